use crate::error::SyncError;
use crate::scrobble::render::PathTemplate;
use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PATH_TEMPLATE: &str = "{year}/{month}/LastFM_{date}.md";
pub const DEFAULT_ENDPOINT: &str = "https://ws.audioscrobbler.com/2.0/";
/// The service caps one page of recent tracks at this many entries.
pub const MAX_PAGE_LIMIT: u32 = 200;
/// Longest trailing fetch window, in hours (ten years).
pub const MAX_WINDOW_HOURS: u64 = 24 * 366 * 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub path_template: String,
    pub timezone: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl NotesConfig {
    pub fn template(&self) -> Result<PathTemplate, SyncError> {
        PathTemplate::parse(&self.path_template)
    }

    pub fn tz(&self) -> Result<Tz, SyncError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| SyncError::InvalidConfig(format!("unknown timezone `{}`", self.timezone)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub window_hours: u64,
    pub page_limit: u32,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            page_limit: MAX_PAGE_LIMIT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
            user_agent: format!("ScrobbleSync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    pub notes: NotesConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSyncConfig {
    notes: Option<NotesConfig>,
    fetch: Option<FetchConfig>,
}

/// API credentials. Loaded once at startup; `Debug` never prints the values.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub shared_secret: String,
    pub username: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("shared_secret", &"<redacted>")
            .field("username", &"<redacted>")
            .finish()
    }
}

pub const CREDENTIAL_VARS: [&str; 3] = ["LASTFM_API_KEY", "LASTFM_SHARED_SECRET", "LASTFM_USERNAME"];

fn required_env(var: &'static str) -> Result<String, SyncError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(SyncError::MissingCredential(var)),
    }
}

pub fn load_credentials() -> Result<Credentials, SyncError> {
    Ok(Credentials {
        api_key: required_env("LASTFM_API_KEY")?,
        shared_secret: required_env("LASTFM_SHARED_SECRET")?,
        username: required_env("LASTFM_USERNAME")?,
    })
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

pub fn validate(cfg: &SyncConfig) -> Result<()> {
    cfg.notes.template()?;
    cfg.notes.tz()?;
    if cfg.fetch.page_limit == 0 || cfg.fetch.page_limit > MAX_PAGE_LIMIT {
        return Err(anyhow!(
            "invalid page limit: require 1 <= limit <= {MAX_PAGE_LIMIT}"
        ));
    }
    if cfg.fetch.window_hours == 0 || cfg.fetch.window_hours > MAX_WINDOW_HOURS {
        return Err(anyhow!(
            "invalid fetch window: require 1 <= hours <= {MAX_WINDOW_HOURS}"
        ));
    }
    if cfg.fetch.timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    if cfg.fetch.endpoint.trim().is_empty() {
        return Err(anyhow!("invalid endpoint: cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("SCROBBLE_SYNC_CONFIG") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("scrobble-sync").join("config.toml"))
}

fn merge_file_config(base: &mut SyncConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialSyncConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(notes) = parsed.notes {
        base.notes = notes;
    }
    if let Some(fetch) = parsed.fetch {
        base.fetch = fetch;
    }
    Ok(())
}

pub fn load_config() -> Result<SyncConfig> {
    let mut cfg = SyncConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.notes.path_template =
        env_or_string("SCROBBLE_SYNC_PATH_TEMPLATE", &cfg.notes.path_template);
    cfg.notes.timezone = env_or_string("SCROBBLE_SYNC_TIMEZONE", &cfg.notes.timezone);
    cfg.fetch.window_hours = env_or_u64("SCROBBLE_SYNC_WINDOW_HOURS", cfg.fetch.window_hours);
    cfg.fetch.page_limit = env_or_u32("SCROBBLE_SYNC_PAGE_LIMIT", cfg.fetch.page_limit);
    cfg.fetch.endpoint = env_or_string("SCROBBLE_SYNC_ENDPOINT", &cfg.fetch.endpoint);
    cfg.fetch.timeout_secs = env_or_u64("SCROBBLE_SYNC_TIMEOUT_SECS", cfg.fetch.timeout_secs);
    cfg.fetch.user_agent = env_or_string("SCROBBLE_SYNC_USER_AGENT", &cfg.fetch.user_agent);

    validate(&cfg)?;
    Ok(cfg)
}
