use crate::error::SyncError;
use crate::scrobble::config::{Credentials, FetchConfig};
use crate::scrobble::signer::sign_params;
use anyhow::Result;
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const RECENT_TRACKS_METHOD: &str = "user.getrecenttracks";
/// Longest error body kept in a log line.
const MAX_LOGGED_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: i64,
    pub to: i64,
    pub limit: u32,
}

/// Result of one fetch. `Empty` stands for every failure mode; callers treat
/// it the same as "no data".
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Body(Value),
    Empty,
}

pub trait TrackSource {
    fn recent_tracks(&self, window: FetchWindow) -> FetchOutcome;
}

pub struct HistoryFetcher {
    client: Client,
    endpoint: String,
    user_agent: String,
    credentials: Credentials,
}

impl HistoryFetcher {
    pub fn new(fetch: &FetchConfig, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, fetch, credentials))
    }

    pub fn with_client(client: Client, fetch: &FetchConfig, credentials: Credentials) -> Self {
        Self {
            client,
            endpoint: fetch.endpoint.clone(),
            user_agent: fetch.user_agent.clone(),
            credentials,
        }
    }

    /// Query parameters for one window, `api_sig` included.
    pub fn signed_params(&self, window: FetchWindow) -> BTreeMap<String, String> {
        build_signed_params(&self.credentials, window)
    }

    fn try_fetch(&self, window: FetchWindow) -> Result<Value, SyncError> {
        let params = self.signed_params(window);
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&params)
            .send()
            .map_err(|err| SyncError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_LOGGED_BODY_CHARS).collect(),
            });
        }

        let json: Value = response
            .json()
            .map_err(|err| SyncError::ResponseParse(err.without_url().to_string()))?;
        if let Some(code) = json.get("error") {
            return Err(SyncError::ApiError {
                code: code.as_i64().unwrap_or_default(),
                message: json
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message")
                    .to_string(),
            });
        }
        Ok(json)
    }
}

pub fn build_signed_params(credentials: &Credentials, window: FetchWindow) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("method".to_string(), RECENT_TRACKS_METHOD.to_string());
    params.insert("user".to_string(), credentials.username.clone());
    params.insert("api_key".to_string(), credentials.api_key.clone());
    params.insert("from".to_string(), window.from.to_string());
    params.insert("to".to_string(), window.to.to_string());
    params.insert("limit".to_string(), window.limit.to_string());
    params.insert("format".to_string(), "json".to_string());
    let sig = sign_params(&params, &credentials.shared_secret);
    params.insert("api_sig".to_string(), sig);
    params
}

impl TrackSource for HistoryFetcher {
    fn recent_tracks(&self, window: FetchWindow) -> FetchOutcome {
        log::debug!(
            "requesting recent tracks from={} to={} limit={}",
            window.from,
            window.to,
            window.limit
        );
        match self.try_fetch(window) {
            Ok(body) => FetchOutcome::Body(body),
            Err(err) => {
                log::error!("fetch failed: {err}");
                FetchOutcome::Empty
            }
        }
    }
}
