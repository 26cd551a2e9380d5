use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SyncPaths {
    pub sync_home: PathBuf,
    pub output_dir: PathBuf,
    pub staging_file: PathBuf,
}

impl SyncPaths {
    /// Lay out every path under one root; used by tests and by `resolve_paths`.
    pub fn under(sync_home: PathBuf) -> Self {
        Self {
            output_dir: sync_home.join("notes"),
            staging_file: sync_home.join("lastfm_history.csv"),
            sync_home,
        }
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<SyncPaths> {
    let home = required_home_dir()?;
    let sync_home = env_or_default_path("SCROBBLE_SYNC_HOME", home.join("ScrobbleSync"));
    let defaults = SyncPaths::under(sync_home);

    Ok(SyncPaths {
        output_dir: env_or_default_path("SCROBBLE_SYNC_OUTPUT_DIR", defaults.output_dir),
        staging_file: env_or_default_path("SCROBBLE_SYNC_STAGING_FILE", defaults.staging_file),
        sync_home: defaults.sync_home,
    })
}

#[cfg(test)]
mod tests {
    use super::SyncPaths;
    use std::path::PathBuf;

    #[test]
    fn under_places_notes_and_staging_in_home() {
        let paths = SyncPaths::under(PathBuf::from("/data/sync"));
        assert_eq!(paths.output_dir, PathBuf::from("/data/sync/notes"));
        assert_eq!(
            paths.staging_file,
            PathBuf::from("/data/sync/lastfm_history.csv")
        );
    }
}
