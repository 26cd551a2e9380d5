use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(sync_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(sync_home) = sync_home {
        return Some(sync_home.join(".env"));
    }
    Some(home_dir?.join("ScrobbleSync/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("SCROBBLE_SYNC_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}
