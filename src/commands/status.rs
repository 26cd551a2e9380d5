use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::scrobble::config::{CREDENTIAL_VARS, load_config};
use crate::scrobble::paths::resolve_paths;

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    let paths = resolve_paths()?;

    report.detail(format!("sync_home={}", paths.sync_home.display()));
    report.detail(format!("output_dir={}", paths.output_dir.display()));
    report.detail(format!("staging_file={}", paths.staging_file.display()));

    match load_config() {
        Ok(cfg) => {
            report.detail(format!("notes.path_template={}", cfg.notes.path_template));
            report.detail(format!("notes.timezone={}", cfg.notes.timezone));
            report.detail(format!("fetch.window_hours={}", cfg.fetch.window_hours));
            report.detail(format!("fetch.page_limit={}", cfg.fetch.page_limit));
            report.detail(format!("fetch.endpoint={}", cfg.fetch.endpoint));
            report.detail(format!("fetch.timeout_secs={}", cfg.fetch.timeout_secs));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    for var in CREDENTIAL_VARS {
        let set = env::var(var).is_ok_and(|v| !v.trim().is_empty());
        if set {
            report.detail(format!("credential.{var}=set"));
        } else {
            report.issue(format!("credential.{var}=missing"));
        }
    }

    if !paths.output_dir.exists() {
        report.detail("output_dir=not yet created");
    }

    Ok(report)
}
