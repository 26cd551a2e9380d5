use anyhow::Result;

use crate::commands::{CommandReport, describe_render};
use crate::error::SyncError;
use crate::scrobble::clock::SystemClock;
use crate::scrobble::config::{load_config, load_credentials};
use crate::scrobble::fetch::{FetchWindow, HistoryFetcher};
use crate::scrobble::paths::resolve_paths;
use crate::scrobble::pipeline::{Pipeline, RunOutcome, window_start};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub hours: Option<u64>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: Option<u32>,
}

fn resolve_window(opts: &SyncOptions, default: FetchWindow) -> Result<FetchWindow, SyncError> {
    let to = opts.to.unwrap_or(default.to);
    let from = match (opts.from, opts.hours) {
        (Some(from), _) => from,
        (None, Some(hours)) => window_start(to, hours).ok_or_else(|| {
            SyncError::InvalidConfig(format!("--hours {hours} is out of range"))
        })?,
        (None, None) => to.checked_sub(default.to - default.from).ok_or_else(|| {
            SyncError::InvalidConfig(format!("fetch window ending at {to} is out of range"))
        })?,
    };
    if from >= to {
        return Err(SyncError::InvalidConfig(format!(
            "fetch window is empty: from={from} to={to}"
        )));
    }
    Ok(FetchWindow {
        from,
        to,
        limit: opts.limit.unwrap_or(default.limit),
    })
}

pub fn run(opts: &SyncOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("sync");
    let paths = resolve_paths()?;
    let mut config = load_config()?;
    if let Some(limit) = opts.limit {
        config.fetch.page_limit = limit;
        crate::scrobble::config::validate(&config)?;
    }
    let credentials = load_credentials()?;

    let fetcher = HistoryFetcher::new(&config.fetch, credentials)?;
    let pipeline = Pipeline::new(paths.clone(), config, fetcher, SystemClock)?;
    let window = resolve_window(opts, pipeline.default_window()?)?;
    report.detail(format!("window.from={}", window.from));
    report.detail(format!("window.to={}", window.to));
    report.detail(format!("window.limit={}", window.limit));

    match pipeline.run(window) {
        Ok(RunOutcome::FetchFailed) => {
            report.detail("status=fetch_failed");
            report.detail("failed to fetch data; see log for details");
        }
        Ok(RunOutcome::NoTracks) => {
            report.detail("status=no_tracks");
            report.detail("no tracks found in the requested window");
        }
        Ok(RunOutcome::Completed(summary)) => {
            report.detail("status=completed");
            report.detail(format!("staging_file={}", paths.staging_file.display()));
            describe_render(&mut report, &summary);
        }
        Err(err) => {
            let malformed = matches!(
                err.downcast_ref::<SyncError>(),
                Some(SyncError::MalformedRecord { .. })
            );
            if !malformed {
                return Err(err);
            }
            log::error!("{err}");
            report.issue(err.to_string());
        }
    }

    Ok(report)
}
