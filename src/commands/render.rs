use anyhow::Result;

use crate::commands::{CommandReport, describe_render};
use crate::scrobble::clock::SystemClock;
use crate::scrobble::config::load_config;
use crate::scrobble::fetch::{FetchOutcome, FetchWindow, TrackSource};
use crate::scrobble::paths::resolve_paths;
use crate::scrobble::pipeline::Pipeline;

/// Stand-in source for runs that never touch the network.
struct OfflineSource;

impl TrackSource for OfflineSource {
    fn recent_tracks(&self, _window: FetchWindow) -> FetchOutcome {
        FetchOutcome::Empty
    }
}

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("render");
    let paths = resolve_paths()?;
    let config = load_config()?;

    report.detail(format!("staging_file={}", paths.staging_file.display()));
    let pipeline = Pipeline::new(paths, config, OfflineSource, SystemClock)?;
    let summary = pipeline.render_staged()?;
    describe_render(&mut report, &summary);
    Ok(report)
}
