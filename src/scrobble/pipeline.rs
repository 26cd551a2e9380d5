use crate::error::SyncError;
use crate::scrobble::clock::Clock;
use crate::scrobble::config::SyncConfig;
use crate::scrobble::fetch::{FetchOutcome, FetchWindow, TrackSource};
use crate::scrobble::group::group_records;
use crate::scrobble::normalize::{extract_track_entries, normalize_all};
use crate::scrobble::paths::SyncPaths;
use crate::scrobble::render::{PathTemplate, dated_note, now_playing_note, write_note};
use crate::scrobble::staging::{read_staging, write_staging};
use anyhow::Result;
use chrono_tz::Tz;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub records: usize,
    pub dated_notes: Vec<PathBuf>,
    pub now_playing_note: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The service could not be reached or answered with garbage.
    FetchFailed,
    /// The service answered but the window holds no tracks.
    NoTracks,
    Completed(RenderSummary),
}

pub struct Pipeline<S, C> {
    paths: SyncPaths,
    config: SyncConfig,
    template: PathTemplate,
    tz: Tz,
    source: S,
    clock: C,
}

impl<S: TrackSource, C: Clock> Pipeline<S, C> {
    pub fn new(paths: SyncPaths, config: SyncConfig, source: S, clock: C) -> Result<Self> {
        let template = config.notes.template()?;
        let tz = config.notes.tz()?;
        Ok(Self {
            paths,
            config,
            template,
            tz,
            source,
            clock,
        })
    }

    /// The trailing `window_hours` ending now.
    pub fn default_window(&self) -> Result<FetchWindow, SyncError> {
        let hours = self.config.fetch.window_hours;
        let to = self.clock.now().timestamp();
        let from = window_start(to, hours).ok_or_else(|| {
            SyncError::InvalidConfig(format!("fetch window of {hours} hours is out of range"))
        })?;
        Ok(FetchWindow {
            from,
            to,
            limit: self.config.fetch.page_limit,
        })
    }

    /// Fetch, normalize, stage, then render.
    pub fn run(&self, window: FetchWindow) -> Result<RunOutcome> {
        let body = match self.source.recent_tracks(window) {
            FetchOutcome::Body(body) => body,
            FetchOutcome::Empty => {
                log::warn!("no data fetched; check credentials and connectivity");
                return Ok(RunOutcome::FetchFailed);
            }
        };

        let entries = extract_track_entries(&body);
        if entries.is_empty() {
            log::info!("no tracks found between {} and {}", window.from, window.to);
            return Ok(RunOutcome::NoTracks);
        }

        let records = normalize_all(&entries)?;
        log::info!(
            "staging {} record(s) to {}",
            records.len(),
            self.paths.staging_file.display()
        );
        write_staging(&self.paths.staging_file, &records)?;

        Ok(RunOutcome::Completed(self.render_staged()?))
    }

    /// Rebuild notes from the staging table alone.
    pub fn render_staged(&self) -> Result<RenderSummary> {
        let records = read_staging(&self.paths.staging_file)?;
        let total = records.len();
        let buckets = group_records(records, &self.tz)?;

        let mut dated_notes = Vec::with_capacity(buckets.dated.len());
        for (date, records) in &buckets.dated {
            let doc = dated_note(&self.paths.output_dir, &self.template, *date, records, &self.tz)?;
            write_note(&doc)?;
            log::debug!("wrote {} row(s) to {}", doc.rows.len(), doc.path.display());
            dated_notes.push(doc.path);
        }

        let now_playing = if buckets.now_playing.is_empty() {
            log::debug!("no now-playing tracks");
            None
        } else {
            let now = self.clock.now().with_timezone(&self.tz);
            let doc = now_playing_note(&self.paths.output_dir, &buckets.now_playing, &now);
            write_note(&doc)?;
            Some(doc.path)
        };

        log::info!(
            "rendered {} dated note(s) from {} record(s) into {}",
            dated_notes.len(),
            total,
            self.paths.output_dir.display()
        );
        Ok(RenderSummary {
            records: total,
            dated_notes,
            now_playing_note: now_playing,
        })
    }
}

/// Epoch seconds `hours` before `to`, or `None` on overflow.
pub fn window_start(to: i64, hours: u64) -> Option<i64> {
    let secs = i64::try_from(hours).ok()?.checked_mul(3600)?;
    to.checked_sub(secs)
}
