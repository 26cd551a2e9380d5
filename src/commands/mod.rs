pub mod render;
pub mod status;
pub mod sync;

use serde::Serialize;

use crate::scrobble::pipeline::RenderSummary;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

pub fn describe_render(report: &mut CommandReport, summary: &RenderSummary) {
    report.detail(format!("records={}", summary.records));
    report.detail(format!("dated_notes={}", summary.dated_notes.len()));
    for path in &summary.dated_notes {
        report.detail(format!("note={}", path.display()));
    }
    match &summary.now_playing_note {
        Some(path) => report.detail(format!("now_playing_note={}", path.display())),
        None => report.detail("now_playing_note=none"),
    }
}
