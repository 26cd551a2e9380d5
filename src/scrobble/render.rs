use crate::error::SyncError;
use crate::scrobble::group::local_time;
use crate::scrobble::normalize::CanonicalRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const NOW_PLAYING_FILE: &str = "LastFM_NowPlaying.md";
const NOTE_TYPE: &str = "[[LastFM]]";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";
const PLACEHOLDERS: [&str; 4] = ["year", "month", "day", "date"];

/// Relative note path with `{year}`, `{month}`, `{day}` and `{date}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let invalid = |why: String| SyncError::InvalidConfig(format!("path template `{raw}`: {why}"));
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("cannot be empty".to_string()));
        }

        let path = Path::new(trimmed);
        if path.is_absolute() || path.has_root() {
            return Err(invalid("must be relative to the output folder".to_string()));
        }
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(invalid("must not contain `..`".to_string()));
        }

        let mut rest = trimmed;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                return Err(invalid("unclosed `{`".to_string()));
            };
            let name = &after[..close];
            if !PLACEHOLDERS.contains(&name) {
                return Err(invalid(format!("unknown placeholder `{{{name}}}`")));
            }
            rest = &after[close + 1..];
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn resolve(&self, date: NaiveDate) -> PathBuf {
        let resolved = self
            .0
            .replace("{year}", &format!("{:04}", date.year()))
            .replace("{month}", &format!("{:02}", date.month()))
            .replace("{day}", &format!("{:02}", date.day()))
            .replace("{date}", &date.format("%Y-%m-%d").to_string());
        PathBuf::from(resolved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMetadata {
    pub noteid: String,
    pub iso8601time: String,
    pub notetype: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub track: String,
    pub artist: String,
    pub album: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDocument {
    pub path: PathBuf,
    pub metadata: NoteMetadata,
    pub title: String,
    pub rows: Vec<NoteRow>,
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}

impl NoteDocument {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let meta = &self.metadata;
        out.push_str("---\n");
        out.push_str(&format!("noteid: \"{}\"\n", meta.noteid));
        out.push_str(&format!("iso8601time: \"{}\"\n", meta.iso8601time));
        out.push_str(&format!("notetype: \"{}\"\n", meta.notetype));
        out.push_str("tags:\n");
        for tag in &meta.tags {
            out.push_str(&format!("  - {tag}\n"));
        }
        out.push_str("---\n\n");

        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str("| Track | Artist | Album | Timestamp |\n");
        out.push_str("|-------|--------|-------|-----------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| **{}** | *{}* | {} | {} |\n",
                escape_cell(&row.track),
                escape_cell(&row.artist),
                escape_cell(&row.album),
                row.timestamp
            ));
        }
        out
    }
}

fn note_row(record: &CanonicalRecord, timestamp: String) -> NoteRow {
    NoteRow {
        track: record.track.clone(),
        artist: record.artist.clone(),
        album: record.album.clone(),
        timestamp,
    }
}

/// Note for one calendar date. `records` must already be sorted.
///
/// `iso8601time` is the date joined with the time of the latest scrobble, so
/// rendering the same records twice produces the same bytes.
pub fn dated_note<Z: TimeZone>(
    output_dir: &Path,
    template: &PathTemplate,
    date: NaiveDate,
    records: &[CanonicalRecord],
    tz: &Z,
) -> Result<NoteDocument, SyncError>
where
    Z::Offset: std::fmt::Display,
{
    let mut rows = Vec::with_capacity(records.len());
    let mut latest = "00:00:00".to_string();
    for record in records {
        let Some(secs) = record.timestamp.epoch_secs() else {
            continue;
        };
        let time_of_day = local_time(secs, tz)?.format(TIME_OF_DAY_FORMAT).to_string();
        latest = time_of_day.clone();
        rows.push(note_row(record, time_of_day));
    }

    let date_str = date.format("%Y-%m-%d").to_string();
    Ok(NoteDocument {
        path: output_dir.join(template.resolve(date)),
        metadata: NoteMetadata {
            noteid: format!("[[LastFM_{date_str}]]"),
            iso8601time: format!("{date_str}T{latest}"),
            notetype: NOTE_TYPE.to_string(),
            tags: vec!["LastFM".to_string(), "Scrobble".to_string()],
        },
        title: format!("Last.fm - Scrobble History ({date_str})"),
        rows,
    })
}

/// Note for tracks still playing; every row carries the write instant.
pub fn now_playing_note<Z: TimeZone>(
    output_dir: &Path,
    records: &[CanonicalRecord],
    now: &DateTime<Z>,
) -> NoteDocument
where
    Z::Offset: std::fmt::Display,
{
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    NoteDocument {
        path: output_dir.join(NOW_PLAYING_FILE),
        metadata: NoteMetadata {
            noteid: "[[NowPlaying]]".to_string(),
            iso8601time: stamp.clone(),
            notetype: NOTE_TYPE.to_string(),
            tags: vec!["LastFM".to_string(), "NowPlaying".to_string()],
        },
        title: "Last.fm - Now Playing".to_string(),
        rows: records.iter().map(|r| note_row(r, stamp.clone())).collect(),
    }
}

/// Write `doc` to its path, replacing any previous file.
pub fn write_note(doc: &NoteDocument) -> Result<()> {
    if let Some(parent) = doc.path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&doc.path, doc.to_markdown())
        .with_context(|| format!("failed to write {}", doc.path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrobble::normalize::ScrobbleTime;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn record(track: &str, timestamp: ScrobbleTime) -> CanonicalRecord {
        CanonicalRecord {
            artist: "Band".to_string(),
            track: track.to_string(),
            album: "Record".to_string(),
            timestamp,
        }
    }

    #[test]
    fn template_substitutes_date_parts() {
        let template = PathTemplate::parse("{year}/{month}/LastFM_{date}.md").expect("parse");
        assert_eq!(
            template.resolve(date("2024-03-05")),
            PathBuf::from("2024/03/LastFM_2024-03-05.md")
        );

        let daily = PathTemplate::parse("{year}-{month}-{day}.md").expect("parse");
        assert_eq!(daily.resolve(date("2024-11-09")), PathBuf::from("2024-11-09.md"));
    }

    #[test]
    fn template_rejects_unsafe_or_unknown_forms() {
        assert!(PathTemplate::parse("").is_err());
        assert!(PathTemplate::parse("/abs/{date}.md").is_err());
        assert!(PathTemplate::parse("../{date}.md").is_err());
        assert!(PathTemplate::parse("{week}/{date}.md").is_err());
        assert!(PathTemplate::parse("{date.md").is_err());
    }

    #[test]
    fn dated_note_renders_header_and_rows() {
        let records = vec![
            record("Opening", ScrobbleTime::At(1_709_625_600)),
            record("Closing", ScrobbleTime::At(1_709_632_800)),
        ];
        let template = PathTemplate::parse("{year}/{month}/LastFM_{date}.md").expect("parse");
        let doc = dated_note(
            Path::new("/notes"),
            &template,
            date("2024-03-05"),
            &records,
            &chrono_tz::UTC,
        )
        .expect("render");

        assert_eq!(doc.path, PathBuf::from("/notes/2024/03/LastFM_2024-03-05.md"));
        let expected = "---\n\
noteid: \"[[LastFM_2024-03-05]]\"\n\
iso8601time: \"2024-03-05T10:00:00\"\n\
notetype: \"[[LastFM]]\"\n\
tags:\n  - LastFM\n  - Scrobble\n\
---\n\n\
# Last.fm - Scrobble History (2024-03-05)\n\n\
| Track | Artist | Album | Timestamp |\n\
|-------|--------|-------|-----------|\n\
| **Opening** | *Band* | Record | 08:00:00 |\n\
| **Closing** | *Band* | Record | 10:00:00 |\n";
        assert_eq!(doc.to_markdown(), expected);
    }

    #[test]
    fn now_playing_rows_share_write_instant() {
        let now = DateTime::from_timestamp(1_709_700_000, 0).expect("instant");
        let records = vec![
            record("One", ScrobbleTime::NowPlaying),
            record("Two", ScrobbleTime::NowPlaying),
        ];
        let doc = now_playing_note(Path::new("/notes"), &records, &now);

        assert_eq!(doc.path, PathBuf::from("/notes/LastFM_NowPlaying.md"));
        assert_eq!(doc.metadata.noteid, "[[NowPlaying]]");
        assert_eq!(doc.metadata.iso8601time, "2024-03-06T04:40:00");
        assert!(doc.rows.iter().all(|r| r.timestamp == "2024-03-06T04:40:00"));
        assert!(doc.to_markdown().contains("  - NowPlaying\n"));
    }

    #[test]
    fn pipes_in_cells_are_escaped() {
        let mut rec = record("A|B", ScrobbleTime::At(0));
        rec.album = "Side 1\nSide 2".to_string();
        let doc = dated_note(
            Path::new("/n"),
            &PathTemplate::parse("{date}.md").expect("parse"),
            date("1970-01-01"),
            &[rec],
            &chrono_tz::UTC,
        )
        .expect("render");
        assert!(doc.to_markdown().contains("| **A\\|B** | *Band* | Side 1 Side 2 | 00:00:00 |"));
    }

    #[test]
    fn write_note_creates_parents_and_overwrites() {
        let tmp = tempdir().expect("tempdir");
        let template = PathTemplate::parse("{year}/{month}/LastFM_{date}.md").expect("parse");
        let first = dated_note(
            tmp.path(),
            &template,
            date("2024-03-05"),
            &[record("First", ScrobbleTime::At(1_709_625_600))],
            &chrono_tz::UTC,
        )
        .expect("render");
        write_note(&first).expect("write");

        let second = dated_note(
            tmp.path(),
            &template,
            date("2024-03-05"),
            &[record("Second", ScrobbleTime::At(1_709_625_600))],
            &chrono_tz::UTC,
        )
        .expect("render");
        write_note(&second).expect("rewrite");

        let body = fs::read_to_string(&second.path).expect("read");
        assert!(body.contains("**Second**"));
        assert!(!body.contains("**First**"));
    }
}
