use crate::error::SyncError;
use crate::scrobble::normalize::{CanonicalRecord, ScrobbleTime};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const STAGING_HEADER: [&str; 4] = ["Artist", "Track", "Album", "Timestamp"];
pub const NOW_PLAYING_MARKER: &str = "Now Playing";

fn timestamp_cell(timestamp: ScrobbleTime) -> String {
    match timestamp {
        ScrobbleTime::At(secs) => secs.to_string(),
        ScrobbleTime::NowPlaying => NOW_PLAYING_MARKER.to_string(),
    }
}

fn parse_timestamp_cell(row: usize, cell: &str) -> Result<ScrobbleTime, SyncError> {
    let cell = cell.trim();
    if cell == NOW_PLAYING_MARKER {
        return Ok(ScrobbleTime::NowPlaying);
    }
    cell.parse::<i64>().map(ScrobbleTime::At).map_err(|_| {
        SyncError::InvalidStaging(format!("row {row}: timestamp `{cell}` is neither seconds nor `{NOW_PLAYING_MARKER}`"))
    })
}

/// Replace the staging table with `records`, header first.
pub fn write_staging(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    wtr.write_record(STAGING_HEADER)?;
    for record in records {
        wtr.write_record([
            record.artist.as_str(),
            record.track.as_str(),
            record.album.as_str(),
            timestamp_cell(record.timestamp).as_str(),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Read the staging table back. A missing file reads as an empty table.
pub fn read_staging(path: &Path) -> Result<Vec<CanonicalRecord>> {
    if !path.exists() {
        log::debug!("staging table {} not found; treating as empty", path.display());
        return Ok(Vec::new());
    }

    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?;
    if headers.iter().ne(STAGING_HEADER) {
        return Err(SyncError::InvalidStaging(format!(
            "unexpected header in {}: {}",
            path.display(),
            headers.iter().collect::<Vec<_>>().join(",")
        ))
        .into());
    }

    let mut out = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("failed to read {}", path.display()))?;
        // Row numbers are 1-based and skip the header.
        let row_no = idx + 2;
        if row.len() != STAGING_HEADER.len() {
            return Err(SyncError::InvalidStaging(format!(
                "row {row_no}: expected {} columns, found {}",
                STAGING_HEADER.len(),
                row.len()
            ))
            .into());
        }
        for (col, name) in [(0, "artist"), (1, "track")] {
            if row[col].trim().is_empty() {
                return Err(SyncError::InvalidStaging(format!("row {row_no}: empty {name}")).into());
            }
        }
        out.push(CanonicalRecord {
            artist: row[0].to_string(),
            track: row[1].to_string(),
            album: row[2].to_string(),
            timestamp: parse_timestamp_cell(row_no, &row[3])?,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(artist: &str, track: &str, album: &str, timestamp: ScrobbleTime) -> CanonicalRecord {
        CanonicalRecord {
            artist: artist.to_string(),
            track: track.to_string(),
            album: album.to_string(),
            timestamp,
        }
    }

    #[test]
    fn staged_records_read_back_equal() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("staging.csv");
        let records = vec![
            record("Band, The", "Song \"One\"", "LP", ScrobbleTime::At(1_709_600_000)),
            record("Solo", "Live", "Unknown Album", ScrobbleTime::NowPlaying),
        ];

        write_staging(&path, &records).expect("write");
        assert_eq!(read_staging(&path).expect("read"), records);
    }

    #[test]
    fn header_row_is_fixed() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("staging.csv");
        write_staging(&path, &[record("A", "B", "C", ScrobbleTime::At(5))]).expect("write");

        let raw = fs::read_to_string(&path).expect("read raw");
        assert_eq!(raw, "Artist,Track,Album,Timestamp\nA,B,C,5\n");
    }

    #[test]
    fn writing_replaces_previous_content() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested/staging.csv");
        write_staging(
            &path,
            &[
                record("A", "1", "X", ScrobbleTime::At(1)),
                record("A", "2", "X", ScrobbleTime::At(2)),
            ],
        )
        .expect("first write");
        write_staging(&path, &[record("B", "3", "Y", ScrobbleTime::At(3))]).expect("second write");

        let back = read_staging(&path).expect("read");
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].artist, "B");
    }

    #[test]
    fn empty_and_missing_tables_read_as_no_records() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("staging.csv");
        assert!(read_staging(&path).expect("missing").is_empty());

        write_staging(&path, &[]).expect("write");
        assert!(read_staging(&path).expect("empty").is_empty());
    }

    #[test]
    fn bad_timestamp_cell_is_rejected() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("staging.csv");
        fs::write(&path, "Artist,Track,Album,Timestamp\nA,B,C,yesterday\n").expect("write");

        let err = read_staging(&path).expect_err("invalid");
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn blank_artist_or_track_is_rejected() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("staging.csv");
        fs::write(&path, "Artist,Track,Album,Timestamp\nA,B,C,1\n,Song,C,2\n").expect("write");
        let err = read_staging(&path).expect_err("blank artist");
        assert!(err.to_string().contains("row 3: empty artist"));

        fs::write(&path, "Artist,Track,Album,Timestamp\nA,  ,C,1\n").expect("write");
        let err = read_staging(&path).expect_err("blank track");
        assert!(err.to_string().contains("row 2: empty track"));
    }
}
