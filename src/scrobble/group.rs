use crate::error::SyncError;
use crate::scrobble::normalize::{CanonicalRecord, ScrobbleTime};
use chrono::{DateTime, NaiveDate, TimeZone};
use std::collections::BTreeMap;

/// Records bucketed by the calendar date they were scrobbled on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateBuckets {
    pub dated: BTreeMap<NaiveDate, Vec<CanonicalRecord>>,
    /// Tracks still playing, in staging order.
    pub now_playing: Vec<CanonicalRecord>,
}

impl DateBuckets {
    pub fn is_empty(&self) -> bool {
        self.dated.is_empty() && self.now_playing.is_empty()
    }
}

pub fn local_time<Z: TimeZone>(secs: i64, tz: &Z) -> Result<DateTime<Z>, SyncError> {
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(tz))
        .ok_or_else(|| SyncError::InvalidStaging(format!("timestamp {secs} is out of range")))
}

/// Bucket records by local calendar date in `tz`; each dated bucket is sorted
/// ascending by timestamp.
pub fn group_records<Z: TimeZone>(
    records: Vec<CanonicalRecord>,
    tz: &Z,
) -> Result<DateBuckets, SyncError> {
    let mut buckets = DateBuckets::default();
    for record in records {
        match record.timestamp {
            ScrobbleTime::NowPlaying => buckets.now_playing.push(record),
            ScrobbleTime::At(secs) => {
                let date = local_time(secs, tz)?.date_naive();
                buckets.dated.entry(date).or_default().push(record);
            }
        }
    }
    for bucket in buckets.dated.values_mut() {
        bucket.sort_by_key(|r| r.timestamp.epoch_secs());
    }
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(track: &str, secs: i64) -> CanonicalRecord {
        CanonicalRecord {
            artist: "Artist".to_string(),
            track: track.to_string(),
            album: "Album".to_string(),
            timestamp: ScrobbleTime::At(secs),
        }
    }

    fn playing(track: &str) -> CanonicalRecord {
        CanonicalRecord {
            timestamp: ScrobbleTime::NowPlaying,
            ..at(track, 0)
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn empty_input_gives_no_buckets() {
        let buckets = group_records(Vec::new(), &chrono_tz::UTC).expect("group");
        assert!(buckets.is_empty());
    }

    #[test]
    fn buckets_by_utc_date_and_sorts_ascending() {
        // 2024-03-05T10:00:00Z, 2024-03-05T08:00:00Z, 2024-03-06T00:00:01Z
        let records = vec![
            at("late", 1_709_632_800),
            playing("live"),
            at("next-day", 1_709_683_201),
            at("early", 1_709_625_600),
        ];
        let buckets = group_records(records, &chrono_tz::UTC).expect("group");

        assert_eq!(buckets.dated.len(), 2);
        let first: Vec<_> = buckets.dated[&date("2024-03-05")]
            .iter()
            .map(|r| r.track.as_str())
            .collect();
        assert_eq!(first, ["early", "late"]);
        assert_eq!(buckets.dated[&date("2024-03-06")].len(), 1);
        assert_eq!(buckets.now_playing.len(), 1);
        assert_eq!(buckets.now_playing[0].track, "live");
    }

    #[test]
    fn configured_zone_shifts_the_calendar_date() {
        // 2024-03-06T02:00:00Z is still 2024-03-05 in New York.
        let buckets =
            group_records(vec![at("night", 1_709_690_400)], &chrono_tz::America::New_York)
                .expect("group");
        assert!(buckets.dated.contains_key(&date("2024-03-05")));
    }
}
