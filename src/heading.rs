//! Section headings derived from record filenames.
//!
//! Images pulled from a photo library are named
//! `<date>_<time>_<original name>`. The date and time become a readable
//! timestamp, and the rest becomes the label. Any other name is used as-is
//! with the [`NO_TIMESTAMP`](crate::models::NO_TIMESTAMP) marker.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;

use crate::models::{file_name, Heading};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];
const TIME_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%H%M%S", "%H%M"];
const DISPLAY_FORMAT: &str = "%B %d, %Y at %I:%M %p";

/// Derive the heading for a record or image path.
pub fn derive(path: &Path) -> Heading {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    match parse_stem(&stem) {
        Some((timestamp, rest)) => Heading {
            label: if rest.is_empty() { stem.clone() } else { rest },
            timestamp: Some(timestamp.format(DISPLAY_FORMAT).to_string()),
        },
        None => {
            tracing::debug!(path = %path.display(), "filename has no timestamp");
            Heading {
                label: file_name(path),
                timestamp: None,
            }
        }
    }
}

fn parse_stem(stem: &str) -> Option<(NaiveDateTime, String)> {
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let date = parse_date(parts[0])?;
    let time = parse_time(&parts[1].replace('-', ":"))?;
    Some((date.and_time(time), parts[2..].join("_")))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_TIMESTAMP;

    #[test]
    fn timestamped_name() {
        let h = derive(Path::new("2023-05-01_14-30-00_vacation.jpg"));
        assert_eq!(h.label, "vacation");
        assert_eq!(h.timestamp.as_deref(), Some("May 01, 2023 at 02:30 PM"));
    }

    #[test]
    fn rest_keeps_its_underscores() {
        let h = derive(Path::new("/data/2021-12-24_08-05-09_IMG_0042.json"));
        assert_eq!(h.label, "IMG_0042");
        assert_eq!(h.timestamp.as_deref(), Some("December 24, 2021 at 08:05 AM"));
    }

    #[test]
    fn plain_name_falls_back() {
        let h = derive(Path::new("IMG_0001.jpg"));
        assert_eq!(h.label, "IMG_0001.jpg");
        assert_eq!(h.timestamp, None);
        assert_eq!(h.timestamp_text(), NO_TIMESTAMP);
    }

    #[test]
    fn invalid_date_falls_back() {
        let h = derive(Path::new("2023-13-45_10-00-00_x.json"));
        assert_eq!(h.label, "2023-13-45_10-00-00_x.json");
        assert_eq!(h.timestamp, None);
    }

    #[test]
    fn compact_date_and_short_time() {
        let h = derive(Path::new("20230501_0930_scan.json"));
        assert_eq!(h.label, "scan");
        assert_eq!(h.timestamp.as_deref(), Some("May 01, 2023 at 09:30 AM"));
    }

    #[test]
    fn no_rest_uses_stem() {
        let h = derive(Path::new("2023-05-01_14-30-00.json"));
        assert_eq!(h.label, "2023-05-01_14-30-00");
        assert!(h.timestamp.is_some());
    }
}
