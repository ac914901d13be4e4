use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::channel::Receipt;
use crate::clock;
use crate::error::{BenchError, Result};

/// Time interval over which power is attributed to one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl PowerWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end <= start {
            return Err(BenchError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Strictly between the boundaries
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        *ts > self.start && *ts < self.end
    }

    pub fn duration_secs(&self) -> f64 {
        clock::seconds_between(&self.start, &self.end)
    }

    /// First start-class marker and the first end-class marker after it.
    /// `Ok(None)` when the receipts hold no such pair.
    pub fn from_receipts(receipts: &[Receipt]) -> Result<Option<Self>> {
        let Some(start_idx) = receipts.iter().position(|r| r.marker.is_start()) else {
            return Ok(None);
        };
        let Some(end) = receipts[start_idx + 1..].iter().find(|r| r.marker.is_end()) else {
            return Ok(None);
        };
        Self::new(receipts[start_idx].received_at, end.received_at).map(Some)
    }
}

/// Window from the first field of the first two lines of a timing file
pub fn load_window(path: &Path) -> Result<PowerWindow> {
    let text = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    parse_window(&text, path)
}

pub fn parse_window(text: &str, origin: &Path) -> Result<PowerWindow> {
    let mut lines = text.lines();
    let mut boundary = |which: &str| -> Result<NaiveDateTime> {
        let line = lines.next().ok_or_else(|| {
            BenchError::format(origin, format!("missing {} line, need two timing lines", which))
        })?;
        let field = line.split(',').next().unwrap_or_default();
        clock::parse_timestamp(field).ok_or_else(|| {
            BenchError::format(origin, format!("bad {} timestamp {:?}", which, field))
        })
    };

    let start = boundary("start")?;
    let end = boundary("end")?;
    PowerWindow::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Marker;

    fn ts(raw: &str) -> NaiveDateTime {
        clock::parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_timing_file_five_seconds() {
        let text = "2019-01-01T00:00:00,x\n2019-01-01T00:00:05,y\n";
        let window = parse_window(text, Path::new("timing.txt")).unwrap();
        assert_eq!(window.duration_secs(), 5.0);
    }

    #[test]
    fn test_ctime_lines_from_reference_receiver() {
        let text = "Tue Jan  1 00:00:00 2019,profile_start\nTue Jan  1 00:01:00 2019,profile_end\n";
        let window = parse_window(text, Path::new("profile_output.txt")).unwrap();
        assert_eq!(window.duration_secs(), 60.0);
    }

    #[test]
    fn test_single_line_is_format_error() {
        let err = parse_window("2019-01-01T00:00:00,x\n", Path::new("t.txt")).unwrap_err();
        assert!(matches!(err, BenchError::Format { .. }));
    }

    #[test]
    fn test_unparseable_timestamp() {
        let err = parse_window("start,x\n2019-01-01T00:00:05,y\n", Path::new("t.txt")).unwrap_err();
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn test_reversed_window_invalid() {
        let text = "2019-01-01T00:00:05,x\n2019-01-01T00:00:00,y\n";
        let err = parse_window(text, Path::new("t.txt")).unwrap_err();
        assert!(matches!(err, BenchError::InvalidWindow { .. }));
    }

    #[test]
    fn test_from_receipts_pairs_first_start_with_next_end() {
        let receipts = vec![
            Receipt::new(ts("2019-01-01T00:00:00"), Marker::RunEnd),
            Receipt::new(ts("2019-01-01T00:00:01"), Marker::Text("warmup".into())),
            Receipt::new(ts("2019-01-01T00:00:02"), Marker::ProfileStart),
            Receipt::new(ts("2019-01-01T00:00:03"), Marker::RunStart),
            Receipt::new(ts("2019-01-01T00:00:09"), Marker::ProfileEnd),
            Receipt::new(ts("2019-01-01T00:00:12"), Marker::RunEnd),
        ];
        let window = PowerWindow::from_receipts(&receipts).unwrap().unwrap();
        assert_eq!(window.start(), ts("2019-01-01T00:00:02"));
        assert_eq!(window.end(), ts("2019-01-01T00:00:09"));
    }

    #[test]
    fn test_from_receipts_without_end() {
        let receipts = vec![Receipt::new(ts("2019-01-01T00:00:00"), Marker::RunStart)];
        assert_eq!(PowerWindow::from_receipts(&receipts).unwrap(), None);
    }
}
