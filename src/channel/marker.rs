use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock;

pub const RUN_START: &str = "run_start";
pub const RUN_END: &str = "run_end";
pub const PROFILE_START: &str = "profile_start";
pub const PROFILE_END: &str = "profile_end";
pub const DONE: &str = "done_transmit";

/// Lifecycle event sent by the device under test
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    RunStart,
    RunEnd,
    ProfileStart,
    ProfileEnd,
    /// Receiver closes after logging this
    Done,
    /// Anything that is not a reserved token
    Text(String),
}

impl Marker {
    /// Decode one marker. Reserved tokens must match exactly after trimming.
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            RUN_START => Self::RunStart,
            RUN_END => Self::RunEnd,
            PROFILE_START => Self::ProfileStart,
            PROFILE_END => Self::ProfileEnd,
            DONE => Self::Done,
            other => Self::Text(other.to_string()),
        }
    }

    /// Wire text for this marker
    pub fn token(&self) -> &str {
        match self {
            Self::RunStart => RUN_START,
            Self::RunEnd => RUN_END,
            Self::ProfileStart => PROFILE_START,
            Self::ProfileEnd => PROFILE_END,
            Self::Done => DONE,
            Self::Text(text) => text,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Self::RunStart | Self::ProfileStart)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::RunEnd | Self::ProfileEnd)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_end() || *self == Self::Done
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl From<&str> for Marker {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

/// True when an end-class token appears anywhere in a read, which catches
/// markers that arrived coalesced into one segment.
pub fn mentions_end(text: &str) -> bool {
    text.contains(RUN_END) || text.contains(PROFILE_END)
}

pub fn mentions_lifecycle(text: &str) -> bool {
    mentions_end(text) || text.contains(RUN_START) || text.contains(PROFILE_START)
}

pub fn mentions_done(text: &str) -> bool {
    text.contains(DONE)
}

/// A marker stamped with the receiver's clock at the moment of the read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub received_at: NaiveDateTime,
    pub marker: Marker,
}

impl Receipt {
    pub fn new(received_at: NaiveDateTime, marker: Marker) -> Self {
        Self {
            received_at,
            marker,
        }
    }

    /// `<timestamp>,<token>` as written to the run log
    pub fn to_log_line(&self) -> String {
        let token = self.marker.token().replace(['\r', '\n'], " ");
        format!("{},{}", clock::format_timestamp(&self.received_at), token)
    }

    pub fn from_log_line(line: &str) -> Option<Self> {
        let (ts, token) = line.split_once(',').unwrap_or((line, ""));
        let received_at = clock::parse_timestamp(ts)?;
        Some(Self::new(received_at, Marker::parse(token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_tokens_roundtrip() {
        for marker in [
            Marker::RunStart,
            Marker::RunEnd,
            Marker::ProfileStart,
            Marker::ProfileEnd,
            Marker::Done,
        ] {
            assert_eq!(Marker::parse(marker.token()), marker);
        }
    }

    #[test]
    fn test_free_text_is_preserved() {
        let marker = Marker::parse("Prediction Start");
        assert_eq!(marker, Marker::Text("Prediction Start".to_string()));
        assert_eq!(marker.token(), "Prediction Start");
        assert!(!marker.is_start());
        assert!(!marker.is_terminal());
    }

    #[test]
    fn test_classification() {
        assert!(Marker::ProfileStart.is_start());
        assert!(Marker::RunEnd.is_end());
        assert!(Marker::Done.is_terminal());
        assert!(!Marker::Done.is_end());
    }

    #[test]
    fn test_coalesced_read_mentions_end() {
        let merged = "profile_startprofile_end";
        assert!(matches!(Marker::parse(merged), Marker::Text(_)));
        assert!(mentions_end(merged));
        assert!(mentions_lifecycle(merged));
        assert!(!mentions_done(merged));
    }

    #[test]
    fn test_receipt_log_line() {
        let ts = clock::parse_timestamp("2019-01-01T00:00:05").unwrap();
        let receipt = Receipt::new(ts, Marker::ProfileEnd);
        let line = receipt.to_log_line();
        assert_eq!(line, "2019-01-01T00:00:05.000000,profile_end");
        assert_eq!(Receipt::from_log_line(&line), Some(receipt));
    }
}
