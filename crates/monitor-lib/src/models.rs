//! Core data models for the transaction monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Normalize a status label the way every component compares them
pub fn normalize_status(status: &str) -> String {
    status.trim().to_uppercase()
}

/// One aggregated bucket from the historical dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub status: String,
    pub count: u64,
}

impl HistoricalRecord {
    pub fn new(status: impl AsRef<str>, count: u64) -> Self {
        Self {
            status: normalize_status(status.as_ref()),
            count,
        }
    }
}

/// Raw payload received from a caller before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSubmission {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventSubmission {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A validated live event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub status: String,
    pub count: u64,
    pub timestamp: DateTime<Utc>,
}

impl LiveEvent {
    pub fn new(status: impl AsRef<str>, count: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: normalize_status(status.as_ref()),
            count,
            timestamp,
        }
    }
}

impl TryFrom<EventSubmission> for LiveEvent {
    type Error = MonitorError;

    fn try_from(submission: EventSubmission) -> Result<Self, Self::Error> {
        let status = submission
            .status
            .as_deref()
            .map(normalize_status)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MonitorError::InvalidEvent("status is required".to_string()))?;

        let count = match submission.count {
            None => 1,
            Some(c) if c < 0 => {
                return Err(MonitorError::InvalidEvent(format!(
                    "count must be non-negative, got {}",
                    c
                )))
            }
            Some(c) => c as u64,
        };

        Ok(Self {
            status,
            count,
            timestamp: submission.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

/// Severity of a window evaluation or an individual breach
///
/// Ordered so that escalation is a `max`: `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Normal => write!(f, "NORMAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_defaults() {
        let event = LiveEvent::try_from(EventSubmission::new("approved")).unwrap();
        assert_eq!(event.status, "APPROVED");
        assert_eq!(event.count, 1);
    }

    #[test]
    fn test_submission_keeps_timestamp() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event =
            LiveEvent::try_from(EventSubmission::new(" failed ").with_count(7).with_timestamp(ts))
                .unwrap();
        assert_eq!(event.status, "FAILED");
        assert_eq!(event.count, 7);
        assert_eq!(event.timestamp, ts);
    }

    #[test]
    fn test_missing_or_blank_status_rejected() {
        let missing = LiveEvent::try_from(EventSubmission::default());
        assert!(matches!(missing, Err(MonitorError::InvalidEvent(_))));

        let blank = LiveEvent::try_from(EventSubmission::new("   "));
        assert!(matches!(blank, Err(MonitorError::InvalidEvent(_))));
    }

    #[test]
    fn test_negative_count_rejected() {
        let result = LiveEvent::try_from(EventSubmission::new("FAILED").with_count(-3));
        assert!(matches!(result, Err(MonitorError::InvalidEvent(_))));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Normal);
        assert_eq!(Severity::Warning.max(Severity::Critical), Severity::Critical);
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }

    #[test]
    fn test_submission_deserializes_partial_payload() {
        let submission: EventSubmission =
            serde_json::from_str(r#"{"status": "denied"}"#).unwrap();
        assert_eq!(submission.status.as_deref(), Some("denied"));
        assert!(submission.count.is_none());
        assert!(submission.timestamp.is_none());
    }
}
