//! Job lifecycle as observed by clients
//!
//! A job is Pending from submission until the backend reports either an
//! `endTime` (Completed) or an `errorMessage` (Failed). Both terminal states
//! are final.

use super::types::ForecastJobRecord;
use crate::time::parse_timestamp;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job status derived from a backend job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Training, evaluation or prediction still running
    Pending,
    /// Job finished and results are available
    Completed { end_time: DateTime<Utc> },
    /// Backend reported a job-level failure
    Failed { error_message: String },
}

impl JobStatus {
    /// Map a job record onto a status
    ///
    /// A non-empty `errorMessage` wins over `endTime`: the backend stamps an
    /// end time on failed jobs too. An unparseable `endTime` is an error, not
    /// a terminal state.
    pub fn from_record(record: &ForecastJobRecord) -> Result<Self> {
        if let Some(message) = record.error_message.as_deref() {
            if !message.trim().is_empty() {
                return Ok(JobStatus::Failed {
                    error_message: message.to_string(),
                });
            }
        }

        match record.end_time.as_deref() {
            Some(end_time) => Ok(JobStatus::Completed {
                end_time: parse_timestamp(end_time)?,
            }),
            None => Ok(JobStatus::Pending),
        }
    }

    /// True for Completed and Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    /// Short label for logs and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Completed { end_time } => write!(f, "completed at {}", end_time.to_rfc3339()),
            JobStatus::Failed { error_message } => write!(f, "failed: {}", error_message),
        }
    }
}

/// Elapsed time between the request start and the job end, when both parse
pub fn job_duration(record: &ForecastJobRecord) -> Option<chrono::Duration> {
    let start = parse_timestamp(record.request.start_time.as_deref()?).ok()?;
    let end = parse_timestamp(record.end_time.as_deref()?).ok()?;
    Some(end - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(end_time: Option<&str>, error_message: Option<&str>) -> ForecastJobRecord {
        serde_json::from_value(json!({
            "jobId": "02paakhy",
            "request": {
                "jobId": "02paakhy",
                "trainingMethodId": "bqml_arimaplus",
                "dataset": {"id": "t028rst4", "displayName": "Retail Sales"},
                "startTime": "2022-08-01T12:00:00+00:00"
            },
            "endTime": end_time,
            "errorMessage": error_message,
        }))
        .unwrap()
    }

    #[test]
    fn test_no_terminal_fields_is_pending() {
        let status = JobStatus::from_record(&record(None, None)).unwrap();
        assert_eq!(status, JobStatus::Pending);
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_end_time_is_completed() {
        let status = JobStatus::from_record(&record(Some("2022-08-01T12:05:00+00:00"), None)).unwrap();
        assert!(matches!(status, JobStatus::Completed { .. }));
        assert!(status.is_terminal());
    }

    #[test]
    fn test_error_message_wins_over_end_time() {
        let status = JobStatus::from_record(&record(
            Some("2022-08-01T12:05:00+00:00"),
            Some("Training method 'x' is not supported"),
        ))
        .unwrap();

        assert_eq!(
            status,
            JobStatus::Failed {
                error_message: "Training method 'x' is not supported".to_string()
            }
        );
    }

    #[test]
    fn test_blank_error_message_is_ignored() {
        let status = JobStatus::from_record(&record(Some("2022-08-01T12:05:00Z"), Some("  "))).unwrap();
        assert!(matches!(status, JobStatus::Completed { .. }));
    }

    #[test]
    fn test_bad_end_time_is_error() {
        assert!(JobStatus::from_record(&record(Some("not a date"), None)).is_err());
    }

    #[test]
    fn test_job_duration() {
        let duration = job_duration(&record(Some("2022-08-01T12:05:30+00:00"), None)).unwrap();
        assert_eq!(duration.num_seconds(), 330);
        assert!(job_duration(&record(None, None)).is_none());
    }

    #[test]
    fn test_status_serialization_tagged() {
        let value = serde_json::to_value(JobStatus::Failed {
            error_message: "boom".into(),
        })
        .unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["error_message"], "boom");
    }
}
