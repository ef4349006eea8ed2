//! Event types for the forecast wizard event system
//!
//! Wizard sessions publish progress on an [`EventBus`] so that any number of
//! views (the CLI, tests, a future UI) can follow a session without holding
//! a reference to it.

use crate::api::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Why a poll loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStopReason {
    /// A Completed or Failed status was observed
    Terminal,
    /// The consumer tore the poller down
    Cancelled,
}

/// Forecast wizard event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ForecastEvent {
    /// Wizard moved to a different step
    StepChanged {
        session_id: Uuid,
        old_index: usize,
        new_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// Step completion check failed; the wizard did not advance
    ValidationFailed {
        session_id: Uuid,
        step_index: usize,
        status_message: String,
        timestamp: DateTime<Utc>,
    },

    /// Forecast job accepted by the backend
    JobSubmitted {
        session_id: Uuid,
        job_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Job creation request failed
    SubmissionFailed {
        session_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A poll returned a status different from the previous one
    JobStatusChanged {
        job_id: String,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },

    /// A poll failed in transport; polling continues
    PollFailed {
        job_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The poll loop for a job ended
    PollingStopped {
        job_id: String,
        reason: PollStopReason,
        timestamp: DateTime<Utc>,
    },
}

impl ForecastEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            ForecastEvent::StepChanged { .. } => "StepChanged",
            ForecastEvent::ValidationFailed { .. } => "ValidationFailed",
            ForecastEvent::JobSubmitted { .. } => "JobSubmitted",
            ForecastEvent::SubmissionFailed { .. } => "SubmissionFailed",
            ForecastEvent::JobStatusChanged { .. } => "JobStatusChanged",
            ForecastEvent::PollFailed { .. } => "PollFailed",
            ForecastEvent::PollingStopped { .. } => "PollingStopped",
        }
    }
}

/// Broadcast bus for [`ForecastEvent`]s
///
/// Cloning the bus shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ForecastEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers
    ///   start dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ForecastEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ForecastEvent,
    ) -> Result<usize, broadcast::error::SendError<ForecastEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ForecastEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(ForecastEvent::PollFailed {
            job_id: "j".into(),
            message: "timeout".into(),
            timestamp: Utc::now(),
        });
        assert!(result.is_err());

        // Lossy variant never fails
        bus.emit_lossy(ForecastEvent::PollFailed {
            job_id: "j".into(),
            message: "timeout".into(),
            timestamp: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(ForecastEvent::JobSubmitted {
            session_id: Uuid::new_v4(),
            job_id: "7x51fxdf".into(),
            timestamp: Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "JobSubmitted");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ForecastEvent::PollingStopped {
            job_id: "abc".into(),
            reason: PollStopReason::Cancelled,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "PollingStopped");
        assert_eq!(value["reason"], "cancelled");
    }
}
