//! Job status poller
//!
//! **Lifecycle:**
//! 1. [`JobPoller::start`] spawns the poll loop; the first poll is immediate
//! 2. One `GET /forecast-job/{jobId}` at a time, then a fixed interval
//! 3. Stops on its own at Completed or Failed
//! 4. [`PollerHandle::stop`] (or dropping the handle) cancels it, including a
//!    request that is still in flight
//!
//! Progress is published on a `watch` channel as a [`PollSnapshot`]. A
//! transport failure is recorded in the snapshot and the loop keeps going;
//! only a terminal status ends it.

use super::forecast_client::ForecastApi;
use crate::models::JobHandle;
use chrono::{DateTime, Utc};
use forecast_common::api::{ForecastJobRecord, JobStatus};
use forecast_common::events::{EventBus, ForecastEvent, PollStopReason};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Latest known state of a polled job
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    /// Most recent record that mapped to a status
    pub record: Option<ForecastJobRecord>,
    /// Set when the most recent poll failed, cleared by the next success
    pub last_error: Option<String>,
    /// Requests issued so far
    pub polls: u64,
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Set once the loop has ended
    pub stopped: Option<PollStopReason>,
}

impl PollSnapshot {
    fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Pending,
            record: None,
            last_error: None,
            polls: 0,
            last_polled_at: None,
            stopped: None,
        }
    }

    /// Record a freshly observed status
    ///
    /// A terminal status is final: later observations are ignored. Returns
    /// true when the visible status changed.
    pub fn apply_status(&mut self, status: JobStatus, record: ForecastJobRecord) -> bool {
        self.last_error = None;
        if self.status.is_terminal() {
            return false;
        }
        self.record = Some(record);
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    pub fn apply_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Starts poll loops
pub struct JobPoller {
    api: Arc<dyn ForecastApi>,
    interval: Duration,
    event_bus: EventBus,
}

impl JobPoller {
    pub fn new(api: Arc<dyn ForecastApi>, interval: Duration, event_bus: EventBus) -> Self {
        Self {
            api,
            interval,
            event_bus,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the poll loop for `handle`
    pub fn start(&self, handle: &JobHandle) -> PollerHandle {
        let job_id = handle.job_id().to_string();
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(PollSnapshot::new(&job_id));

        info!(job_id = %job_id, interval_ms = self.interval.as_millis() as u64, "Starting job poller");

        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.api),
            job_id.clone(),
            self.interval,
            cancel.clone(),
            tx,
            self.event_bus.clone(),
        ));

        PollerHandle {
            job_id,
            cancel,
            rx,
            task: Some(task),
        }
    }
}

/// Owner of a running poll loop
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollerHandle {
    job_id: String,
    cancel: CancellationToken,
    rx: watch::Receiver<PollSnapshot>,
    task: Option<JoinHandle<PollStopReason>>,
}

impl PollerHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PollSnapshot {
        self.rx.borrow().clone()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.rx.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.rx.borrow().stopped.is_some()
    }

    /// Wait for the loop to end on its own (terminal status) or by `stop`
    ///
    /// Cancel-safe: abandoning the wait leaves the loop running and still
    /// owned by this handle.
    pub async fn wait(&mut self) -> PollStopReason {
        let reason = match self.task.as_mut() {
            Some(task) => task.await.unwrap_or(PollStopReason::Cancelled),
            None => return self.rx.borrow().stopped.unwrap_or(PollStopReason::Cancelled),
        };
        self.task = None;
        reason
    }

    /// Cancel the loop and wait until it has exited
    ///
    /// No request is issued after this returns. Idempotent.
    pub async fn stop(&mut self) -> PollStopReason {
        self.cancel.cancel();
        self.wait().await
    }

    /// Token that cancels this loop, for wiring to external shutdown signals
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Step<T> {
    Cancelled,
    Done(T),
}

/// Run `fut` unless cancellation comes first
async fn unless_cancelled<F: std::future::Future>(cancel: &CancellationToken, fut: F) -> Step<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Step::Cancelled,
        out = fut => Step::Done(out),
    }
}

async fn poll_loop(
    api: Arc<dyn ForecastApi>,
    job_id: String,
    interval: Duration,
    cancel: CancellationToken,
    tx: watch::Sender<PollSnapshot>,
    event_bus: EventBus,
) -> PollStopReason {
    let reason = loop {
        let result = match unless_cancelled(&cancel, api.get_forecast_job(&job_id)).await {
            Step::Cancelled => break PollStopReason::Cancelled,
            Step::Done(result) => result,
        };

        let observed = result
            .map_err(|e| e.to_string())
            .and_then(|record| match JobStatus::from_record(&record) {
                Ok(status) => Ok((status, record)),
                Err(e) => Err(format!("Unreadable job record: {}", e)),
            });

        match observed {
            Ok((status, record)) => {
                let mut changed = None;
                tx.send_modify(|snapshot| {
                    snapshot.polls += 1;
                    snapshot.last_polled_at = Some(Utc::now());
                    if snapshot.apply_status(status, record) {
                        changed = Some(snapshot.status.clone());
                    }
                });

                if let Some(status) = changed {
                    info!(job_id = %job_id, status = %status, "Job status changed");
                    event_bus.emit_lossy(ForecastEvent::JobStatusChanged {
                        job_id: job_id.clone(),
                        status,
                        timestamp: Utc::now(),
                    });
                }
            }
            Err(message) => {
                warn!(job_id = %job_id, error = %message, "Job status poll failed");
                event_bus.emit_lossy(ForecastEvent::PollFailed {
                    job_id: job_id.clone(),
                    message: message.clone(),
                    timestamp: Utc::now(),
                });
                tx.send_modify(|snapshot| {
                    snapshot.polls += 1;
                    snapshot.last_polled_at = Some(Utc::now());
                    snapshot.apply_error(message);
                });
            }
        }

        if tx.borrow().is_terminal() {
            break PollStopReason::Terminal;
        }

        debug!(job_id = %job_id, "Job still pending");
        if let Step::Cancelled = unless_cancelled(&cancel, tokio::time::sleep(interval)).await {
            break PollStopReason::Cancelled;
        }
    };

    info!(job_id = %job_id, reason = ?reason, "Job poller stopped");
    tx.send_modify(|snapshot| snapshot.stopped = Some(reason));
    event_bus.emit_lossy(ForecastEvent::PollingStopped {
        job_id,
        reason,
        timestamp: Utc::now(),
    });
    reason
}
