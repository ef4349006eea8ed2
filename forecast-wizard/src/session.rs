//! Wizard session orchestration
//!
//! A [`ForecastSession`] ties one step sequencer to one submitter and at most
//! one running poller. Completing the wizard submits the frozen request
//! exactly once and starts polling; tearing the session down (or dropping
//! it) stops the poller. Completing again after the wizard's selections
//! changed abandons the old job and submits the new request.

use crate::error::{ClientError, WizardError, WizardResult};
use crate::models::{JobHandle, JobRequest, WizardStep};
use crate::services::{
    ForecastApi, ForecastResults, JobPoller, JobSubmitter, PollSnapshot, PollerHandle,
    ResultsFetcher,
};
use crate::wizard::StepSequencer;
use chrono::Utc;
use forecast_common::api::{DatasetFull, JobStatus};
use forecast_common::events::{EventBus, ForecastEvent, PollStopReason};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ForecastSession {
    api: Arc<dyn ForecastApi>,
    sequencer: StepSequencer,
    submitter: JobSubmitter,
    poller: JobPoller,
    results: ResultsFetcher,
    active: Option<PollerHandle>,
    /// Request behind the current submission outcome
    submitted: Option<JobRequest>,
    event_bus: EventBus,
}

impl ForecastSession {
    pub fn new(api: Arc<dyn ForecastApi>, poll_interval: Duration, event_bus: EventBus) -> Self {
        Self {
            sequencer: StepSequencer::new(event_bus.clone()),
            submitter: JobSubmitter::new(Arc::clone(&api)),
            poller: JobPoller::new(Arc::clone(&api), poll_interval, event_bus.clone()),
            results: ResultsFetcher::new(Arc::clone(&api)),
            active: None,
            submitted: None,
            api,
            event_bus,
        }
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut StepSequencer {
        &mut self.sequencer
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Datasets offered on the Dataset step
    pub async fn list_datasets(&self) -> WizardResult<Vec<DatasetFull>> {
        Ok(self.api.list_datasets().await?)
    }

    /// Look a dataset up in the dataset list by id and select it
    pub async fn select_dataset_by_id(&mut self, dataset_id: &str) -> WizardResult<()> {
        let dataset = self
            .api
            .list_datasets()
            .await?
            .into_iter()
            .find(|d| d.id == dataset_id)
            .ok_or_else(|| {
                ClientError::NotFound(format!("Dataset id {} was not found!", dataset_id))
            })?;
        self.sequencer.select_dataset(dataset)
    }

    /// Submit the wizard's job and start polling it
    ///
    /// Only valid on the Results step. The backend sees at most one
    /// submission per job request; calling this again with unchanged
    /// selections returns the same handle and keeps the running poller.
    pub async fn complete(&mut self) -> WizardResult<JobHandle> {
        let step = self.sequencer.state().current_step();
        if step != WizardStep::Results {
            return Err(WizardError::InvalidStep(format!(
                "the wizard can only be completed on the Results step, not {:?}",
                step
            )));
        }

        let request = self.sequencer.job_request()?;
        if self.submitted.as_ref().is_some_and(|previous| *previous != request) {
            info!(
                dataset_id = %request.dataset_id(),
                training_method = %request.training_method(),
                "Wizard selections changed since submission, abandoning previous job"
            );
            self.teardown().await;
            self.submitter.reset().await;
            self.submitted = None;
        }

        if let Some(active) = &self.active {
            return Ok(JobHandle::new(active.job_id()));
        }

        let first_attempt = !self.submitter.attempted().await;
        let session_id = self.sequencer.state().session_id;
        self.submitted = Some(request.clone());

        let handle = match self.submitter.submit(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                self.sequencer.set_status_message(Some(e.to_string()));
                if first_attempt {
                    self.event_bus.emit_lossy(ForecastEvent::SubmissionFailed {
                        session_id,
                        message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                return Err(e);
            }
        };

        if first_attempt {
            self.event_bus.emit_lossy(ForecastEvent::JobSubmitted {
                session_id,
                job_id: handle.job_id().to_string(),
                timestamp: Utc::now(),
            });
        }
        self.sequencer.set_status_message(None);
        self.active = Some(self.poller.start(&handle));
        Ok(handle)
    }

    /// Running (or finished) poller for the submitted job
    pub fn poller(&self) -> Option<&PollerHandle> {
        self.active.as_ref()
    }

    /// Latest job snapshot, if a job is being followed
    pub fn job_snapshot(&self) -> Option<PollSnapshot> {
        self.active.as_ref().map(PollerHandle::snapshot)
    }

    /// Wait until polling ends and return the last observed status
    pub async fn wait_for_job(&mut self) -> WizardResult<(JobStatus, PollStopReason)> {
        let active = self.active.as_mut().ok_or(WizardError::NotSubmitted)?;
        let reason = active.wait().await;
        Ok((active.snapshot().status, reason))
    }

    /// Evaluation and prediction for the completed job
    pub async fn fetch_results(&self) -> WizardResult<ForecastResults> {
        let active = self.active.as_ref().ok_or(WizardError::NotSubmitted)?;
        let handle = JobHandle::new(active.job_id());
        self.results.fetch(&handle, &active.snapshot().status).await
    }

    /// Stop polling; the submission outcome is kept
    pub async fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            let reason = active.stop().await;
            info!(job_id = %active.job_id(), reason = ?reason, "Session torn down");
        }
    }

    /// Tear down and start a fresh wizard
    pub async fn reset(&mut self) {
        self.teardown().await;
        self.submitter.reset().await;
        self.submitted = None;
        self.sequencer.reset();
        info!(session_id = %self.sequencer.state().session_id, "Wizard session reset");
    }
}
