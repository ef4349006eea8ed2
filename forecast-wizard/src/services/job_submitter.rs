//! Fire-once forecast job submission
//!
//! The backend gives no idempotency guarantee, so the submitter itself makes
//! sure a wizard completion reaches `POST /submit-forecast-job` at most once.
//! Later calls get the recorded outcome, success or failure, until
//! [`JobSubmitter::reset`].

use super::forecast_client::ForecastApi;
use crate::error::{WizardError, WizardResult};
use crate::models::{JobHandle, JobRequest};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Outcome of the single submission attempt
#[derive(Debug, Clone)]
enum SubmissionState {
    NotSubmitted,
    Submitted(JobHandle),
    Failed(crate::error::ClientError),
}

pub struct JobSubmitter {
    api: Arc<dyn ForecastApi>,
    state: Mutex<SubmissionState>,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn ForecastApi>) -> Self {
        Self {
            api,
            state: Mutex::new(SubmissionState::NotSubmitted),
        }
    }

    /// Submit `request`, or return the outcome of the earlier submission
    ///
    /// Concurrent callers wait for the in-flight attempt instead of issuing
    /// their own. A failed attempt is not retried.
    pub async fn submit(&self, request: &JobRequest) -> WizardResult<JobHandle> {
        let mut state = self.state.lock().await;

        match &*state {
            SubmissionState::Submitted(handle) => return Ok(handle.clone()),
            SubmissionState::Failed(e) => return Err(WizardError::Submission(e.clone())),
            SubmissionState::NotSubmitted => {}
        }

        let body = request
            .to_wire()
            .map_err(|e| WizardError::InvalidRequest(e.to_string()))?;

        info!(
            training_method = %request.training_method(),
            dataset_id = %request.dataset_id(),
            "Submitting forecast job"
        );

        match self.api.submit_forecast_job(&body).await {
            Ok(response) => {
                let handle = JobHandle::new(response.job_id);
                info!(job_id = %handle, "Forecast job submitted");
                *state = SubmissionState::Submitted(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                warn!(error = %e, "Forecast job submission failed");
                *state = SubmissionState::Failed(e.clone());
                Err(WizardError::Submission(e))
            }
        }
    }

    /// Handle of the accepted job, if any
    pub async fn handle(&self) -> Option<JobHandle> {
        match &*self.state.lock().await {
            SubmissionState::Submitted(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// True once an attempt has been made, whatever its outcome
    pub async fn attempted(&self) -> bool {
        !matches!(*self.state.lock().await, SubmissionState::NotSubmitted)
    }

    /// Forget the previous attempt so the next `submit` goes to the backend
    pub async fn reset(&self) {
        *self.state.lock().await = SubmissionState::NotSubmitted;
    }
}
