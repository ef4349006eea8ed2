//! Forecast results retrieval
//!
//! Evaluation and prediction only exist once a job has completed, so both
//! are refused locally for any other status.

use super::forecast_client::ForecastApi;
use crate::error::{WizardError, WizardResult};
use crate::models::JobHandle;
use forecast_common::api::{DataGridData, JobStatus, PlotlyPredictionResponse};
use std::sync::Arc;
use tracing::debug;

/// Everything the Results step shows for a completed job
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResults {
    pub evaluation: DataGridData,
    pub prediction: PlotlyPredictionResponse,
}

impl ForecastResults {
    /// Number of predicted points across all plotted series
    pub fn point_count(&self) -> usize {
        self.prediction.lines.iter().map(|l| l.y.len()).sum()
    }
}

pub struct ResultsFetcher {
    api: Arc<dyn ForecastApi>,
}

impl ResultsFetcher {
    pub fn new(api: Arc<dyn ForecastApi>) -> Self {
        Self { api }
    }

    /// Fetch evaluation and prediction for a job known to be Completed
    pub async fn fetch(&self, handle: &JobHandle, status: &JobStatus) -> WizardResult<ForecastResults> {
        match status {
            JobStatus::Completed { .. } => {}
            other => {
                return Err(WizardError::ResultsUnavailable(format!(
                    "job {} is {}",
                    handle,
                    other.label()
                )))
            }
        }

        debug!(job_id = %handle, "Fetching forecast results");
        let (evaluation, prediction) = tokio::try_join!(
            self.api.get_evaluation(handle.job_id()),
            self.api.get_prediction_plotly(handle.job_id()),
        )?;

        Ok(ForecastResults {
            evaluation,
            prediction,
        })
    }
}
