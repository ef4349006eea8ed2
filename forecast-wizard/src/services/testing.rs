//! In-memory [`ForecastApi`] for unit tests

use super::forecast_client::ForecastApi;
use crate::error::ClientError;
use async_trait::async_trait;
use forecast_common::api::{
    DataGridData, DatasetFull, DatasetRef, ForecastJobRecord, JobRequestRecord,
    ParameterDict, PlotlyPredictionLine, PlotlyPredictionResponse, SubmitForecastJobRequest,
    SubmitForecastJobResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const JOB_ID: &str = "7x51fxdf";

pub fn pending_record(job_id: &str) -> ForecastJobRecord {
    ForecastJobRecord {
        job_id: Some(job_id.to_string()),
        request: JobRequestRecord {
            job_id: job_id.to_string(),
            training_method_id: "bqml_arimaplus".to_string(),
            training_method_name: Some("BQML ARIMA+".to_string()),
            dataset: DatasetRef {
                id: "t028rst4".to_string(),
                icon: None,
                display_name: "Retail Sales".to_string(),
            },
            model_parameters: ParameterDict::new(),
            prediction_parameters: ParameterDict::new(),
            start_time: Some("2023-03-01T10:00:00+00:00".to_string()),
        },
        end_time: None,
        error_message: None,
    }
}

pub fn completed_record(job_id: &str, end_time: &str) -> ForecastJobRecord {
    ForecastJobRecord {
        end_time: Some(end_time.to_string()),
        ..pending_record(job_id)
    }
}

pub fn failed_record(job_id: &str, message: &str) -> ForecastJobRecord {
    ForecastJobRecord {
        end_time: Some("2023-03-01T10:01:00+00:00".to_string()),
        error_message: Some(message.to_string()),
        ..pending_record(job_id)
    }
}

/// Scripted backend
///
/// The first submission is accepted as [`JOB_ID`], later ones as
/// `JOB_ID-<n>`. Job polls replay the pushed records in order and then keep returning the
/// last one. With nothing pushed every poll reports a pending job.
#[derive(Default)]
pub struct ScriptedApi {
    records: Mutex<VecDeque<Result<ForecastJobRecord, ClientError>>>,
    submit_error: Mutex<Option<ClientError>>,
    poll_delay: Mutex<Duration>,
    datasets: Mutex<Vec<DatasetFull>>,
    submitted_datasets: Mutex<Vec<String>>,
    submissions: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&self, record: Result<ForecastJobRecord, ClientError>) {
        self.records.lock().unwrap().push_back(record);
    }

    pub fn fail_submissions(&self, error: ClientError) {
        *self.submit_error.lock().unwrap() = Some(error);
    }

    pub fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.lock().unwrap() = delay;
    }

    pub fn set_datasets(&self, datasets: Vec<DatasetFull>) {
        *self.datasets.lock().unwrap() = datasets;
    }

    /// Dataset id of every submission, in order
    pub fn submitted_datasets(&self) -> Vec<String> {
        self.submitted_datasets.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Poll requests that ran to completion
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn next_record(&self, job_id: &str) -> Result<ForecastJobRecord, ClientError> {
        let mut records = self.records.lock().unwrap();
        if records.len() > 1 {
            records.pop_front().unwrap()
        } else {
            records
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(pending_record(job_id)))
        }
    }
}

#[async_trait]
impl ForecastApi for ScriptedApi {
    async fn list_datasets(&self) -> Result<Vec<DatasetFull>, ClientError> {
        Ok(self.datasets.lock().unwrap().clone())
    }

    async fn submit_forecast_job(
        &self,
        request: &SubmitForecastJobRequest,
    ) -> Result<SubmitForecastJobResponse, ClientError> {
        let count = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted_datasets
            .lock()
            .unwrap()
            .push(request.dataset_id.clone());
        // Give concurrent callers a chance to pile up
        tokio::task::yield_now().await;

        match self.submit_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None if count == 1 => Ok(SubmitForecastJobResponse {
                job_id: JOB_ID.to_string(),
            }),
            None => Ok(SubmitForecastJobResponse {
                job_id: format!("{}-{}", JOB_ID, count),
            }),
        }
    }

    async fn get_forecast_job(&self, job_id: &str) -> Result<ForecastJobRecord, ClientError> {
        let delay = *self.poll_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.next_record(job_id)
    }

    async fn list_jobs(&self) -> Result<Vec<ForecastJobRecord>, ClientError> {
        Ok(Vec::new())
    }

    async fn list_pending_jobs(&self) -> Result<Vec<ForecastJobRecord>, ClientError> {
        Ok(Vec::new())
    }

    async fn get_evaluation(&self, _job_id: &str) -> Result<DataGridData, ClientError> {
        Ok(DataGridData {
            columns: vec!["metric".to_string(), "value".to_string()],
            rows: Vec::new(),
        })
    }

    async fn get_prediction_plotly(
        &self,
        _job_id: &str,
    ) -> Result<PlotlyPredictionResponse, ClientError> {
        Ok(PlotlyPredictionResponse {
            lines: vec![PlotlyPredictionLine {
                x: vec!["2023-03-02".to_string()],
                y: vec![12.5],
                name: "sales".to_string(),
                mode: "lines".to_string(),
            }],
            historical_bounds: None,
        })
    }
}
