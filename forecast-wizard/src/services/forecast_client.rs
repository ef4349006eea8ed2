//! Forecast backend HTTP client
//!
//! [`ForecastApi`] is the seam between the wizard and the backend; the
//! submitter, poller and results fetcher only see the trait.
//! [`HttpForecastClient`] implements it over reqwest.

use crate::error::ClientError;
use async_trait::async_trait;
use forecast_common::api::{
    DataGridData, DatasetFull, ErrorDetail, ForecastJobRecord, PlotlyPredictionResponse,
    SubmitForecastJobRequest, SubmitForecastJobResponse,
};
use forecast_common::config::ClientSettings;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("forecast-wizard/", env!("CARGO_PKG_VERSION"));

/// Forecast backend operations used by the wizard
#[async_trait]
pub trait ForecastApi: Send + Sync {
    /// `GET /datasets`
    async fn list_datasets(&self) -> Result<Vec<DatasetFull>, ClientError>;

    /// `POST /submit-forecast-job`
    async fn submit_forecast_job(
        &self,
        request: &SubmitForecastJobRequest,
    ) -> Result<SubmitForecastJobResponse, ClientError>;

    /// `GET /forecast-job/{jobId}`
    async fn get_forecast_job(&self, job_id: &str) -> Result<ForecastJobRecord, ClientError>;

    /// `GET /jobs` (pending and completed)
    async fn list_jobs(&self) -> Result<Vec<ForecastJobRecord>, ClientError>;

    /// `GET /pending-jobs`
    async fn list_pending_jobs(&self) -> Result<Vec<ForecastJobRecord>, ClientError>;

    /// `GET /evaluation/{jobId}`
    async fn get_evaluation(&self, job_id: &str) -> Result<DataGridData, ClientError>;

    /// `GET /prediction/{jobId}/plotly`
    async fn get_prediction_plotly(
        &self,
        job_id: &str,
    ) -> Result<PlotlyPredictionResponse, ClientError>;
}

/// reqwest-backed [`ForecastApi`]
#[derive(Debug, Clone)]
pub struct HttpForecastClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpForecastClient {
    /// Client for the configured backend
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        Self::with_timeout(&settings.api_base_url, settings.request_timeout)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Network(format!("Invalid base URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Network(format!(
                "Invalid base URL {:?}: cannot hold a path",
                base_url.as_str()
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Network(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.url(segments)?;
        tracing::debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        decode(url, response).await
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        tracing::debug!(url = %url, "POST");

        let response = self
            .http_client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        decode(url, response).await
    }
}

/// Map status codes onto [`ClientError`] and parse successful bodies
async fn decode<T: DeserializeOwned>(url: Url, response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        tracing::debug!(url = %url, status = status.as_u16(), detail = %detail, "Backend error");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(detail));
        }
        return Err(ClientError::Api(status.as_u16(), detail));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::Parse(format!("Unexpected response from {}: {}", url.path(), e)))
}

/// `detail` of a backend error body, or the raw body when it has none
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(detail) => detail.message(),
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl ForecastApi for HttpForecastClient {
    async fn list_datasets(&self) -> Result<Vec<DatasetFull>, ClientError> {
        self.get_json(&["datasets"]).await
    }

    async fn submit_forecast_job(
        &self,
        request: &SubmitForecastJobRequest,
    ) -> Result<SubmitForecastJobResponse, ClientError> {
        self.post_json(&["submit-forecast-job"], request).await
    }

    async fn get_forecast_job(&self, job_id: &str) -> Result<ForecastJobRecord, ClientError> {
        self.get_json(&["forecast-job", job_id]).await
    }

    async fn list_jobs(&self) -> Result<Vec<ForecastJobRecord>, ClientError> {
        self.get_json(&["jobs"]).await
    }

    async fn list_pending_jobs(&self) -> Result<Vec<ForecastJobRecord>, ClientError> {
        self.get_json(&["pending-jobs"]).await
    }

    async fn get_evaluation(&self, job_id: &str) -> Result<DataGridData, ClientError> {
        self.get_json(&["evaluation", job_id]).await
    }

    async fn get_prediction_plotly(
        &self,
        job_id: &str,
    ) -> Result<PlotlyPredictionResponse, ClientError> {
        self.get_json(&["prediction", job_id, "plotly"]).await
    }
}
