//! In-process mock forecasting backend for integration tests
//!
//! Serves the backend routes the wizard consumes from an axum router bound to
//! an ephemeral localhost port. `GET /forecast-job/{id}` replays a script of
//! replies and then keeps repeating the last one. `GET /dataset/{id}` answers
//! with the backend's internal snake_case record, like the real service.

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const JOB_ID: &str = "7x51fxdf";
pub const DATASET_ID: &str = "t028rst4";

/// One scripted reply to `GET /forecast-job/{id}`
#[derive(Debug, Clone)]
pub enum JobReply {
    Pending,
    Completed(&'static str),
    /// Backend-style failure: both endTime and errorMessage are set
    Failed(&'static str),
    Error(u16, &'static str),
    /// 200 with a body that is not a job record
    Garbage,
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<JobReply>>,
    submit_error: Mutex<Option<(u16, &'static str)>>,
    submissions: AtomicUsize,
    polls: AtomicUsize,
    dataset_lookups: AtomicUsize,
    last_submission: Mutex<Option<Value>>,
}

pub struct MockBackend {
    pub base_url: String,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/datasets", get(list_datasets))
            .route("/dataset/:id", get(get_dataset_record))
            .route("/submit-forecast-job", post(submit_job))
            .route("/forecast-job/:id", get(get_job))
            .route("/jobs", get(list_jobs))
            .route("/pending-jobs", get(list_pending_jobs))
            .route("/evaluation/:id", get(get_evaluation))
            .route("/prediction/:id/plotly", get(get_prediction))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }

    /// Replace the poll script
    pub fn script(&self, replies: impl IntoIterator<Item = JobReply>) {
        let mut script = self.state.script.lock().unwrap();
        script.clear();
        script.extend(replies);
    }

    pub fn fail_submissions(&self, status: u16, detail: &'static str) {
        *self.state.submit_error.lock().unwrap() = Some((status, detail));
    }

    pub fn submissions(&self) -> usize {
        self.state.submissions.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    /// Requests to `GET /dataset/{id}`
    pub fn dataset_lookups(&self) -> usize {
        self.state.dataset_lookups.load(Ordering::SeqCst)
    }

    pub fn last_submission(&self) -> Option<Value> {
        self.state.last_submission.lock().unwrap().clone()
    }

    /// Wait until at least `count` polls have arrived
    pub async fn wait_for_polls(&self, count: usize) {
        for _ in 0..500 {
            if self.polls() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} polls, saw {}", count, self.polls());
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn retail_dataset() -> Value {
    json!({
        "id": DATASET_ID,
        "displayName": "Retail Sales",
        "description": "Daily sales per product and store.",
        "icon": "storefront",
        "startDate": "01/01/2018",
        "endDate": "12/31/2020",
        "columns": ["date", "sales", "product_at_store", "product_type", "store"],
        "dfPreview": [
            {"date": "2018-01-01", "sales": 12, "product_at_store": "0_0", "id": 0}
        ],
        "recommendedModelParameters": {
            "bqml_arimaplus": {
                "targetColumn": "sales",
                "timeColumn": "date",
                "timeSeriesIdentifierColumn": "product_at_store"
            },
            "automl-forecasting": {
                "targetColumn": "sales",
                "timeColumn": "date",
                "timeSeriesIdentifierColumn": "product_at_store",
                "timeSeriesAttributeColumns": ["product_type", "store"]
            }
        },
        "recommendedPredictionParameters": {
            "bqml_arimaplus": {"forecastHorizon": 120},
            "automl-forecasting": {"forecastHorizon": 30, "contextWindow": 30}
        }
    })
}

fn request_record(job_id: &str) -> Value {
    json!({
        "jobId": job_id,
        "trainingMethodId": "bqml_arimaplus",
        "trainingMethodName": "BQML ARIMA+",
        "dataset": {"id": DATASET_ID, "icon": "storefront", "displayName": "Retail Sales"},
        "modelParameters": {"targetColumn": "sales"},
        "predictionParameters": {"forecastHorizon": 10},
        "startTime": "2023-03-01T10:00:00.000000+00:00"
    })
}

fn detail(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn list_datasets() -> Json<Value> {
    Json(json!([retail_dataset()]))
}

async fn get_dataset_record(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    state.dataset_lookups.fetch_add(1, Ordering::SeqCst);
    if id != DATASET_ID {
        return detail(404, &format!("Dataset id {} was not found!", id));
    }
    Json(json!({
        "id": DATASET_ID,
        "display_name": "Retail Sales",
        "description": "Daily sales per product and store.",
        "icon": "storefront",
        "dataset_filepath": "sample_data/sales_forecasting.csv",
        "time_column": "date",
        "recommended_model_parameters": {"bqml_arimaplus": {"targetColumn": "sales"}},
        "recommended_prediction_parameters": {"bqml_arimaplus": {"forecastHorizon": 120}}
    }))
    .into_response()
}

async fn submit_job(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.submissions.fetch_add(1, Ordering::SeqCst);
    *state.last_submission.lock().unwrap() = Some(body.clone());

    if let Some((status, message)) = *state.submit_error.lock().unwrap() {
        return detail(status, message);
    }
    if body["datasetId"] != json!(DATASET_ID) {
        return detail(404, &format!("Dataset not found: {}", body["datasetId"]));
    }
    Json(json!({ "jobId": JOB_ID })).into_response()
}

async fn get_job(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    state.polls.fetch_add(1, Ordering::SeqCst);
    if id != JOB_ID {
        return detail(404, &format!("Job not found: {}", id));
    }

    let reply = {
        let mut script = state.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    };

    match reply.unwrap_or(JobReply::Pending) {
        JobReply::Pending => Json(json!({"jobId": id, "request": request_record(&id)})).into_response(),
        JobReply::Completed(end_time) => Json(json!({
            "jobId": id,
            "request": request_record(&id),
            "endTime": end_time,
            "errorMessage": null
        }))
        .into_response(),
        JobReply::Failed(message) => Json(json!({
            "jobId": id,
            "request": request_record(&id),
            "endTime": "2023-03-01T10:01:00.000000+00:00",
            "errorMessage": message
        }))
        .into_response(),
        JobReply::Error(status, message) => detail(status, message),
        JobReply::Garbage => Json(json!({"unexpected": true})).into_response(),
    }
}

async fn list_jobs() -> Json<Value> {
    Json(json!([
        {"jobId": "pending01", "request": request_record("pending01")},
        {
            "jobId": JOB_ID,
            "request": request_record(JOB_ID),
            "endTime": "2023-03-01T10:05:30.000000+00:00",
            "errorMessage": null
        }
    ]))
}

async fn list_pending_jobs() -> Json<Value> {
    Json(json!([{"jobId": "pending01", "request": request_record("pending01")}]))
}

async fn get_evaluation(Path(id): Path<String>) -> Response {
    if id != JOB_ID {
        return detail(404, &format!("Evaluation not found: {}", id));
    }
    Json(json!({
        "columns": ["product_at_store", "mean_absolute_error", "mean_squared_error"],
        "rows": [
            {"id": 0, "product_at_store": "0_0", "mean_absolute_error": 1.8, "mean_squared_error": 5.2},
            {"id": 1, "product_at_store": "0_1", "mean_absolute_error": 2.4, "mean_squared_error": 7.9}
        ]
    }))
    .into_response()
}

async fn get_prediction(Path(id): Path<String>) -> Response {
    if id != JOB_ID {
        return detail(404, &format!("Prediction not found: {}", id));
    }
    Json(json!({
        "lines": [
            {"x": ["2021-01-01", "2021-01-02"], "y": [10.5, 11.0], "name": "0_0", "mode": "lines"},
            {"x": ["2021-01-01", "2021-01-02"], "y": [3.0, 4.25], "name": "0_1", "mode": "lines"}
        ],
        "historicalBounds": {"min": "2018-01-01", "max": "2020-12-31"}
    }))
    .into_response()
}
