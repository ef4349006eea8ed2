//! Forecast backend request/response types
//!
//! Field names follow the backend's camelCase JSON. Parameter dictionaries are
//! kept as free-form JSON maps here; typed per-model parameters live in
//! `forecast-wizard` and convert to and from these maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Free-form parameter dictionary as exchanged with the backend
pub type ParameterDict = Map<String, Value>;

// ========================================
// Dataset Types
// ========================================

/// Short dataset reference embedded in job requests
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    pub id: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub display_name: String,
}

/// Full dataset descriptor returned by `GET /datasets`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFull {
    pub id: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// `MM/DD/YYYY` as formatted by the backend
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub columns: Vec<String>,
    /// First rows of the dataset, opaque to the wizard
    #[serde(default)]
    pub df_preview: Vec<Value>,
    /// Model type id → recommended model parameters
    #[serde(default)]
    pub recommended_model_parameters: Option<BTreeMap<String, ParameterDict>>,
    /// Model type id → recommended prediction parameters
    #[serde(default)]
    pub recommended_prediction_parameters: Option<BTreeMap<String, ParameterDict>>,
}

impl DatasetFull {
    /// Reference form used inside job requests
    pub fn to_ref(&self) -> DatasetRef {
        DatasetRef {
            id: self.id.clone(),
            icon: self.icon.clone(),
            display_name: self.display_name.clone(),
        }
    }

    /// Recommended model parameters for a model type, if the dataset has any
    pub fn recommended_model_parameters_for(&self, model_type_id: &str) -> Option<&ParameterDict> {
        self.recommended_model_parameters
            .as_ref()
            .and_then(|m| m.get(model_type_id))
    }

    /// Recommended prediction parameters for a model type, if the dataset has any
    pub fn recommended_prediction_parameters_for(
        &self,
        model_type_id: &str,
    ) -> Option<&ParameterDict> {
        self.recommended_prediction_parameters
            .as_ref()
            .and_then(|m| m.get(model_type_id))
    }

    /// True when the dataset lists `column` (or lists no columns at all)
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| c == column)
    }
}

// ========================================
// Job Types
// ========================================

/// `POST /submit-forecast-job` body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitForecastJobRequest {
    pub training_method_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub model_parameters: ParameterDict,
    #[serde(default)]
    pub prediction_parameters: ParameterDict,
}

/// `POST /submit-forecast-job` response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitForecastJobResponse {
    pub job_id: String,
}

/// Job request echoed back by the backend inside job records
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequestRecord {
    pub job_id: String,
    pub training_method_id: String,
    #[serde(default)]
    pub training_method_name: Option<String>,
    pub dataset: DatasetRef,
    #[serde(default)]
    pub model_parameters: ParameterDict,
    #[serde(default)]
    pub prediction_parameters: ParameterDict,
    #[serde(default)]
    pub start_time: Option<String>,
}

/// `GET /forecast-job/{jobId}` response
///
/// Absence of both `end_time` and `error_message` means the job is still
/// running.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastJobRecord {
    #[serde(default)]
    pub job_id: Option<String>,
    pub request: JobRequestRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ForecastJobRecord {
    /// Job id, preferring the top-level field over the echoed request
    pub fn id(&self) -> &str {
        self.job_id.as_deref().unwrap_or(&self.request.job_id)
    }
}

// ========================================
// Result Types
// ========================================

/// `GET /evaluation/{jobId}` response (tabular data grid)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataGridData {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// One series of `GET /prediction/{jobId}/plotly`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlotlyPredictionLine {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub name: String,
    #[serde(default)]
    pub mode: String,
}

/// Time span covered by the history portion of a prediction plot
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoricalBounds {
    pub min: String,
    pub max: String,
}

/// `GET /prediction/{jobId}/plotly` response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotlyPredictionResponse {
    pub lines: Vec<PlotlyPredictionLine>,
    #[serde(default)]
    pub historical_bounds: Option<HistoricalBounds>,
}

// ========================================
// Error Response Types
// ========================================

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorDetail {
    pub detail: Value,
}

impl ErrorDetail {
    /// Human-readable message from the `detail` field
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
