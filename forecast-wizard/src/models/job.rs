//! Forecast job request and handle

use super::parameters::{ModelParameters, ModelType, ParameterSet, PredictionParameters};
use forecast_common::api::SubmitForecastJobRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything needed to create one forecast job
///
/// Built once from a completed wizard and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    dataset_id: String,
    model_parameters: ModelParameters,
    prediction_parameters: PredictionParameters,
}

impl JobRequest {
    pub fn new(dataset_id: impl Into<String>, parameters: ParameterSet) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            model_parameters: parameters.model,
            prediction_parameters: parameters.prediction,
        }
    }

    pub fn training_method(&self) -> ModelType {
        self.model_parameters.model_type()
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn model_parameters(&self) -> &ModelParameters {
        &self.model_parameters
    }

    pub fn prediction_parameters(&self) -> &PredictionParameters {
        &self.prediction_parameters
    }

    /// `POST /submit-forecast-job` body
    pub fn to_wire(&self) -> serde_json::Result<SubmitForecastJobRequest> {
        Ok(SubmitForecastJobRequest {
            training_method_id: self.training_method().id().to_string(),
            dataset_id: self.dataset_id.clone(),
            model_parameters: self.model_parameters.to_dict()?,
            prediction_parameters: self.prediction_parameters.to_dict()?,
        })
    }
}

/// Opaque backend job identifier, used only as a polling key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub job_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_id)
    }
}
