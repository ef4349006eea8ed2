//! Model types and their typed training/prediction parameters
//!
//! The backend accepts free-form parameter dictionaries whose expected keys
//! depend on the training method. Each training method gets its own typed
//! parameter struct here; the enums serialize to exactly the dictionary the
//! backend expects.

use forecast_common::api::ParameterDict;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Training method offered by the forecasting backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// BigQuery ML ARIMA_PLUS (univariate)
    #[default]
    #[serde(rename = "bqml_arimaplus")]
    BqmlArimaPlus,
    /// Vertex AI AutoML Forecasting (multivariate)
    #[serde(rename = "automl-forecasting")]
    AutomlForecasting,
    /// Backend debug method, accepts arbitrary parameters
    #[serde(rename = "debug")]
    Debug,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [
        ModelType::BqmlArimaPlus,
        ModelType::AutomlForecasting,
        ModelType::Debug,
    ];

    /// Training method id as used by the backend
    pub fn id(&self) -> &'static str {
        match self {
            ModelType::BqmlArimaPlus => "bqml_arimaplus",
            ModelType::AutomlForecasting => "automl-forecasting",
            ModelType::Debug => "debug",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::BqmlArimaPlus => "BQML ARIMA+",
            ModelType::AutomlForecasting => "Vertex AI AutoML Forecasting",
            ModelType::Debug => "Debug",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s.trim()).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|m| m.id()).collect();
            format!("Unknown model type {:?} (expected one of: {})", s, known.join(", "))
        })
    }
}

/// Input series frequency for ARIMA_PLUS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFrequency {
    AutoFrequency,
    PerMinute,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl DataFrequency {
    pub const ALL: [DataFrequency; 8] = [
        DataFrequency::AutoFrequency,
        DataFrequency::PerMinute,
        DataFrequency::Hourly,
        DataFrequency::Daily,
        DataFrequency::Weekly,
        DataFrequency::Monthly,
        DataFrequency::Quarterly,
        DataFrequency::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFrequency::AutoFrequency => "auto_frequency",
            DataFrequency::PerMinute => "per_minute",
            DataFrequency::Hourly => "hourly",
            DataFrequency::Daily => "daily",
            DataFrequency::Weekly => "weekly",
            DataFrequency::Monthly => "monthly",
            DataFrequency::Quarterly => "quarterly",
            DataFrequency::Yearly => "yearly",
        }
    }
}

impl FromStr for DataFrequency {
    type Err = String;

    // Accepts the upper-case BigQuery spelling too (e.g. "AUTO_FREQUENCY")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or_else(|| format!("unsupported data frequency {:?}", s))
    }
}

/// Time unit between training rows for AutoML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GranularityUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl GranularityUnit {
    pub const ALL: [GranularityUnit; 6] = [
        GranularityUnit::Minute,
        GranularityUnit::Hour,
        GranularityUnit::Day,
        GranularityUnit::Week,
        GranularityUnit::Month,
        GranularityUnit::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GranularityUnit::Minute => "minute",
            GranularityUnit::Hour => "hour",
            GranularityUnit::Day => "day",
            GranularityUnit::Week => "week",
            GranularityUnit::Month => "month",
            GranularityUnit::Year => "year",
        }
    }

    /// Granularity counts the backend accepts for this unit
    pub fn allowed_counts(&self) -> &'static [u32] {
        match self {
            GranularityUnit::Minute => &[1, 5, 10, 15, 30],
            _ => &[1],
        }
    }
}

impl FromStr for GranularityUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == lowered)
            .ok_or_else(|| format!("unsupported granularity unit {:?}", s))
    }
}

/// ARIMA_PLUS model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BqmlModelParameters {
    pub target_column: String,
    pub time_column: String,
    pub time_series_identifier_column: String,
    pub data_frequency: DataFrequency,
}

/// AutoML Forecasting model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomlModelParameters {
    pub target_column: String,
    pub time_column: String,
    pub time_series_identifier_column: String,
    pub data_granularity_unit: GranularityUnit,
    pub data_granularity_count: u32,
    /// Columns that are constant within a series (product type, store...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_series_attribute_columns: Vec<String>,
    /// Column name → transformation type (timestamp, numeric, categorical...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_specs: BTreeMap<String, String>,
}

/// ARIMA_PLUS prediction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BqmlPredictionParameters {
    pub forecast_horizon: u32,
}

/// AutoML Forecasting prediction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomlPredictionParameters {
    pub forecast_horizon: u32,
    pub context_window: u32,
}

/// Model parameters, one variant per model type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelParameters {
    BqmlArimaPlus(BqmlModelParameters),
    AutomlForecasting(AutomlModelParameters),
    Debug(ParameterDict),
}

impl ModelParameters {
    pub fn model_type(&self) -> ModelType {
        match self {
            ModelParameters::BqmlArimaPlus(_) => ModelType::BqmlArimaPlus,
            ModelParameters::AutomlForecasting(_) => ModelType::AutomlForecasting,
            ModelParameters::Debug(_) => ModelType::Debug,
        }
    }

    /// Backend dictionary form
    pub fn to_dict(&self) -> serde_json::Result<ParameterDict> {
        to_dict(self)
    }
}

/// Prediction parameters, one variant per model type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionParameters {
    BqmlArimaPlus(BqmlPredictionParameters),
    AutomlForecasting(AutomlPredictionParameters),
    Debug(ParameterDict),
}

impl PredictionParameters {
    pub fn model_type(&self) -> ModelType {
        match self {
            PredictionParameters::BqmlArimaPlus(_) => ModelType::BqmlArimaPlus,
            PredictionParameters::AutomlForecasting(_) => ModelType::AutomlForecasting,
            PredictionParameters::Debug(_) => ModelType::Debug,
        }
    }

    /// Backend dictionary form
    pub fn to_dict(&self) -> serde_json::Result<ParameterDict> {
        to_dict(self)
    }
}

/// Validated model + prediction parameters for one model type
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub model: ModelParameters,
    pub prediction: PredictionParameters,
}

impl ParameterSet {
    /// Model type shared by both halves
    pub fn model_type(&self) -> ModelType {
        self.model.model_type()
    }
}

/// Serialize `value` and require a JSON object
fn to_dict<T: Serialize>(value: &T) -> serde_json::Result<ParameterDict> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "parameters must serialize to an object, got {}",
            other
        ))),
    }
}
