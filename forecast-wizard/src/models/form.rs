//! Model-step parameter form and client-side validation
//!
//! The form holds raw (unvalidated) values the way a user would enter them.
//! [`StepForm::validate`] turns them into a typed [`ParameterSet`] or reports
//! every offending field at once.

use super::parameters::{
    AutomlModelParameters, AutomlPredictionParameters, BqmlModelParameters,
    BqmlPredictionParameters, DataFrequency, GranularityUnit, ModelParameters, ModelType,
    ParameterSet, PredictionParameters,
};
use forecast_common::api::{DatasetFull, ParameterDict};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::num::IntErrorKind;

/// Forecast horizon used when neither the dataset nor the user gives one
pub const DEFAULT_FORECAST_HORIZON: u32 = 10;

const TARGET_COLUMN: &str = "targetColumn";
const TIME_COLUMN: &str = "timeColumn";
const SERIES_ID_COLUMN: &str = "timeSeriesIdentifierColumn";
const DATA_FREQUENCY: &str = "dataFrequency";
const GRANULARITY_UNIT: &str = "dataGranularityUnit";
const GRANULARITY_COUNT: &str = "dataGranularityCount";
const ATTRIBUTE_COLUMNS: &str = "timeSeriesAttributeColumns";
const COLUMN_SPECS: &str = "columnSpecs";
const FORECAST_HORIZON: &str = "forecastHorizon";
const CONTEXT_WINDOW: &str = "contextWindow";

/// Why a single field failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Required and absent (or blank)
    Missing,
    /// Present but unusable
    Invalid(String),
}

/// Per-field validation errors, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(&mut self, field: &str) {
        self.errors.insert(field.to_string(), FieldError::Missing);
    }

    pub fn invalid(&mut self, field: &str, reason: impl Into<String>) {
        self.errors
            .insert(field.to_string(), FieldError::Invalid(reason.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.errors.get(field)
    }

    /// Names of all offending fields
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Status line shown to the user, e.g. `Missing: targetColumn, timeColumn`
    pub fn status_message(&self) -> String {
        let missing: Vec<&str> = self
            .errors
            .iter()
            .filter(|(_, e)| matches!(e, FieldError::Missing))
            .map(|(k, _)| k.as_str())
            .collect();
        let invalid: Vec<String> = self
            .errors
            .iter()
            .filter_map(|(k, e)| match e {
                FieldError::Invalid(reason) => Some(format!("{} ({})", k, reason)),
                FieldError::Missing => None,
            })
            .collect();

        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("Missing: {}", missing.join(", ")));
        }
        if !invalid.is_empty() {
            parts.push(format!("Invalid: {}", invalid.join(", ")));
        }
        parts.join("; ")
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_message())
    }
}

impl std::error::Error for FieldErrors {}

/// A wizard step's completion check
///
/// Steps that collect input expose their validation through this trait so
/// the sequencer can call it without knowing how the form is rendered.
pub trait StepForm {
    fn validate(&self) -> Result<ParameterSet, FieldErrors>;
}

/// Editable model/prediction parameter values for one model type
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterForm {
    model_type: ModelType,
    model_values: ParameterDict,
    prediction_values: ParameterDict,
    /// Dataset columns; empty disables column membership checks
    columns: Vec<String>,
}

impl ParameterForm {
    /// Empty form with the model type's default values
    pub fn new(model_type: ModelType) -> Self {
        let (model_values, prediction_values) = default_values(model_type);
        Self {
            model_type,
            model_values,
            prediction_values,
            columns: Vec::new(),
        }
    }

    /// Form seeded with the dataset's recommendations for `model_type`
    ///
    /// Recommendations are laid over the defaults so that fields the dataset
    /// does not mention keep their default values.
    pub fn seeded(model_type: ModelType, dataset: Option<&DatasetFull>) -> Self {
        let mut form = Self::new(model_type);

        if let Some(dataset) = dataset {
            form.columns = dataset.columns.clone();
            if let Some(recommended) = dataset.recommended_model_parameters_for(model_type.id()) {
                form.model_values
                    .extend(recommended.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            if let Some(recommended) =
                dataset.recommended_prediction_parameters_for(model_type.id())
            {
                form.prediction_values
                    .extend(recommended.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        form
    }

    /// Form pre-filled with previously validated parameters
    pub fn from_parameter_set(
        set: &ParameterSet,
        dataset: Option<&DatasetFull>,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            model_type: set.model_type(),
            model_values: set.model.to_dict()?,
            prediction_values: set.prediction.to_dict()?,
            columns: dataset.map(|d| d.columns.clone()).unwrap_or_default(),
        })
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn model_values(&self) -> &ParameterDict {
        &self.model_values
    }

    pub fn prediction_values(&self) -> &ParameterDict {
        &self.prediction_values
    }

    pub fn set_model_value(&mut self, key: impl Into<String>, value: Value) {
        self.model_values.insert(key.into(), value);
    }

    pub fn set_prediction_value(&mut self, key: impl Into<String>, value: Value) {
        self.prediction_values.insert(key.into(), value);
    }

    pub fn remove_model_value(&mut self, key: &str) -> Option<Value> {
        self.model_values.remove(key)
    }

    pub fn remove_prediction_value(&mut self, key: &str) -> Option<Value> {
        self.prediction_values.remove(key)
    }

    fn validate_bqml(&self, errors: &mut FieldErrors) -> Option<ParameterSet> {
        let values = &self.model_values;
        let target_column = self.column(values, TARGET_COLUMN, errors);
        let time_column = self.column(values, TIME_COLUMN, errors);
        let series_column = self.column(values, SERIES_ID_COLUMN, errors);
        let data_frequency = parse_choice::<DataFrequency>(values, DATA_FREQUENCY, errors);

        let horizon = positive_int(&self.prediction_values, FORECAST_HORIZON, 1, errors);

        Some(ParameterSet {
            model: ModelParameters::BqmlArimaPlus(BqmlModelParameters {
                target_column: target_column?,
                time_column: time_column?,
                time_series_identifier_column: series_column?,
                data_frequency: data_frequency?,
            }),
            prediction: PredictionParameters::BqmlArimaPlus(BqmlPredictionParameters {
                forecast_horizon: horizon?,
            }),
        })
    }

    fn validate_automl(&self, errors: &mut FieldErrors) -> Option<ParameterSet> {
        let values = &self.model_values;
        let target_column = self.column(values, TARGET_COLUMN, errors);
        let time_column = self.column(values, TIME_COLUMN, errors);
        let series_column = self.column(values, SERIES_ID_COLUMN, errors);
        let unit = parse_choice::<GranularityUnit>(values, GRANULARITY_UNIT, errors);
        let count = positive_int(values, GRANULARITY_COUNT, 1, errors);

        if let (Some(unit), Some(count)) = (unit, count) {
            if !unit.allowed_counts().contains(&count) {
                errors.invalid(
                    GRANULARITY_COUNT,
                    format!(
                        "must be one of {:?} when unit is {}",
                        unit.allowed_counts(),
                        unit.as_str()
                    ),
                );
            }
        }

        let attribute_columns = self.column_list(values, ATTRIBUTE_COLUMNS, errors);
        let column_specs = string_map(values, COLUMN_SPECS, errors);

        let horizon = positive_int(&self.prediction_values, FORECAST_HORIZON, 1, errors);
        let context_window = positive_int(&self.prediction_values, CONTEXT_WINDOW, 0, errors);

        if !errors.is_empty() {
            return None;
        }

        Some(ParameterSet {
            model: ModelParameters::AutomlForecasting(AutomlModelParameters {
                target_column: target_column?,
                time_column: time_column?,
                time_series_identifier_column: series_column?,
                data_granularity_unit: unit?,
                data_granularity_count: count?,
                time_series_attribute_columns: attribute_columns?,
                column_specs: column_specs?,
            }),
            prediction: PredictionParameters::AutomlForecasting(AutomlPredictionParameters {
                forecast_horizon: horizon?,
                context_window: context_window?,
            }),
        })
    }

    /// Required column name, checked against the dataset's columns
    fn column(&self, values: &ParameterDict, key: &str, errors: &mut FieldErrors) -> Option<String> {
        let name = required_string(values, key, errors)?;
        if !self.columns.is_empty() && !self.columns.contains(&name) {
            errors.invalid(key, format!("{:?} is not a column of the dataset", name));
            return None;
        }
        Some(name)
    }

    /// Optional list of column names
    fn column_list(
        &self,
        values: &ParameterDict,
        key: &str,
        errors: &mut FieldErrors,
    ) -> Option<Vec<String>> {
        let list = match values.get(key) {
            None | Some(Value::Null) => return Some(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                errors.invalid(key, "expected a list of column names");
                return None;
            }
        };

        let mut names = Vec::with_capacity(list.len());
        for item in list {
            match item.as_str() {
                Some(name) if self.columns.is_empty() || self.columns.iter().any(|c| c == name) => {
                    names.push(name.to_string())
                }
                Some(name) => {
                    errors.invalid(key, format!("{:?} is not a column of the dataset", name));
                    return None;
                }
                None => {
                    errors.invalid(key, "expected a list of column names");
                    return None;
                }
            }
        }
        Some(names)
    }
}

impl StepForm for ParameterForm {
    fn validate(&self) -> Result<ParameterSet, FieldErrors> {
        let mut errors = FieldErrors::new();

        let result = match self.model_type {
            ModelType::BqmlArimaPlus => self.validate_bqml(&mut errors),
            ModelType::AutomlForecasting => self.validate_automl(&mut errors),
            ModelType::Debug => Some(ParameterSet {
                model: ModelParameters::Debug(self.model_values.clone()),
                prediction: PredictionParameters::Debug(self.prediction_values.clone()),
            }),
        };

        match result {
            Some(set) if errors.is_empty() => Ok(set),
            _ => Err(errors),
        }
    }
}

fn default_values(model_type: ModelType) -> (ParameterDict, ParameterDict) {
    let mut model = ParameterDict::new();
    let mut prediction = ParameterDict::new();

    match model_type {
        ModelType::BqmlArimaPlus => {
            model.insert(TARGET_COLUMN.into(), json!(""));
            model.insert(TIME_COLUMN.into(), json!(""));
            model.insert(SERIES_ID_COLUMN.into(), json!(""));
            model.insert(DATA_FREQUENCY.into(), json!(DataFrequency::Daily.as_str()));
            prediction.insert(FORECAST_HORIZON.into(), json!(DEFAULT_FORECAST_HORIZON));
        }
        ModelType::AutomlForecasting => {
            model.insert(TARGET_COLUMN.into(), json!(""));
            model.insert(TIME_COLUMN.into(), json!(""));
            model.insert(SERIES_ID_COLUMN.into(), json!(""));
            model.insert(GRANULARITY_UNIT.into(), json!(GranularityUnit::Day.as_str()));
            model.insert(GRANULARITY_COUNT.into(), json!(1));
            prediction.insert(FORECAST_HORIZON.into(), json!(DEFAULT_FORECAST_HORIZON));
        }
        ModelType::Debug => {}
    }

    (model, prediction)
}

/// Required non-blank string field
fn required_string(values: &ParameterDict, key: &str, errors: &mut FieldErrors) -> Option<String> {
    match values.get(key) {
        None | Some(Value::Null) => {
            errors.missing(key);
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.missing(key);
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.invalid(key, "expected text");
            None
        }
    }
}

/// Required integer field, accepting numeric strings, bounded to `min..=u32::MAX`
///
/// Out-of-range inputs saturate to `i64` before the bound checks so that huge
/// values are reported as too large rather than as malformed.
fn positive_int(values: &ParameterDict, key: &str, min: u32, errors: &mut FieldErrors) -> Option<u32> {
    let parsed = match values.get(key) {
        None | Some(Value::Null) => {
            errors.missing(key);
            return None;
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.missing(key);
            return None;
        }
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(n) => Some(n),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Some(i64::MAX),
                IntErrorKind::NegOverflow => Some(i64::MIN),
                _ => None,
            },
        },
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            // Whole floats such as 30.0 are fine; `as` saturates
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(_) => None,
    };

    match parsed {
        Some(n) if n < i64::from(min) => {
            errors.invalid(key, format!("must be at least {}", min));
            None
        }
        Some(n) => match u32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                errors.invalid(key, format!("must be at most {}", u32::MAX));
                None
            }
        },
        None => {
            errors.invalid(key, "expected a whole number");
            None
        }
    }
}

/// Required field holding one of an enum's string spellings
fn parse_choice<T>(values: &ParameterDict, key: &str, errors: &mut FieldErrors) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw = required_string(values, key, errors)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(reason) => {
            errors.invalid(key, reason);
            None
        }
    }
}

/// Optional string → string map
fn string_map(
    values: &ParameterDict,
    key: &str,
    errors: &mut FieldErrors,
) -> Option<BTreeMap<String, String>> {
    match values.get(key) {
        None | Some(Value::Null) => Some(BTreeMap::new()),
        Some(Value::Object(map)) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                match v.as_str() {
                    Some(s) => {
                        out.insert(k.clone(), s.to_string());
                    }
                    None => {
                        errors.invalid(key, format!("value for {:?} must be text", k));
                        return None;
                    }
                }
            }
            Some(out)
        }
        Some(_) => {
            errors.invalid(key, "expected a map of column name to type");
            None
        }
    }
}
