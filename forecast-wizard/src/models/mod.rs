//! Data models for the forecast wizard
//!
//! - Typed per-model training/prediction parameters
//! - Model-step form and validation
//! - Job request and handle
//! - Wizard session state

pub mod form;
pub mod job;
pub mod parameters;
pub mod wizard_state;

pub use form::{FieldError, FieldErrors, ParameterForm, StepForm, DEFAULT_FORECAST_HORIZON};
pub use job::{JobHandle, JobRequest};
pub use parameters::{
    AutomlModelParameters, AutomlPredictionParameters, BqmlModelParameters,
    BqmlPredictionParameters, DataFrequency, GranularityUnit, ModelParameters, ModelType,
    ParameterSet, PredictionParameters,
};
pub use wizard_state::{StepTransition, WizardState, WizardStep};
