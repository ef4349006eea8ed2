//! Wizard session state
//!
//! A wizard session walks a fixed, linear list of steps:
//! DATASET → MODEL → RESULTS

use super::parameters::{ModelParameters, ModelType, ParameterSet, PredictionParameters};
use chrono::{DateTime, Utc};
use forecast_common::api::DatasetFull;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wizard step, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WizardStep {
    /// Pick one of the backend's datasets
    Dataset,
    /// Pick a model type and fill in its parameters
    Model,
    /// Submit and follow the forecast job
    Results,
}

impl WizardStep {
    /// All steps in order; a step's position is its index
    pub const ORDER: [WizardStep; 3] = [WizardStep::Dataset, WizardStep::Model, WizardStep::Results];

    pub fn index(&self) -> usize {
        match self {
            WizardStep::Dataset => 0,
            WizardStep::Model => 1,
            WizardStep::Results => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ORDER.get(index).copied()
    }

    pub fn last_index() -> usize {
        Self::ORDER.len() - 1
    }

    pub fn is_last(&self) -> bool {
        self.index() == Self::last_index()
    }
}

/// Step change record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTransition {
    pub session_id: Uuid,
    pub old_index: usize,
    pub new_index: usize,
    pub transitioned_at: DateTime<Utc>,
}

impl StepTransition {
    /// Clamped moves at either end produce a no-op transition
    pub fn moved(&self) -> bool {
        self.old_index != self.new_index
    }
}

/// Wizard session (in-memory state)
///
/// `current_step_index` is always a valid index into [`WizardStep::ORDER`].
/// The parameter fields are only populated once the Model step has been
/// passed, and are cleared again when the selection they came from changes.
#[derive(Debug, Clone, Serialize)]
pub struct WizardState {
    /// Unique session identifier
    pub session_id: Uuid,

    current_step_index: usize,

    /// Dataset chosen on the Dataset step
    pub selected_dataset: Option<DatasetFull>,

    /// Model type chosen on the Model step
    pub selected_model_type: ModelType,

    /// Frozen when advancing past the Model step
    pub model_parameters: Option<ModelParameters>,

    /// Frozen when advancing past the Model step
    pub prediction_parameters: Option<PredictionParameters>,

    /// Last completion-check failure, cleared by the next successful move
    pub status_message: Option<String>,

    /// Session start time
    pub started_at: DateTime<Utc>,
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            current_step_index: 0,
            selected_dataset: None,
            selected_model_type: ModelType::default(),
            model_parameters: None,
            prediction_parameters: None,
            status_message: None,
            started_at: Utc::now(),
        }
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step(&self) -> WizardStep {
        // Index is kept in range by move_to()
        WizardStep::from_index(self.current_step_index).unwrap_or(WizardStep::Dataset)
    }

    /// Move to `index`, clamped to the step list
    pub fn move_to(&mut self, index: usize) -> StepTransition {
        let new_index = index.min(WizardStep::last_index());
        let transition = StepTransition {
            session_id: self.session_id,
            old_index: self.current_step_index,
            new_index,
            transitioned_at: Utc::now(),
        };
        self.current_step_index = new_index;
        transition
    }

    /// Store validated parameters for submission
    pub fn freeze_parameters(&mut self, set: ParameterSet) {
        self.selected_model_type = set.model_type();
        self.model_parameters = Some(set.model);
        self.prediction_parameters = Some(set.prediction);
    }

    /// Frozen parameters, if the Model step has been passed
    pub fn frozen_parameters(&self) -> Option<ParameterSet> {
        match (&self.model_parameters, &self.prediction_parameters) {
            (Some(model), Some(prediction)) => Some(ParameterSet {
                model: model.clone(),
                prediction: prediction.clone(),
            }),
            _ => None,
        }
    }

    pub fn clear_parameters(&mut self) {
        self.model_parameters = None;
        self.prediction_parameters = None;
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}
