//! Step sequencer
//!
//! Owns the [`WizardState`] of one session and moves it strictly linearly
//! through DATASET → MODEL → RESULTS. Moving forward runs the current step's
//! completion check; moving back always succeeds.

use super::step::StepDescriptor;
use crate::error::{WizardError, WizardResult};
use crate::models::{
    FieldErrors, JobRequest, ModelType, ParameterForm, ParameterSet, StepForm, StepTransition,
    WizardState, WizardStep,
};
use chrono::Utc;
use forecast_common::api::DatasetFull;
use forecast_common::events::{EventBus, ForecastEvent};
use tracing::{debug, info, warn};

/// Field name reported when Next is pressed without a dataset
pub const DATASET_FIELD: &str = "dataset";

pub struct StepSequencer {
    state: WizardState,
    form: ParameterForm,
    event_bus: EventBus,
}

impl StepSequencer {
    pub fn new(event_bus: EventBus) -> Self {
        let state = WizardState::new();
        let form = ParameterForm::new(state.selected_model_type);
        Self {
            state,
            form,
            event_bus,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> StepDescriptor {
        let step = self.state.current_step();
        let ready = match step {
            WizardStep::Dataset => self.state.selected_dataset.is_some(),
            // A model type is always selected
            WizardStep::Model => true,
            WizardStep::Results => false,
        };
        StepDescriptor::for_step(step, ready)
    }

    pub fn status_message(&self) -> Option<&str> {
        self.state.status_message.as_deref()
    }

    /// Surface an error from outside the completion checks (e.g. submission)
    pub fn set_status_message(&mut self, message: Option<String>) {
        self.state.status_message = message;
    }

    /// Choose the dataset (Dataset step only)
    ///
    /// Reseeds the parameter form from the dataset's recommendations and drops
    /// any parameters frozen for a previous dataset.
    pub fn select_dataset(&mut self, dataset: DatasetFull) -> WizardResult<()> {
        self.require_step(WizardStep::Dataset, "select a dataset")?;

        let unchanged = self
            .state
            .selected_dataset
            .as_ref()
            .is_some_and(|current| current.id == dataset.id);
        if unchanged {
            return Ok(());
        }

        info!(
            session_id = %self.state.session_id,
            dataset_id = %dataset.id,
            "Dataset selected"
        );
        self.form = ParameterForm::seeded(self.state.selected_model_type, Some(&dataset));
        self.state.selected_dataset = Some(dataset);
        self.state.clear_parameters();
        self.state.status_message = None;
        Ok(())
    }

    /// Choose the model type (Model step only)
    pub fn select_model_type(&mut self, model_type: ModelType) -> WizardResult<()> {
        self.require_step(WizardStep::Model, "select a model type")?;

        if model_type == self.form.model_type() {
            return Ok(());
        }

        debug!(
            session_id = %self.state.session_id,
            model_type = %model_type,
            "Model type selected"
        );
        self.state.selected_model_type = model_type;
        self.form = match self.state.frozen_parameters() {
            Some(frozen) if frozen.model_type() == model_type => {
                match ParameterForm::from_parameter_set(&frozen, self.state.selected_dataset.as_ref()) {
                    Ok(form) => form,
                    Err(e) => {
                        warn!(error = %e, "Frozen parameters unusable, reseeding form");
                        ParameterForm::seeded(model_type, self.state.selected_dataset.as_ref())
                    }
                }
            }
            _ => ParameterForm::seeded(model_type, self.state.selected_dataset.as_ref()),
        };
        self.state.status_message = None;
        Ok(())
    }

    pub fn form(&self) -> &ParameterForm {
        &self.form
    }

    /// Editable Model-step form
    ///
    /// Edits only take effect for submission once the Model step is passed again.
    pub fn form_mut(&mut self) -> &mut ParameterForm {
        &mut self.form
    }

    /// Run the current step's completion check
    ///
    /// Returns the validated parameters for the Model step, `None` for steps
    /// that do not produce any.
    pub fn check_completion(&self) -> Result<Option<ParameterSet>, FieldErrors> {
        match self.state.current_step() {
            WizardStep::Dataset => {
                if self.state.selected_dataset.is_some() {
                    Ok(None)
                } else {
                    let mut errors = FieldErrors::new();
                    errors.missing(DATASET_FIELD);
                    Err(errors)
                }
            }
            WizardStep::Model => self.form.validate().map(Some),
            WizardStep::Results => Ok(None),
        }
    }

    /// Move one step forward if the current step is complete
    ///
    /// On failure the index is unchanged and the status message names the
    /// offending fields. At the last step this is a successful no-op.
    pub fn advance(&mut self) -> WizardResult<StepTransition> {
        let index = self.state.current_step_index();

        match self.check_completion() {
            Ok(parameters) => {
                if let Some(parameters) = parameters {
                    self.state.freeze_parameters(parameters);
                }
                self.state.status_message = None;
                Ok(self.move_to(index + 1))
            }
            Err(errors) => {
                let message = errors.status_message();
                info!(
                    session_id = %self.state.session_id,
                    step_index = index,
                    status = %message,
                    "Step completion check failed"
                );
                self.state.status_message = Some(message.clone());
                self.event_bus.emit_lossy(ForecastEvent::ValidationFailed {
                    session_id: self.state.session_id,
                    step_index: index,
                    status_message: message,
                    timestamp: Utc::now(),
                });
                Err(WizardError::Validation(errors))
            }
        }
    }

    /// Move one step back; a no-op at the first step
    pub fn retreat(&mut self) -> StepTransition {
        let index = self.state.current_step_index();
        self.state.status_message = None;
        self.move_to(index.saturating_sub(1))
    }

    /// Job request from the frozen selections
    pub fn job_request(&self) -> WizardResult<JobRequest> {
        let dataset = self.state.selected_dataset.as_ref().ok_or_else(|| {
            WizardError::InvalidStep("no dataset has been selected".to_string())
        })?;
        let parameters = self.state.frozen_parameters().ok_or_else(|| {
            WizardError::InvalidStep("model parameters have not been confirmed".to_string())
        })?;
        Ok(JobRequest::new(dataset.id.clone(), parameters))
    }

    /// Start over with a fresh session id
    pub fn reset(&mut self) {
        let old_index = self.state.current_step_index();
        let old_session = self.state.session_id;
        self.state = WizardState::new();
        self.form = ParameterForm::new(self.state.selected_model_type);
        debug!(old_session = %old_session, session_id = %self.state.session_id, "Wizard reset");

        if old_index != 0 {
            self.event_bus.emit_lossy(ForecastEvent::StepChanged {
                session_id: self.state.session_id,
                old_index,
                new_index: 0,
                timestamp: Utc::now(),
            });
        }
    }

    fn move_to(&mut self, index: usize) -> StepTransition {
        let transition = self.state.move_to(index);
        if transition.moved() {
            debug!(
                session_id = %transition.session_id,
                old_index = transition.old_index,
                new_index = transition.new_index,
                "Step changed"
            );
            self.event_bus.emit_lossy(ForecastEvent::StepChanged {
                session_id: transition.session_id,
                old_index: transition.old_index,
                new_index: transition.new_index,
                timestamp: transition.transitioned_at,
            });
        }
        transition
    }

    fn require_step(&self, step: WizardStep, action: &str) -> WizardResult<()> {
        let current = self.state.current_step();
        if current == step {
            Ok(())
        } else {
            Err(WizardError::InvalidStep(format!(
                "cannot {} on the {:?} step",
                action, current
            )))
        }
    }
}
