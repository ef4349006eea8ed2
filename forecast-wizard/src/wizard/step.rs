//! Step presentation: titles and navigation control states

use crate::models::WizardStep;
use serde::Serialize;

/// State of a Back or Next control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Enabled,
    Disabled,
    Hidden,
}

impl ControlState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ControlState::Enabled)
    }

    fn enabled_if(condition: bool) -> Self {
        if condition {
            ControlState::Enabled
        } else {
            ControlState::Disabled
        }
    }
}

/// What a view needs to render the current step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub step: WizardStep,
    pub index: usize,
    pub title: &'static str,
    pub body: &'static str,
    /// Short name for breadcrumb trails
    pub breadcrumb: &'static str,
    pub back: ControlState,
    pub next: ControlState,
}

impl StepDescriptor {
    /// Descriptor for `step`; `ready` says whether its completion input is present
    pub fn for_step(step: WizardStep, ready: bool) -> Self {
        let (title, body) = step_text(step);
        let (back, next) = match step {
            WizardStep::Dataset => (ControlState::Hidden, ControlState::enabled_if(ready)),
            WizardStep::Model => (ControlState::Enabled, ControlState::enabled_if(ready)),
            // Terminal step: the job is followed here, not edited
            WizardStep::Results => (ControlState::Hidden, ControlState::Hidden),
        };

        Self {
            step,
            index: step.index(),
            title,
            body,
            breadcrumb: breadcrumb(step),
            back,
            next,
        }
    }
}

fn step_text(step: WizardStep) -> (&'static str, &'static str) {
    match step {
        WizardStep::Dataset => (
            "Select a dataset",
            "Here are a few time-series datasets to choose from.",
        ),
        WizardStep::Model => ("Select a model", "Choose from a variety of models."),
        WizardStep::Results => ("Review forecast", "Review the forecast results."),
    }
}

pub fn breadcrumb(step: WizardStep) -> &'static str {
    match step {
        WizardStep::Dataset => "Dataset",
        WizardStep::Model => "Model",
        WizardStep::Results => "Results",
    }
}
