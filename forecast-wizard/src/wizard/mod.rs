//! Wizard navigation
//!
//! [`StepSequencer`] owns the session state and decides whether Next may
//! proceed; [`StepDescriptor`] is what a view renders for the current step.

pub mod sequencer;
pub mod step;

pub use sequencer::{StepSequencer, DATASET_FIELD};
pub use step::{breadcrumb, ControlState, StepDescriptor};
