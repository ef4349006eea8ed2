//! forecast-wizard library interface
//!
//! Drives the new-forecast wizard against a forecasting backend:
//! DATASET → MODEL → RESULTS, then one job submission and a cancellable
//! status poll until the job completes or fails.

pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod wizard;

pub use crate::error::{ClientError, WizardError, WizardResult};
pub use crate::session::ForecastSession;
