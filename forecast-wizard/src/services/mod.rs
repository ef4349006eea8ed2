//! Backend-facing services
//!
//! - HTTP client behind the [`ForecastApi`] trait
//! - Fire-once job submission
//! - Cancellable job status polling
//! - Results retrieval for completed jobs

pub mod forecast_client;
pub mod job_poller;
pub mod job_submitter;
pub mod results;

#[cfg(test)]
pub(crate) mod testing;

pub use forecast_client::{ForecastApi, HttpForecastClient};
pub use job_poller::{JobPoller, PollSnapshot, PollerHandle};
pub use job_submitter::JobSubmitter;
pub use results::{ForecastResults, ResultsFetcher};
