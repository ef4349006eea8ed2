//! Forecast backend API surface shared across crates

pub mod status;
pub mod types;

pub use status::{job_duration, JobStatus};
pub use types::{
    DataGridData, DatasetFull, DatasetRef, ErrorDetail, ForecastJobRecord, HistoricalBounds,
    JobRequestRecord, ParameterDict, PlotlyPredictionLine, PlotlyPredictionResponse,
    SubmitForecastJobRequest, SubmitForecastJobResponse,
};
