//! # Forecast Common Library
//!
//! Shared code for the forecast wizard crates including:
//! - Backend wire types (datasets, job records, results)
//! - Configuration loading and resolution
//! - Event types and the broadcast event bus
//! - Timestamp utilities

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
