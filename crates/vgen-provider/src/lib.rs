//! Client for the external video generation provider.
//!
//! The provider exposes a task API: a prediction is submitted, then polled
//! until it succeeds or fails. [`ProviderClient`] wraps that protocol behind
//! the [`VideoGenerator`] trait and classifies every failure into
//! configuration, task or transport errors.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{ProviderClient, VideoGenerator};
pub use config::ProviderConfig;
pub use error::{ErrorKind, ProviderError, ProviderResult};
pub use types::{extract_result_url, Prediction, PredictionInput, PredictionRequest, PredictionStatus};
