//! Axum HTTP API for preset video generation.
//!
//! This crate provides:
//! - Session-authenticated generation, listing, dashboard and billing endpoints
//! - The generation workflow and the stale video sweeper
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{AuthUser, SessionClaims, SessionVerifier};
pub use config::{ApiConfig, RecordStoreKind};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{GenerateInput, GenerationOutcome, GenerationWorkflow, StaleVideoSweeper, WorkflowError};
pub use state::AppState;
