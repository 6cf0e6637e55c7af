//! Business services.

pub mod generation;
pub mod sweeper;

pub use generation::{resolve_tier, GenerateInput, GenerationOutcome, GenerationWorkflow, WorkflowError};
pub use sweeper::StaleVideoSweeper;
