//! Shared data models for the video generation backend.
//!
//! This crate provides:
//! - Presets and the preset catalog
//! - Plan tiers, quota policy and the monthly usage window
//! - Prompt construction
//! - Video records and their status machine

pub mod generation;
pub mod plan;
pub mod preset;
pub mod prompt;
pub mod video;

pub use generation::{GenerationRequest, DEFAULT_TITLE, MAX_TITLE_LEN};
pub use plan::{MonthWindow, PlanTier, QuotaPolicy, DEFAULT_FREE_MONTHLY_LIMIT};
pub use preset::{CatalogError, Orientation, Preset, PresetCatalog};
pub use prompt::build_prompt;
pub use video::{TransitionError, VideoId, VideoRecord, VideoStatus, VideoSummary, VideoUpdate};
