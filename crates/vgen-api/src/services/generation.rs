//! Generation workflow.
//!
//! One call takes a request from validation through quota reservation,
//! prompt construction and the provider call to a terminal record. Every
//! failure after the record exists flips it to `failed`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info, warn};

use vgen_models::{
    build_prompt, GenerationRequest, MonthWindow, PlanTier, PresetCatalog, QuotaPolicy, VideoId, VideoRecord,
};
use vgen_provider::{ErrorKind, ProviderError, VideoGenerator};
use vgen_store::{BillingError, PlanResolver, StoreError, VideoStore};

use crate::metrics;

/// Workflow failure taxonomy.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Monthly limit of {limit} videos reached")]
    QuotaExceeded { limit: u32 },

    /// Missing credential or settings. The detail stays in logs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Generation task failed: {0}")]
    ProviderTaskFailure(String),

    #[error("Provider unavailable: {0}")]
    ProviderTransport(String),

    #[error("Generation timed out after {0:?}")]
    ProviderTimeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Short label for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Configuration(_) => "configuration",
            Self::ProviderTaskFailure(_) => "task_failure",
            Self::ProviderTransport(_) => "transport",
            Self::ProviderTimeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<ProviderError> for WorkflowError {
    fn from(e: ProviderError) -> Self {
        match e.kind() {
            ErrorKind::Configuration => Self::Configuration(e.to_string()),
            ErrorKind::TaskFailure => Self::ProviderTaskFailure(e.to_string()),
            ErrorKind::Transport => Self::ProviderTransport(e.to_string()),
        }
    }
}

/// Input to [`GenerationWorkflow::run`].
#[derive(Debug, Clone, Default)]
pub struct GenerateInput {
    pub preset_id: String,
    pub fields: HashMap<String, String>,
    pub title: Option<String>,
}

/// A completed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub video_id: VideoId,
    pub video_url: String,
}

/// Drives a generation request to a terminal record.
#[derive(Clone)]
pub struct GenerationWorkflow {
    catalog: Arc<PresetCatalog>,
    store: Arc<dyn VideoStore>,
    plans: Arc<dyn PlanResolver>,
    generator: Arc<dyn VideoGenerator>,
    policy: QuotaPolicy,
    timeout: Duration,
}

impl GenerationWorkflow {
    pub fn new(
        catalog: Arc<PresetCatalog>,
        store: Arc<dyn VideoStore>,
        plans: Arc<dyn PlanResolver>,
        generator: Arc<dyn VideoGenerator>,
        policy: QuotaPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            plans,
            generator,
            policy,
            timeout,
        }
    }

    /// Run one generation for `user_id`.
    pub async fn run(&self, user_id: Option<String>, input: GenerateInput) -> Result<GenerationOutcome, WorkflowError> {
        let started = Instant::now();
        let result = self.run_inner(user_id, input).await;

        let outcome = match &result {
            Ok(_) => "completed",
            Err(e) => e.outcome(),
        };
        metrics::record_generation(outcome, started.elapsed().as_secs_f64());
        result
    }

    async fn run_inner(&self, user_id: Option<String>, input: GenerateInput) -> Result<GenerationOutcome, WorkflowError> {
        let user_id = user_id.ok_or(WorkflowError::Unauthorized)?;

        let preset = self
            .catalog
            .find_by_id(&input.preset_id)
            .ok_or_else(|| WorkflowError::InvalidInput("Invalid preset".to_string()))?;

        let mut request = GenerationRequest::new(user_id.as_str(), preset.id.as_str(), input.fields);
        request.title = input.title;
        request
            .validate_against(preset)
            .map_err(WorkflowError::InvalidInput)?;

        let tier = resolve_tier(self.plans.as_ref(), &user_id).await?;

        let record = VideoRecord::new(user_id.as_str(), request.resolved_title(preset), preset.id.as_str());
        let record = self
            .store
            .create_within_quota(record, tier, &self.policy, MonthWindow::current())
            .await
            .map_err(|e| match e {
                StoreError::QuotaExceeded { limit } => {
                    metrics::record_quota_rejection(tier.as_str());
                    info!(user_id = %user_id, limit, "Monthly quota reached");
                    WorkflowError::QuotaExceeded { limit }
                }
                other => {
                    error!(user_id = %user_id, error = %other, "Failed to create video record");
                    WorkflowError::Internal(other.to_string())
                }
            })?;
        let video_id = record.id.clone();

        info!(
            video_id = %video_id,
            user_id = %user_id,
            preset = %preset.id,
            plan = %tier,
            "Starting video generation"
        );

        let prompt = build_prompt(preset, &request.field_values);

        let failure = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt, preset)).await {
            Ok(Ok(url)) => {
                return match self.store.mark_completed(&video_id, url.clone()).await {
                    Ok(_) => {
                        info!(video_id = %video_id, "Video generation completed");
                        Ok(GenerationOutcome {
                            video_id,
                            video_url: url,
                        })
                    }
                    Err(e) => {
                        error!(video_id = %video_id, error = %e, "Failed to record completed video");
                        Err(WorkflowError::Internal(e.to_string()))
                    }
                };
            }
            Ok(Err(e)) => WorkflowError::from(e),
            Err(_) => WorkflowError::ProviderTimeout(self.timeout),
        };

        warn!(video_id = %video_id, error = %failure, "Video generation failed");
        if let Err(e) = self.store.mark_failed(&video_id, failure.to_string()).await {
            error!(video_id = %video_id, error = %e, "Failed to mark video as failed");
        }
        Err(failure)
    }
}

/// Plan tier for a user. Unknown users are an error; an unreachable billing
/// source degrades to the free tier.
pub async fn resolve_tier(plans: &dyn PlanResolver, user_id: &str) -> Result<PlanTier, WorkflowError> {
    match plans.resolve_plan(user_id).await {
        Ok(tier) => Ok(tier),
        Err(BillingError::NotFound(_)) => Err(WorkflowError::NotFound("User not found".to_string())),
        Err(BillingError::Unavailable(e)) => {
            warn!(user_id, error = %e, "Billing lookup failed, treating user as free tier");
            Ok(PlanTier::Free)
        }
    }
}
