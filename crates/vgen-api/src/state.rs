//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use vgen_models::{PlanTier, PresetCatalog, QuotaPolicy};
use vgen_provider::{ProviderClient, VideoGenerator};
use vgen_store::{
    FirestoreClient, FirestorePlanResolver, FirestoreVideoStore, MemoryPlanResolver, MemoryVideoStore,
    PlanResolver, VideoStore,
};

use crate::auth::SessionVerifier;
use crate::config::{ApiConfig, RecordStoreKind};
use crate::services::GenerationWorkflow;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub catalog: Arc<PresetCatalog>,
    pub store: Arc<dyn VideoStore>,
    pub plans: Arc<dyn PlanResolver>,
    pub quota: QuotaPolicy,
    /// `None` when no session secret is configured; every request is then
    /// unauthenticated.
    pub sessions: Option<Arc<SessionVerifier>>,
    pub workflow: GenerationWorkflow,
}

impl AppState {
    /// Build state from configuration and the environment.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let catalog = PresetCatalog::from_env().context("failed to load preset catalog")?;
        info!(presets = catalog.len(), "Loaded preset catalog");

        let (store, plans): (Arc<dyn VideoStore>, Arc<dyn PlanResolver>) = match config.record_store {
            RecordStoreKind::Firestore => {
                let client = FirestoreClient::from_env()
                    .await
                    .context("failed to create Firestore client")?;
                info!("Using Firestore record store");
                (
                    Arc::new(FirestoreVideoStore::new(client.clone())),
                    Arc::new(FirestorePlanResolver::new(client)),
                )
            }
            RecordStoreKind::Memory => {
                if config.is_production() {
                    warn!("Using in-memory record store in production; records are lost on restart");
                } else {
                    info!("Using in-memory record store");
                }
                (
                    Arc::new(MemoryVideoStore::new()),
                    Arc::new(MemoryPlanResolver::with_default(PlanTier::Free)),
                )
            }
        };

        let generator = ProviderClient::from_env().context("failed to create provider client")?;
        if generator.config().api_token.is_none() {
            warn!("VIDEO_PROVIDER_API_TOKEN is not set; generation requests will fail");
        }

        let sessions = match &config.session_secret {
            Some(secret) => Some(Arc::new(SessionVerifier::new(secret))),
            None => {
                warn!("SESSION_SECRET is not set; all authenticated endpoints will reject requests");
                None
            }
        };

        Ok(Self::from_parts(
            config,
            Arc::new(catalog),
            store,
            plans,
            Arc::new(generator),
            sessions,
        ))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        config: ApiConfig,
        catalog: Arc<PresetCatalog>,
        store: Arc<dyn VideoStore>,
        plans: Arc<dyn PlanResolver>,
        generator: Arc<dyn VideoGenerator>,
        sessions: Option<Arc<SessionVerifier>>,
    ) -> Self {
        let quota = QuotaPolicy::new(config.free_monthly_limit);
        let workflow = GenerationWorkflow::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&plans),
            generator,
            quota,
            config.generation_timeout,
        );

        Self {
            config,
            catalog,
            store,
            plans,
            quota,
            sessions,
            workflow,
        }
    }
}
