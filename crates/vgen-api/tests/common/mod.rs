//! Shared fixtures for API tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};

use vgen_api::{ApiConfig, AppState, SessionClaims, SessionVerifier};
use vgen_models::{PlanTier, Preset, PresetCatalog};
use vgen_provider::{ProviderError, ProviderResult, VideoGenerator};
use vgen_store::{BillingError, MemoryPlanResolver, MemoryVideoStore, PlanResolver};

pub const SECRET: &str = "integration-test-secret";
pub const VIDEO_URL: &str = "https://cdn.example.com/videos/out.mp4";

/// What the fake provider does on each call.
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    Succeed,
    TaskFailure,
    Transport,
    Unconfigured,
    Hang,
}

/// Provider stand-in that records prompts.
pub struct FakeGenerator {
    behavior: Behavior,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, _preset: &Preset) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        match self.behavior {
            Behavior::Succeed => Ok(VIDEO_URL.to_string()),
            Behavior::TaskFailure => Err(ProviderError::TaskFailed {
                task_id: "task-1".to_string(),
                detail: "NSFW content detected".to_string(),
            }),
            Behavior::Transport => Err(ProviderError::from_status(503, "overloaded", None)),
            Behavior::Unconfigured => Err(ProviderError::Configuration(
                "VIDEO_PROVIDER_API_TOKEN is not set".to_string(),
            )),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(VIDEO_URL.to_string())
            }
        }
    }
}

/// Billing source that is always down.
pub struct UnavailablePlans;

#[async_trait]
impl PlanResolver for UnavailablePlans {
    async fn resolve_plan(&self, _user_id: &str) -> Result<PlanTier, BillingError> {
        Err(BillingError::Unavailable("connection refused".to_string()))
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryVideoStore>,
    pub generator: Arc<FakeGenerator>,
}

pub fn config() -> ApiConfig {
    ApiConfig {
        free_monthly_limit: 3,
        generation_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

pub fn harness(behavior: Behavior) -> Harness {
    let plans = MemoryPlanResolver::with_default(PlanTier::Free);
    harness_with(behavior, Arc::new(plans))
}

pub fn harness_with(behavior: Behavior, plans: Arc<dyn PlanResolver>) -> Harness {
    let store = Arc::new(MemoryVideoStore::new());
    let generator = FakeGenerator::new(behavior);
    let catalog = Arc::new(PresetCatalog::embedded().unwrap());

    let state = AppState::from_parts(
        config(),
        catalog,
        store.clone(),
        plans,
        generator.clone(),
        Some(Arc::new(SessionVerifier::new(SECRET))),
    );

    Harness {
        state,
        store,
        generator,
    }
}

pub fn session_token(user_id: &str) -> String {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: None,
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}
