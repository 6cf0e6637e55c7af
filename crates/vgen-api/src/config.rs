//! API configuration.

use std::time::Duration;

use vgen_models::DEFAULT_FREE_MONTHLY_LIMIT;

/// Shortest stale sweep period; `tokio::time::interval` rejects zero.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// `true` for the production environment name, in any case.
pub fn is_production_environment(environment: &str) -> bool {
    environment.trim().eq_ignore_ascii_case("production")
}

/// Which [`vgen_store::VideoStore`] backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStoreKind {
    Memory,
    Firestore,
}

impl RecordStoreKind {
    /// Parse `RECORD_STORE`. Anything but `firestore` selects memory.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Self::Firestore,
            _ => Self::Memory,
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Per-IP requests per second on `/api`.
    pub rate_limit_rps: u32,
    pub max_body_size: usize,
    /// development/production
    pub environment: String,
    /// HS256 key for session tokens. Never logged.
    pub session_secret: Option<String>,
    pub free_monthly_limit: u32,
    /// Deadline for one provider generation.
    pub generation_timeout: Duration,
    /// Processing records older than this are failed by the sweeper.
    pub stale_video_after: Duration,
    pub stale_sweep_interval: Duration,
    pub stale_sweep_enabled: bool,
    pub record_store: RecordStoreKind,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024,
            environment: "development".to_string(),
            session_secret: None,
            free_monthly_limit: DEFAULT_FREE_MONTHLY_LIMIT,
            generation_timeout: Duration::from_secs(300),
            stale_video_after: Duration::from_secs(900),
            stale_sweep_interval: Duration::from_secs(60),
            stale_sweep_enabled: true,
            record_store: RecordStoreKind::Memory,
            metrics_enabled: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            session_secret: std::env::var("SESSION_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            free_monthly_limit: env_parse("FREE_MONTHLY_LIMIT").unwrap_or(defaults.free_monthly_limit),
            generation_timeout: env_parse("GENERATION_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.generation_timeout),
            stale_video_after: env_parse("STALE_VIDEO_AFTER_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_video_after),
            stale_sweep_interval: env_parse("STALE_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_sweep_interval)
                .max(MIN_SWEEP_INTERVAL),
            stale_sweep_enabled: env_flag("ENABLE_STALE_SWEEP", defaults.stale_sweep_enabled),
            record_store: std::env::var("RECORD_STORE")
                .map(|s| RecordStoreKind::parse(&s))
                .unwrap_or(defaults.record_store),
            metrics_enabled: env_flag("METRICS_ENABLED", defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.environment)
    }
}
