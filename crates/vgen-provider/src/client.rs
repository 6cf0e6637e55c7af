//! Provider HTTP client.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use vgen_models::Preset;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::types::{extract_result_url, Prediction, PredictionInput, PredictionRequest, PredictionStatus};

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Turns a prompt into a finished video.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Run one generation to completion and return the result URL.
    async fn generate(&self, prompt: &str, preset: &Preset) -> ProviderResult<String>;
}

/// Client for the provider's prediction API.
pub struct ProviderClient {
    http: Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("vgen-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env())
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Submit a prediction. Returns the task as first reported.
    pub async fn submit(&self, request: &PredictionRequest) -> ProviderResult<Prediction> {
        let token = self.config.require_token()?;
        let url = self.config.predictions_url()?;

        self.with_retry("submit", || async {
            let response = self.http.post(&url).bearer_auth(token).json(request).send().await?;
            Self::read_prediction(response).await
        })
        .await
    }

    /// Fetch the current state of a prediction.
    pub async fn get_prediction(&self, id: &str) -> ProviderResult<Prediction> {
        let token = self.config.require_token()?;
        let url = self.config.prediction_url(id)?;

        self.with_retry("poll", || async {
            let response = self.http.get(&url).bearer_auth(token).send().await?;
            Self::read_prediction(response).await
        })
        .await
    }

    /// Poll until the task reaches a terminal state.
    async fn wait_for(&self, mut prediction: Prediction) -> ProviderResult<Prediction> {
        let started = Instant::now();
        while !prediction.status.is_terminal() {
            tokio::time::sleep(self.config.poll_interval).await;
            prediction = self.get_prediction(&prediction.id).await?;
            debug!(
                task_id = %prediction.id,
                status = ?prediction.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Polled generation task"
            );
        }
        Ok(prediction)
    }

    async fn read_prediction(response: Response) -> ProviderResult<Prediction> {
        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(ProviderError::from_status(status.as_u16(), body, retry_after_ms));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("undecodable prediction: {}", e)))
    }

    /// Execute with retry on transient errors.
    async fn with_retry<F, Fut, T>(&self, operation: &str, op: F) -> ProviderResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.backoff_delay(attempt, &e);
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32, error: &ProviderError) -> Duration {
        let delay = match error.retry_after_ms() {
            Some(ms) => Duration::from_millis(ms),
            None => self
                .config
                .retry_base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.config.retry_max_delay)
    }
}

#[async_trait]
impl VideoGenerator for ProviderClient {
    async fn generate(&self, prompt: &str, preset: &Preset) -> ProviderResult<String> {
        // Fail before touching the network.
        self.config.require_token()?;

        let request = PredictionRequest {
            input: PredictionInput {
                prompt: prompt.to_string(),
                duration: self.config.duration,
                aspect_ratio: preset.orientation.aspect_ratio().to_string(),
                seed: rand::random::<u32>(),
            },
        };

        let started = Instant::now();
        let submitted = self.submit(&request).await?;
        info!(
            task_id = %submitted.id,
            preset = %preset.id,
            model = %self.config.model,
            seed = request.input.seed,
            "Submitted generation task"
        );

        let prediction = self.wait_for(submitted).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match prediction.status {
            PredictionStatus::Succeeded => match extract_result_url(&prediction) {
                Some(url) => {
                    info!(task_id = %prediction.id, elapsed_ms, "Generation task succeeded");
                    Ok(url)
                }
                None => {
                    warn!(task_id = %prediction.id, "Generation task succeeded without output");
                    Err(ProviderError::MissingOutput(prediction.id))
                }
            },
            _ => {
                let detail = prediction.error_detail();
                warn!(task_id = %prediction.id, elapsed_ms, detail = %detail, "Generation task failed");
                Err(ProviderError::TaskFailed {
                    task_id: prediction.id,
                    detail,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ProviderClient {
        ProviderClient::new(ProviderConfig {
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(8),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let c = client();
        let err = ProviderError::from_status(503, "", None);
        assert_eq!(c.backoff_delay(0, &err), Duration::from_millis(500));
        assert_eq!(c.backoff_delay(1, &err), Duration::from_millis(1000));
        assert_eq!(c.backoff_delay(3, &err), Duration::from_millis(4000));
        assert_eq!(c.backoff_delay(10, &err), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_honors_retry_after() {
        let c = client();
        let err = ProviderError::from_status(429, "", Some(2000));
        assert_eq!(c.backoff_delay(0, &err), Duration::from_millis(2000));
        let err = ProviderError::from_status(429, "", Some(60_000));
        assert_eq!(c.backoff_delay(0, &err), Duration::from_secs(8));
    }
}
