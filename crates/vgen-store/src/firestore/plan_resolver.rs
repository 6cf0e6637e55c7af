//! Plan lookup from the `users` collection.

use async_trait::async_trait;
use tracing::warn;

use vgen_models::PlanTier;

use super::client::FirestoreClient;
use super::video_store::USERS_COLLECTION;
use crate::error::BillingError;
use crate::store::PlanResolver;

/// Reads `plan_tier` (or the older `plan` field) from `users/{uid}`.
#[derive(Clone)]
pub struct FirestorePlanResolver {
    client: FirestoreClient,
}

impl FirestorePlanResolver {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlanResolver for FirestorePlanResolver {
    async fn resolve_plan(&self, user_id: &str) -> Result<PlanTier, BillingError> {
        let doc = self
            .client
            .get_document(USERS_COLLECTION, user_id)
            .await
            .map_err(|e| {
                warn!(user_id, error = %e, "Plan lookup failed");
                BillingError::Unavailable(e.to_string())
            })?
            .ok_or_else(|| BillingError::NotFound(user_id.to_string()))?;

        let tier = doc
            .get::<String>("plan_tier")
            .or_else(|| doc.get::<String>("plan"))
            .map(|p| PlanTier::from_str(&p))
            .unwrap_or_default();
        Ok(tier)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::firestore::client::FirestoreConfig;
    use crate::firestore::retry::RetryConfig;
    use crate::firestore::token_cache::TokenSource;

    const USERS: &str = "/v1/projects/p/databases/(default)/documents/users";

    fn resolver(server: &MockServer) -> FirestorePlanResolver {
        let config = FirestoreConfig {
            project_id: "p".to_string(),
            database_id: "(default)".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 1,
            },
            emulator_host: None,
        };
        let client = FirestoreClient::with_endpoint(config, &server.uri(), TokenSource::Static("owner".into())).unwrap();
        FirestorePlanResolver::new(client)
    }

    fn user(fields: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/p/databases/(default)/documents/users/u1",
            "fields": fields,
            "updateTime": "2024-03-01T00:00:00Z"
        }))
    }

    #[tokio::test]
    async fn test_reads_plan_tier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/u1", USERS)))
            .respond_with(user(json!({"plan_tier": {"stringValue": "pro"}})))
            .mount(&server)
            .await;

        assert_eq!(resolver(&server).resolve_plan("u1").await.unwrap(), PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_missing_plan_is_free() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/u1", USERS)))
            .respond_with(user(json!({"email": {"stringValue": "a@b.c"}})))
            .mount(&server)
            .await;

        assert_eq!(resolver(&server).resolve_plan("u1").await.unwrap(), PlanTier::Free);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(matches!(
            resolver(&server).resolve_plan("ghost").await,
            Err(BillingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        assert!(matches!(
            resolver(&server).resolve_plan("u1").await,
            Err(BillingError::Unavailable(_))
        ));
    }
}
