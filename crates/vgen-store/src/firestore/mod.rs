//! Firestore REST backend.
//!
//! Talks to the Firestore v1 REST API directly with reqwest, authenticating
//! through `gcp_auth`. Reads and queries retry with backoff; writes are
//! guarded by preconditions instead.

pub mod client;
pub mod error;
pub mod metrics;
pub mod plan_resolver;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod video_store;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use plan_resolver::FirestorePlanResolver;
pub use retry::RetryConfig;
pub use token_cache::TokenSource;
pub use video_store::FirestoreVideoStore;
