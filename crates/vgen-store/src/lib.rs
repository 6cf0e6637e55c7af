//! Video record persistence and plan lookup.
//!
//! [`VideoStore`] and [`PlanResolver`] are the seams the API depends on.
//! Two backends implement them:
//! - [`memory`]: process-local, for development and tests
//! - [`firestore`]: Firestore REST, for deployments

pub mod error;
pub mod firestore;
pub mod memory;
pub mod store;

pub use error::{BillingError, StoreError, StoreResult};
pub use firestore::{FirestoreClient, FirestoreConfig, FirestorePlanResolver, FirestoreVideoStore};
pub use memory::{MemoryPlanResolver, MemoryVideoStore};
pub use store::{
    PageRequest, PlanResolver, VideoFilter, VideoPage, VideoStats, VideoStore, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
