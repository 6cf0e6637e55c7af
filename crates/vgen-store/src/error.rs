//! Store and billing error types.

use thiserror::Error;

use crate::firestore::FirestoreError;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by a [`crate::VideoStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Video not found: {0}")]
    NotFound(String),

    /// The record is no longer in a state that accepts the update.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Monthly limit of {limit} videos reached")]
    QuotaExceeded { limit: u32 },

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn corrupt(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by a [`crate::PlanResolver`].
#[derive(Debug, Error)]
pub enum BillingError {
    /// No account exists for the user.
    #[error("User not found: {0}")]
    NotFound(String),

    /// The billing source could not be reached or returned garbage.
    #[error("Billing provider unavailable: {0}")]
    Unavailable(String),
}
