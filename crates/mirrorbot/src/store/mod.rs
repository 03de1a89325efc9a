//! Dedup store and work queue.
//!
//! The pipeline only needs three operations from persistence: a membership
//! test and an insert on the set of processed repositories, and a push onto
//! the mirror job queue. They are split into two traits so either side can be
//! backed by a different service; [`SqlStore`] implements both on one
//! database.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

mod sql;

pub use sql::SqlStore;

/// Errors from the dedup store or work queue.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Membership set of repositories that have already been dispatched.
///
/// Marking is idempotent and the set only grows.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Whether `full_name` has been marked before.
    async fn seen(&self, full_name: &str) -> Result<bool, StoreError>;

    /// Record `full_name` as processed.
    async fn mark(&self, full_name: &str) -> Result<(), StoreError>;
}

/// FIFO sink for mirror targets, consumed by an external worker.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, target: &str) -> Result<(), StoreError>;
}

/// Fixed-length key for a repository: lowercase hex SHA-256 of its full name.
pub fn repo_digest(full_name: &str) -> String {
    format!("{:x}", Sha256::digest(full_name.as_bytes()))
}
