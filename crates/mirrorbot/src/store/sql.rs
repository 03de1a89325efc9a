//! SQL-backed dedup store and work queue.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect,
};

use super::{DedupStore, StoreError, WorkQueue, repo_digest};
use crate::entity::known_repo;
use crate::entity::mirror_job;
use crate::entity::prelude::*;

/// Dedup set and job queue stored in the `known_repos` and `mirror_jobs`
/// tables.
#[derive(Debug)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Number of repositories marked as processed.
    pub async fn known_count(&self) -> Result<u64, StoreError> {
        Ok(KnownRepo::find().count(&self.db).await?)
    }

    /// Number of jobs currently in the queue.
    pub async fn job_count(&self) -> Result<u64, StoreError> {
        Ok(MirrorJob::find().count(&self.db).await?)
    }

    /// Oldest `limit` jobs, in the order the worker will consume them.
    pub async fn pending_jobs(&self, limit: u64) -> Result<Vec<MirrorJobModel>, StoreError> {
        Ok(MirrorJob::find()
            .order_by_asc(mirror_job::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }
}

#[async_trait]
impl DedupStore for SqlStore {
    async fn seen(&self, full_name: &str) -> Result<bool, StoreError> {
        let found = KnownRepo::find_by_id(repo_digest(full_name))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    async fn mark(&self, full_name: &str) -> Result<(), StoreError> {
        let model = known_repo::ActiveModel {
            digest: Set(repo_digest(full_name)),
            marked_at: Set(Utc::now().fixed_offset()),
        };

        KnownRepo::insert(model)
            .on_conflict(
                OnConflict::column(known_repo::Column::Digest)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for SqlStore {
    async fn enqueue(&self, target: &str) -> Result<(), StoreError> {
        let model = mirror_job::ActiveModel {
            id: NotSet,
            target: Set(target.to_string()),
            enqueued_at: Set(Utc::now().fixed_offset()),
        };

        MirrorJob::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        tracing::debug!(target = %target, "Enqueued mirror job");
        Ok(())
    }
}
