//! MirrorJob entity - FIFO queue of mirror targets for the external worker.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mirror_jobs")]
pub struct Model {
    /// Insertion order; the worker consumes jobs in ascending id order.
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Clone URL or fork page URL, opaque to the queue.
    #[sea_orm(column_type = "Text")]
    pub target: String,

    pub enqueued_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
