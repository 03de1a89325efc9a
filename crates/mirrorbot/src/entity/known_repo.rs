//! KnownRepo entity - the append-only dedup set.
//!
//! Rows are keyed by the SHA-256 digest of a repository's full name and are
//! never deleted by mirrorbot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "known_repos")]
pub struct Model {
    /// Lowercase hex SHA-256 of `owner/name`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub digest: String,

    /// When the repository was first marked as processed.
    pub marked_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
