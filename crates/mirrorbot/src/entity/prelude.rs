//! Common re-exports for convenient entity usage.

pub use super::known_repo::{
    ActiveModel as KnownRepoActiveModel, Column as KnownRepoColumn, Entity as KnownRepo,
    Model as KnownRepoModel,
};
pub use super::mirror_job::{
    ActiveModel as MirrorJobActiveModel, Column as MirrorJobColumn, Entity as MirrorJob,
    Model as MirrorJobModel,
};
