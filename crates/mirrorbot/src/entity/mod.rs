//! SeaORM entity definitions for the mirrorbot database schema.

pub mod known_repo;
pub mod mirror_job;
pub mod prelude;
