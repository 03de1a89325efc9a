//! Initial migration: dedup set and mirror job queue.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_known_repos(manager).await?;
        self.create_mirror_jobs(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MirrorJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(KnownRepos::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_known_repos(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(KnownRepos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KnownRepos::Digest)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(KnownRepos::MarkedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_mirror_jobs(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MirrorJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MirrorJobs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MirrorJobs::Target).text().not_null())
                    .col(
                        ColumnDef::new(MirrorJobs::EnqueuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "known_repos")]
enum KnownRepos {
    Table,
    Digest,
    MarkedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "mirror_jobs")]
enum MirrorJobs {
    Table,
    Id,
    Target,
    EnqueuedAt,
}
