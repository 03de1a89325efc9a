use mirrorbot::db;
use mirrorbot::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?;
            if pending.is_empty() {
                println!("Schema is up to date.");
                return Ok(());
            }
            for migration in &pending {
                println!("Applying {}", migration.name());
            }
            Migrator::up(&db, None).await?;
            println!("Applied {} migration(s).", pending.len());
        }
        MigrateAction::Down => {
            println!("Rolling back last migration...");
            Migrator::down(&db, Some(1)).await?;
            println!("Rollback complete.");
        }
        MigrateAction::Status => {
            for migration in Migrator::get_migration_with_status(&db).await? {
                println!("{:<10} {}", migration.status().to_string(), migration.name());
            }
        }
        MigrateAction::Fresh { yes } => {
            if !yes {
                return Err(
                    "fresh drops every known repository and queued job; pass --yes to confirm"
                        .into(),
                );
            }
            println!("Dropping all tables and reapplying migrations...");
            Migrator::fresh(&db).await?;
            println!("Fresh migration complete.");
        }
    }

    Ok(())
}
