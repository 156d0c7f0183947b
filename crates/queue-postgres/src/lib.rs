//! `sea-orm`-backed `JobStorage`/`EventStorage` provider for
//! `queue-core`, following the entity-plus-thin-repository shape used
//! throughout this workspace's Postgres-backed domains.

pub mod codec;
pub mod entity;
pub mod events;
pub mod jobs;
pub mod migration;

pub use events::PgEventStorage;
pub use jobs::PgJobStorage;
pub use migration::Migrator;

use database::postgres::{DatabaseConnection, DbErr, PostgresConfig, connect_from_config_with_retry, run_migrations};

/// Connects with the workspace's standard retrying connector and runs
/// the `queue_job_records`/`queue_event_records` migrations, handing
/// back a pool ready for [`PgJobStorage::new`]/[`PgEventStorage::new`].
pub async fn connect_and_migrate(config: PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = connect_from_config_with_retry(config, None).await?;
    run_migrations::<Migrator>(&db, "queue-postgres").await?;
    Ok(db)
}
