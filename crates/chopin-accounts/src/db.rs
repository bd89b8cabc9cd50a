use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use crate::config::AccountsConfig;
use crate::migrations::Migrator;

/// Initialize the database connection from config.
pub async fn connect(config: &AccountsConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opts = ConnectOptions::new(&config.database_url);
    opts.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(config.is_dev());

    SeaDatabase::connect(opts).await
}

/// Connect and bring the account tables up to date.
pub async fn connect_and_migrate(
    config: &AccountsConfig,
) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let db = connect(config).await?;
    Migrator::up(&db, None).await?;
    tracing::info!("account tables migrated");
    Ok(db)
}
