//! Database handle for the fleetsink server.

use std::path::Path;

use fleetsink_core::db::{self, DatabaseError};
use sqlx::{Pool, Sqlite};
use tracing::info;

#[derive(Clone)]
pub struct FleetDatabase {
    pool: Pool<Sqlite>,
}

impl FleetDatabase {
    /// Open (or create) the database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let pool = db::open_pool(path).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let pool = db::open_pool_in_memory().await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Fleet database migrations complete");
        Ok(())
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
