//! PostgreSQL connection management

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::error::{StoreError, StoreResult};

pub type DbPool = Pool;

/// Create a PostgreSQL connection pool from a `postgresql://` URL
pub fn create_pool(url: &str, max_connections: u32) -> StoreResult<DbPool> {
    let mut cfg = Config::new();
    cfg.url = Some(url.to_string());
    cfg.pool = Some(PoolConfig::new(max_connections.max(1) as usize));

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;

    Ok(pool)
}

/// Test database connection
pub async fn test_connection(pool: &DbPool) -> StoreResult<()> {
    let client = pool.get().await?;
    let row = client.query_one("SELECT 1 as test", &[]).await?;
    let test: i32 = row.get(0);

    if test == 1 {
        Ok(())
    } else {
        Err(StoreError::Schema(
            "connection test returned an unexpected value".to_string(),
        ))
    }
}
