//! Connection pool setup (spec §5 "a Replicator holds a single datamart
//! connection"; the CLI driver runs many notifications over the lifetime of
//! one pool, so pooling — not a single connection — is what actually backs
//! that contract in the long-running process). Grounded on the teacher's
//! `store/postgres/pool.rs`.

use deadpool_postgres::{ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Timeouts};
use error_stack::{Report, ResultExt as _};
use tokio_postgres::NoTls;

use crate::config::{DatabaseConnectionInfo, DatabasePoolConfig};
use crate::error::PoolConfigError;

/// Owns a `deadpool_postgres::Pool` to the datamart database.
pub struct PostgresStorePool {
    pool: Pool,
}

impl PostgresStorePool {
    /// Creates a new connection pool.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the pool could not be built from the given connection info.
    #[tracing::instrument(skip(pool_config))]
    pub fn new(
        db_info: &DatabaseConnectionInfo,
        pool_config: &DatabasePoolConfig,
    ) -> Result<Self, Report<PoolConfigError>> {
        tracing::debug!(url = %db_info, "creating connection pool to datamart");

        let config = deadpool_postgres::Config {
            user: Some(db_info.user().to_owned()),
            password: Some(db_info.password().to_owned()),
            host: Some(db_info.host().to_owned()),
            port: Some(db_info.port()),
            dbname: Some(db_info.database().to_owned()),
            pool: Some(PoolConfig {
                max_size: pool_config.max_connections.get() as usize,
                timeouts: Timeouts {
                    wait: Some(std::time::Duration::from_secs(pool_config.connection_timeout.get())),
                    create: Some(std::time::Duration::from_secs(pool_config.connection_timeout.get())),
                    recycle: Some(std::time::Duration::from_secs(pool_config.connection_timeout.get())),
                },
                ..PoolConfig::default()
            }),
            manager: Some(ManagerConfig { recycling_method: RecyclingMethod::Fast }),
            ..deadpool_postgres::Config::default()
        };

        let pool = config
            .builder(NoTls)
            .change_context(PoolConfigError)
            .attach_printable_lazy(|| db_info.clone())?
            .build()
            .change_context(PoolConfigError)?;

        Ok(Self { pool })
    }

    /// Checks out a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the pool is exhausted or a connection could not be established.
    pub async fn acquire(&self) -> Result<Object, Report<PoolConfigError>> {
        self.pool.get().await.change_context(PoolConfigError)
    }
}
