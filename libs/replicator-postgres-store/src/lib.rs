//! Postgres-backed [`DatamartGateway`] and HTTP-backed [`ErGateway`]
//! (spec §4.4, §6 "ER Gateway (consumed)"), plus the connection/pool
//! configuration and embedded migrations the CLI driver needs (SPEC_FULL §9.1,
//! §9.4, §9.5). Grounded on `hash-graph-postgres-store`'s crate layout:
//! `config`/`pool`/`migration` sit alongside the gateway implementation itself.
//!
//! [`DatamartGateway`]: replicator_store::gateway::DatamartGateway
//! [`ErGateway`]: replicator_store::gateway::ErGateway

pub mod config;
pub mod datamart;
pub mod er;
pub mod error;
pub mod migration;
pub mod pool;

pub use config::{DatabaseConnectionInfo, DatabasePoolConfig, ErEngineConnectionInfo};
pub use datamart::PostgresDatamartGateway;
pub use er::HttpErGateway;
pub use error::{MigrationError, PoolConfigError};
pub use pool::PostgresStorePool;
