//! Store-local error kinds (spec §7 "config" covers pool/connection setup;
//! everything past that point is folded into `replicator_types::error::SqlError`
//! at the gateway boundary, matching the teacher's `StoreError`/`MigrationError`
//! split in `store/error.rs`).

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("failed to create a connection pool to the datamart")]
#[must_use]
pub struct PoolConfigError;

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("failed to run datamart migrations")]
#[must_use]
pub struct MigrationError;
