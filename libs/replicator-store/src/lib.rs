//! Gateway traits and the replication policy hook (spec §4.4, §4.6, §9).
//!
//! Concrete implementations live in `replicator-postgres-store`; tests in
//! `replicator` exercise the engine against in-memory fakes of these traits.

pub mod gateway;
pub mod policy;

pub use gateway::{DatamartGateway, ErGateway, InsertOutcome, RowsAffected, UpdateOutcome};
pub use policy::{NoopPolicy, ReplicationPolicy, WatchlistPolicy};
