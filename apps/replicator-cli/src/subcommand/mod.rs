//! Subcommand surface (spec §6 "Driver surface", expanded by SPEC_FULL §9.5),
//! patterned on `apps/hash-graph/bin/cli/src/subcommand/mod.rs`: a thin enum
//! dispatching to one function per subcommand.

mod migrate;
mod replicate;
mod resync;

pub use self::migrate::{migrate, MigrateArgs};
pub use self::replicate::{replicate, ReplicateArgs};
pub use self::resync::{resync, ResyncArgs};

/// Which [`ReplicationPolicy`] the subcommand should run with (spec §9 "Runtime
/// -typed config hook points", SPEC_FULL §9.7).
///
/// [`ReplicationPolicy`]: replicator_store::policy::ReplicationPolicy
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum PolicyKind {
    /// No custom columns, no alerts.
    #[default]
    Noop,
    /// The watchlist cross-join example policy (SPEC_FULL §9.7).
    Watchlist,
}

impl PolicyKind {
    #[must_use]
    pub fn build(self) -> Box<dyn replicator_store::policy::ReplicationPolicy> {
        match self {
            Self::Noop => Box::new(replicator_store::policy::NoopPolicy),
            Self::Watchlist => Box::new(replicator_store::policy::WatchlistPolicy),
        }
    }
}

/// Subcommand for the `replicator` binary.
#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Run the embedded datamart migrations (spec §6 "Datamart tables").
    Migrate(MigrateArgs),
    /// Read one notification and run it through the Orchestrator once (spec §4.1).
    Replicate(ReplicateArgs),
    /// Bulk backfill loop over a list of entities (spec §1 "deliberately out
    /// of scope" for the core engine; a driver-level convenience).
    Resync(ResyncArgs),
}

impl Subcommand {
    /// Dispatches to the selected subcommand's entry point.
    ///
    /// # Errors
    ///
    /// Returns `Err` on any unrecoverable startup/config failure (spec §7
    /// "config" kind — fatal, unlike `api`/`sql` errors which a notification
    /// absorbs into its status).
    pub async fn execute(self) -> error_stack::Result<(), crate::error::ReplicatorCliError> {
        match self {
            Self::Migrate(args) => migrate(args).await,
            Self::Replicate(args) => replicate(args).await,
            Self::Resync(args) => resync(args).await,
        }
    }
}
