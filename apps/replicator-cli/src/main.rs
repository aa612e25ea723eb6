//! `replicator` CLI driver (spec §6 "Driver surface", expanded by SPEC_FULL
//! §9.5): the external collaborator spec §1 deliberately keeps out of the
//! core engine — argument parsing, database connections, and subcommand
//! dispatch over the `replicator`/`replicator-postgres-store` library crates.

mod args;
mod error;
mod logging;
mod subcommand;

use error_stack::Result;

use self::args::Args;
use self::error::ReplicatorCliError;

#[tokio::main]
async fn main() -> Result<(), ReplicatorCliError> {
    let Args { subcommand } = Args::parse_args();
    subcommand.execute().await
}
