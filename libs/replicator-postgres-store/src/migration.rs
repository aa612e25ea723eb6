//! Embedded SQL migrations creating the six datamart tables (spec §6
//! "Datamart tables"; spec §1 treats the DDL itself as external, this is the
//! concrete realization the CLI driver's `migrate` subcommand runs).
//! Grounded on the teacher's `store/postgres/migration.rs`.

use error_stack::{Result, ResultExt as _};
use tokio_postgres::Client;

use crate::error::MigrationError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Runs every migration that has not yet been applied to `client`.
///
/// # Errors
///
/// Returns `Err` if a migration fails to apply.
pub async fn run_migrations(client: &mut Client) -> Result<Vec<String>, MigrationError> {
    let report = embedded::migrations::runner()
        .run_async(client)
        .await
        .change_context(MigrationError)?;

    Ok(report
        .applied_migrations()
        .iter()
        .map(|migration| format!("{}_{}", migration.version(), migration.name()))
        .collect())
}

/// Returns `true` if every checked-in migration has already been applied.
///
/// # Errors
///
/// Returns `Err` if the migration history could not be read.
pub async fn is_up_to_date(client: &mut Client) -> Result<bool, MigrationError> {
    let runner = embedded::migrations::runner();
    let applied = runner
        .get_applied_migrations_async(client)
        .await
        .change_context(MigrationError)?;
    let all = runner.get_migrations();
    Ok(all.iter().all(|migration| applied.iter().any(|applied| applied == migration)))
}
