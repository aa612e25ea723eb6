use error_stack::{Result, ResultExt as _};
use replicator_postgres_store::DatabaseConnectionInfo;
use tokio_postgres::NoTls;

use crate::error::ReplicatorCliError;
use crate::logging::LoggingArgs;

/// `replicator migrate` (spec §6 "Datamart tables"; SPEC_FULL §9.5): creates
/// `DM_ENTITY`/`DM_RECORD`/`DM_RELATION`/`DM_REPORT`/`DM_REPORT_DETAIL`/`DM_ALERT`.
#[derive(Debug, clap::Parser)]
pub struct MigrateArgs {
    #[clap(flatten)]
    pub log_config: LoggingArgs,

    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,
}

pub async fn migrate(args: MigrateArgs) -> Result<(), ReplicatorCliError> {
    crate::logging::init_logger(&args.log_config);

    let connection_string = format!(
        "host={} port={} user={} password={} dbname={}",
        args.db_info.host(),
        args.db_info.port(),
        args.db_info.user(),
        args.db_info.password(),
        args.db_info.database(),
    );

    let (mut client, connection) = tokio_postgres::connect(&connection_string, NoTls)
        .await
        .change_context(ReplicatorCliError)?;

    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::error!("datamart connection error: {error}");
        }
    });

    let applied = replicator_postgres_store::migration::run_migrations(&mut client)
        .await
        .change_context(ReplicatorCliError)?;

    if applied.is_empty() {
        tracing::info!("datamart schema already up to date");
    } else {
        tracing::info!(?applied, "applied datamart migrations");
    }

    Ok(())
}
