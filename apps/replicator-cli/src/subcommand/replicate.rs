use std::io::Read as _;
use std::path::PathBuf;

use error_stack::{Result, ResultExt as _};
use replicator::orchestrator::replicate_notification;
use replicator_postgres_store::{DatabaseConnectionInfo, DatabasePoolConfig, ErEngineConnectionInfo, HttpErGateway, PostgresDatamartGateway, PostgresStorePool};
use replicator_types::notification::Notification;

use super::PolicyKind;
use crate::error::ReplicatorCliError;
use crate::logging::LoggingArgs;

/// `replicator replicate` (spec §4.1; SPEC_FULL §9.5): reads one notification
/// and runs it through the Orchestrator once.
#[derive(Debug, clap::Parser)]
pub struct ReplicateArgs {
    #[clap(flatten)]
    pub log_config: LoggingArgs,

    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,

    #[clap(flatten)]
    pub db_pool: DatabasePoolConfig,

    #[clap(flatten)]
    pub er_info: ErEngineConnectionInfo,

    /// Which policy to run custom fields/alerts through.
    #[clap(long, value_enum, default_value = "noop")]
    pub policy: PolicyKind,

    /// Skip the Alert Processor (spec §4.1 step 5).
    #[clap(long)]
    pub no_alerts: bool,

    /// Reads the notification from this file instead of stdin.
    #[clap(long)]
    pub input: Option<PathBuf>,

    /// Flushes the notification's `StatLog` to `tracing::info!` afterwards
    /// (spec §7 "the engine exposes an in-memory `stat_log` ... plus optional
    /// debug lines").
    #[clap(long)]
    pub debug: bool,
}

pub async fn replicate(args: ReplicateArgs) -> Result<(), ReplicatorCliError> {
    crate::logging::init_logger(&args.log_config);

    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path).change_context(ReplicatorCliError)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).change_context(ReplicatorCliError)?;
            buffer
        }
    };
    let notification: Notification = serde_json::from_str(&raw).change_context(ReplicatorCliError)?;

    let pool = PostgresStorePool::new(&args.db_info, &args.db_pool).change_context(ReplicatorCliError)?;
    let client = pool.acquire().await.change_context(ReplicatorCliError)?;
    let mut datamart = PostgresDatamartGateway::new(client);
    let mut er = HttpErGateway::new(&args.er_info).change_context(ReplicatorCliError)?;
    let policy = args.policy.build();

    let outcome = replicate_notification(
        &notification,
        &mut datamart,
        &mut er,
        policy.as_ref(),
        !args.no_alerts,
        // Wall-clock timestamp captured once per notification (spec §4.1 step 1).
        time::OffsetDateTime::now_utc(),
    )
    .await;

    println!("status: {}", outcome.status.code());
    if args.debug {
        tracing::info!(stats = %outcome.stats, "notification stat log");
    }

    Ok(())
}
