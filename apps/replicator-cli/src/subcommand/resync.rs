use error_stack::{Result, ResultExt as _};
use replicator::engine::replicate_entity;
use replicator::ReplicationContext;
use replicator_store::gateway::DatamartGateway as _;
use replicator_postgres_store::{DatabaseConnectionInfo, DatabasePoolConfig, ErEngineConnectionInfo, HttpErGateway, PostgresDatamartGateway, PostgresStorePool};

use super::PolicyKind;
use crate::error::ReplicatorCliError;
use crate::logging::LoggingArgs;

/// `replicator resync` (spec §1 "deliberately out of scope" for the core
/// engine, but a driver-level necessity; SPEC_FULL §9.5): repeatedly invokes
/// `replicate_entity` over a list of entities, mirroring
/// `G2Replicator.py`'s `__main__` `--entity-list` loop.
#[derive(Debug, clap::Parser)]
pub struct ResyncArgs {
    #[clap(flatten)]
    pub log_config: LoggingArgs,

    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,

    #[clap(flatten)]
    pub db_pool: DatabasePoolConfig,

    #[clap(flatten)]
    pub er_info: ErEngineConnectionInfo,

    #[clap(long, value_enum, default_value = "noop")]
    pub policy: PolicyKind,

    /// `all` to resync every entity the datamart knows about, or a
    /// comma-separated list of entity ids.
    #[clap(long)]
    pub entity_list: String,

    /// Restricts `--entity-list all` to entities with at least one record
    /// from this data source.
    #[clap(long)]
    pub data_source: Option<String>,

    /// Deletes every row from all six datamart tables before resyncing
    /// (SPEC_FULL §9.7, the original's `-P/--purge`).
    #[clap(long)]
    pub purge: bool,

    /// Flushes the accumulated `StatLog` to `tracing::info!` afterwards.
    #[clap(long)]
    pub debug: bool,
}

pub async fn resync(args: ResyncArgs) -> Result<(), ReplicatorCliError> {
    crate::logging::init_logger(&args.log_config);

    let pool = PostgresStorePool::new(&args.db_info, &args.db_pool).change_context(ReplicatorCliError)?;
    let client = pool.acquire().await.change_context(ReplicatorCliError)?;
    let mut datamart = PostgresDatamartGateway::new(client);
    let mut er = HttpErGateway::new(&args.er_info).change_context(ReplicatorCliError)?;
    let policy = args.policy.build();

    if args.purge {
        datamart.purge_all().await.change_context(ReplicatorCliError)?;
        tracing::info!("purged all datamart tables before resync");
    }

    let entity_ids = if args.entity_list == "all" {
        datamart.list_entity_ids(args.data_source.as_deref()).await.change_context(ReplicatorCliError)?
    } else {
        args.entity_list
            .split(',')
            .map(str::trim)
            .filter(|entity_id| !entity_id.is_empty())
            .map(|entity_id| entity_id.parse::<i64>().change_context(ReplicatorCliError))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut ctx = ReplicationContext::new(time::OffsetDateTime::now_utc());
    for entity_id in &entity_ids {
        let resync_ids =
            replicate_entity(*entity_id, "affected entity 0", &mut datamart, &mut er, policy.as_ref(), &mut ctx)
                .await;
        for related_id in resync_ids {
            replicate_entity(related_id, "related cycle 1", &mut datamart, &mut er, policy.as_ref(), &mut ctx).await;
        }
    }

    tracing::info!(count = entity_ids.len(), status = ctx.status.code(), "resync complete");
    if args.debug {
        tracing::info!(stats = %ctx.stats, "resync stat log");
    }

    std::process::exit(i32::from(ctx.status.code()));
}
