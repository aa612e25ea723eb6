use clap::Parser;

use crate::subcommand::Subcommand;

/// Arguments passed to the `replicator` binary (SPEC_FULL §9.5).
#[derive(Debug, Parser)]
#[clap(version, author, about = "Net-change replicator for the ER datamart", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub subcommand: Subcommand,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
