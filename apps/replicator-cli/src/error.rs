//! Top-level CLI error (spec §7 "config" kind; startup-only, fatal). Mirrors
//! the teacher's `bin/cli/src/error.rs` single marker-error-per-binary pattern.

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("the replicator CLI encountered an unrecoverable error")]
pub struct ReplicatorCliError;
