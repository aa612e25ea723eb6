//! Error kinds (spec §7). None of these ever cross the Orchestrator boundary —
//! every fallible call site converts the `Report` into a [`NotificationStatus`]
//! variant plus a [`StatLog`] entry instead of propagating it to the caller.
//!
//! [`NotificationStatus`]: crate::status::NotificationStatus
//! [`StatLog`]: crate::stat_log::StatLog

/// The ER engine could not serve a request (notification status becomes `api_error`).
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("ER engine request failed")]
#[must_use]
pub struct ApiError;

/// A datamart statement failed (notification status becomes `sql_error`).
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("datamart statement failed")]
#[must_use]
pub struct SqlError;

/// A résumé hash could not be decoded in place; this forces a rebuild from the
/// Record/Relation tables and is not surfaced as an error to the caller.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("résumé hash could not be decoded, rebuild required")]
#[must_use]
pub struct DataError;

/// Startup-only configuration failure; fatal.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("configuration error")]
#[must_use]
pub struct ConfigError;

/// Unexpected failures in the alert path that don't fit the other kinds.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("unexpected error")]
#[must_use]
pub struct UnknownError;
