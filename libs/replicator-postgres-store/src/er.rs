//! HTTP-backed [`ErGateway`] (spec §6 "ER Gateway (consumed)"), grounded on
//! `authorization::backend::spicedb::SpiceDbOpenApi` — the pack's other
//! plain-`reqwest::Client`-over-a-configured-base-path gateway to an external
//! service, down to the `base_url` field plus a `Debug` impl that omits the
//! client.

use error_stack::{Result, ResultExt as _};
use replicator_types::error::ApiError;
use replicator_types::notification::{GetEntityResponse, GetRecordResponse};

use crate::config::ErEngineConnectionInfo;

/// Talks to the ER engine's query interface over HTTP. The engine exposes
/// `get_entity`/`get_record` as plain `GET` requests returning the JSON
/// shapes spec §6 documents; a `404` response is the ER engine's "not found"
/// (spec §4.2 step 1), not a failure.
pub struct HttpErGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpErGateway {
    /// Builds a gateway from connection info (spec §9.4).
    ///
    /// # Errors
    ///
    /// Returns `Err` if the underlying HTTP client could not be constructed
    /// (e.g. an invalid TLS configuration).
    pub fn new(connection_info: &ErEngineConnectionInfo) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(connection_info.timeout_secs()))
            .build()
            .change_context(ApiError)?;

        Ok(Self { client, base_url: connection_info.base_url().trim_end_matches('/').to_owned() })
    }
}

#[async_trait::async_trait]
impl replicator_store::gateway::ErGateway for HttpErGateway {
    #[tracing::instrument(skip(self))]
    async fn get_entity(&mut self, entity_id: i64) -> Result<Option<GetEntityResponse>, ApiError> {
        let url = format!("{}/entities/{entity_id}", self.base_url);
        let response = self.client.get(&url).send().await.change_context(ApiError)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response.error_for_status().change_context(ApiError)?;
        let body = response.json::<GetEntityResponse>().await.change_context(ApiError)?;
        Ok(Some(body))
    }

    #[tracing::instrument(skip(self))]
    async fn get_record(&mut self, data_source: &str, record_id: &str) -> Result<GetRecordResponse, ApiError> {
        let url = format!("{}/records/{data_source}/{record_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .change_context(ApiError)?
            .error_for_status()
            .change_context(ApiError)?;
        response.json::<GetRecordResponse>().await.change_context(ApiError)
    }
}

impl core::fmt::Debug for HttpErGateway {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "HttpErGateway({})", self.base_url)
    }
}
