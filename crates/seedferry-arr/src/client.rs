//! HTTP client for one queue API instance.

use std::time::Duration;

use reqwest::Client;
use seedferry_config::ArrInstanceConfig;
use tracing::debug;

use crate::error::{ArrError, ArrResult};
use crate::model::QueuePage;

/// Header carrying the application API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Read-only queue client.
#[derive(Debug, Clone)]
pub struct ArrClient {
    name: String,
    base_url: String,
    api_key: String,
    http: Client,
}

impl ArrClient {
    /// Build a client for `instance` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(instance: &ArrInstanceConfig, timeout: Duration) -> ArrResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ArrError::Build { source })?;
        Ok(Self {
            name: instance.name.clone(),
            base_url: instance.url.trim_end_matches('/').to_string(),
            api_key: instance.api_key.clone(),
            http,
        })
    }

    /// Application name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch the current queue.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success statuses, or an
    /// undecodable body.
    pub async fn queue(&self) -> ArrResult<QueuePage> {
        let url = format!("{}/api/v3/queue", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| ArrError::Http {
                instance: self.name.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArrError::Status {
                instance: self.name.clone(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|source| ArrError::Http {
            instance: self.name.clone(),
            source,
        })?;
        let page: QueuePage = serde_json::from_slice(&bytes).map_err(|source| ArrError::Decode {
            instance: self.name.clone(),
            source,
        })?;
        debug!(instance = %self.name, records = page.records.len(), "fetched queue");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> anyhow::Result<ArrClient> {
        let instance = ArrInstanceConfig {
            name: "sonarr".into(),
            url: server.base_url(),
            api_key: "secret".into(),
        };
        Ok(ArrClient::new(&instance, Duration::from_secs(5))?)
    }

    #[tokio::test]
    async fn queue_sends_api_key() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v3/queue").header("X-Api-Key", "secret");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"records": [{"title": "Film", "status": "warning"}]}));
        });

        let page = client_for(&server)?.queue().await?;
        mock.assert();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].title, "Film");
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_reported() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/queue");
            then.status(401);
        });

        let err = client_for(&server)?.queue().await.err();
        assert!(matches!(err, Some(ArrError::Status { status: 401, .. })));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/queue");
            then.status(200).body("not json");
        });

        let err = client_for(&server)?.queue().await.err();
        assert!(matches!(err, Some(ArrError::Decode { .. })));
        Ok(())
    }
}
