//! HTTP transport for the Transmission RPC endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use seedferry_config::InstanceConfig;
use seedferry_torrent_core::{AddTorrent, TorrentClient, TorrentRecord, TorrentResult};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{TransmissionError, TransmissionResult};
use crate::wire::{
    AddArgs, AddedTorrent, IdsArgs, NoArgs, RpcRequest, RpcResponse, SetLocationArgs,
    TORRENT_FIELDS, TorrentGetArgs, TorrentList,
};

/// Header carrying the CSRF session identifier.
pub const SESSION_HEADER: &str = "X-Transmission-Session-Id";

const RESULT_SUCCESS: &str = "success";

/// Client for one Transmission instance.
#[derive(Debug)]
pub struct TransmissionClient {
    label: String,
    endpoint: String,
    username: String,
    password: String,
    http: Client,
    session_id: RwLock<Option<String>>,
}

impl TransmissionClient {
    /// Build a client for `instance` with the given request timeout.
    ///
    /// No request is sent; use [`TorrentClient::probe`] to check connectivity.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(instance: &InstanceConfig, timeout: Duration) -> TransmissionResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransmissionError::Build { source })?;
        Ok(Self {
            label: instance.label.clone(),
            endpoint: instance.rpc_url(),
            username: instance.username.clone(),
            password: instance.password.clone(),
            http,
            session_id: RwLock::new(None),
        })
    }

    /// RPC endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<A, T>(&self, method: &'static str, arguments: A) -> TransmissionResult<Option<T>>
    where
        A: Serialize + Send + Sync,
        T: DeserializeOwned,
    {
        let body = RpcRequest { method, arguments };
        let mut refreshed = false;
        loop {
            let session = self.session_id.read().await.clone();
            let mut request = self
                .http
                .post(&self.endpoint)
                .basic_auth(&self.username, Some(&self.password))
                .json(&body);
            if let Some(session) = session {
                request = request.header(SESSION_HEADER, session);
            }
            let response = request
                .send()
                .await
                .map_err(|source| TransmissionError::Http { method, source })?;

            let status = response.status();
            if status == StatusCode::CONFLICT && !refreshed {
                let session = response
                    .headers()
                    .get(SESSION_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
                    .ok_or(TransmissionError::SessionHandshake { method })?;
                debug!(instance = %self.label, "refreshed transmission session id");
                *self.session_id.write().await = Some(session);
                refreshed = true;
                continue;
            }
            if !status.is_success() {
                return Err(TransmissionError::Status {
                    method,
                    status: status.as_u16(),
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|source| TransmissionError::Http { method, source })?;
            let decoded: RpcResponse<T> = serde_json::from_slice(&bytes)
                .map_err(|source| TransmissionError::Decode { method, source })?;
            if decoded.result != RESULT_SUCCESS {
                return Err(TransmissionError::Rejected {
                    method,
                    result: decoded.result,
                });
            }
            return Ok(decoded.arguments);
        }
    }

    async fn call_for_hash(
        &self,
        operation: &'static str,
        method: &'static str,
        info_hash: &str,
    ) -> TorrentResult<()> {
        self.call::<_, serde_json::Value>(method, IdsArgs { ids: [info_hash] })
            .await
            .map(|_| ())
            .map_err(|err| err.into_torrent_error(operation, Some(info_hash)))
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list(&self) -> TorrentResult<Vec<TorrentRecord>> {
        let list: Option<TorrentList> = self
            .call("torrent-get", TorrentGetArgs {
                fields: TORRENT_FIELDS,
            })
            .await
            .map_err(|err| err.into_torrent_error("list", None))?;
        Ok(list
            .unwrap_or_default()
            .torrents
            .into_iter()
            .map(TorrentRecord::from)
            .collect())
    }

    async fn start(&self, info_hash: &str) -> TorrentResult<()> {
        self.call_for_hash("start", "torrent-start", info_hash).await
    }

    async fn stop(&self, info_hash: &str) -> TorrentResult<()> {
        self.call_for_hash("stop", "torrent-stop", info_hash).await
    }

    async fn move_data(&self, info_hash: &str, location: &str) -> TorrentResult<()> {
        self.call::<_, serde_json::Value>(
            "torrent-set-location",
            SetLocationArgs {
                ids: [info_hash],
                location,
                move_data: true,
            },
        )
        .await
        .map(|_| ())
        .map_err(|err| err.into_torrent_error("move_data", Some(info_hash)))
    }

    async fn verify(&self, info_hash: &str) -> TorrentResult<()> {
        self.call_for_hash("verify", "torrent-verify", info_hash).await
    }

    async fn add(&self, request: AddTorrent) -> TorrentResult<()> {
        let arguments = AddArgs {
            metainfo: STANDARD.encode(&request.metainfo),
            paused: request.paused,
            download_dir: &request.download_dir,
        };
        let added: Option<AddedTorrent> = self
            .call("torrent-add", arguments)
            .await
            .map_err(|err| err.into_torrent_error("add", None))?;
        match added.unwrap_or_default() {
            AddedTorrent {
                added: Some(torrent),
                ..
            } => info!(
                instance = %self.label,
                torrent = %torrent.name,
                info_hash = %torrent.hash_string,
                "torrent added"
            ),
            AddedTorrent {
                duplicate: Some(torrent),
                ..
            } => info!(
                instance = %self.label,
                torrent = %torrent.name,
                info_hash = %torrent.hash_string,
                "torrent already present"
            ),
            AddedTorrent { .. } => debug!(instance = %self.label, "torrent-add returned no torrent"),
        }
        Ok(())
    }

    async fn probe(&self) -> TorrentResult<()> {
        self.call::<_, serde_json::Value>("session-get", NoArgs::default())
            .await
            .map(|_| ())
            .map_err(|err| err.into_torrent_error("probe", None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use seedferry_config::Protocol;
    use seedferry_torrent_core::{TorrentError, TorrentState};
    use serde_json::json;

    const RPC_PATH: &str = "/transmission/rpc";

    fn client_for(server: &MockServer) -> anyhow::Result<TransmissionClient> {
        let instance = InstanceConfig {
            label: "local".into(),
            protocol: Protocol::Http,
            host: server.host(),
            port: server.port(),
            username: "transmission".into(),
            password: "password".into(),
        };
        Ok(TransmissionClient::new(&instance, Duration::from_secs(5))?)
    }

    #[tokio::test]
    async fn session_id_handshake_retries_once() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let accepted = server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .header(SESSION_HEADER, "session-1")
                .json_body(json!({"method": "torrent-start", "arguments": {"ids": ["abc"]}}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"result": "success", "arguments": {}}));
        });
        let conflict = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(409).header(SESSION_HEADER, "session-1");
        });

        let client = client_for(&server)?;
        client.start("abc").await?;
        conflict.assert_hits(1);
        accepted.assert_hits(1);

        client.start("abc").await?;
        conflict.assert_hits(1);
        accepted.assert_hits(2);
        Ok(())
    }

    #[tokio::test]
    async fn list_decodes_and_normalises_records() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": "success",
                    "arguments": {"torrents": [
                        {
                            "id": 1,
                            "hashString": "aaa",
                            "name": "Film",
                            "status": 0,
                            "percentDone": 0.5,
                            "errorString": "",
                            "downloadDir": "/data/movies",
                            "files": [{"name": "Film/film.mkv", "length": 42}],
                            "torrentFile": "/config/torrents/aaa.torrent"
                        },
                        {"id": 2, "hashString": "bbb", "name": "Odd", "status": 12}
                    ]}
                }));
        });

        let records = client_for(&server)?.list().await?;
        mock.assert();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state, TorrentState::Stopped);
        assert!((records[0].percent_done - 50.0).abs() < f64::EPSILON);
        assert_eq!(records[0].torrent_file_name, "aaa.torrent");
        assert_eq!(records[1].state, TorrentState::Unknown);
        Ok(())
    }

    #[tokio::test]
    async fn non_success_result_is_a_rejection() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"result": "no such torrent"}));
        });

        let err = client_for(&server)?.verify("zzz").await.err();
        assert!(matches!(
            err,
            Some(TorrentError::Rejected { operation: "verify", ref reason }) if reason == "no such torrent"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unauthorised_status_is_an_operation_failure() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(401);
        });

        let err = client_for(&server)?.stop("abc").await.err();
        assert!(matches!(
            err,
            Some(TorrentError::OperationFailed { operation: "stop", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn add_sends_base64_metainfo_paused() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH).json_body(json!({
                "method": "torrent-add",
                "arguments": {"metainfo": "ZDQ6dGVzdGU=", "paused": true, "download-dir": "/data/tv"}
            }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": "success",
                    "arguments": {"torrent-added": {"id": 3, "name": "Show", "hashString": "ccc"}}
                }));
        });

        client_for(&server)?
            .add(AddTorrent {
                metainfo: b"d4:teste".to_vec(),
                paused: true,
                download_dir: "/data/tv".into(),
            })
            .await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn move_data_requests_a_physical_move() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH).json_body(json!({
                "method": "torrent-set-location",
                "arguments": {"ids": ["abc"], "location": "/data/tv/moved", "move": true}
            }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"result": "success"}));
        });

        client_for(&server)?.move_data("abc", "/data/tv/moved").await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn probe_uses_session_get() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .json_body(json!({"method": "session-get", "arguments": {}}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"result": "success", "arguments": {"version": "4.0.5"}}));
        });

        client_for(&server)?.probe().await?;
        mock.assert();
        Ok(())
    }
}
