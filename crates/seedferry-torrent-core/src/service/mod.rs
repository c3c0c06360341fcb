//! Capability trait implemented by torrent client adapters.

use async_trait::async_trait;

use crate::error::{TorrentError, TorrentResult};
use crate::model::{AddTorrent, TorrentRecord};

/// Remote-control surface of one torrent client instance.
///
/// Every mutating call addresses a torrent by its info hash. Failures are reported per
/// call and are expected to be logged by the caller rather than aborting a cycle.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Instance label used in log output (for example `local` or `remote`).
    fn label(&self) -> &str;

    /// Snapshot every torrent known to the instance.
    async fn list(&self) -> TorrentResult<Vec<TorrentRecord>>;

    /// Start (resume) a torrent.
    async fn start(&self, info_hash: &str) -> TorrentResult<()>;

    /// Stop (pause) a torrent.
    async fn stop(&self, info_hash: &str) -> TorrentResult<()>;

    /// Point a torrent at a new data location.
    async fn move_data(&self, info_hash: &str, location: &str) -> TorrentResult<()>;

    /// Re-verify on-disk data against the piece hashes.
    async fn verify(&self, info_hash: &str) -> TorrentResult<()>;

    /// Register a `.torrent` metadata file.
    async fn add(&self, request: AddTorrent) -> TorrentResult<()>;

    /// Stop then start a torrent to clear transient client errors.
    async fn restart(&self, info_hash: &str) -> TorrentResult<()> {
        self.stop(info_hash).await?;
        self.start(info_hash).await
    }

    /// Check connectivity; the default implementation lists torrents.
    async fn probe(&self) -> TorrentResult<()> {
        self.list().await.map(|_| ())
    }
}

/// Client that rejects every call; stands in for an instance that was never configured.
#[derive(Debug, Clone)]
pub struct UnavailableClient {
    label: String,
}

impl UnavailableClient {
    /// Build a placeholder for the named instance.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl TorrentClient for UnavailableClient {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list(&self) -> TorrentResult<Vec<TorrentRecord>> {
        Err(TorrentError::Unsupported { operation: "list" })
    }

    async fn start(&self, _info_hash: &str) -> TorrentResult<()> {
        Err(TorrentError::Unsupported { operation: "start" })
    }

    async fn stop(&self, _info_hash: &str) -> TorrentResult<()> {
        Err(TorrentError::Unsupported { operation: "stop" })
    }

    async fn move_data(&self, _info_hash: &str, _location: &str) -> TorrentResult<()> {
        Err(TorrentError::Unsupported {
            operation: "move_data",
        })
    }

    async fn verify(&self, _info_hash: &str) -> TorrentResult<()> {
        Err(TorrentError::Unsupported { operation: "verify" })
    }

    async fn add(&self, _request: AddTorrent) -> TorrentResult<()> {
        Err(TorrentError::Unsupported { operation: "add" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubClient {
        calls: Mutex<Vec<String>>,
        fail_stop: bool,
    }

    impl StubClient {
        fn record(&self, call: String) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl TorrentClient for StubClient {
        fn label(&self) -> &str {
            "stub"
        }

        async fn list(&self) -> TorrentResult<Vec<TorrentRecord>> {
            self.record("list".into());
            Ok(Vec::new())
        }

        async fn start(&self, info_hash: &str) -> TorrentResult<()> {
            self.record(format!("start:{info_hash}"));
            Ok(())
        }

        async fn stop(&self, info_hash: &str) -> TorrentResult<()> {
            self.record(format!("stop:{info_hash}"));
            if self.fail_stop {
                return Err(TorrentError::Rejected {
                    operation: "stop",
                    reason: "busy".into(),
                });
            }
            Ok(())
        }

        async fn move_data(&self, info_hash: &str, location: &str) -> TorrentResult<()> {
            self.record(format!("move:{info_hash}:{location}"));
            Ok(())
        }

        async fn verify(&self, info_hash: &str) -> TorrentResult<()> {
            self.record(format!("verify:{info_hash}"));
            Ok(())
        }

        async fn add(&self, request: AddTorrent) -> TorrentResult<()> {
            self.record(format!("add:{}", request.download_dir));
            Ok(())
        }
    }

    #[tokio::test]
    async fn restart_stops_then_starts() -> anyhow::Result<()> {
        let client = StubClient::default();
        client.restart("abc").await?;
        assert_eq!(client.calls(), vec!["stop:abc", "start:abc"]);
        Ok(())
    }

    #[tokio::test]
    async fn restart_skips_start_when_stop_fails() {
        let client = StubClient {
            fail_stop: true,
            ..StubClient::default()
        };
        assert!(client.restart("abc").await.is_err());
        assert_eq!(client.calls(), vec!["stop:abc"]);
    }

    #[tokio::test]
    async fn probe_defaults_to_listing() -> anyhow::Result<()> {
        let client = StubClient::default();
        client.probe().await?;
        assert_eq!(client.calls(), vec!["list"]);
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_client_rejects_everything() {
        let client = UnavailableClient::new("remote");
        assert_eq!(client.label(), "remote");
        assert!(client.list().await.is_err());
        assert!(client.start("abc").await.is_err());
        assert!(client.probe().await.is_err());
        let err = client
            .add(AddTorrent {
                metainfo: Vec::new(),
                paused: true,
                download_dir: "/data".into(),
            })
            .await
            .err();
        assert!(matches!(err, Some(TorrentError::Unsupported { operation: "add" })));
    }
}
