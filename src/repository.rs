//! Client-side spike repository: the local queue is the durable record,
//! the network copy is advisory. One send attempt per spike on enqueue;
//! [`SpikeRepository::push_pending`] is the explicit redelivery pass.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::backend::{http_client, post_spike, BackendClient};
use crate::db::{Database, QueuedSpike};
use crate::models::Spike;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Network leg of [`SpikeRepository::enqueue`].
#[async_trait]
pub trait SpikeTransport: Send + Sync {
    /// Deliver one spike; returns the id the backend acknowledged, if any.
    async fn send(&self, spike: &Spike) -> Result<Option<String>>;
}

/// POSTs the wire record to a submission URL.
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SpikeTransport for HttpTransport {
    async fn send(&self, spike: &Spike) -> Result<Option<String>> {
        let receipt = post_spike(&self.client, &self.url, spike)
            .await
            .with_context(|| format!("failed to submit spike to {}", self.url))?;
        Ok(receipt.id)
    }
}

#[async_trait]
impl SpikeTransport for BackendClient {
    async fn send(&self, spike: &Spike) -> Result<Option<String>> {
        let receipt = self
            .submit_spike(spike)
            .await
            .with_context(|| format!("failed to push spike {} to {}", spike.id, self.endpoint()))?;
        Ok(receipt.id)
    }
}

/// Outcome of one [`SpikeRepository::push_pending`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub pending: usize,
    pub delivered: usize,
    /// Ids that stayed undelivered.
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct SpikeRepository {
    db: Database,
    transport: Option<Arc<dyn SpikeTransport>>,
}

impl SpikeRepository {
    pub fn new(db: Database, transport: Option<Arc<dyn SpikeTransport>>) -> Self {
        Self { db, transport }
    }

    /// Queue locally, then try the network once. Only a failed local insert
    /// is reported; a failed send is logged and swallowed.
    pub async fn enqueue(&self, spike: &Spike) -> Result<QueuedSpike> {
        let mut queued = self
            .db
            .insert_spike(spike)
            .await
            .context("failed to queue spike locally")?;

        log_info!(
            "Queued {} spike {} for project {}",
            spike.kind.as_str(),
            spike.id,
            spike.project_key
        );

        let Some(transport) = &self.transport else {
            return Ok(queued);
        };

        match transport.send(spike).await {
            Ok(remote_id) => {
                let delivered_at = Utc::now();
                if let Err(err) = self
                    .db
                    .record_delivery(&spike.id, remote_id.clone(), delivered_at)
                    .await
                {
                    log_warn!("Spike {} sent but delivery not recorded: {err:#}", spike.id);
                }
                queued.delivered_at = Some(delivered_at);
                queued.remote_id = remote_id;
            }
            Err(err) => {
                log_warn!("Spike {} kept in local queue only: {err:#}", spike.id);
            }
        }

        Ok(queued)
    }

    /// Send every undelivered spike, oldest first, and record each one the
    /// backend accepts. Failures are counted and the pass carries on.
    pub async fn push_pending(&self, project: Option<&str>) -> Result<PushReport> {
        let Some(transport) = &self.transport else {
            bail!("no remote endpoint configured");
        };

        let pending = self.db.list_pending_spikes(project).await?;
        let mut report = PushReport {
            pending: pending.len(),
            ..PushReport::default()
        };

        for queued in pending {
            let spike = queued.spike;
            match transport.send(&spike).await {
                Ok(remote_id) => {
                    self.db
                        .record_delivery(&spike.id, remote_id, Utc::now())
                        .await?;
                    report.delivered += 1;
                }
                Err(err) => {
                    log_warn!("Spike {} still pending: {err:#}", spike.id);
                    report.failed.push(spike.id);
                }
            }
        }

        log_info!(
            "Pushed {} of {} pending spikes",
            report.delivered,
            report.pending
        );
        Ok(report)
    }

    /// Spikes queued for `project`, oldest first.
    pub async fn list(&self, project: &str) -> Result<Vec<Spike>> {
        let queued = self.db.list_spikes(Some(project)).await?;
        Ok(queued.into_iter().map(|entry| entry.spike).collect())
    }

    pub async fn get(&self, id_or_prefix: &str) -> Result<Option<QueuedSpike>> {
        self.db.find_spike(id_or_prefix).await
    }

    pub async fn count(&self, project: &str) -> Result<u64> {
        self.db.count_spikes(Some(project)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::models::fixtures::page_spike;
    use crate::models::Rating;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpikeTransport for RecordingTransport {
        async fn send(&self, spike: &Spike) -> Result<Option<String>> {
            self.sent.lock().unwrap().push(spike.id.clone());
            Ok(Some(format!("remote-{}", spike.id)))
        }
    }

    struct OfflineTransport;

    #[async_trait]
    impl SpikeTransport for OfflineTransport {
        async fn send(&self, _spike: &Spike) -> Result<Option<String>> {
            bail!("network unreachable")
        }
    }

    fn open(transport: Option<Arc<dyn SpikeTransport>>) -> (tempfile::TempDir, SpikeRepository) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("spikes.db")).unwrap();
        (dir, SpikeRepository::new(db, transport))
    }

    #[tokio::test]
    async fn enqueue_persists_then_sends_once() {
        let transport = Arc::new(RecordingTransport::default());
        let (_dir, repo) = open(Some(transport.clone()));

        let queued = repo
            .enqueue(&page_spike("a1", "acme", "Dana", Some(Rating::Like)))
            .await
            .unwrap();
        assert!(queued.is_delivered());
        assert_eq!(queued.remote_id.as_deref(), Some("remote-a1"));
        assert_eq!(*transport.sent.lock().unwrap(), vec!["a1".to_string()]);

        let stored = repo.get("a1").await.unwrap().unwrap();
        assert!(stored.is_delivered());
    }

    #[tokio::test]
    async fn network_failure_is_swallowed() {
        let (_dir, repo) = open(Some(Arc::new(OfflineTransport)));

        let queued = repo
            .enqueue(&page_spike("a1", "acme", "Dana", None))
            .await
            .unwrap();
        assert!(!queued.is_delivered());
        assert_eq!(repo.count("acme").await.unwrap(), 1);
        assert_eq!(repo.list("acme").await.unwrap()[0].id, "a1");
    }

    #[tokio::test]
    async fn local_failure_is_reported() {
        let transport = Arc::new(RecordingTransport::default());
        let (_dir, repo) = open(Some(transport.clone()));
        let spike = page_spike("a1", "acme", "Dana", None);
        repo.enqueue(&spike).await.unwrap();

        assert!(repo.enqueue(&spike).await.is_err());
        // The duplicate never reached the network.
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn http_transport_reports_quota_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spikes"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": "Spike limit reached for this share",
                "code": "SPIKE_LIMIT"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let transport = HttpTransport::new(format!("{}/spikes", server.uri())).unwrap();
        let (_dir, repo) = open(Some(Arc::new(transport)));

        let queued = repo
            .enqueue(&page_spike("a1", "acme", "Dana", None))
            .await
            .unwrap();
        assert!(!queued.is_delivered());
        assert_eq!(repo.count("acme").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn push_delivers_only_pending_spikes() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("spikes.db")).unwrap();
        let offline = SpikeRepository::new(db.clone(), Some(Arc::new(OfflineTransport)));
        offline
            .enqueue(&page_spike("a1", "acme", "Dana", None))
            .await
            .unwrap();
        offline
            .enqueue(&page_spike("a2", "acme", "Lee", None))
            .await
            .unwrap();
        db.record_delivery("a1", None, Utc::now()).await.unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let online = SpikeRepository::new(db, Some(transport.clone()));
        let report = online.push_pending(Some("acme")).await.unwrap();

        assert_eq!(report.pending, 1);
        assert_eq!(report.delivered, 1);
        assert!(report.failed.is_empty());
        assert_eq!(*transport.sent.lock().unwrap(), vec!["a2".to_string()]);
        let pushed = online.get("a2").await.unwrap().unwrap();
        assert_eq!(pushed.remote_id.as_deref(), Some("remote-a2"));

        let again = online.push_pending(Some("acme")).await.unwrap();
        assert_eq!(again, PushReport::default());
    }

    #[tokio::test]
    async fn push_keeps_rejected_spikes_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spikes"))
            .and(query_param("token", "t0k"))
            .and(body_partial_json(json!({ "id": "ok1" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true, "id": "r-ok1" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/spikes"))
            .and(body_partial_json(json!({ "id": "bad2" })))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "Invalid JSON" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Some("t0k".into())).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("spikes.db")).unwrap();
        let queue = SpikeRepository::new(db.clone(), None);
        queue.enqueue(&page_spike("ok1", "acme", "Dana", None)).await.unwrap();
        queue.enqueue(&page_spike("bad2", "acme", "Dana", None)).await.unwrap();

        let pusher = SpikeRepository::new(db, Some(Arc::new(client)));
        let report = pusher.push_pending(None).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["bad2".to_string()]);
        assert_eq!(
            pusher.get("ok1").await.unwrap().unwrap().remote_id.as_deref(),
            Some("r-ok1")
        );
        assert!(!pusher.get("bad2").await.unwrap().unwrap().is_delivered());

        assert!(queue.push_pending(None).await.is_err());
    }
}
