//! The mounted widget: one capture machine, the local reviewer identity and
//! the spike repository, plus review mode when the page asks for it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::backend::{BackendClient, SpikeQuery};
use crate::capture::{CaptureMachine, SaveOutcome};
use crate::config::WidgetConfig;
use crate::db::{Database, QueuedSpike};
use crate::dom::{Document, DomEvent, EventResponse};
use crate::identity::IdentityStore;
use crate::models::{ReviewerIdentity, Spike};
use crate::repository::{HttpTransport, SpikeRepository, SpikeTransport};
use crate::review::ReviewOverlay;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

pub const IDENTITY_FILE: &str = "reviewer.json";
pub const QUEUE_FILE: &str = "spikes.db";

pub struct Widget {
    machine: CaptureMachine,
    identity: IdentityStore,
    repository: SpikeRepository,
    review: Option<ReviewOverlay>,
}

impl Widget {
    /// Mount with stores under `dir`; spikes are sent to the configured
    /// submission URL when there is one.
    pub fn open(doc: &mut Document, config: WidgetConfig, dir: &Path) -> Result<Self> {
        let identity = IdentityStore::new(dir.join(IDENTITY_FILE))?;
        let db = Database::new(dir.join(QUEUE_FILE))
            .with_context(|| format!("failed to open spike queue in {}", dir.display()))?;

        let transport = match config.submission_url(doc) {
            Some(url) => {
                log_info!("Submitting spikes to {}", url);
                Some(Arc::new(HttpTransport::new(url)?) as Arc<dyn SpikeTransport>)
            }
            None => {
                log_info!("No submission endpoint; spikes stay in the local queue");
                None
            }
        };

        Self::mount(doc, config, identity, SpikeRepository::new(db, transport))
    }

    pub fn mount(
        doc: &mut Document,
        config: WidgetConfig,
        identity: IdentityStore,
        repository: SpikeRepository,
    ) -> Result<Self> {
        let preset = config.preset_reviewer.clone();
        let mut machine = CaptureMachine::mount(doc, config)?;

        let reviewer = match preset {
            Some(name) => Some(identity.ensure(&name)?),
            None => identity.get(),
        };
        machine.set_reviewer(doc, reviewer);

        let review = if ReviewOverlay::requested(doc) {
            Some(ReviewOverlay::mount(doc)?)
        } else {
            None
        };

        log_debug!("Widget mounted for project {}", machine.config().project);
        Ok(Self {
            machine,
            identity,
            repository,
            review,
        })
    }

    pub fn config(&self) -> &WidgetConfig {
        self.machine.config()
    }

    pub fn machine(&self) -> &CaptureMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut CaptureMachine {
        &mut self.machine
    }

    pub fn repository(&self) -> &SpikeRepository {
        &self.repository
    }

    pub fn review(&self) -> Option<&ReviewOverlay> {
        self.review.as_ref()
    }

    pub fn review_mut(&mut self) -> Option<&mut ReviewOverlay> {
        self.review.as_mut()
    }

    /// Review mode sees events first; a handled marker click never reaches
    /// the capture machine.
    pub fn handle_event(&mut self, doc: &mut Document, event: &DomEvent) -> Result<EventResponse> {
        if let Some(review) = self.review.as_mut() {
            let response = review.handle_event(doc, event)?;
            if response.stop_propagation {
                return Ok(response);
            }
        }
        self.machine.handle_event(doc, event)
    }

    /// Save the open form. `None` while the form waits for a reviewer name.
    pub async fn save(&mut self, doc: &mut Document) -> Result<Option<QueuedSpike>> {
        match self.machine.save(doc)? {
            SaveOutcome::Saved(spike) => self.repository.enqueue(&spike).await.map(Some),
            SaveOutcome::AwaitingIdentity => Ok(None),
        }
    }

    /// Name entered in the inline prompt: create the identity and finish a
    /// save that was waiting for it.
    pub async fn submit_name(&mut self, doc: &mut Document, name: &str) -> Result<Option<QueuedSpike>> {
        let identity = self.identity.create(name)?;
        match self.machine.identity_created(doc, identity)? {
            Some(spike) => self.repository.enqueue(&spike).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch this project's spikes and draw them. No-op outside review mode.
    pub async fn load_review(&mut self, doc: &mut Document, backend: &BackendClient) -> Result<()> {
        let Some(review) = self.review.as_mut() else {
            return Ok(());
        };
        let query = SpikeQuery::for_project(self.machine.config().project.clone());
        let spikes = backend
            .list_spikes(&query)
            .await
            .context("failed to load spikes for review")?;
        review.load(doc, spikes)
    }

    /// Spikes queued locally for this project.
    pub async fn spikes(&self) -> Result<Vec<Spike>> {
        self.repository.list(&self.machine.config().project).await
    }

    pub fn reviewer(&self) -> Option<ReviewerIdentity> {
        self.identity.get()
    }

    pub fn set_reviewer_name(&mut self, doc: &mut Document, name: &str) -> Result<ReviewerIdentity> {
        let identity = self.identity.rename(name)?;
        self.machine.set_reviewer(doc, Some(identity.clone()));
        Ok(identity)
    }

    /// Name entered in the rename dialog opened from the reviewer indicator.
    pub fn submit_rename(&mut self, doc: &mut Document, name: &str) -> Result<ReviewerIdentity> {
        let identity = self.set_reviewer_name(doc, name)?;
        self.machine.close_rename(doc);
        Ok(identity)
    }

    pub fn clear_reviewer(&mut self, doc: &mut Document) -> Result<()> {
        self.identity.clear()?;
        self.machine.set_reviewer(doc, None);
        Ok(())
    }
}
