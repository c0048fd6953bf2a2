pub mod utils;

pub mod backend;
pub mod capture;
pub mod config;
pub mod db;
pub mod dom;
pub mod identity;
pub mod layout;
pub mod locator;
pub mod models;
pub mod repository;
pub mod review;
pub mod settings;
pub mod widget;

pub use backend::{BackendClient, BackendError, SpikeQuery};
pub use capture::{CaptureMachine, CaptureMode, SaveOutcome};
pub use config::WidgetConfig;
pub use db::{Database, QueuedSpike};
pub use identity::IdentityStore;
pub use models::{ElementLocator, Rating, Reviewer, ReviewerIdentity, Spike, SpikeKind};
pub use repository::{HttpTransport, PushReport, SpikeRepository, SpikeTransport};
pub use review::ReviewOverlay;
pub use settings::SettingsStore;
pub use widget::Widget;
