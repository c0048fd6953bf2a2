use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Spike;

/// A spike as held in the local queue, with the queue's own bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSpike {
    pub spike: Spike,
    pub queued_at: DateTime<Utc>,
    /// Set once the backend acknowledged the single send attempt.
    pub delivered_at: Option<DateTime<Utc>>,
    pub remote_id: Option<String>,
}

impl QueuedSpike {
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}
