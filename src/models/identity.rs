use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Reviewer;

/// The local reviewer. Created once per profile; only the name changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerIdentity {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewerIdentity {
    pub fn as_reviewer(&self) -> Reviewer {
        Reviewer {
            id: self.id.clone(),
            name: self.name.clone(),
            email: None,
        }
    }
}
