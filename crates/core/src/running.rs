use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ClientId;
use crate::session::Phase;

/// Progress snapshot of an active session, as shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunningMigrationEntry {
    pub client_id: ClientId,
    pub session_id: Uuid,
    pub session_name: Option<String>,
    pub phase: Phase,
    pub processed_count: u32,
    pub total_count: u32,
    pub current_object: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunningMigrationEntry {
    #[must_use]
    pub fn new(client_id: ClientId, session_id: Uuid, session_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            client_id,
            session_id,
            session_name,
            phase: Phase::Pending,
            processed_count: 0,
            total_count: 0,
            current_object: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Next snapshot with the given progress. `started_at` and identity carry over.
    #[must_use]
    pub fn with_progress(
        &self,
        phase: Phase,
        processed_count: u32,
        total_count: u32,
        current_object: Option<String>,
    ) -> Self {
        Self {
            phase,
            processed_count,
            total_count,
            current_object,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
