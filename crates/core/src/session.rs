//! Session snapshots and chat responses produced by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::ThreadId;

/// Immutable snapshot of a session's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub thread_id: ThreadId,
    pub start_time: DateTime<Utc>,
    pub message_count: u64,
}

/// One successful exchange with the remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The reply text
    pub message: String,
    pub thread_id: ThreadId,
    pub timestamp: DateTime<Utc>,
}
