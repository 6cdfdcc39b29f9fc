//! Transient snapshots of remote execution state.
//!
//! Nothing here is authoritative: every value is refreshed from the manager
//! on each poll and dropped when the session ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a wait session observes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
    Execution(String),
    Group(String),
}

impl Target {
    pub fn id(&self) -> &str {
        match self {
            Target::Execution(id) | Target::Group(id) => id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Execution(id) => write!(f, "execution {}", id),
            Target::Group(id) => write!(f, "execution group {}", id),
        }
    }
}

/// Execution status as reported by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Queued,
    Scheduled,
    Started,
    Cancelling,
    ForceCancelling,
    KillCancelling,
    Terminated,
    Failed,
    Cancelled,
    /// A status this client does not know about; never terminal.
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    /// Statuses from which no further transition occurs.
    pub const TERMINAL: [ExecutionStatus; 3] = [
        ExecutionStatus::Terminated,
        ExecutionStatus::Failed,
        ExecutionStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// Only a clean finish counts; failed and cancelled runs do not.
    pub fn is_success(self) -> bool {
        self == ExecutionStatus::Terminated
    }

    /// Transient states entered only after an explicit cancel request.
    pub fn is_cancelling(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Cancelling
                | ExecutionStatus::ForceCancelling
                | ExecutionStatus::KillCancelling
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Scheduled => "scheduled",
            ExecutionStatus::Started => "started",
            ExecutionStatus::Cancelling => "cancelling",
            ExecutionStatus::ForceCancelling => "force_cancelling",
            ExecutionStatus::KillCancelling => "kill_cancelling",
            ExecutionStatus::Terminated => "terminated",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of a workflow against a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,

    #[serde(default)]
    pub workflow_id: String,

    #[serde(default)]
    pub deployment_id: Option<String>,

    pub status: ExecutionStatus,

    /// Error reported by the manager; empty strings are normalized to `None`.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Member of an execution group, as listed in the group snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    pub status: ExecutionStatus,
}

/// Aggregate view of a set of executions managed as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionGroup {
    pub id: String,

    pub status: ExecutionStatus,

    #[serde(default)]
    pub member_count: u64,

    /// Members still pending, queued or running. Required: it decides termination.
    pub remaining_count: u64,

    #[serde(default)]
    pub members: Vec<GroupMember>,
}

impl ExecutionGroup {
    /// A group is done once no member is in flight, whatever the members' outcomes.
    pub fn is_terminal(&self) -> bool {
        self.remaining_count == 0
    }
}

/// Final result of waiting on a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub group: ExecutionGroup,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl GroupOutcome {
    pub fn from_snapshot(group: ExecutionGroup) -> Self {
        let count = |status: ExecutionStatus| {
            group.members.iter().filter(|m| m.status == status).count()
        };
        let succeeded = count(ExecutionStatus::Terminated);
        let failed = count(ExecutionStatus::Failed);
        let cancelled = count(ExecutionStatus::Cancelled);
        Self {
            group,
            succeeded,
            failed,
            cancelled,
        }
    }

    /// Every member finished cleanly, by the same rule as a single execution.
    pub fn is_success(&self) -> bool {
        self.group.members.iter().all(|m| m.status.is_success())
    }

    pub fn summary(&self) -> String {
        format!(
            "Execution group {} finished with status {}: {} succeeded, {} failed, {} cancelled (of {})",
            self.group.id,
            self.group.status,
            self.succeeded,
            self.failed,
            self.cancelled,
            self.group.member_count
        )
    }
}

/// Structured event or free-text log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "cloudify_event")]
    Event,
    #[serde(rename = "cloudify_log")]
    Log,
}

/// One record of an execution's append-only event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the target's stream, assigned from the read cursor.
    #[serde(skip_deserializing, default)]
    pub offset: u64,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(rename = "type")]
    pub kind: EventKind,

    #[serde(default)]
    pub event_type: Option<String>,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub deployment_id: Option<String>,

    #[serde(default, alias = "node_instance_id")]
    pub node_id: Option<String>,

    #[serde(default)]
    pub operation: Option<String>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub execution_id: Option<String>,
}

impl Event {
    pub fn is_log(&self) -> bool {
        self.kind == EventKind::Log
    }
}

/// Read position within a target's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCursor {
    pub target: Target,
    pub next_offset: u64,
    pub last_known_total: Option<u64>,
}

impl FetchCursor {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            next_offset: 0,
            last_known_total: None,
        }
    }

    /// Record the total reported by the latest page.
    ///
    /// A total smaller than the read position means the server truncated the
    /// stream; the cursor is clamped down so it never reads past the end.
    pub fn observe_total(&mut self, total: u64) {
        if total < self.next_offset {
            self.next_offset = total;
        }
        self.last_known_total = Some(total);
    }

    pub fn advance(&mut self, count: u64) {
        self.next_offset += count;
    }

    /// True once everything the server last reported has been read.
    pub fn is_caught_up(&self) -> bool {
        self.last_known_total
            .is_some_and(|total| self.next_offset >= total)
    }
}
