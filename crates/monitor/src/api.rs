//! Upstream seam: the manager operations the monitor consumes.

use async_trait::async_trait;

use crate::error::MonitorResult;
use crate::model::{Event, Execution, ExecutionGroup, Target};

/// One page request against a target's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub target: Target,
    pub offset: u64,
    pub size: u64,
    pub include_logs: bool,
}

/// One page of events plus the server's total at fetch time.
#[derive(Debug, Clone, Default)]
pub struct EventsPage {
    pub items: Vec<Event>,
    pub total: u64,
}

/// Read-only view of the remote execution API.
///
/// Each method performs exactly one request and never retries.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Current snapshot of a single execution.
    async fn get_execution(&self, execution_id: &str) -> MonitorResult<Execution>;

    /// One page of a target's event stream.
    async fn get_events(&self, query: &EventQuery) -> MonitorResult<EventsPage>;

    /// Current aggregate snapshot of an execution group.
    async fn get_execution_group(&self, group_id: &str) -> MonitorResult<ExecutionGroup>;
}

#[async_trait]
impl<T: ExecutionApi + ?Sized> ExecutionApi for &T {
    async fn get_execution(&self, execution_id: &str) -> MonitorResult<Execution> {
        (**self).get_execution(execution_id).await
    }

    async fn get_events(&self, query: &EventQuery) -> MonitorResult<EventsPage> {
        (**self).get_events(query).await
    }

    async fn get_execution_group(&self, group_id: &str) -> MonitorResult<ExecutionGroup> {
        (**self).get_execution_group(group_id).await
    }
}
