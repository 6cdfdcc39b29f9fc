//! Status snapshots for executions and execution groups.

use async_trait::async_trait;

use crate::api::ExecutionApi;
use crate::error::MonitorResult;
use crate::model::{Execution, ExecutionGroup, ExecutionStatus, Target};

/// Retrieves current status snapshots. Errors propagate untouched.
pub struct StatusPoller<A> {
    api: A,
}

impl<A: ExecutionApi> StatusPoller<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Status of an execution, or the aggregate status of a group.
    pub async fn status(&self, target: &Target) -> MonitorResult<ExecutionStatus> {
        match target {
            Target::Execution(id) => Ok(self.execution(id).await?.status),
            Target::Group(id) => Ok(self.group(id).await?.status),
        }
    }

    pub async fn execution(&self, execution_id: &str) -> MonitorResult<Execution> {
        self.api.get_execution(execution_id).await
    }

    pub async fn group(&self, group_id: &str) -> MonitorResult<ExecutionGroup> {
        self.api.get_execution_group(group_id).await
    }
}

/// Status source for the wait engine: how to fetch a snapshot and when to stop.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    type Snapshot: Send;

    fn target(&self) -> &Target;

    async fn probe(&self) -> MonitorResult<Self::Snapshot>;

    fn is_terminal(&self, snapshot: &Self::Snapshot) -> bool;

    /// Short status text for logging.
    fn describe(&self, snapshot: &Self::Snapshot) -> String;
}

/// Probe for a single execution; terminal per the execution state machine.
pub struct ExecutionProbe<A> {
    poller: StatusPoller<A>,
    target: Target,
}

impl<A: ExecutionApi> ExecutionProbe<A> {
    pub fn new(api: A, execution_id: &str) -> Self {
        Self {
            poller: StatusPoller::new(api),
            target: Target::Execution(execution_id.to_string()),
        }
    }
}

#[async_trait]
impl<A: ExecutionApi> StatusProbe for ExecutionProbe<A> {
    type Snapshot = Execution;

    fn target(&self) -> &Target {
        &self.target
    }

    async fn probe(&self) -> MonitorResult<Execution> {
        self.poller.execution(self.target.id()).await
    }

    fn is_terminal(&self, snapshot: &Execution) -> bool {
        snapshot.is_terminal()
    }

    fn describe(&self, snapshot: &Execution) -> String {
        snapshot.status.to_string()
    }
}

/// Probe for an execution group; terminal once no member is in flight.
pub struct GroupProbe<A> {
    poller: StatusPoller<A>,
    target: Target,
}

impl<A: ExecutionApi> GroupProbe<A> {
    pub fn new(api: A, group_id: &str) -> Self {
        Self {
            poller: StatusPoller::new(api),
            target: Target::Group(group_id.to_string()),
        }
    }
}

#[async_trait]
impl<A: ExecutionApi> StatusProbe for GroupProbe<A> {
    type Snapshot = ExecutionGroup;

    fn target(&self) -> &Target {
        &self.target
    }

    async fn probe(&self) -> MonitorResult<ExecutionGroup> {
        self.poller.group(self.target.id()).await
    }

    fn is_terminal(&self, snapshot: &ExecutionGroup) -> bool {
        snapshot.is_terminal()
    }

    fn describe(&self, snapshot: &ExecutionGroup) -> String {
        format!(
            "{} ({}/{} remaining)",
            snapshot.status, snapshot.remaining_count, snapshot.member_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Failure, StubApi};
    use crate::MonitorError;

    #[tokio::test]
    async fn test_status_follows_script() {
        let api = StubApi::new().with_statuses(vec![
            Ok(ExecutionStatus::Pending),
            Ok(ExecutionStatus::Started),
            Ok(ExecutionStatus::Terminated),
        ]);
        let poller = StatusPoller::new(&api);
        let target = Target::Execution(StubApi::EXECUTION_ID.into());

        assert_eq!(poller.status(&target).await.unwrap(), ExecutionStatus::Pending);
        assert_eq!(poller.status(&target).await.unwrap(), ExecutionStatus::Started);
        assert_eq!(poller.status(&target).await.unwrap(), ExecutionStatus::Terminated);
        assert_eq!(poller.status(&target).await.unwrap(), ExecutionStatus::Terminated);
    }

    #[tokio::test]
    async fn test_unauthorized_propagates() {
        let api = StubApi::new().with_statuses(vec![Err(Failure::Unauthorized)]);
        let poller = StatusPoller::new(&api);

        let result = poller.execution(StubApi::EXECUTION_ID).await;
        assert!(matches!(result, Err(MonitorError::Unauthorized(_))));
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_execution_probe_terminal_predicate() {
        let api = StubApi::new().with_statuses(vec![
            Ok(ExecutionStatus::Cancelling),
            Ok(ExecutionStatus::Cancelled),
        ]);
        let probe = ExecutionProbe::new(&api, StubApi::EXECUTION_ID);

        let first = probe.probe().await.unwrap();
        assert!(!probe.is_terminal(&first));
        let second = probe.probe().await.unwrap();
        assert!(probe.is_terminal(&second));
        assert_eq!(probe.describe(&second), "cancelled");
    }

    #[tokio::test]
    async fn test_group_probe_uses_remaining_count() {
        let api = StubApi::new().with_group_snapshots(vec![
            StubApi::group(ExecutionStatus::Failed, &[
                ExecutionStatus::Failed,
                ExecutionStatus::Started,
            ]),
        ]);
        let probe = GroupProbe::new(&api, StubApi::GROUP_ID);

        let snapshot = probe.probe().await.unwrap();
        assert_eq!(snapshot.remaining_count, 1);
        assert!(!probe.is_terminal(&snapshot));
        assert_eq!(probe.describe(&snapshot), "failed (1/2 remaining)");
    }
}
