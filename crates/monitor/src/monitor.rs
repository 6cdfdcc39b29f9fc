//! Entry points used by command handlers.

use std::time::Duration;

use crate::api::ExecutionApi;
use crate::config::WaitConfig;
use crate::error::MonitorResult;
use crate::fetcher::EventPageFetcher;
use crate::model::{Execution, FetchCursor, GroupOutcome, Target};
use crate::poller::{ExecutionProbe, GroupProbe};
use crate::sink::EventSink;
use crate::tracker::OrderTracker;
use crate::wait::WaitEngine;

/// Execution monitor bound to one API handle for the whole session.
pub struct Monitor<A> {
    api: A,
    config: WaitConfig,
}

impl<A: ExecutionApi> Monitor<A> {
    pub fn new(api: A, config: WaitConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Block until the execution is terminal, forwarding its events.
    ///
    /// `timeout = None` waits forever. A `FAILED` execution is returned
    /// normally; inspect its status and error.
    pub async fn wait_for_execution<S>(
        &self,
        execution_id: &str,
        sink: &mut S,
        include_logs: bool,
        timeout: Option<Duration>,
    ) -> MonitorResult<Execution>
    where
        S: EventSink + ?Sized,
    {
        let cursor = FetchCursor::new(Target::Execution(execution_id.to_string()));
        self.resume_execution(cursor, sink, include_logs, timeout)
            .await
    }

    /// Continue waiting from a cursor, typically one carried by a timeout.
    pub async fn resume_execution<S>(
        &self,
        cursor: FetchCursor,
        sink: &mut S,
        include_logs: bool,
        timeout: Option<Duration>,
    ) -> MonitorResult<Execution>
    where
        S: EventSink + ?Sized,
    {
        let probe = ExecutionProbe::new(&self.api, cursor.target.id());
        let mut tracker =
            OrderTracker::resume(&self.api, cursor, self.config.page_size, include_logs);

        WaitEngine::new(&self.config)
            .run(&probe, &mut tracker, sink, timeout)
            .await
    }

    /// Block until no member of the group is in flight.
    ///
    /// Member failures do not stop the wait. Events come from the group's
    /// single combined stream.
    pub async fn wait_for_execution_group<S>(
        &self,
        group_id: &str,
        sink: &mut S,
        include_logs: bool,
        timeout: Option<Duration>,
    ) -> MonitorResult<GroupOutcome>
    where
        S: EventSink + ?Sized,
    {
        let probe = GroupProbe::new(&self.api, group_id);
        let mut tracker = OrderTracker::new(
            &self.api,
            Target::Group(group_id.to_string()),
            self.config.page_size,
            include_logs,
        );

        let group = WaitEngine::new(&self.config)
            .run(&probe, &mut tracker, sink, timeout)
            .await?;
        Ok(GroupOutcome::from_snapshot(group))
    }

    /// Deliver what is available right now, without waiting for more.
    ///
    /// The events endpoint answers an unknown id with an empty list, so the
    /// execution is looked up first to surface `NotFound`.
    pub async fn drain_events_once<S>(
        &self,
        execution_id: &str,
        sink: &mut S,
        include_logs: bool,
    ) -> MonitorResult<usize>
    where
        S: EventSink + ?Sized,
    {
        self.api.get_execution(execution_id).await?;
        let mut tracker = OrderTracker::new(
            &self.api,
            Target::Execution(execution_id.to_string()),
            self.config.page_size,
            include_logs,
        );
        tracker.drain(sink).await
    }

    /// Deliver exactly one page at an explicit position.
    ///
    /// Returns how many events were shown and the server's total, for a
    /// "showing N of M" summary.
    pub async fn list_events_page<S>(
        &self,
        execution_id: &str,
        offset: u64,
        size: u64,
        include_logs: bool,
        sink: &mut S,
    ) -> MonitorResult<(usize, u64)>
    where
        S: EventSink + ?Sized,
    {
        self.api.get_execution(execution_id).await?;
        let fetcher = EventPageFetcher::new(&self.api);
        let target = Target::Execution(execution_id.to_string());
        let page = fetcher.fetch(&target, offset, size, include_logs).await?;

        if !page.events.is_empty() {
            sink.accept(&page.events)
                .map_err(crate::error::MonitorError::Sink)?;
        }
        Ok((page.events.len(), page.total))
    }
}
