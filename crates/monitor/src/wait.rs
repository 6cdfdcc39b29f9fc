//! Wait engine: poll status, drain events, sleep, until terminal or deadline.
//!
//! One engine serves both single executions and execution groups. It is
//! parameterized by a `StatusProbe` (how to fetch a snapshot and when it is
//! terminal) and an `OrderTracker` (which event stream to drain).
//!
//! Each session is strictly sequential: at most one request is outstanding,
//! and the deadline is checked before every call, never by interrupting one,
//! so a timeout fires at most one round trip late. Timing out stops the
//! local loop only; the remote work is left running.

use std::time::Duration;
use tokio::time::Instant;

use crate::api::ExecutionApi;
use crate::config::WaitConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::poller::StatusProbe;
use crate::sink::EventSink;
use crate::tracker::{Drained, OrderTracker};

/// Wall-clock budget of one wait session.
struct Deadline {
    started: Instant,
    timeout: Option<Duration>,
}

impl Deadline {
    fn start(timeout: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn at(&self) -> Option<Instant> {
        self.timeout.map(|t| self.started + t)
    }

    fn expired(&self) -> bool {
        self.timeout.is_some_and(|t| self.elapsed() >= t)
    }

    /// How long to sleep before the next iteration.
    fn next_sleep(&self, interval: Duration) -> Duration {
        match self.timeout {
            Some(t) => interval.min(t.saturating_sub(self.elapsed())),
            None => interval,
        }
    }
}

pub(crate) struct WaitEngine<'a> {
    config: &'a WaitConfig,
}

impl<'a> WaitEngine<'a> {
    pub(crate) fn new(config: &'a WaitConfig) -> Self {
        Self { config }
    }

    /// Run until the probe reports a terminal snapshot or the timeout passes.
    ///
    /// On success every event below the final total has been delivered. On
    /// timeout the error carries the tracker's cursor so the caller can resume.
    pub(crate) async fn run<P, A, S>(
        &self,
        probe: &P,
        tracker: &mut OrderTracker<A>,
        sink: &mut S,
        timeout: Option<Duration>,
    ) -> MonitorResult<P::Snapshot>
    where
        P: StatusProbe,
        A: ExecutionApi,
        S: EventSink + ?Sized,
    {
        let deadline = Deadline::start(timeout);
        let target = probe.target().clone();

        tracing::debug!(
            target = %target,
            timeout_secs = timeout.map(|t| t.as_secs()),
            "Waiting for target to finish"
        );

        loop {
            let snapshot = self.poll(probe, tracker, &deadline).await?;
            if deadline.expired() {
                return Err(timed_out(tracker, &deadline));
            }
            let drained = self.drain(tracker, sink, &deadline).await?;

            if probe.is_terminal(&snapshot) {
                // Flush events produced up to and including completion.
                if drained.complete && !deadline.expired() {
                    let flushed = self.drain(tracker, sink, &deadline).await?;
                    if flushed.complete {
                        tracing::info!(
                            target = %target,
                            status = %probe.describe(&snapshot),
                            events = tracker.cursor().next_offset,
                            elapsed_ms = deadline.elapsed().as_millis() as u64,
                            "Target reached terminal state"
                        );
                        return Ok(snapshot);
                    }
                }
                return Err(timed_out(tracker, &deadline));
            }

            if deadline.expired() {
                return Err(timed_out(tracker, &deadline));
            }

            tracing::trace!(target = %target, status = %probe.describe(&snapshot), "Still running");
            tokio::time::sleep(deadline.next_sleep(self.config.poll_interval)).await;

            // The last sleep may have been clamped to land on the deadline.
            if deadline.expired() {
                return Err(timed_out(tracker, &deadline));
            }
        }
    }

    async fn poll<P, A>(
        &self,
        probe: &P,
        tracker: &OrderTracker<A>,
        deadline: &Deadline,
    ) -> MonitorResult<P::Snapshot>
    where
        P: StatusProbe,
        A: ExecutionApi,
    {
        let mut failures = 0;
        loop {
            match probe.probe().await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    self.on_failure(e, &mut failures, tracker, deadline, "status poll")
                        .await?
                }
            }
        }
    }

    async fn drain<A, S>(
        &self,
        tracker: &mut OrderTracker<A>,
        sink: &mut S,
        deadline: &Deadline,
    ) -> MonitorResult<Drained>
    where
        A: ExecutionApi,
        S: EventSink + ?Sized,
    {
        let mut failures = 0;
        loop {
            match tracker.drain_until(sink, deadline.at()).await {
                Ok(drained) => return Ok(drained),
                Err(e) => {
                    self.on_failure(e, &mut failures, tracker, deadline, "event fetch")
                        .await?
                }
            }
        }
    }

    /// Decide whether a failed call is retried.
    ///
    /// Returns `Ok(())` after sleeping one poll interval when a retry is
    /// allowed and time remains, otherwise the error to propagate.
    async fn on_failure<A: ExecutionApi>(
        &self,
        error: MonitorError,
        failures: &mut u32,
        tracker: &OrderTracker<A>,
        deadline: &Deadline,
        what: &str,
    ) -> MonitorResult<()> {
        if !error.is_transient() || !self.config.transient_errors.allows_retry(*failures) {
            return Err(error);
        }
        if deadline.expired() {
            return Err(timed_out(tracker, deadline));
        }

        *failures += 1;
        tracing::warn!(
            target = %tracker.cursor().target,
            attempt = *failures,
            error = %error,
            "{} failed, retrying",
            what
        );
        tokio::time::sleep(deadline.next_sleep(self.config.poll_interval)).await;
        if deadline.expired() {
            return Err(timed_out(tracker, deadline));
        }
        Ok(())
    }
}

fn timed_out<A: ExecutionApi>(tracker: &OrderTracker<A>, deadline: &Deadline) -> MonitorError {
    let cursor = tracker.cursor().clone();
    tracing::warn!(
        target = %cursor.target,
        next_offset = cursor.next_offset,
        elapsed_ms = deadline.elapsed().as_millis() as u64,
        "Timed out waiting; remote work continues"
    );
    MonitorError::Timeout {
        cursor,
        elapsed: deadline.elapsed(),
    }
}
