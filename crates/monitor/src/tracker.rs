//! Ordered, at-most-once draining of a target's event stream.

use tokio::time::Instant;

use crate::api::ExecutionApi;
use crate::error::{MonitorError, MonitorResult};
use crate::fetcher::EventPageFetcher;
use crate::model::{FetchCursor, Target};
use crate::sink::EventSink;

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drained {
    pub delivered: usize,
    /// False when the pass stopped at a deadline before reaching the end.
    pub complete: bool,
}

/// Owns the read cursor for one target and drains pages into a sink.
pub struct OrderTracker<A> {
    fetcher: EventPageFetcher<A>,
    cursor: FetchCursor,
    page_size: u64,
    include_logs: bool,
}

impl<A: ExecutionApi> OrderTracker<A> {
    pub fn new(api: A, target: Target, page_size: u64, include_logs: bool) -> Self {
        Self::resume(api, FetchCursor::new(target), page_size, include_logs)
    }

    /// Continue from a cursor reached by an earlier session.
    pub fn resume(api: A, cursor: FetchCursor, page_size: u64, include_logs: bool) -> Self {
        Self {
            fetcher: EventPageFetcher::new(api),
            cursor,
            page_size: page_size.max(1),
            include_logs,
        }
    }

    pub fn cursor(&self) -> &FetchCursor {
        &self.cursor
    }

    pub fn into_cursor(self) -> FetchCursor {
        self.cursor
    }

    /// Deliver everything currently available, in offset order.
    ///
    /// Stops on a short page or once the cursor reaches the reported total;
    /// never waits for more. Returns the number of events handed to the sink.
    /// The cursor moves only after a page is accepted, so a failed call can
    /// be repeated without losing or duplicating events.
    pub async fn drain<S>(&mut self, sink: &mut S) -> MonitorResult<usize>
    where
        S: EventSink + ?Sized,
    {
        Ok(self.drain_until(sink, None).await?.delivered)
    }

    /// Like `drain`, but no further page is requested once `deadline` has
    /// passed. The cursor stays valid, so a later pass picks up from there.
    pub async fn drain_until<S>(
        &mut self,
        sink: &mut S,
        deadline: Option<Instant>,
    ) -> MonitorResult<Drained>
    where
        S: EventSink + ?Sized,
    {
        let mut delivered = 0;

        let complete = loop {
            let page = self
                .fetcher
                .fetch(
                    &self.cursor.target,
                    self.cursor.next_offset,
                    self.page_size,
                    self.include_logs,
                )
                .await?;

            if !page.events.is_empty() {
                sink.accept(&page.events).map_err(MonitorError::Sink)?;
                delivered += page.events.len();
            }

            self.cursor.advance(page.raw_count);
            // A count taken before the page's items were written can trail
            // them; only an empty page can report a genuine truncation.
            let total = if page.raw_count == 0 {
                page.total
            } else {
                page.total.max(self.cursor.next_offset)
            };
            self.cursor.observe_total(total);

            if page.raw_count < self.page_size || self.cursor.is_caught_up() {
                break true;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break false;
            }
        };

        if delivered > 0 {
            tracing::debug!(
                target = %self.cursor.target,
                delivered,
                next_offset = self.cursor.next_offset,
                complete,
                "Drained events"
            );
        }

        Ok(Drained { delivered, complete })
    }
}
