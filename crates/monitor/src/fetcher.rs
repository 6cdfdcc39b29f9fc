//! Single-page event retrieval.

use crate::api::{EventQuery, ExecutionApi};
use crate::error::MonitorResult;
use crate::model::{Event, Target};

/// Events of one page, numbered by their position in the stream.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    /// Delivered events, log records removed unless requested.
    pub events: Vec<Event>,

    /// Records the server returned before filtering; the cursor advances by this.
    pub raw_count: u64,

    /// Total known to the server at fetch time.
    pub total: u64,
}

/// Fetches one bounded page of a target's event stream.
pub struct EventPageFetcher<A> {
    api: A,
}

impl<A: ExecutionApi> EventPageFetcher<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// One network call; never retries.
    ///
    /// Log records are dropped locally as well when `include_logs` is false,
    /// so a server that ignores the filter cannot leak them into the sink.
    pub async fn fetch(
        &self,
        target: &Target,
        offset: u64,
        size: u64,
        include_logs: bool,
    ) -> MonitorResult<EventPage> {
        let query = EventQuery {
            target: target.clone(),
            offset,
            size,
            include_logs,
        };
        let page = self.api.get_events(&query).await?;

        let raw_count = page.items.len() as u64;
        let events = page
            .items
            .into_iter()
            .zip(offset..)
            .filter_map(|(mut event, position)| {
                if event.is_log() && !include_logs {
                    return None;
                }
                event.offset = position;
                Some(event)
            })
            .collect();

        tracing::debug!(
            target = %target,
            offset,
            size,
            raw_count,
            total = page.total,
            "Fetched event page"
        );

        Ok(EventPage {
            events,
            raw_count,
            total: page.total,
        })
    }
}
