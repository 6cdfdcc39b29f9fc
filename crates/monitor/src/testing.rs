//! Scripted in-memory manager for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{EventQuery, EventsPage, ExecutionApi};
use crate::error::{MonitorError, MonitorResult};
use crate::model::{Event, EventKind, Execution, ExecutionGroup, ExecutionStatus, GroupMember};

/// Failure a scripted call should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    NotFound,
    Unauthorized,
    Transport,
}

impl Failure {
    fn into_error(self, what: &str) -> MonitorError {
        match self {
            Failure::NotFound => MonitorError::NotFound(what.to_string()),
            Failure::Unauthorized => MonitorError::Unauthorized(what.to_string()),
            Failure::Transport => MonitorError::Transport(format!("{}: connection reset", what)),
        }
    }
}

pub(crate) struct StubApi {
    statuses: Mutex<VecDeque<Result<ExecutionStatus, Failure>>>,
    last_status: Mutex<ExecutionStatus>,
    /// Events appended to the stream on each status poll.
    growth: Mutex<VecDeque<usize>>,
    events: Mutex<Vec<Event>>,
    is_log: fn(u64) -> bool,
    event_failures: Mutex<VecDeque<Failure>>,
    /// Totals reported by successive event pages instead of the real length.
    reported_totals: Mutex<VecDeque<u64>>,
    groups: Mutex<VecDeque<ExecutionGroup>>,
    last_group: Mutex<Option<ExecutionGroup>>,
    latency: Duration,
    status_calls: AtomicUsize,
    event_calls: AtomicUsize,
    group_calls: AtomicUsize,
}

impl StubApi {
    pub const EXECUTION_ID: &'static str = "exec-1";
    pub const GROUP_ID: &'static str = "group-1";

    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(ExecutionStatus::Started),
            growth: Mutex::new(VecDeque::new()),
            events: Mutex::new(Vec::new()),
            is_log: |_| false,
            event_failures: Mutex::new(VecDeque::new()),
            reported_totals: Mutex::new(VecDeque::new()),
            groups: Mutex::new(VecDeque::new()),
            last_group: Mutex::new(None),
            latency: Duration::ZERO,
            status_calls: AtomicUsize::new(0),
            event_calls: AtomicUsize::new(0),
            group_calls: AtomicUsize::new(0),
        }
    }

    /// Statuses returned by successive polls; the last success repeats.
    pub fn with_statuses(self, statuses: Vec<Result<ExecutionStatus, Failure>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    /// Pre-populate the stream; `is_log` decides which offsets are log records.
    pub fn with_events(mut self, count: usize, is_log: fn(u64) -> bool) -> Self {
        self.is_log = is_log;
        self.append_events(count);
        self
    }

    /// Events appended on the 1st, 2nd, ... status poll.
    pub fn with_growth(self, per_poll: Vec<usize>) -> Self {
        *self.growth.lock().unwrap() = per_poll.into();
        self
    }

    /// Group snapshots returned by successive polls; the last one repeats.
    pub fn with_group_snapshots(self, snapshots: Vec<ExecutionGroup>) -> Self {
        *self.groups.lock().unwrap() = snapshots.into();
        self
    }

    /// Simulated round trip applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn group(status: ExecutionStatus, members: &[ExecutionStatus]) -> ExecutionGroup {
        let members: Vec<GroupMember> = members
            .iter()
            .enumerate()
            .map(|(i, status)| GroupMember {
                id: format!("member-{}", i),
                status: *status,
            })
            .collect();
        ExecutionGroup {
            id: Self::GROUP_ID.to_string(),
            status,
            member_count: members.len() as u64,
            remaining_count: members.iter().filter(|m| !m.status.is_terminal()).count() as u64,
            members,
        }
    }

    pub fn append_events(&self, count: usize) {
        let mut events = self.events.lock().unwrap();
        let start = events.len() as u64;
        for position in start..start + count as u64 {
            let kind = if (self.is_log)(position) {
                EventKind::Log
            } else {
                EventKind::Event
            };
            events.push(Event {
                offset: 0,
                timestamp: None,
                kind,
                event_type: Some("task_succeeded".to_string()),
                level: Some("info".to_string()),
                deployment_id: Some("dep-1".to_string()),
                node_id: None,
                operation: None,
                message: format!("event {}", position),
                execution_id: Some(Self::EXECUTION_ID.to_string()),
            });
        }
    }

    pub fn truncate_events(&self, len: usize) {
        self.events.lock().unwrap().truncate(len);
    }

    pub fn fail_event_fetches(&self, failures: Vec<Failure>) {
        *self.event_failures.lock().unwrap() = failures.into();
    }

    pub fn report_totals(&self, totals: Vec<u64>) {
        *self.reported_totals.lock().unwrap() = totals.into();
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn event_calls(&self) -> usize {
        self.event_calls.load(Ordering::SeqCst)
    }

    pub fn group_calls(&self) -> usize {
        self.group_calls.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn grow(&self) {
        let next = self.growth.lock().unwrap().pop_front();
        if let Some(count) = next {
            self.append_events(count);
        }
    }
}

#[async_trait]
impl ExecutionApi for StubApi {
    async fn get_execution(&self, execution_id: &str) -> MonitorResult<Execution> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await;

        if execution_id != Self::EXECUTION_ID {
            return Err(Failure::NotFound.into_error(execution_id));
        }

        let scripted = self.statuses.lock().unwrap().pop_front();
        let status = match scripted {
            Some(Ok(status)) => {
                *self.last_status.lock().unwrap() = status;
                status
            }
            Some(Err(failure)) => return Err(failure.into_error(execution_id)),
            None => *self.last_status.lock().unwrap(),
        };
        self.grow();

        Ok(Execution {
            id: execution_id.to_string(),
            workflow_id: "install".to_string(),
            deployment_id: Some("dep-1".to_string()),
            status,
            error: (status == ExecutionStatus::Failed).then(|| "task failed".to_string()),
            created_at: None,
            started_at: None,
            ended_at: None,
        })
    }

    async fn get_events(&self, query: &EventQuery) -> MonitorResult<EventsPage> {
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await;

        let id = query.target.id();
        if id != Self::EXECUTION_ID && id != Self::GROUP_ID {
            return Err(Failure::NotFound.into_error(id));
        }

        let failure = self.event_failures.lock().unwrap().pop_front();
        if let Some(failure) = failure {
            return Err(failure.into_error(id));
        }

        // include_logs is deliberately ignored: the client filters too
        let events = self.events.lock().unwrap();
        let total = events.len();
        let start = (query.offset as usize).min(total);
        let end = (start + query.size as usize).min(total);

        let reported = self.reported_totals.lock().unwrap().pop_front();
        Ok(EventsPage {
            items: events[start..end].to_vec(),
            total: reported.unwrap_or(total as u64),
        })
    }

    async fn get_execution_group(&self, group_id: &str) -> MonitorResult<ExecutionGroup> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await;

        if group_id != Self::GROUP_ID {
            return Err(Failure::NotFound.into_error(group_id));
        }

        let scripted = self.groups.lock().unwrap().pop_front();
        let snapshot = match scripted {
            Some(snapshot) => {
                *self.last_group.lock().unwrap() = Some(snapshot.clone());
                snapshot
            }
            None => self
                .last_group
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Self::group(ExecutionStatus::Started, &[ExecutionStatus::Started])),
        };
        self.grow();

        Ok(snapshot)
    }
}
