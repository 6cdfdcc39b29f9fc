//! Execution monitor for a remote workflow manager.
//!
//! Observes long-running executions from a short-lived process until they
//! reach a terminal state, while draining their append-only event streams.
//!
//! This crate provides:
//! - Manager REST client behind the `ExecutionApi` seam
//! - Page fetching and ordered, at-most-once event draining
//! - Status polling for single executions and execution groups
//! - A generic wait engine with deadline and transient-error policy
//! - Event sinks for rendering drained events

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod monitor;
pub mod poller;
pub mod sink;
pub mod tracker;
mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{EventQuery, EventsPage, ExecutionApi};
pub use client::ManagerClient;
pub use config::{MonitorConfig, TransientErrorPolicy, WaitConfig};
pub use error::{MonitorError, MonitorResult};
pub use fetcher::{EventPage, EventPageFetcher};
pub use model::{
    Event, EventKind, Execution, ExecutionGroup, ExecutionStatus, FetchCursor, GroupMember,
    GroupOutcome, Target,
};
pub use monitor::Monitor;
pub use poller::{ExecutionProbe, GroupProbe, StatusPoller, StatusProbe};
pub use sink::{CountingSink, EventSink, OutputFormat, WriterSink};
pub use tracker::{Drained, OrderTracker};
