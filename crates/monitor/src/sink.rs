//! Event sinks: where drained batches go.

use std::io::Write;

use crate::model::Event;

/// Consumer of ordered event batches.
///
/// Errors are fatal to the wait or drain that delivered the batch.
pub trait EventSink: Send {
    fn accept(&mut self, events: &[Event]) -> anyhow::Result<()>;
}

impl<F> EventSink for F
where
    F: FnMut(&[Event]) -> anyhow::Result<()> + Send,
{
    fn accept(&mut self, events: &[Event]) -> anyhow::Result<()> {
        self(events)
    }
}

/// How a `WriterSink` renders each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One human-readable line per event.
    #[default]
    Short,
    /// One JSON object per line.
    Json,
}

/// Renders events to any writer, usually stdout.
pub struct WriterSink<W> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn accept(&mut self, events: &[Event]) -> anyhow::Result<()> {
        for event in events {
            match self.format {
                OutputFormat::Short => writeln!(self.writer, "{}", short_line(event))?,
                OutputFormat::Json => {
                    serde_json::to_writer(&mut self.writer, event)?;
                    writeln!(self.writer)?;
                }
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// `<timestamp> <LEVEL|event_type> [<deployment>.<node>.<operation>] <message>`
fn short_line(event: &Event) -> String {
    let timestamp = event
        .timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| "-".to_string());

    let label = if event.is_log() {
        event.level.as_deref().unwrap_or("info").to_uppercase()
    } else {
        event.event_type.clone().unwrap_or_else(|| "event".to_string())
    };

    let context: Vec<&str> = [
        event.deployment_id.as_deref(),
        event.node_id.as_deref(),
        event.operation.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if context.is_empty() {
        format!("{} {}: {}", timestamp, label, event.message)
    } else {
        format!("{} {} [{}] {}", timestamp, label, context.join("."), event.message)
    }
}

/// Counts what passes through to the inner sink.
pub struct CountingSink<S> {
    inner: S,
    delivered: usize,
}

impl<S: EventSink> CountingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, delivered: 0 }
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: EventSink> EventSink for CountingSink<S> {
    fn accept(&mut self, events: &[Event]) -> anyhow::Result<()> {
        self.inner.accept(events)?;
        self.delivered += events.len();
        Ok(())
    }
}
