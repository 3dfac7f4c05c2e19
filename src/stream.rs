//! Decoding of the diagram generation event stream and the client-side
//! connection state around it.

use crate::error::StreamError;
use crate::model::Diagram;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const DATA_PREFIX: &str = "data:";

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Start { message: Option<String> },
    Progress { message: String, progress: f32 },
    Heartbeat,
    Complete(Box<Diagram>),
    Error(String),
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    progress: Option<f32>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    diagram: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Parses one `data: {...}` payload.
pub fn parse_event(payload: &str) -> Result<StreamEvent, StreamError> {
    let raw: RawEvent = serde_json::from_str(payload)?;
    match raw.kind.as_str() {
        "start" => Ok(StreamEvent::Start {
            message: raw.message,
        }),
        "progress" => Ok(StreamEvent::Progress {
            message: raw.message.unwrap_or_default(),
            progress: raw.progress.unwrap_or(0.0).clamp(0.0, 100.0),
        }),
        "heartbeat" => Ok(StreamEvent::Heartbeat),
        "complete" => {
            let body = raw.diagram.or(raw.data).unwrap_or(Value::Null);
            let diagram: Diagram = serde_json::from_value(body)?;
            Ok(StreamEvent::Complete(Box::new(diagram)))
        }
        "error" => {
            let message = match raw.error {
                Some(Value::String(message)) => message,
                Some(other) => other
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
                None => raw.message.unwrap_or_else(|| "generation failed".to_string()),
            };
            Ok(StreamEvent::Error(message))
        }
        other => Err(StreamError::UnknownEvent(other.to_string())),
    }
}

/// Incremental `text/event-stream` decoder; chunks may split lines anywhere.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<Result<StreamEvent, StreamError>> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing line that was not newline terminated.
    pub fn finish(&mut self) -> Option<Result<StreamEvent, StreamError>> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line)
    }
}

fn decode_line(line: &str) -> Option<Result<StreamEvent, StreamError>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX)?.trim_start();
    if payload.is_empty() {
        return None;
    }
    Some(parse_event(payload))
}

pub fn decode_all(body: &str) -> Vec<Result<StreamEvent, StreamError>> {
    let mut decoder = StreamDecoder::new();
    let mut events = decoder.push(body);
    events.extend(decoder.finish());
    events
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamStatus {
    Idle,
    Connecting,
    Connected,
    Generating { message: String, progress: f32 },
    Complete,
    Disconnected,
    Error(String),
}

/// Identifies one started stream; events of an older ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Ignored,
    Updated,
    Completed(Box<Diagram>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The request was aborted by `begin` or `cancel`.
    Aborted,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StreamSession {
    generation: u64,
    status: StreamStatus,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self {
            generation: 0,
            status: StreamStatus::Idle,
        }
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &StreamStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            StreamStatus::Connecting | StreamStatus::Connected | StreamStatus::Generating { .. }
        )
    }

    /// Starts a new stream, superseding whatever was in flight.
    pub fn begin(&mut self) -> StreamTicket {
        if self.is_active() {
            debug!(generation = self.generation, "aborting previous generation stream");
        }
        self.generation += 1;
        self.status = StreamStatus::Connecting;
        StreamTicket(self.generation)
    }

    /// User cancellation. Never reported as an error.
    pub fn cancel(&mut self) {
        if self.is_active() {
            debug!(generation = self.generation, "generation stream cancelled");
        }
        self.generation += 1;
        self.status = StreamStatus::Disconnected;
    }

    fn is_current(&self, ticket: StreamTicket) -> bool {
        ticket.0 == self.generation && self.is_active()
    }

    pub fn handle(&mut self, ticket: StreamTicket, event: StreamEvent) -> Delivery {
        if !self.is_current(ticket) {
            return Delivery::Ignored;
        }
        match event {
            StreamEvent::Start { .. } => {
                self.status = StreamStatus::Connected;
                Delivery::Updated
            }
            StreamEvent::Heartbeat => {
                if self.status == StreamStatus::Connecting {
                    self.status = StreamStatus::Connected;
                }
                Delivery::Updated
            }
            StreamEvent::Progress { message, progress } => {
                self.status = StreamStatus::Generating { message, progress };
                Delivery::Updated
            }
            StreamEvent::Complete(diagram) => {
                self.status = StreamStatus::Complete;
                Delivery::Completed(diagram)
            }
            StreamEvent::Error(message) => {
                warn!(%message, "generation stream reported an error");
                self.status = StreamStatus::Error(message.clone());
                Delivery::Failed(message)
            }
        }
    }

    pub fn transport_failed(
        &mut self,
        ticket: StreamTicket,
        failure: TransportFailure,
    ) -> Delivery {
        if ticket.0 != self.generation {
            return Delivery::Ignored;
        }
        match failure {
            TransportFailure::Aborted => {
                self.status = StreamStatus::Disconnected;
                Delivery::Ignored
            }
            TransportFailure::Failed(message) => {
                if !self.is_active() {
                    return Delivery::Ignored;
                }
                warn!(%message, "generation stream failed");
                self.status = StreamStatus::Error(message.clone());
                Delivery::Failed(message)
            }
        }
    }
}
