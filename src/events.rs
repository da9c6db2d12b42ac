//! Progress events streamed while a crew runs.
//!
//! Events are an observation channel only: sending never blocks and a
//! missing or lagging subscriber never affects scheduling or results.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrewEvent {
    /// A task was handed to its agent.
    TaskStarted {
        index: usize,
        task: String,
        agent_role: String,
    },
    /// The agent asked for a tool.
    ToolCalled {
        task: String,
        tool: String,
        args: Value,
    },
    /// A tool call finished (successfully or not).
    ToolFinished {
        task: String,
        tool: String,
        success: bool,
        excerpt: String,
    },
    /// Generated code ran in the sandbox.
    CodeExecuted {
        task: String,
        success: bool,
        excerpt: String,
    },
    TaskCompleted {
        index: usize,
        task: String,
        output_chars: usize,
    },
    TaskFailed {
        index: usize,
        task: String,
        error: String,
    },
    /// The terminal result was persisted.
    ArtifactWritten { path: PathBuf, sha256: String },
}

/// Cloneable sending half shared by the crew and its agents.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<CrewEvent>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrewEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: CrewEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}
