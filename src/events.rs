//! Progress events published while a run is under way.
//!
//! The orchestrator emits via [`EventBus::emit`]; the CLI (or anything
//! else) listens via [`EventBus::subscribe`]. Built on
//! [`tokio::sync::broadcast`], so a slow or absent listener never holds up
//! a run.

use tokio::sync::broadcast;

use crate::task::TaskStatus;

/// Milestones of a single run, in the order they occur.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The service accepted the task.
    Submitted { task_id: String, status: TaskStatus },
    /// A status check came back (1-based `attempt`).
    StatusChecked {
        task_id: String,
        status: TaskStatus,
        attempt: u32,
    },
    /// Stdout of the finished task was downloaded.
    StdoutFetched { task_id: String, bytes: usize },
    /// The value that will be plotted or sampled was picked out of stdout.
    ValueSelected { task_id: String, value: String },
    /// The run produced its result.
    Finished { task_id: String },
}

impl Event {
    pub fn task_id(&self) -> &str {
        match self {
            Self::Submitted { task_id, .. }
            | Self::StatusChecked { task_id, .. }
            | Self::StdoutFetched { task_id, .. }
            | Self::ValueSelected { task_id, .. }
            | Self::Finished { task_id } => task_id,
        }
    }
}

#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
