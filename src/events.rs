//! Lifecycle event bus
//!
//! Each subscriber owns a bounded queue and receives events in publish order.
//! Publishing never waits on a subscriber: when a queue is full the event is
//! dropped for that subscriber and counted. Subscribers whose receiver was
//! dropped are pruned on the next publish.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::protocol::task::TaskState;

/// Lifecycle notifications emitted by the protocol core
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    AgentInitialized {
        agent_id: String,
    },
    AgentRegistered {
        agent_id: String,
        url: String,
    },
    TaskStateChanged {
        task_id: String,
        context_id: String,
        /// `None` when the task was just created
        from: Option<TaskState>,
        to: TaskState,
    },
    DiscussionCreated {
        discussion_id: String,
        topic: String,
    },
    DiscussionJoined {
        discussion_id: String,
        agent_id: String,
    },
    ContributionAdded {
        discussion_id: String,
        contribution_id: String,
        agent_id: String,
    },
    DiscussionConcluded {
        discussion_id: String,
    },
    InsightsGenerated {
        count: usize,
    },
    KnowledgeSynthesized {
        knowledge_id: String,
    },
}

impl LifecycleEvent {
    /// Stable dotted name, e.g. `task.state_changed`
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::AgentInitialized { .. } => "agent.initialized",
            LifecycleEvent::AgentRegistered { .. } => "agent.registered",
            LifecycleEvent::TaskStateChanged { .. } => "task.state_changed",
            LifecycleEvent::DiscussionCreated { .. } => "discussion.created",
            LifecycleEvent::DiscussionJoined { .. } => "discussion.joined",
            LifecycleEvent::ContributionAdded { .. } => "discussion.contribution_added",
            LifecycleEvent::DiscussionConcluded { .. } => "discussion.concluded",
            LifecycleEvent::InsightsGenerated { .. } => "insight.generated",
            LifecycleEvent::KnowledgeSynthesized { .. } => "insight.knowledge_synthesized",
        }
    }
}

/// Fan-out of lifecycle events to bounded subscriber queues
#[derive(Debug, Clone)]
pub struct EventBus {
    capacity: usize,
    subscribers: Arc<Mutex<Vec<mpsc::Sender<LifecycleEvent>>>>,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a new observer; it sees events published from now on
    pub fn subscribe(&self) -> mpsc::Receiver<LifecycleEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Events discarded because a subscriber's queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn publish(&self, event: LifecycleEvent) {
        let senders: Vec<_> = self.lock().clone();
        if senders.is_empty() {
            return;
        }

        let mut closed = false;
        for sender in &senders {
            match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(event = event.name(), "Lifecycle subscriber is full; dropping event");
                }
                Err(TrySendError::Closed(_)) => closed = true,
            }
        }

        if closed {
            self.lock().retain(|sender| !sender.is_closed());
            tracing::debug!(event = event.name(), "Pruned closed lifecycle subscribers");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<LifecycleEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
