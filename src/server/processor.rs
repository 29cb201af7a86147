//! Message processor: create-or-continue a task, produce the agent's
//! response and advance the task through its lifecycle.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Instant};

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    events::{EventBus, LifecycleEvent},
    monitor::{OperationEvent, SharedMonitor},
    persistence::{PersistenceAdapter, TaskSnapshot},
    protocol::{
        error::A2AError,
        message::{Message, MessagePart, Role},
        task::{Task, TaskState},
    },
    server::dispatcher::panic_message,
    store::TaskStore,
};

/// Produces the agent's reply to an inbound message
///
/// Only the envelope is fixed; the content is up to the implementation.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Parts of the response to `message`, given the task it belongs to
    async fn generate(&self, message: &Message, task: &Task) -> Result<Vec<MessagePart>, A2AError>;
}

/// Acknowledges the text of every inbound message
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResponder;

#[async_trait]
impl ResponseGenerator for EchoResponder {
    async fn generate(&self, message: &Message, _task: &Task) -> Result<Vec<MessagePart>, A2AError> {
        let text = message.text_content();
        let reply = if text.is_empty() {
            format!("Received message with {} part(s)", message.parts.len())
        } else {
            format!("Received: {text}")
        };
        Ok(vec![MessagePart::text(reply)])
    }
}

/// Locked task, held for the whole create-or-continue and process sequence
pub type TaskGuard = OwnedMutexGuard<Task>;

pub struct MessageProcessor {
    agent_id: String,
    store: Arc<TaskStore>,
    persistence: Arc<dyn PersistenceAdapter>,
    monitor: SharedMonitor,
    events: EventBus,
    generator: Arc<dyn ResponseGenerator>,
}

impl MessageProcessor {
    pub fn new(
        agent_id: impl Into<String>,
        store: Arc<TaskStore>,
        persistence: Arc<dyn PersistenceAdapter>,
        monitor: SharedMonitor,
        events: EventBus,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            store,
            persistence,
            monitor,
            events,
            generator: Arc::new(EchoResponder),
        }
    }

    /// Replace the default [`EchoResponder`]
    pub fn with_generator(mut self, generator: Arc<dyn ResponseGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Run one inbound message through its task
    ///
    /// The task stays locked from lookup until the response is recorded, so
    /// messages for the same task are applied one at a time in arrival order.
    pub async fn handle_message(&self, message: Message) -> Result<Task, A2AError> {
        let mut task = self.create_or_continue_task(message).await?;
        let inbound = task
            .history
            .last()
            .cloned()
            .ok_or_else(|| A2AError::Internal(format!("task {} has no history", task.id)))?;

        self.process_message_through_agent(&inbound, &mut task).await?;
        Ok(task.clone())
    }

    /// Append `message` to the task it names, or start a new task for it
    ///
    /// A `taskId` unknown to the store is replaced by the newly minted id. The
    /// returned guard keeps the task locked.
    pub async fn create_or_continue_task(&self, mut message: Message) -> Result<TaskGuard, A2AError> {
        if let Some(handle) = message.task_id.as_deref().and_then(|id| self.store.get(id)) {
            let mut task = handle.lock_owned().await;
            if !task.state().accepts_messages() {
                return Err(A2AError::TaskNotContinuable {
                    task_id: task.id.clone(),
                    state: task.state(),
                });
            }

            message.context_id = Some(task.context_id.clone());
            task.push_message(message);
            tracing::debug!(task_id = %task.id, history = task.history.len(), "Continuing task");
            return Ok(task);
        }

        if let Some(unknown) = &message.task_id {
            tracing::debug!(task_id = %unknown, "Unknown task id; starting a new task");
        }

        let task_id = Uuid::now_v7().to_string();
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        message.task_id = Some(task_id.clone());
        message.context_id = Some(context_id.clone());

        let mut task = Task::new(task_id, context_id);
        task.push_message(message);
        let handle = self.store.insert(task)?;
        let task = handle.lock_owned().await;

        tracing::info!(task_id = %task.id, context_id = %task.context_id, "Created task");
        self.after_transition(&task, None).await;
        Ok(task)
    }

    /// Generate the response to `message` and complete the turn
    ///
    /// A generator failure moves the task to `failed` with the error text as
    /// its status message; the task is still returned. A generator panic also
    /// fails the task, then surfaces as an internal error.
    pub async fn process_message_through_agent(
        &self,
        message: &Message,
        task: &mut Task,
    ) -> Result<(), A2AError> {
        self.transition(task, TaskState::Working, None).await?;

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.generator.generate(message, task))
            .catch_unwind()
            .await;
        let (generated, panicked) = match outcome {
            Ok(generated) => (
                generated.and_then(|parts| {
                    if parts.is_empty() {
                        Err(A2AError::Internal("response generator produced no parts".into()))
                    } else {
                        Ok(parts)
                    }
                }),
                false,
            ),
            Err(panic) => (Err(A2AError::Internal(panic_message(panic.as_ref()))), true),
        };

        match generated {
            Ok(parts) => {
                self.monitor
                    .record(OperationEvent::success("message.process", started.elapsed()));
                let response = self.response_message(task, parts)?;
                task.push_message(response.clone());
                self.transition(task, TaskState::Completed, Some(response))
                    .await
            }
            Err(err) => {
                self.monitor.record(OperationEvent::failure(
                    "message.process",
                    started.elapsed(),
                    &err,
                ));
                if panicked {
                    tracing::error!(task_id = %task.id, error = %err, "Response generator panicked");
                } else {
                    tracing::warn!(task_id = %task.id, error = %err, "Response generation failed");
                }
                let status = self.response_message(task, vec![MessagePart::text(err.to_string())])?;
                self.transition(task, TaskState::Failed, Some(status)).await?;
                if panicked {
                    Err(err)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Current task, optionally trimmed to the last `history_length` messages
    pub async fn get_task(&self, task_id: &str, history_length: Option<usize>) -> Result<Task, A2AError> {
        self.store
            .snapshot(task_id)
            .await
            .map(|task| task.with_history_limit(history_length))
            .ok_or_else(|| A2AError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }

    /// Cancel a task; a task that already finished is returned unchanged
    pub async fn cancel_task(&self, task_id: &str) -> Result<Task, A2AError> {
        let handle = self.store.get(task_id).ok_or_else(|| A2AError::TaskNotFound {
            task_id: task_id.to_string(),
        })?;

        let mut task = handle.lock().await;
        if task.is_terminal() {
            tracing::debug!(task_id, state = %task.state(), "Cancel on finished task ignored");
            return Ok(task.clone());
        }

        self.transition(&mut task, TaskState::Canceled, None).await?;
        tracing::info!(task_id, "Task canceled");
        Ok(task.clone())
    }

    fn response_message(&self, task: &Task, parts: Vec<MessagePart>) -> Result<Message, A2AError> {
        Message::builder()
            .role(Role::Agent)
            .parts(parts)
            .task_id(&task.id)
            .context_id(&task.context_id)
            .metadata("agentId", Value::String(self.agent_id.clone()))
            .build()
    }

    async fn transition(
        &self,
        task: &mut Task,
        next: TaskState,
        message: Option<Message>,
    ) -> Result<(), A2AError> {
        let previous = task.transition(next, message)?;
        tracing::debug!(task_id = %task.id, from = %previous, to = %next, "Task transition");
        self.after_transition(task, Some(previous)).await;
        Ok(())
    }

    /// Persist a snapshot and announce the new state
    ///
    /// Persistence failures are logged; they never fail the transition.
    async fn after_transition(&self, task: &Task, previous: Option<TaskState>) {
        let started = Instant::now();
        match self.persistence.persist_task(&TaskSnapshot::from(task)).await {
            Ok(()) => self
                .monitor
                .record(OperationEvent::success("task.persist", started.elapsed())),
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "Failed to persist task snapshot");
                self.monitor.record(OperationEvent::failure(
                    "task.persist",
                    started.elapsed(),
                    &err,
                ));
            }
        }

        self.events
            .publish(LifecycleEvent::TaskStateChanged {
                task_id: task.id.clone(),
                context_id: task.context_id.clone(),
                from: previous,
                to: task.state(),
            })
            .await;
    }
}
