//! A2A task types and lifecycle management

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{error::A2AError, message::Message, Artifact};

/// A task in the A2A protocol
///
/// Tasks are the unit of conversational state between two agents. A task is
/// created by the first message that does not name an existing task and is
/// mutated by every later message and state transition. Tasks are never
/// deleted by the protocol core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,

    /// Groups related tasks
    pub context_id: String,

    /// Current status of the task
    pub status: TaskStatus,

    /// Ordered message history, in arrival order
    #[serde(default)]
    pub history: Vec<Message>,

    /// Outputs produced by the task
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    /// Free-form metadata bag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task in the `submitted` state
    pub fn new(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(TaskState::Submitted),
            history: Vec::new(),
            artifacts: Vec::new(),
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        self.status.state
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Append a message to the history
    pub fn push_message(&mut self, message: Message) {
        self.history.push(message);
        self.updated_at = Utc::now();
    }

    /// Attach an artifact
    pub fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
        self.updated_at = Utc::now();
    }

    /// Move the task to `next`, returning the state it left
    ///
    /// The optional message becomes `status.message`.
    pub fn transition(
        &mut self,
        next: TaskState,
        message: Option<Message>,
    ) -> Result<TaskState, A2AError> {
        let previous = self.status.state;
        if !previous.can_transition_to(next) {
            return Err(A2AError::Internal(format!(
                "illegal transition for task {}: {} -> {}",
                self.id, previous, next
            )));
        }

        self.status = TaskStatus {
            state: next,
            message,
            timestamp: Utc::now(),
        };
        self.updated_at = self.status.timestamp;
        Ok(previous)
    }

    /// Copy of this task keeping only the last `limit` history entries
    pub fn with_history_limit(&self, limit: Option<usize>) -> Task {
        let mut task = self.clone();
        if let Some(limit) = limit {
            let skip = task.history.len().saturating_sub(limit);
            task.history.drain(..skip);
        }
        task
    }
}

/// Status of a task: its state plus the message that produced it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Utc::now(),
        }
    }
}

/// Task state in the A2A protocol lifecycle
///
/// Task lifecycle: submitted → working → completed/failed/canceled.
/// A completed task may re-enter `working` when the peer continues the
/// conversation; nothing ever returns to `submitted`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task has been received and is queued for processing
    Submitted,

    /// Task is currently being processed
    Working,

    /// Task completed successfully
    Completed,

    /// Task failed with an error
    Failed,

    /// Task was canceled by the client
    Canceled,
}

impl TaskState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Whether a task in this state can start another turn
    pub fn accepts_messages(&self) -> bool {
        self.can_transition_to(TaskState::Working)
    }

    /// Transition table of the task state machine
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;

        matches!(
            (self, next),
            (Submitted, Working)
                | (Submitted, Failed)
                | (Submitted, Canceled)
                | (Working, Completed)
                | (Working, Failed)
                | (Working, Canceled)
                | (Completed, Working)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of `message/send` and `message/stream`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: Message,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Parameters of `tasks/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}

/// Parameters of `tasks/cancel`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("task-123", "ctx-1");

        assert_eq!(task.id, "task-123");
        assert_eq!(task.state(), TaskState::Submitted);
        assert!(!task.is_terminal());
        assert!(task.history.is_empty());
    }

    #[test]
    fn test_task_lifecycle() {
        let mut task = Task::new("task-123", "ctx-1");

        let previous = task.transition(TaskState::Working, None).unwrap();
        assert_eq!(previous, TaskState::Submitted);

        task.transition(TaskState::Completed, Some(Message::agent("done")))
            .unwrap();
        assert!(task.is_terminal());
        assert_eq!(task.status.message.as_ref().unwrap().text_content(), "done");
    }

    #[test]
    fn test_no_return_to_submitted() {
        let mut task = Task::new("task-1", "ctx-1");
        task.transition(TaskState::Working, None).unwrap();

        assert!(task.transition(TaskState::Submitted, None).is_err());
        assert_eq!(task.state(), TaskState::Working);
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [TaskState::Failed, TaskState::Canceled] {
            for next in [
                TaskState::Submitted,
                TaskState::Working,
                TaskState::Completed,
                TaskState::Failed,
                TaskState::Canceled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(TaskState::Completed.can_transition_to(TaskState::Working));
        assert!(!TaskState::Completed.can_transition_to(TaskState::Canceled));
    }

    #[test]
    fn test_history_limit() {
        let mut task = Task::new("task-1", "ctx-1");
        for i in 0..5 {
            task.push_message(Message::user(format!("m{i}")));
        }

        let trimmed = task.with_history_limit(Some(2));
        assert_eq!(trimmed.history.len(), 2);
        assert_eq!(trimmed.history[0].text_content(), "m3");

        assert_eq!(task.with_history_limit(None).history.len(), 5);
        assert_eq!(task.with_history_limit(Some(10)).history.len(), 5);
    }

    #[test]
    fn test_task_serialization() {
        let task = Task::new("task-123", "ctx-9");

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "task-123");
        assert_eq!(json["contextId"], "ctx-9");
        assert_eq!(json["status"]["state"], "submitted");

        let deserialized: Task = serde_json::from_value(json).unwrap();
        assert_eq!(task.id, deserialized.id);
        assert_eq!(task.state(), deserialized.state());
    }
}
