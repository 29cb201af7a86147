//! A2A service response types

use crate::protocol::{agent::AgentCard, task::Task};

/// Response from an A2A service operation
#[derive(Debug, Clone)]
pub enum A2AResponse {
    /// Task response (from SendMessage, GetTask, CancelTask)
    Task(Box<Task>),

    /// Agent card response (from DiscoverAgent)
    AgentCard(Box<AgentCard>),

    /// Empty response (for operations with no return value)
    Empty,
}

impl A2AResponse {
    /// Extract a task from the response, if present
    pub fn into_task(self) -> Option<Task> {
        match self {
            A2AResponse::Task(task) => Some(*task),
            _ => None,
        }
    }

    /// Extract an agent card from the response, if present
    pub fn into_agent_card(self) -> Option<AgentCard> {
        match self {
            A2AResponse::AgentCard(card) => Some(*card),
            _ => None,
        }
    }

    /// Check if the response is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, A2AResponse::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_task() {
        let response = A2AResponse::Task(Box::new(Task::new("task-123", "ctx-1")));

        let extracted = response.into_task().unwrap();
        assert_eq!(extracted.id, "task-123");
    }

    #[test]
    fn test_wrong_variant_is_none() {
        let response = A2AResponse::Task(Box::new(Task::new("task-123", "ctx-1")));
        assert!(response.into_agent_card().is_none());
        assert!(A2AResponse::Empty.is_empty());
    }
}
