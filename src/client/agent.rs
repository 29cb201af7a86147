//! High-level A2A agent client

use std::time::Duration;

use tower::{util::BoxCloneSyncService, ServiceExt};
use tower_service::Service;
use url::Url;

use crate::{
    client::config::ClientConfig,
    protocol::{error::A2AError, AgentCard, A2AOperation, Message, Task},
    service::{A2ARequest, A2AResponse, RequestContext},
};

/// Type-erased outbound service stack
pub type BoxA2AService = BoxCloneSyncService<A2ARequest, A2AResponse, A2AError>;

/// High-level A2A client for talking to peer agents
///
/// One client serves every peer: each call names the target URL. The
/// underlying service is cloned per call, so `AgentClient` is cheap to share.
///
/// # Example
///
/// ```rust,no_run
/// use a2a_mesh::prelude::*;
///
/// # async fn example() -> Result<(), A2AError> {
/// let client = A2AClientBuilder::new_http().build()?;
///
/// let peer = "http://127.0.0.1:4101".parse().unwrap();
/// let card = client.discover_agent(&peer).await?;
///
/// let endpoint: url::Url = card.url.parse().map_err(|_| A2AError::Validation("bad url".into()))?;
/// let task = client.send_message(&endpoint, Message::user("Hello, agent!")).await?;
/// println!("Task created: {}", task.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AgentClient<S = BoxA2AService> {
    service: S,
    config: ClientConfig,
}

impl<S> AgentClient<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Clone + Send,
    S::Future: Send,
{
    /// Create a new agent client
    ///
    /// # Arguments
    ///
    /// * `service` - The Tower service that handles requests
    /// * `config` - Client configuration
    pub fn new(service: S, config: ClientConfig) -> Self {
        Self { service, config }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn call(
        &self,
        agent_url: &Url,
        operation: A2AOperation,
        timeout: Duration,
    ) -> Result<A2AResponse, A2AError> {
        let context = RequestContext::new(agent_url.clone()).with_timeout(timeout);
        self.service
            .clone()
            .oneshot(A2ARequest::new(operation, context))
            .await
    }

    async fn call_for_task(
        &self,
        agent_url: &Url,
        operation: A2AOperation,
    ) -> Result<Task, A2AError> {
        let method = operation.method();
        self.call(agent_url, operation, self.config.timeout)
            .await?
            .into_task()
            .ok_or_else(|| A2AError::Protocol(format!("Expected task response from {method}")))
    }

    /// Fetch the agent card published under `base_url`
    ///
    /// # Errors
    ///
    /// Returns `A2AError::Discovery` on a non-2xx response and
    /// `A2AError::Timeout` when the discovery timeout elapses.
    pub async fn discover_agent(&self, base_url: &Url) -> Result<AgentCard, A2AError> {
        self.call(
            base_url,
            A2AOperation::DiscoverAgent,
            self.config.discovery_timeout,
        )
        .await?
        .into_agent_card()
        .ok_or_else(|| A2AError::Discovery {
            url: base_url.to_string(),
            reason: "Expected agent card response".into(),
        })
    }

    /// Send a message to the agent at `agent_url` and get its task back
    pub async fn send_message(&self, agent_url: &Url, message: Message) -> Result<Task, A2AError> {
        self.call_for_task(agent_url, A2AOperation::SendMessage { message })
            .await
    }

    /// Get a task by id
    ///
    /// # Arguments
    ///
    /// * `task_id` - The task to look up
    /// * `history_length` - Keep only the most recent messages when set
    pub async fn get_task(
        &self,
        agent_url: &Url,
        task_id: impl Into<String>,
        history_length: Option<usize>,
    ) -> Result<Task, A2AError> {
        let operation = A2AOperation::GetTask {
            task_id: task_id.into(),
            history_length,
        };
        self.call_for_task(agent_url, operation).await
    }

    /// Cancel a task; canceling a finished task returns it unchanged
    pub async fn cancel_task(
        &self,
        agent_url: &Url,
        task_id: impl Into<String>,
    ) -> Result<Task, A2AError> {
        let operation = A2AOperation::CancelTask {
            task_id: task_id.into(),
        };
        self.call_for_task(agent_url, operation).await
    }
}
