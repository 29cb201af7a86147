//! Runs one A2A agent and, optionally, introduces it to a peer.
//!
//! ```text
//! A2A_AGENT_ID=agent-a A2A_PORT=4100 cargo run --example agent_server
//! A2A_AGENT_ID=agent-b A2A_PORT=4101 PEER_URL=http://127.0.0.1:4100/ cargo run --example agent_server
//! ```

use std::path::Path;

use a2a_mesh::prelude::*;
use anyhow::Context;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "a2a.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,a2a_mesh=debug")),
        )
        .init();

    let config = if Path::new(CONFIG_PATH).exists() {
        AgentConfig::load(CONFIG_PATH).with_context(|| format!("loading {CONFIG_PATH}"))?
    } else {
        let mut config = AgentConfig::default();
        config.apply_env_overrides()?;
        config
    };

    let agent = A2AAgent::from_config(config).context("building agent")?;
    let listener = agent.bind().await.context("binding gateway")?;
    println!("Agent {} serving {}", agent.agent_id(), agent.card().url);

    if let Ok(peer) = std::env::var("PEER_URL") {
        let base: url::Url = peer.parse().context("PEER_URL is not a valid URL")?;
        let entry = agent
            .registry()
            .discover_and_register("peer", &base)
            .await
            .context("discovering peer")?;
        println!("Discovered {} at {}", entry.card.name, entry.url);

        let task = agent
            .messenger()
            .send_to_agent("peer", Message::user("Hello from a fellow agent"))
            .await
            .context("messaging peer")?;
        println!("Peer answered with task {} ({})", task.id, task.state());
        if let Some(reply) = task.history.last() {
            println!("  {}", reply.text_content());
        }

        let discussion = agent
            .discussions()
            .create_agent_discussion("Shared roadmap", ["peer"])
            .await?;
        println!("Opened discussion {discussion}");
    }

    agent
        .serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
