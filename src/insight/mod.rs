//! Insight and pattern engine
//!
//! Derives recurring-topic patterns, cross-agent insights, synthesized
//! knowledge and communication patterns from conversation history. Insight
//! generation is advisory: search or persistence failures are logged and
//! reported to the monitor, and the affected call degrades to an empty
//! result instead of returning an error.

pub mod patterns;
pub mod scoring;
pub mod synthesis;

pub use patterns::{analyze_conversation_patterns, detect_communication_patterns, RecurringTopic};
pub use scoring::{HeuristicScorer, QualityScore, QualityScorer};

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    events::{EventBus, LifecycleEvent},
    monitor::{observe, OperationEvent, SharedMonitor},
    persistence::{AgentMessageRecord, MemoryQuery, PersistenceAdapter, RecordKind},
    protocol::{
        discussion::AgentDiscussion,
        insight::{AgentInsight, CommunicationPattern, InsightType, SynthesizedKnowledge, TimeRange},
        message::Message,
    },
};

pub struct InsightEngine {
    persistence: Arc<dyn PersistenceAdapter>,
    monitor: SharedMonitor,
    scorer: Arc<dyn QualityScorer>,
    events: EventBus,
}

impl InsightEngine {
    pub fn new(
        persistence: Arc<dyn PersistenceAdapter>,
        monitor: SharedMonitor,
        events: EventBus,
    ) -> Self {
        Self {
            persistence,
            monitor,
            scorer: Arc::new(HeuristicScorer::new()),
            events,
        }
    }

    /// Replace the default heuristic scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn QualityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn score(&self, content: &str) -> QualityScore {
        self.scorer.score(content)
    }

    pub fn analyze_conversation_patterns(&self, messages: &[Message]) -> Vec<CommunicationPattern> {
        patterns::analyze_conversation_patterns(messages)
    }

    /// One `pattern` insight per recurring topic, each persisted
    ///
    /// A failed persist is logged and does not drop the insight.
    pub async fn generate_cross_agent_insights(&self, messages: &[Message]) -> Vec<AgentInsight> {
        let started = Instant::now();
        let topics = patterns::recurring_topics(messages);

        let mut insights = Vec::with_capacity(topics.len());
        for topic in &topics {
            let insight = insight_from_topic(topic);
            let persisted = observe(
                self.monitor.as_ref(),
                "insight.persist",
                self.persistence.persist_insight(&insight),
            )
            .await;
            if let Err(err) = persisted {
                tracing::warn!(insight_id = %insight.id, error = %err, "Failed to persist insight");
            }
            insights.push(insight);
        }

        self.monitor.record(OperationEvent::success(
            "insight.generate",
            started.elapsed(),
        ));
        tracing::info!(
            messages = messages.len(),
            insights = insights.len(),
            "Generated cross-agent insights"
        );

        if !insights.is_empty() {
            self.events
                .publish(LifecycleEvent::InsightsGenerated {
                    count: insights.len(),
                })
                .await;
        }
        insights
    }

    /// Search persisted agent messages and derive insights from the hits
    pub async fn generate_insights_for_query(&self, query: &str, limit: usize) -> Vec<AgentInsight> {
        let search = MemoryQuery::new(query)
            .kind(RecordKind::AgentMessage)
            .limit(limit);

        let records = match observe(
            self.monitor.as_ref(),
            "insight.search",
            self.persistence.search(&search),
        )
        .await
        {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(query, error = %err, "Insight search failed");
                return Vec::new();
            }
        };

        let messages: Vec<Message> = records
            .iter()
            .filter_map(|record| match record.decode::<AgentMessageRecord>() {
                Ok(stored) => Some(stored.message),
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping undecodable agent message");
                    None
                }
            })
            .collect();

        self.generate_cross_agent_insights(&messages).await
    }

    /// Pool the insights of `threads` into persisted knowledge
    ///
    /// Returns `None` when the knowledge could not be persisted.
    pub async fn synthesize_agent_knowledge(
        &self,
        threads: &[AgentDiscussion],
    ) -> Option<SynthesizedKnowledge> {
        let knowledge = synthesis::synthesize(threads, self.scorer.as_ref());

        let persisted = observe(
            self.monitor.as_ref(),
            "insight.synthesize",
            self.persistence.persist_knowledge(&knowledge),
        )
        .await;
        if let Err(err) = persisted {
            tracing::warn!(error = %err, "Failed to persist synthesized knowledge");
            return None;
        }

        tracing::info!(
            knowledge_id = %knowledge.id,
            threads = threads.len(),
            quality = knowledge.quality_score,
            "Synthesized agent knowledge"
        );
        self.events
            .publish(LifecycleEvent::KnowledgeSynthesized {
                knowledge_id: knowledge.id.clone(),
            })
            .await;
        Some(knowledge)
    }

    /// Communication patterns over persisted contributions in `range`
    ///
    /// An empty `agent_ids` list means every agent.
    pub async fn detect_communication_patterns(
        &self,
        agent_ids: &[String],
        range: TimeRange,
    ) -> Vec<CommunicationPattern> {
        match observe(
            self.monitor.as_ref(),
            "insight.detect_patterns",
            self.persistence.load_contributions(Some(range)),
        )
        .await
        {
            Ok(contributions) => patterns::detect_communication_patterns(&contributions, agent_ids),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load contributions");
                Vec::new()
            }
        }
    }
}

fn insight_from_topic(topic: &RecurringTopic) -> AgentInsight {
    let mut implications = Vec::new();
    if topic.participants.len() > 1 {
        implications.push(format!(
            "'{}' is a shared concern of {} agents",
            topic.topic,
            topic.participants.len()
        ));
    }

    AgentInsight {
        id: Uuid::now_v7().to_string(),
        insight_type: InsightType::Pattern,
        content: format!(
            "Recurring topic '{}' appears in {} messages",
            topic.topic, topic.frequency
        ),
        confidence: topic.confidence,
        contributing_agents: topic.participants.clone(),
        source_ids: topic.message_ids.clone(),
        implications,
        action_items: vec![format!("Consolidate findings on '{}'", topic.topic)],
        relevance_score: topic.confidence,
        created_at: Utc::now(),
    }
}
