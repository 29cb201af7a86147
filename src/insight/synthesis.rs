//! Knowledge synthesis across discussion threads

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use uuid::Uuid;

use super::scoring::QualityScorer;
use crate::protocol::{
    discussion::AgentDiscussion,
    insight::{AgentInsight, SynthesizedKnowledge},
};

/// Insights above this relevance are listed as key insights
pub const KEY_INSIGHT_RELEVANCE: f64 = 0.7;

/// Confidence reported when there is nothing to average
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// `min(len/500, 1) * 50 + min(count/10, 1) * 50`, in `[0, 100]`
pub fn quality_score(content_length: usize, insight_count: usize) -> f64 {
    let length = (content_length as f64 / 500.0).min(1.0) * 50.0;
    let breadth = (insight_count as f64 / 10.0).min(1.0) * 50.0;
    length + breadth
}

/// Mean confidence of `insights`, or [`DEFAULT_CONFIDENCE`] when none has a
/// finite confidence
pub fn mean_confidence(insights: &[&AgentInsight]) -> f64 {
    let finite: Vec<f64> = insights
        .iter()
        .map(|i| i.confidence)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .collect();
    if finite.is_empty() {
        return DEFAULT_CONFIDENCE;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}

fn dedup_in_order<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&'a String> = HashSet::new();
    values.filter(|value| seen.insert(*value)).cloned().collect()
}

/// Pool the insights of `threads` into one knowledge record
pub fn synthesize(threads: &[AgentDiscussion], scorer: &dyn QualityScorer) -> SynthesizedKnowledge {
    let pooled: Vec<&AgentInsight> = threads.iter().flat_map(|t| t.insights.iter()).collect();
    let key_insights: Vec<&AgentInsight> = pooled
        .iter()
        .copied()
        .filter(|i| i.relevance_score > KEY_INSIGHT_RELEVANCE)
        .collect();

    let topics: Vec<&str> = threads.iter().map(|t| t.topic.as_str()).collect();
    let mut content = format!(
        "Synthesis across {} discussion(s): {}.",
        threads.len(),
        topics.join("; ")
    );
    if key_insights.is_empty() {
        content.push_str("\nNo high-relevance insights yet.");
    } else {
        content.push_str("\nKey insights:");
        for insight in &key_insights {
            content.push_str(&format!(
                "\n- {} (confidence {:.2})",
                insight.content, insight.confidence
            ));
        }
    }

    let contributors: BTreeSet<String> = threads
        .iter()
        .flat_map(|t| t.participants.iter().cloned())
        .chain(
            pooled
                .iter()
                .flat_map(|i| i.contributing_agents.iter().cloned()),
        )
        .collect();

    let implications = dedup_in_order(pooled.iter().flat_map(|i| i.implications.iter()));
    let action_items = dedup_in_order(pooled.iter().flat_map(|i| i.action_items.iter()));

    let quality_score = quality_score(content.chars().count(), pooled.len());
    let validation = scorer.score(&content);

    SynthesizedKnowledge {
        id: Uuid::now_v7().to_string(),
        source_threads: threads.iter().map(|t| t.id.clone()).collect(),
        contributors: contributors.into_iter().collect(),
        confidence: mean_confidence(&pooled),
        quality_score,
        implications,
        action_items,
        validation,
        content,
        created_at: Utc::now(),
    }
}
