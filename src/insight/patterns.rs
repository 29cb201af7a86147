//! Recurring-topic and communication pattern detection
//!
//! Everything here is synchronous and deterministic: the same corpus always
//! yields the same patterns, ids included.

use std::collections::{BTreeMap, BTreeSet};

use crate::protocol::{
    discussion::{ContributionType, DiscussionContribution},
    insight::{CommunicationPattern, PatternType},
    message::Message,
};

/// Minimum number of messages a topic must appear in to count as recurring
pub const MIN_TOPIC_FREQUENCY: usize = 2;

const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "agent", "agents", "along", "already", "among",
    "anything", "around", "based", "because", "before", "being", "below", "between", "could",
    "doing", "during", "every", "everything", "first", "further", "going", "hello", "having",
    "itself", "maybe", "might", "myself", "never", "other", "others", "ourselves", "please",
    "quite", "rather", "really", "right", "shall", "should", "since", "something", "still",
    "thank", "thanks", "their", "theirs", "there", "these", "thing", "things", "think", "those",
    "though", "through", "today", "under", "until", "using", "where", "which", "while", "would",
    "yours", "yourself",
];

/// A topic appearing in at least [`MIN_TOPIC_FREQUENCY`] messages
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTopic {
    pub topic: String,
    /// Number of messages mentioning the topic
    pub frequency: usize,
    /// `frequency / corpus size`
    pub confidence: f64,
    pub participants: Vec<String>,
    pub message_ids: Vec<String>,
}

impl RecurringTopic {
    pub fn to_pattern(&self) -> CommunicationPattern {
        CommunicationPattern {
            id: format!("pattern-recurring_topic-{}", self.topic),
            pattern_type: PatternType::RecurringTopic,
            description: format!(
                "Topic '{}' recurs in {} messages",
                self.topic, self.frequency
            ),
            topic: Some(self.topic.clone()),
            frequency: self.frequency,
            participants: self.participants.clone(),
            confidence: self.confidence,
            effectiveness: self.confidence,
        }
    }
}

/// Lowercased tokens longer than four characters, stoplist removed
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 4)
        .map(str::to_lowercase)
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
}

/// Topics recurring across `messages`
///
/// A topic is counted once per message. Ordered by frequency descending,
/// then topic ascending.
pub fn recurring_topics(messages: &[Message]) -> Vec<RecurringTopic> {
    if messages.is_empty() {
        return Vec::new();
    }

    #[derive(Default)]
    struct Tally {
        frequency: usize,
        participants: BTreeSet<String>,
        message_ids: Vec<String>,
    }

    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for message in messages {
        let topics: BTreeSet<String> = tokenize(&message.text_content()).collect();
        let sender = message.sender();
        for topic in topics {
            let tally = tallies.entry(topic).or_default();
            tally.frequency += 1;
            tally.participants.insert(sender.clone());
            tally.message_ids.push(message.message_id.clone());
        }
    }

    let corpus = messages.len() as f64;
    let mut topics: Vec<RecurringTopic> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.frequency >= MIN_TOPIC_FREQUENCY)
        .map(|(topic, tally)| RecurringTopic {
            topic,
            frequency: tally.frequency,
            confidence: tally.frequency as f64 / corpus,
            participants: tally.participants.into_iter().collect(),
            message_ids: tally.message_ids,
        })
        .collect();

    topics.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.topic.cmp(&b.topic)));
    topics
}

/// `recurring_topic` patterns over a message corpus
pub fn analyze_conversation_patterns(messages: &[Message]) -> Vec<CommunicationPattern> {
    recurring_topics(messages)
        .iter()
        .map(RecurringTopic::to_pattern)
        .collect()
}

fn pattern_type_for(contribution_type: ContributionType) -> PatternType {
    match contribution_type {
        ContributionType::Message => PatternType::CollaborationStyle,
        ContributionType::Question | ContributionType::Proposal | ContributionType::Critique => {
            PatternType::ProblemSolvingApproach
        }
        ContributionType::Insight | ContributionType::Synthesis => PatternType::KnowledgeSharing,
    }
}

/// Patterns over discussion contributions
///
/// One pattern per contribution type present, followed by one
/// `collaboration_style` signal over all contributors. Only contributions
/// by `agent_ids` are considered; an empty list means every agent.
pub fn detect_communication_patterns(
    contributions: &[DiscussionContribution],
    agent_ids: &[String],
) -> Vec<CommunicationPattern> {
    let selected: Vec<&DiscussionContribution> = contributions
        .iter()
        .filter(|c| agent_ids.is_empty() || agent_ids.contains(&c.agent_id))
        .collect();

    if selected.is_empty() {
        return Vec::new();
    }

    let total = selected.len();
    let mut by_type: BTreeMap<ContributionType, Vec<&DiscussionContribution>> = BTreeMap::new();
    for contribution in &selected {
        by_type
            .entry(contribution.contribution_type)
            .or_default()
            .push(contribution);
    }

    let mut patterns: Vec<CommunicationPattern> = by_type
        .into_iter()
        .map(|(contribution_type, group)| {
            let participants: BTreeSet<&str> = group.iter().map(|c| c.agent_id.as_str()).collect();
            let count = group.len();
            CommunicationPattern {
                id: format!("pattern-{}", contribution_type.as_str()),
                pattern_type: pattern_type_for(contribution_type),
                description: format!(
                    "{} {} contribution(s) from {} agent(s)",
                    count,
                    contribution_type.as_str(),
                    participants.len()
                ),
                topic: Some(contribution_type.as_str().to_string()),
                frequency: count,
                participants: participants.iter().map(|p| p.to_string()).collect(),
                confidence: count as f64 / total as f64,
                effectiveness: (participants.len() as f64 / count as f64).min(1.0),
            }
        })
        .collect();

    let mut per_contributor: BTreeMap<&str, usize> = BTreeMap::new();
    for contribution in &selected {
        *per_contributor.entry(contribution.agent_id.as_str()).or_default() += 1;
    }
    let unique = per_contributor.len();
    let busiest = per_contributor.values().copied().max().unwrap_or_default();

    patterns.push(CommunicationPattern {
        id: "pattern-collaboration".to_string(),
        pattern_type: PatternType::CollaborationStyle,
        description: format!(
            "{} agent(s) made {} contribution(s); most active agent made {}",
            unique, total, busiest
        ),
        topic: None,
        frequency: total,
        participants: per_contributor.keys().map(|p| p.to_string()).collect(),
        confidence: (total as f64 / 10.0).min(1.0),
        effectiveness: (unique as f64 / total as f64).min(1.0),
    });

    patterns
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn message(agent: &str, text: &str) -> Message {
        Message::agent(text).with_metadata("agentId", serde_json::json!(agent))
    }

    fn contribution(agent: &str, kind: ContributionType) -> DiscussionContribution {
        DiscussionContribution {
            id: format!("{agent}-{}", kind.as_str()),
            discussion_id: "d-1".into(),
            agent_id: agent.into(),
            contribution_type: kind,
            message: Message::agent("x"),
            quality: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tokenize_filters_short_and_stopwords() {
        let tokens: Vec<String> = tokenize("Pricing should follow the market, 12345 times!").collect();
        assert_eq!(tokens, vec!["pricing", "follow", "market", "times"]);
    }

    #[test]
    fn test_topic_counted_once_per_message() {
        let messages = vec![
            message("agentA", "pricing pricing pricing"),
            message("agentB", "Pricing tiers and churn"),
            message("agentA", "churn is rising"),
        ];

        let topics = recurring_topics(&messages);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].topic, "churn");
        assert_eq!(topics[0].frequency, 2);
        assert_eq!(topics[1].topic, "pricing");
        assert_eq!(topics[1].frequency, 2);
        assert!((topics[1].confidence - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(topics[1].participants, vec!["agentA", "agentB"]);
    }

    #[test]
    fn test_pattern_detection_is_deterministic() {
        let messages = vec![
            message("a", "latency budget review"),
            message("b", "latency regression in budget"),
            message("c", "budget approved"),
        ];

        let first = analyze_conversation_patterns(&messages);
        let second = analyze_conversation_patterns(&messages);
        assert_eq!(first, second);
        assert_eq!(first[0].topic.as_deref(), Some("budget"));
        assert_eq!(first[0].frequency, 3);
        assert_eq!(first[0].confidence, 1.0);
    }

    #[test]
    fn test_empty_corpus() {
        assert!(analyze_conversation_patterns(&[]).is_empty());
        assert!(detect_communication_patterns(&[], &[]).is_empty());
    }

    #[test]
    fn test_communication_patterns() {
        let contributions = vec![
            contribution("agentA", ContributionType::Question),
            contribution("agentB", ContributionType::Question),
            contribution("agentA", ContributionType::Insight),
            contribution("agentA", ContributionType::Proposal),
        ];

        let patterns = detect_communication_patterns(&contributions, &[]);
        assert_eq!(patterns.len(), 4);

        let question = &patterns[0];
        assert_eq!(question.topic.as_deref(), Some("question"));
        assert_eq!(question.pattern_type, PatternType::ProblemSolvingApproach);
        assert_eq!(question.effectiveness, 1.0);

        let collaboration = patterns.last().unwrap();
        assert_eq!(collaboration.pattern_type, PatternType::CollaborationStyle);
        assert_eq!(collaboration.frequency, 4);
        assert_eq!(collaboration.effectiveness, 0.5);
    }

    #[test]
    fn test_agent_filter() {
        let contributions = vec![
            contribution("agentA", ContributionType::Message),
            contribution("agentB", ContributionType::Critique),
        ];

        let patterns = detect_communication_patterns(&contributions, &["agentB".to_string()]);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].participants, vec!["agentB"]);

        let none = detect_communication_patterns(&contributions, &["agentZ".to_string()]);
        assert!(none.is_empty());
    }
}
