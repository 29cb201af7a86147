//! Pluggable content quality scoring

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Quality of a piece of content, in `[0, 100]`, with the rules it broke
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityScore {
    pub value: f64,
    #[serde(default)]
    pub violations: Vec<String>,
}

impl QualityScore {
    pub fn new(value: f64, violations: Vec<String>) -> Self {
        Self {
            value: value.clamp(0.0, 100.0),
            violations,
        }
    }

    pub fn passes(&self, threshold: f64) -> bool {
        self.violations.is_empty() && self.value >= threshold
    }
}

/// Strategy that scores free text
pub trait QualityScorer: Send + Sync {
    fn score(&self, content: &str) -> QualityScore;
}

struct Rule {
    pattern: Regex,
    violation: &'static str,
    penalty: f64,
}

/// Keyword and regex heuristics
///
/// Starts from 100 and subtracts a penalty per broken rule. Content shorter
/// than `min_length` characters is penalised as well.
pub struct HeuristicScorer {
    rules: Vec<Rule>,
    min_length: usize,
}

const RULES: &[(&str, &str, f64)] = &[
    (
        r"(?i)\b(always|never|guaranteed|definitely|undeniabl[ey]|100%)\b",
        "unqualified absolute claim",
        15.0,
    ),
    (
        r"(?i)\b(stupid|idiot\w*|worthless|shut up|hate you)\b",
        "disrespectful language",
        30.0,
    ),
    (
        r"(?i)\b(password|api[_ -]?key|secret[_ -]?key|private[_ -]?key)\s*[:=]",
        "possible credential disclosure",
        40.0,
    ),
    (r"[!?]{3,}", "excessive punctuation", 5.0),
];

impl HeuristicScorer {
    pub fn new() -> Self {
        let rules = RULES
            .iter()
            .filter_map(|&(pattern, violation, penalty)| {
                Regex::new(pattern).ok().map(|pattern| Rule {
                    pattern,
                    violation,
                    penalty,
                })
            })
            .collect();

        Self {
            rules,
            min_length: 20,
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeuristicScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeuristicScorer")
            .field("rules", &self.rules.len())
            .field("min_length", &self.min_length)
            .finish()
    }
}

impl QualityScorer for HeuristicScorer {
    fn score(&self, content: &str) -> QualityScore {
        let mut value = 100.0;
        let mut violations = Vec::new();

        if content.trim().chars().count() < self.min_length {
            value -= 25.0;
            violations.push("content too short".to_string());
        }

        for rule in &self.rules {
            if rule.pattern.is_match(content) {
                value -= rule.penalty;
                violations.push(rule.violation.to_string());
            }
        }

        QualityScore::new(value, violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content_scores_full() {
        let score = HeuristicScorer::new()
            .score("Consider segmenting customers by usage before changing list prices.");

        assert_eq!(score.value, 100.0);
        assert!(score.violations.is_empty());
        assert!(score.passes(80.0));
    }

    #[test]
    fn test_violations_reduce_score() {
        let score = HeuristicScorer::new().score("This will definitely work, it is guaranteed!!!");

        assert_eq!(score.value, 80.0);
        assert_eq!(
            score.violations,
            vec!["unqualified absolute claim", "excessive punctuation"]
        );
    }

    #[test]
    fn test_short_content() {
        let score = HeuristicScorer::new().score("ok");
        assert_eq!(score.violations, vec!["content too short"]);
        assert!(!score.passes(0.0));
    }

    #[test]
    fn test_score_is_clamped() {
        let score = HeuristicScorer::new().score("idiot!!! api_key: x");
        assert!(score.value >= 0.0);
        assert_eq!(score.violations.len(), 4);
    }
}
