//! Running per-topic coverage accounting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-topic counters accumulated over one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicStats {
    /// Questions asked on this topic.
    pub count: u32,
    /// Sum of evaluation scores received on this topic.
    pub total_score: u32,
    /// How many of the asked questions have been scored.
    pub scored: u32,
    /// Difficulty of the most recently asked question on this topic.
    pub last_difficulty: u8,
}

impl TopicStats {
    pub fn avg_score(&self) -> f32 {
        if self.scored == 0 {
            0.0
        } else {
            self.total_score as f32 / self.scored as f32
        }
    }
}

/// Tracks how many questions have been asked per topic and how they scored.
///
/// Pure bookkeeping: append-only updates, no external calls. The candidate
/// topic order given at construction doubles as the deterministic
/// tie-breaker for [`CoverageTracker::least_covered`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTracker {
    /// Session topics in their original selection order.
    topics: Vec<String>,
    stats: HashMap<String, TopicStats>,
}

impl CoverageTracker {
    pub fn new(topics: &[String]) -> Self {
        let stats = topics
            .iter()
            .map(|t| (t.clone(), TopicStats::default()))
            .collect();
        Self {
            topics: topics.to_vec(),
            stats,
        }
    }

    /// Records one issued question on `topic`. `score` is `None` at issue
    /// time; the evaluation arrives later via [`CoverageTracker::record_score`].
    pub fn record(&mut self, topic: &str, difficulty: u8, score: Option<u8>) {
        let entry = self.stats.entry(topic.to_string()).or_default();
        entry.count += 1;
        entry.last_difficulty = difficulty;
        if let Some(score) = score {
            entry.total_score += u32::from(score);
            entry.scored += 1;
        }
        if !self.topics.iter().any(|t| t == topic) {
            self.topics.push(topic.to_string());
        }
    }

    /// Attaches an evaluation score to the most recent question on `topic`.
    pub fn record_score(&mut self, topic: &str, score: u8) {
        let entry = self.stats.entry(topic.to_string()).or_default();
        entry.total_score += u32::from(score);
        entry.scored += 1;
    }

    /// `(count, average score)` for one topic.
    pub fn coverage_of(&self, topic: &str) -> (u32, f32) {
        self.stats
            .get(topic)
            .map(|s| (s.count, s.avg_score()))
            .unwrap_or((0, 0.0))
    }

    pub fn count_of(&self, topic: &str) -> u32 {
        self.stats.get(topic).map(|s| s.count).unwrap_or(0)
    }

    /// Total questions recorded across all topics.
    ///
    /// Invariant: equals the number of questions asked in the session.
    pub fn total_asked(&self) -> u32 {
        self.stats.values().map(|s| s.count).sum()
    }

    /// The least-covered topic among `candidates`, ties broken by candidate
    /// order.
    pub fn least_covered<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(position, topic)| (self.count_of(topic), *position))
            .map(|(_, topic)| topic.as_str())
    }

    /// Topics covered strictly below their fair share of the questions asked
    /// so far, in candidate order.
    pub fn under_covered(&self) -> Vec<&str> {
        if self.topics.is_empty() {
            return Vec::new();
        }
        let fair_share = self.total_asked() as f32 / self.topics.len() as f32;
        self.topics
            .iter()
            .filter(|t| (self.count_of(t) as f32) < fair_share)
            .map(|t| t.as_str())
            .collect()
    }

    pub fn stats(&self) -> &HashMap<String, TopicStats> {
        &self.stats
    }
}
