//! Final session statistics, frozen on `Closing -> Ended`.

use super::coverage::TopicStats;
use super::model::{Exchange, Intent, Session};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Performance tier derived from the average score via fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "title_case")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl PerformanceTier {
    pub fn from_average(average: f32) -> Self {
        if average >= 9.0 {
            Self::Excellent
        } else if average >= 7.0 {
            Self::Good
        } else if average >= 5.0 {
            Self::Average
        } else if average >= 3.0 {
            Self::BelowAverage
        } else {
            Self::Poor
        }
    }
}

/// Per-topic slice of the final summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub count: u32,
    pub avg_score: f32,
    pub last_difficulty: u8,
}

impl From<&TopicStats> for TopicSummary {
    fn from(stats: &TopicStats) -> Self {
        Self {
            count: stats.count,
            avg_score: stats.avg_score(),
            last_difficulty: stats.last_difficulty,
        }
    }
}

/// Aggregated statistics for a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub questions_asked: u32,
    pub questions_evaluated: u32,
    pub average_score: f32,
    pub min_score: u8,
    pub max_score: u8,
    pub performance_tier: PerformanceTier,
    pub coverage: BTreeMap<String, TopicSummary>,
    /// Full exchange history, completed turns only.
    pub exchanges: Vec<Exchange>,
}

impl SessionSummary {
    /// Computes the summary from a session's completed exchanges.
    pub fn from_session(session: &Session) -> Self {
        let scores: Vec<u8> = session
            .exchanges
            .iter()
            .filter(|e| e.intent == Intent::Answering)
            .filter_map(|e| e.evaluation.as_ref().map(|ev| ev.score))
            .collect();

        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|s| u32::from(*s)).sum::<u32>() as f32 / scores.len() as f32
        };

        let coverage = session
            .coverage
            .stats()
            .iter()
            .map(|(topic, stats)| (topic.clone(), TopicSummary::from(stats)))
            .collect();

        Self {
            session_id: session.id.clone(),
            questions_asked: session.coverage.total_asked(),
            questions_evaluated: scores.len() as u32,
            average_score,
            min_score: scores.iter().copied().min().unwrap_or(0),
            max_score: scores.iter().copied().max().unwrap_or(0),
            performance_tier: PerformanceTier::from_average(average_score),
            coverage,
            exchanges: session.exchanges.clone(),
        }
    }
}
