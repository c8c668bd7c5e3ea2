//! Deterministic lookup over the static question bank.

use super::model::{Question, QuestionBank};
use crate::session::coverage::CoverageTracker;
use std::collections::HashSet;
use std::sync::Arc;

/// Read-only index over the shared question bank.
///
/// Filtering is deterministic: exact difficulty match is preferred, then a
/// ±1 band; ties break toward the least-used topic and finally stable
/// insertion order. A miss is the hybrid-selection fallback trigger, not an
/// error.
#[derive(Clone)]
pub struct BankIndex {
    bank: Arc<QuestionBank>,
}

impl BankIndex {
    pub fn new(bank: Arc<QuestionBank>) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &Arc<QuestionBank> {
        &self.bank
    }

    /// Finds the best unused bank question for the given filter.
    ///
    /// # Arguments
    ///
    /// * `topics` - Topics selected for the session
    /// * `difficulty` - Requested difficulty; candidates within ±1 qualify
    /// * `exclude_ids` - Question ids already asked this session
    /// * `coverage` - Per-topic usage counts, used to balance coverage
    pub fn find(
        &self,
        topics: &[String],
        difficulty: u8,
        exclude_ids: &HashSet<String>,
        coverage: &CoverageTracker,
    ) -> Option<&Question> {
        self.bank
            .questions()
            .iter()
            .enumerate()
            .filter(|(_, q)| topics.iter().any(|t| *t == q.topic))
            .filter(|(_, q)| !exclude_ids.contains(&q.id))
            .filter(|(_, q)| q.difficulty.abs_diff(difficulty) <= 1)
            .min_by_key(|(position, q)| {
                (
                    q.difficulty.abs_diff(difficulty),
                    coverage.count_of(&q.topic),
                    *position,
                )
            })
            .map(|(_, q)| q)
    }
}
