//! Question bank repository.
//!
//! Loads the curated question bank from a JSON file on disk. The file holds
//! a top-level array of questions; validation (unique ids, non-empty text,
//! difficulty range) happens in `QuestionBank::new`.

use intervox_core::error::Result;
use intervox_core::question::{Question, QuestionBank};
use std::path::Path;
use tracing::info;

/// Reads question banks from JSON files.
#[derive(Debug, Clone, Default)]
pub struct JsonBankRepository;

impl JsonBankRepository {
    pub fn new() -> Self {
        Self
    }

    /// Loads and validates a question bank from `path`.
    pub fn load(&self, path: &Path) -> Result<QuestionBank> {
        let contents = std::fs::read_to_string(path)?;
        let questions: Vec<Question> = serde_json::from_str(&contents)?;
        let bank = QuestionBank::new(questions)?;
        info!(
            path = %path.display(),
            questions = bank.len(),
            topics = bank.topics().len(),
            "question bank loaded"
        );
        Ok(bank)
    }
}
