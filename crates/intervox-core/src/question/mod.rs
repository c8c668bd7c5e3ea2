//! Question domain model and the static bank index.

pub mod index;
pub mod model;

pub use index::BankIndex;
pub use model::{Question, QuestionBank, QuestionSource};
