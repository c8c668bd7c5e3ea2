//! Session domain model and its supporting trackers.

pub mod budget;
pub mod coverage;
pub mod model;
pub mod summary;

pub use budget::{Affordability, TimeBudget};
pub use coverage::CoverageTracker;
pub use model::{EvaluationResult, Exchange, Intent, Session, SessionPhase};
pub use summary::{PerformanceTier, SessionSummary, TopicSummary};
