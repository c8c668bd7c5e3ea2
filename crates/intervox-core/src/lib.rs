pub mod config;
pub mod error;
pub mod followup;
pub mod question;
pub mod reasoning;
pub mod router;
pub mod selector;
pub mod session;
pub mod speech;

// Re-export common error type
pub use error::{InterviewError, Result};
