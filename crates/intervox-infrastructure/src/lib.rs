//! File-backed infrastructure: configuration loading and the question bank
//! repository.

pub mod bank;
pub mod config;

pub use bank::JsonBankRepository;
pub use config::{ConfigService, EngineConfig};
