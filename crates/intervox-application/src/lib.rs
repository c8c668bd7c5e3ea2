//! Application layer: per-session orchestration, the session registry, and
//! the wire message contracts.

pub mod message;
pub mod orchestrator;
pub mod registry;

pub use message::{ActionKind, ActionPayload, InboundMessage, OutboundMessage};
pub use orchestrator::{EngineAction, SessionOrchestrator};
pub use registry::SessionRegistry;
