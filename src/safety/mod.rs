//! Prescription safety checks: knowledge base, conflict detection and the
//! per-draft override ledger.

pub mod audit;
pub mod detection;
pub mod engine;
pub mod helpers;
pub mod ledger;
pub mod messages;
pub mod reference;
pub mod types;

pub use engine::{DefaultSafetyEngine, SafetyEngine};
pub use ledger::OverrideLedger;
pub use reference::KnowledgeBase;
pub use types::*;
