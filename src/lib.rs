//! Restaurant Insight Orchestrator
//!
//! Routes a restaurant owner's business question to a team of domain
//! specialists and combines their structured answers:
//! - A coordinator turns the question into a task plan
//! - The orchestrator dispatches the plan in parallel or as a priority chain
//! - Each specialist validates its answer against a declared output contract
//! - Failures stay local to the specialist that hit them
//!
//! FLOW:
//! QUERY → PLAN → DISPATCH → VALIDATE → COMBINE → (SYNTHESIZE) → RESULT

pub mod api;
pub mod classifier;
pub mod config;
pub mod contract;
pub mod coordinator;
pub mod error;
pub mod execution;
pub mod llm;
pub mod models;
pub mod registry;
pub mod service;
pub mod specialists;
pub mod supplementary;

pub use error::Result;

// Re-export common types
pub use classifier::ModeClassifier;
pub use models::*;
pub use service::InsightService;
