//! Execution mode classifier
//!
//! Picks an execution mode when neither the caller nor the plan did:
//! - Parallel: specialists can answer independently
//! - Sequential: the question ties one domain's answer to another's

use crate::models::{ExecutionMode, TaskPlan};

/// Phrases that signal one finding should feed another
const DEPENDENCY_CUES: &[&str] = &[
    "against", "based on", "compared to", "compare", "relative to", "versus", " vs",
    " then ", "given", "in light of", "depending on", "so that", "taking into account",
    "considering", "impact of", "affect", "because of",
];

/// Execution mode classifier
pub struct ModeClassifier;

impl ModeClassifier {
    pub fn suggest(query: &str, plan: &TaskPlan) -> ExecutionMode {
        if plan.steps.len() < 2 {
            return ExecutionMode::Parallel;
        }

        let lowered = query.to_lowercase();
        let cues = DEPENDENCY_CUES
            .iter()
            .filter(|cue| lowered.contains(**cue))
            .count();

        if cues > 0 {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel
        }
    }
}
