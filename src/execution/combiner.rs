//! Composite assembly and the optional narrative synthesis pass

use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{now_timestamp, CompositeAnalysis, ExecutionMode, ResultMap, TaskPlan};
use crate::specialists::BaseAgent;

const SYNTHESIS_ROLE: &str = r#"You are a senior restaurant business consultant.

Several specialists have analyzed the owner's question. Tie their findings
into one clear, practical answer: lead with the direct answer, then the
three to five most important actions in priority order. Where specialists
disagree, say so. Where a specialist was unavailable, do not guess its
findings."#;

/// Assemble the composite answer. Results are keyed by kind.
pub fn assemble(
    plan: &TaskPlan,
    mode: ExecutionMode,
    results: ResultMap,
    synthesis: Option<String>,
) -> CompositeAnalysis {
    CompositeAnalysis {
        success: true,
        main_objective: plan.main_objective.clone(),
        execution_mode: mode,
        results,
        synthesis,
        timestamp: now_timestamp(),
    }
}

pub fn synthesis_prompt(query: &str, main_objective: &str, results: &ResultMap) -> String {
    let mut findings = String::new();
    for (kind, result) in results {
        if result.success {
            findings.push_str(&format!("[{}]\n{}\n\n", kind, Value::Object(result.fields.clone())));
        } else {
            findings.push_str(&format!(
                "[{}]\nUnavailable: {}\n\n",
                kind,
                result.message.as_deref().unwrap_or("no details")
            ));
        }
    }

    format!(
        "OWNER'S QUESTION:\n{}\n\nOBJECTIVE:\n{}\n\nSPECIALIST FINDINGS:\n{}Write the combined recommendation.",
        query.trim(),
        main_objective,
        findings
    )
}

/// Best-effort narrative over all results; `None` on any failure
pub async fn synthesize(
    base: &BaseAgent,
    query: &str,
    main_objective: &str,
    results: &ResultMap,
    timeout: Duration,
) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let prompt = synthesis_prompt(query, main_objective, results);

    match tokio::time::timeout(timeout, base.generate_text(&prompt, SYNTHESIS_ROLE)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => {
            info!(chars = text.len(), "Synthesis complete");
            Some(text.trim().to_string())
        }
        Ok(Ok(_)) => {
            warn!("Synthesis returned empty text");
            None
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Synthesis failed, returning structured results only");
            None
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Synthesis timed out");
            None
        }
    }
}
