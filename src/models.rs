//! Core data models for the insight orchestrator

use chrono::Utc;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::OrchestrationError;

/// RFC 3339 timestamp used on every envelope
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

//
// ================= Kinds =================
//

/// Closed set of dispatchable business domains
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SpecialistKind {
    Market,
    Menu,
    Customer,
    Competitor,
    Financial,
    Location,
    Trend,
}

impl SpecialistKind {
    pub const ALL: [SpecialistKind; 7] = [
        SpecialistKind::Market,
        SpecialistKind::Menu,
        SpecialistKind::Customer,
        SpecialistKind::Competitor,
        SpecialistKind::Financial,
        SpecialistKind::Location,
        SpecialistKind::Trend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialistKind::Market => "market",
            SpecialistKind::Menu => "menu",
            SpecialistKind::Customer => "customer",
            SpecialistKind::Competitor => "competitor",
            SpecialistKind::Financial => "financial",
            SpecialistKind::Location => "location",
            SpecialistKind::Trend => "trend",
        }
    }

    /// Position in [`SpecialistKind::ALL`]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SpecialistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecialistKind {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        SpecialistKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OrchestrationError::InvalidPlan(format!("unknown specialist kind '{}'", s)))
    }
}

/// Any agent the registry knows about. The coordinator is never dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Coordinator,
    Specialist(SpecialistKind),
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Coordinator => f.write_str("coordinator"),
            AgentKind::Specialist(kind) => kind.fmt(f),
        }
    }
}

impl Serialize for AgentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Static description of an agent, owned by the registry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistDescriptor {
    pub kind: AgentKind,
    pub display_name: &'static str,
    pub description: &'static str,
    pub capabilities: Vec<&'static str>,
}

//
// ================= Context =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_cost_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_cost_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_ticket: Option<f64>,
}

/// Optional structured context supplied alongside a query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub competitors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financials: Option<FinancialSnapshot>,
    /// Anything else the caller sent; rendered verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisContext {
    pub fn is_empty(&self) -> bool {
        self == &AnalysisContext::default()
    }

    /// Render the populated fields as prompt lines
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        let labelled = [
            ("Business name", &self.business_name),
            ("Business type", &self.business_type),
            ("Cuisine", &self.cuisine),
            ("Location", &self.location),
            ("Price range", &self.price_range),
        ];
        for (label, value) in labelled {
            if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                lines.push(format!("- {}: {}", label, v));
            }
        }

        if !self.competitors.is_empty() {
            lines.push(format!("- Known competitors: {}", self.competitors.join(", ")));
        }

        if let Some(fin) = &self.financials {
            let figures = [
                ("monthly revenue", fin.monthly_revenue),
                ("food cost %", fin.food_cost_percentage),
                ("labor cost %", fin.labor_cost_percentage),
                ("average ticket", fin.average_ticket),
            ];
            let parts: Vec<String> = figures
                .iter()
                .filter_map(|(label, v)| v.map(|v| format!("{} {:.2}", label, v)))
                .collect();
            if !parts.is_empty() {
                lines.push(format!("- Financial snapshot: {}", parts.join(", ")));
            }
        }

        for (key, value) in &self.extra {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("- {}: {}", key, rendered));
        }

        if lines.is_empty() {
            "No additional business context provided.".to_string()
        } else {
            lines.join("\n")
        }
    }
}

//
// ================= Plan =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Independent fan-out, no cross-specialist data
    Parallel,
    /// Priority-ordered chain carrying previous results forward
    Sequential,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Parallel => f.write_str("parallel"),
            ExecutionMode::Sequential => f.write_str("sequential"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(ExecutionMode::Parallel),
            "sequential" => Ok(ExecutionMode::Sequential),
            other => Err(OrchestrationError::InvalidInput(format!(
                "unknown execution mode '{}'",
                other
            ))),
        }
    }
}

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub kind: SpecialistKind,
    pub priority: u8,
    pub rationale: String,
    #[serde(default)]
    pub sub_questions: Vec<String>,
}

/// Coordinator output, consumed once per request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlan {
    pub main_objective: String,
    pub steps: Vec<PlanStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<ExecutionMode>,
}

impl TaskPlan {
    /// Build a plan, clamping priorities and merging duplicate kinds
    pub fn new(
        main_objective: impl Into<String>,
        steps: Vec<PlanStep>,
        execution_mode: Option<ExecutionMode>,
    ) -> Self {
        let mut merged: Vec<PlanStep> = Vec::with_capacity(steps.len());

        for mut step in steps {
            step.priority = step.priority.clamp(MIN_PRIORITY, MAX_PRIORITY);

            match merged.iter_mut().find(|s| s.kind == step.kind) {
                Some(existing) => {
                    existing.priority = existing.priority.max(step.priority);
                    for q in step.sub_questions {
                        if !existing.sub_questions.contains(&q) {
                            existing.sub_questions.push(q);
                        }
                    }
                }
                None => merged.push(step),
            }
        }

        Self {
            main_objective: main_objective.into(),
            steps: merged,
            execution_mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn kinds(&self) -> Vec<SpecialistKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    /// Steps by descending priority; ties keep plan order
    pub fn steps_by_priority(&self) -> Vec<&PlanStep> {
        let mut ordered: Vec<&PlanStep> = self.steps.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));
        ordered
    }
}

//
// ================= Results =================
//

/// Envelope returned by every specialist call, successful or not.
///
/// Domain fields are flattened next to the envelope fields so the JSON is a
/// single flat object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialistResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SpecialistResult {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

pub type ResultMap = BTreeMap<SpecialistKind, SpecialistResult>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompositeAnalysis {
    pub success: bool,
    pub main_objective: String,
    pub execution_mode: ExecutionMode,
    pub results: ResultMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureEnvelope {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

/// What the facade hands back to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompositeResult {
    Completed(CompositeAnalysis),
    Failed(FailureEnvelope),
}

impl CompositeResult {
    pub fn failure(message: impl Into<String>) -> Self {
        CompositeResult::Failed(FailureEnvelope {
            success: false,
            message: message.into(),
            timestamp: now_timestamp(),
        })
    }

    pub fn is_success(&self) -> bool {
        match self {
            CompositeResult::Completed(analysis) => analysis.success,
            CompositeResult::Failed(_) => false,
        }
    }

    pub fn analysis(&self) -> Option<&CompositeAnalysis> {
        match self {
            CompositeResult::Completed(analysis) => Some(analysis),
            CompositeResult::Failed(_) => None,
        }
    }
}
