//! Domain specialists
//!
//! Each specialist is one [`SpecialistAgent`] driven by a static
//! [`SpecialistProfile`]: descriptor, system role, output contract, analysis
//! guidance and the supplementary sources it may read. The agent never fails
//! past its own boundary; every outcome is a [`SpecialistResult`] envelope.

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::contract::{Field, OutputContract, Shape};
use crate::error::OrchestrationError;
use crate::llm::Generator;
use crate::models::{AnalysisContext, ResultMap, SpecialistDescriptor, SpecialistKind, SpecialistResult};
use crate::supplementary::SupplementaryData;

pub mod base;
pub mod competitor;
pub mod customer;
pub mod financial;
pub mod location;
pub mod market;
pub mod menu;
pub mod trend;

pub use base::BaseAgent;

/// How many days of sales history specialists ask for
const SALES_LOOKBACK_DAYS: u32 = 30;

/// Cap on how much of one earlier finding is carried into a prompt
const MAX_CARRIED_CHARS: usize = 4_000;

/// Read-only lookups a specialist may ground itself on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplementarySource {
    SalesHistory,
    CompetitorRecords,
    MenuItems,
}

pub struct SpecialistProfile {
    pub descriptor: SpecialistDescriptor,
    pub system_role: &'static str,
    pub contract: OutputContract,
    pub guidance: &'static [&'static str],
    pub sources: &'static [SupplementarySource],
}

lazy_static! {
    static ref PROFILES: Vec<SpecialistProfile> =
        SpecialistKind::ALL.iter().map(|k| build_profile(*k)).collect();
}

fn build_profile(kind: SpecialistKind) -> SpecialistProfile {
    match kind {
        SpecialistKind::Market => market::profile(),
        SpecialistKind::Menu => menu::profile(),
        SpecialistKind::Customer => customer::profile(),
        SpecialistKind::Competitor => competitor::profile(),
        SpecialistKind::Financial => financial::profile(),
        SpecialistKind::Location => location::profile(),
        SpecialistKind::Trend => trend::profile(),
    }
}

/// Process-wide profile for a kind
pub fn profile(kind: SpecialistKind) -> &'static SpecialistProfile {
    &PROFILES[kind.index()]
}

/// Process-wide output contract for a kind
pub fn contract_for(kind: SpecialistKind) -> &'static OutputContract {
    &profile(kind).contract
}

/// Contract with the fields every specialist shares appended
pub(crate) fn specialist_contract(
    name: &'static str,
    summary_field: &'static str,
    mut fields: Vec<Field>,
) -> OutputContract {
    fields.push(
        Field::optional("confidence", Shape::Number)
            .describe("Self-reported confidence between 0 and 1"),
    );
    OutputContract::new(name, fields).with_summary_field(summary_field)
}

/// Everything a specialist needs for one call
#[derive(Debug, Clone, Default)]
pub struct SpecialistRequest {
    pub query: String,
    pub context: Arc<AnalysisContext>,
    pub sub_questions: Vec<String>,
    pub rationale: Option<String>,
    /// Findings of earlier chain steps; empty in parallel mode
    pub previous_results: ResultMap,
}

impl SpecialistRequest {
    pub fn new(query: impl Into<String>, context: Arc<AnalysisContext>) -> Self {
        Self {
            query: query.into(),
            context,
            ..Self::default()
        }
    }
}

/// Trait for a dispatchable specialist
#[async_trait]
pub trait Specialist: Send + Sync {
    fn kind(&self) -> SpecialistKind;

    fn descriptor(&self) -> &SpecialistDescriptor {
        &profile(self.kind()).descriptor
    }

    /// Never fails: errors come back as a `success: false` envelope
    async fn analyze(&self, request: &SpecialistRequest) -> SpecialistResult;
}

/// Generic specialist agent parameterized by a domain profile
pub struct SpecialistAgent {
    profile: &'static SpecialistProfile,
    kind: SpecialistKind,
    base: BaseAgent,
    data: Arc<dyn SupplementaryData>,
    data_timeout: Duration,
}

impl SpecialistAgent {
    pub fn new(
        kind: SpecialistKind,
        generator: Arc<dyn Generator>,
        data: Arc<dyn SupplementaryData>,
        data_timeout: Duration,
    ) -> Self {
        Self {
            profile: profile(kind),
            kind,
            base: BaseAgent::new(generator),
            data,
            data_timeout,
        }
    }

    pub fn build_prompt(&self, request: &SpecialistRequest, supplementary: &str) -> String {
        let mut prompt = format!(
            "BUSINESS QUESTION:\n{}\n\nBUSINESS CONTEXT:\n{}\n",
            request.query.trim(),
            request.context.render()
        );

        if let Some(rationale) = request.rationale.as_deref().filter(|r| !r.trim().is_empty()) {
            prompt.push_str(&format!("\nWHY YOU WERE CONSULTED:\n{}\n", rationale));
        }

        if !request.sub_questions.is_empty() {
            prompt.push_str("\nSPECIFIC QUESTIONS TO ANSWER:\n");
            for q in &request.sub_questions {
                prompt.push_str(&format!("- {}\n", q));
            }
        }

        prompt.push_str("\nANALYSIS CHECKLIST:\n");
        for item in self.profile.guidance {
            prompt.push_str(&format!("- {}\n", item));
        }

        prompt.push_str(&format!("\nSUPPLEMENTARY DATA:\n{}\n", supplementary));

        if !request.previous_results.is_empty() {
            prompt.push_str("\nFINDINGS FROM OTHER SPECIALISTS:\n");
            prompt.push_str(&render_previous_results(&request.previous_results));
            prompt.push_str(
                "Build on these findings where relevant; if one is unavailable, rely on your own analysis.\n",
            );
        }

        prompt.push_str(&format!(
            "\nReturn your {} as a single JSON object.",
            self.profile.descriptor.display_name.to_lowercase()
        ));

        prompt
    }

    async fn gather_supplementary(&self, context: &AnalysisContext) -> String {
        let mut sections = Vec::new();

        for source in self.profile.sources {
            match self.read_source(*source, context).await {
                Some(Ok(Some(section))) => sections.push(section),
                Some(Ok(None)) | None => {}
                Some(Err(reason)) => {
                    warn!(kind = %self.kind, source = ?source, reason = %reason, "Supplementary data unavailable");
                }
            }
        }

        if sections.is_empty() {
            "No supplementary data available; rely on domain knowledge.".to_string()
        } else {
            sections.join("\n")
        }
    }

    /// `None` when the context lacks the key this source needs
    async fn read_source(
        &self,
        source: SupplementarySource,
        context: &AnalysisContext,
    ) -> Option<Result<Option<String>, String>> {
        let restaurant_id = context.restaurant_id.as_deref();
        let location = context.location.as_deref();

        let read = async {
            match source {
                SupplementarySource::SalesHistory => {
                    let id = restaurant_id?;
                    Some(
                        self.data
                            .recent_sales(id, SALES_LOOKBACK_DAYS)
                            .await
                            .map(|rows| section("Recent daily sales", &rows)),
                    )
                }
                SupplementarySource::CompetitorRecords => {
                    let loc = location?;
                    Some(
                        self.data
                            .competitor_records(loc)
                            .await
                            .map(|rows| section("Competitor records", &rows)),
                    )
                }
                SupplementarySource::MenuItems => {
                    let id = restaurant_id?;
                    Some(
                        self.data
                            .menu_items(id)
                            .await
                            .map(|rows| section("Current menu items", &rows)),
                    )
                }
            }
        };

        match tokio::time::timeout(self.data_timeout, read).await {
            Ok(Some(Ok(section))) => Some(Ok(section)),
            Ok(Some(Err(e))) => Some(Err(e.to_string())),
            Ok(None) => None,
            Err(_) => Some(Err(OrchestrationError::Timeout(self.data_timeout).to_string())),
        }
    }
}

fn section<T: serde::Serialize>(title: &str, rows: &[T]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    serde_json::to_string(rows)
        .ok()
        .map(|json| format!("{} ({} rows): {}", title, rows.len(), json))
}

fn render_previous_results(previous: &ResultMap) -> String {
    let mut out = String::new();
    for (kind, result) in previous {
        if result.success {
            let fields = Value::Object(result.fields.clone()).to_string();
            let carried: String = fields.chars().take(MAX_CARRIED_CHARS).collect();
            out.push_str(&format!("[{}] {}\n", kind, carried));
        } else {
            out.push_str(&format!(
                "[{}] unavailable ({})\n",
                kind,
                result.message.as_deref().unwrap_or("no details")
            ));
        }
    }
    out
}

#[async_trait]
impl Specialist for SpecialistAgent {
    fn kind(&self) -> SpecialistKind {
        self.kind
    }

    async fn analyze(&self, request: &SpecialistRequest) -> SpecialistResult {
        let contract = &self.profile.contract;

        if request.query.trim().is_empty() {
            return contract.failure("Query must not be empty");
        }

        let supplementary = self.gather_supplementary(&request.context).await;
        let prompt = self.build_prompt(request, &supplementary);

        debug!(kind = %self.kind, prompt_len = prompt.len(), "Specialist prompt rendered");

        match self
            .base
            .generate_validated(&prompt, self.profile.system_role, contract)
            .await
        {
            Ok(result) => {
                info!(kind = %self.kind, "Specialist analysis complete");
                result
            }
            Err(e) => {
                warn!(kind = %self.kind, error = %e, "Specialist analysis failed");
                contract.failure(format!(
                    "{} could not complete the analysis: {}",
                    self.profile.descriptor.display_name, e
                ))
            }
        }
    }
}
