//! Financial analyst
//!
//! Works from the caller's financial snapshot and, when a restaurant id is
//! known, recent daily sales. Without either it falls back to industry
//! benchmarks (food cost 28-35%, labor 25-35%).

use crate::contract::{Field, Shape};
use crate::models::{AgentKind, SpecialistDescriptor, SpecialistKind};
use crate::specialists::{specialist_contract, SpecialistProfile, SupplementarySource};

const SYSTEM_ROLE: &str = r#"You are a restaurant financial analyst and profitability advisor.

You read revenue and cost structure, estimate margins, and find the cost
reductions and revenue levers with the biggest payoff. Use supplied figures
and sales history first; where they are missing use industry benchmarks
and label them as estimates.

Guidelines:
- Express margins and cost ratios in percent
- Estimate savings per opportunity in currency per month
- Rate overall financial risk as low, medium or high"#;

const GUIDANCE: &[&str] = &[
    "Estimate revenue, profit margin, food cost % and labor cost %",
    "Identify cost reduction opportunities with estimated monthly savings",
    "Identify revenue opportunities",
    "Give concrete, prioritized financial recommendations",
    "Rate the overall financial risk",
];

pub(super) fn profile() -> SpecialistProfile {
    SpecialistProfile {
        descriptor: SpecialistDescriptor {
            kind: AgentKind::Specialist(SpecialistKind::Financial),
            display_name: "Financial Analyst",
            description: "Analyzes margins, costs and revenue levers",
            capabilities: vec![
                "margin analysis",
                "cost reduction",
                "revenue optimization",
                "financial risk assessment",
            ],
        },
        system_role: SYSTEM_ROLE,
        contract: specialist_contract(
            "financial_analysis",
            "financialSummary",
            vec![
                Field::required("financialSummary", Shape::String),
                Field::required(
                    "metrics",
                    Shape::Object(vec![
                        Field::required("revenueEstimate", Shape::Number),
                        Field::required("profitMargin", Shape::Number),
                        Field::required("foodCostPercentage", Shape::Number),
                        Field::required("laborCostPercentage", Shape::Number),
                    ]),
                ),
                Field::required(
                    "costReductionOpportunities",
                    Shape::list(Shape::Object(vec![
                        Field::required("area", Shape::String),
                        Field::required("estimatedSavings", Shape::Number),
                        Field::required("description", Shape::String),
                    ])),
                ),
                Field::required("revenueOpportunities", Shape::strings()),
                Field::required("financialRecommendations", Shape::strings()),
                Field::required("riskLevel", Shape::Enum(&["medium", "low", "high"])),
            ],
        ),
        guidance: GUIDANCE,
        sources: &[SupplementarySource::SalesHistory],
    }
}
