//! Food & consumer trend analyst

use crate::contract::{Field, Shape};
use crate::models::{AgentKind, SpecialistDescriptor, SpecialistKind};
use crate::specialists::{specialist_contract, SpecialistProfile};

const SYSTEM_ROLE: &str = r#"You are a food-service trend analyst.

You track emerging dining, menu and delivery trends, seasonal demand
patterns and shifting consumer preferences, and judge how relevant each
trend is for this particular business."#;

const GUIDANCE: &[&str] = &[
    "List emerging trends with relevance and timeframe",
    "Describe seasonal demand patterns",
    "Summarize shifting consumer preferences",
    "Recommend which trends to act on first",
];

pub(super) fn profile() -> SpecialistProfile {
    SpecialistProfile {
        descriptor: SpecialistDescriptor {
            kind: AgentKind::Specialist(SpecialistKind::Trend),
            display_name: "Trend Analyst",
            description: "Tracks food, dining and delivery trends",
            capabilities: vec![
                "trend spotting",
                "seasonality analysis",
                "consumer preference tracking",
            ],
        },
        system_role: SYSTEM_ROLE,
        contract: specialist_contract(
            "trend_analysis",
            "trendSummary",
            vec![
                Field::required("trendSummary", Shape::String),
                Field::required(
                    "emergingTrends",
                    Shape::list(Shape::Object(vec![
                        Field::required("name", Shape::String),
                        Field::required("description", Shape::String),
                        Field::required("relevance", Shape::Enum(&["medium", "low", "high"])),
                        Field::required("timeframe", Shape::String),
                    ])),
                ),
                Field::required("seasonalPatterns", Shape::strings()),
                Field::required("consumerPreferences", Shape::strings()),
                Field::required("recommendations", Shape::strings()),
            ],
        ),
        guidance: GUIDANCE,
        sources: &[],
    }
}
