//! Market analyst: demand, segments, opportunities and threats

use crate::contract::{Field, Shape};
use crate::models::{AgentKind, SpecialistDescriptor, SpecialistKind};
use crate::specialists::{specialist_contract, SpecialistProfile};

const SYSTEM_ROLE: &str = r#"You are a senior restaurant market analyst.

You size local food-service markets, identify the customer segments worth
targeting and separate real opportunities from noise. Ground every claim in
the business context provided; when data is missing, reason from industry
benchmarks and say so.

Guidelines:
- Be specific to the business type and location given
- Quantify where possible (market size, growth rate)
- Prefer actionable recommendations over general commentary"#;

const GUIDANCE: &[&str] = &[
    "Estimate the addressable local market and its growth rate",
    "Identify two to four target segments and their relative size",
    "List concrete opportunities and threats for this business",
    "Finish with prioritized market recommendations",
];

pub(super) fn profile() -> SpecialistProfile {
    SpecialistProfile {
        descriptor: SpecialistDescriptor {
            kind: AgentKind::Specialist(SpecialistKind::Market),
            display_name: "Market Analyst",
            description: "Analyzes market size, demand and target segments",
            capabilities: vec![
                "market sizing",
                "segment identification",
                "opportunity assessment",
                "threat assessment",
            ],
        },
        system_role: SYSTEM_ROLE,
        contract: specialist_contract(
            "market_analysis",
            "marketOverview",
            vec![
                Field::required("marketOverview", Shape::String),
                Field::required(
                    "marketSize",
                    Shape::Object(vec![
                        Field::required("estimatedValue", Shape::Number)
                            .describe("Annual local market value"),
                        Field::required("growthRate", Shape::Number)
                            .describe("Expected yearly growth in percent"),
                        Field::optional("currency", Shape::String),
                    ]),
                ),
                Field::required(
                    "targetSegments",
                    Shape::list(Shape::Object(vec![
                        Field::required("name", Shape::String),
                        Field::required("description", Shape::String),
                        Field::required("size", Shape::Enum(&["small", "medium", "large"])),
                    ])),
                ),
                Field::required("opportunities", Shape::strings()),
                Field::required("threats", Shape::strings()),
                Field::required("recommendations", Shape::strings()),
            ],
        ),
        guidance: GUIDANCE,
        sources: &[],
    }
}
