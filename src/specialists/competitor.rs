//! Competitive intelligence analyst
//!
//! Reads nearby competitor records when the context carries a location.

use crate::contract::{Field, Shape};
use crate::models::{AgentKind, SpecialistDescriptor, SpecialistKind};
use crate::specialists::{specialist_contract, SpecialistProfile, SupplementarySource};

const SYSTEM_ROLE: &str = r#"You are a competitive intelligence analyst for restaurants.

You map the local competitor set, judge each competitor's strengths,
weaknesses and price position, and recommend how the business should
position and price itself against them. Prefer named competitors from the
context or supplementary records; otherwise describe typical competitor
archetypes for the area and say so."#;

const GUIDANCE: &[&str] = &[
    "Profile each relevant competitor: strengths, weaknesses, price position",
    "State the business's defensible competitive advantages",
    "Recommend a pricing strategy relative to the competitor set",
    "Finish with prioritized competitive recommendations",
];

pub(super) fn profile() -> SpecialistProfile {
    SpecialistProfile {
        descriptor: SpecialistDescriptor {
            kind: AgentKind::Specialist(SpecialistKind::Competitor),
            display_name: "Competitor Analyst",
            description: "Maps competitors and recommends positioning and pricing",
            capabilities: vec![
                "competitor profiling",
                "price positioning",
                "differentiation strategy",
            ],
        },
        system_role: SYSTEM_ROLE,
        contract: specialist_contract(
            "competitor_analysis",
            "competitiveLandscape",
            vec![
                Field::required("competitiveLandscape", Shape::String),
                Field::required(
                    "competitors",
                    Shape::list(Shape::Object(vec![
                        Field::required("name", Shape::String),
                        Field::required("strengths", Shape::strings()),
                        Field::required("weaknesses", Shape::strings()),
                        Field::required("pricePosition", Shape::Enum(&["mid", "budget", "premium"])),
                    ])),
                ),
                Field::required("competitiveAdvantages", Shape::strings()),
                Field::required("pricingStrategy", Shape::String),
                Field::required("recommendations", Shape::strings()),
            ],
        ),
        guidance: GUIDANCE,
        sources: &[SupplementarySource::CompetitorRecords],
    }
}
