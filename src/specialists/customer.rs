//! Customer insights analyst

use crate::contract::{Field, Shape};
use crate::models::{AgentKind, SpecialistDescriptor, SpecialistKind};
use crate::specialists::{specialist_contract, SpecialistProfile};

const SYSTEM_ROLE: &str = r#"You are a restaurant customer insights analyst.

You describe who the guests are, how they feel about the experience and
what keeps them coming back. Segment customers by behaviour, estimate each
segment's share, and tie pain points to concrete retention tactics."#;

const GUIDANCE: &[&str] = &[
    "Describe customer segments with characteristics and share (0-100)",
    "Assess overall sentiment and give a score between -1 and 1",
    "List the most common pain points",
    "Recommend retention strategies tied to those pain points",
];

pub(super) fn profile() -> SpecialistProfile {
    SpecialistProfile {
        descriptor: SpecialistDescriptor {
            kind: AgentKind::Specialist(SpecialistKind::Customer),
            display_name: "Customer Insights Analyst",
            description: "Segments guests and analyzes sentiment and retention",
            capabilities: vec![
                "customer segmentation",
                "sentiment analysis",
                "retention strategy",
            ],
        },
        system_role: SYSTEM_ROLE,
        contract: specialist_contract(
            "customer_analysis",
            "customerSummary",
            vec![
                Field::required("customerSummary", Shape::String),
                Field::required(
                    "segments",
                    Shape::list(Shape::Object(vec![
                        Field::required("name", Shape::String),
                        Field::required("characteristics", Shape::strings()),
                        Field::required("share", Shape::Number)
                            .describe("Share of customers in percent"),
                    ])),
                ),
                Field::required(
                    "sentiment",
                    Shape::Object(vec![
                        Field::required(
                            "overall",
                            Shape::Enum(&["neutral", "positive", "negative", "mixed"]),
                        ),
                        Field::required("score", Shape::Number),
                    ]),
                ),
                Field::required("painPoints", Shape::strings()),
                Field::required("retentionStrategies", Shape::strings()),
                Field::required("recommendations", Shape::strings()),
            ],
        ),
        guidance: GUIDANCE,
        sources: &[],
    }
}
