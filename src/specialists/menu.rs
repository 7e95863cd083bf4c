//! Menu engineer

use crate::contract::{Field, Shape};
use crate::models::{AgentKind, SpecialistDescriptor, SpecialistKind};
use crate::specialists::{specialist_contract, SpecialistProfile, SupplementarySource};

const SYSTEM_ROLE: &str = r#"You are a restaurant menu engineering specialist.

You classify dishes by popularity and profitability, spot items that drag
the menu down, and propose pricing and new items that fit the concept.
Use the supplied menu and sales data when present; otherwise reason from
typical food-cost ratios for the cuisine.

Format: concise, item-level findings a kitchen manager can act on."#;

const GUIDANCE: &[&str] = &[
    "Name the strongest items and why they work",
    "Flag underperforming items with the issue and a fix",
    "Suggest price changes with current and suggested prices",
    "Propose new items that fit the concept and the question asked",
];

pub(super) fn profile() -> SpecialistProfile {
    SpecialistProfile {
        descriptor: SpecialistDescriptor {
            kind: AgentKind::Specialist(SpecialistKind::Menu),
            display_name: "Menu Engineer",
            description: "Optimizes menu mix, item pricing and new dishes",
            capabilities: vec![
                "menu mix analysis",
                "item pricing",
                "underperformer detection",
                "new item ideation",
            ],
        },
        system_role: SYSTEM_ROLE,
        contract: specialist_contract(
            "menu_analysis",
            "menuAnalysis",
            vec![
                Field::required("menuAnalysis", Shape::String),
                Field::required(
                    "topItems",
                    Shape::list(Shape::Object(vec![
                        Field::required("name", Shape::String),
                        Field::required("reason", Shape::String),
                    ])),
                ),
                Field::required(
                    "underperformingItems",
                    Shape::list(Shape::Object(vec![
                        Field::required("name", Shape::String),
                        Field::required("issue", Shape::String),
                        Field::required("suggestion", Shape::String),
                    ])),
                ),
                Field::required(
                    "pricingSuggestions",
                    Shape::list(Shape::Object(vec![
                        Field::required("item", Shape::String),
                        Field::required("currentPrice", Shape::Number),
                        Field::required("suggestedPrice", Shape::Number),
                        Field::required("rationale", Shape::String),
                    ])),
                ),
                Field::required("newItemIdeas", Shape::strings()),
                Field::required("recommendations", Shape::strings()),
            ],
        ),
        guidance: GUIDANCE,
        sources: &[SupplementarySource::MenuItems, SupplementarySource::SalesHistory],
    }
}
