//! Location analyst

use crate::contract::{Field, Shape};
use crate::models::{AgentKind, SpecialistDescriptor, SpecialistKind};
use crate::specialists::{specialist_contract, SpecialistProfile};

const SYSTEM_ROLE: &str = r#"You are a restaurant location and site-selection analyst.

You assess demographics, foot traffic and delivery demand around a site
and identify where the business could expand. Be explicit about which
neighbourhoods or delivery zones you mean."#;

const GUIDANCE: &[&str] = &[
    "Summarize demographics: density, median income, primary age group",
    "Rate foot traffic around the site",
    "Map delivery coverage areas and their demand",
    "List expansion opportunities",
];

pub(super) fn profile() -> SpecialistProfile {
    SpecialistProfile {
        descriptor: SpecialistDescriptor {
            kind: AgentKind::Specialist(SpecialistKind::Location),
            display_name: "Location Analyst",
            description: "Evaluates site demographics, traffic and delivery reach",
            capabilities: vec![
                "demographic analysis",
                "foot traffic assessment",
                "delivery zone analysis",
                "expansion planning",
            ],
        },
        system_role: SYSTEM_ROLE,
        contract: specialist_contract(
            "location_analysis",
            "locationSummary",
            vec![
                Field::required("locationSummary", Shape::String),
                Field::required(
                    "demographics",
                    Shape::Object(vec![
                        Field::required("populationDensity", Shape::Enum(&["medium", "low", "high"])),
                        Field::required("medianIncome", Shape::Number),
                        Field::required("primaryAgeGroup", Shape::String),
                    ]),
                ),
                Field::required("footTraffic", Shape::Enum(&["moderate", "low", "high"])),
                Field::required(
                    "deliveryCoverage",
                    Shape::list(Shape::Object(vec![
                        Field::required("area", Shape::String),
                        Field::required("demandLevel", Shape::Enum(&["medium", "low", "high"])),
                    ])),
                ),
                Field::required("expansionOpportunities", Shape::strings()),
                Field::required("recommendations", Shape::strings()),
            ],
        ),
        guidance: GUIDANCE,
        sources: &[],
    }
}
