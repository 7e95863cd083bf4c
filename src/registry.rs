//! Agent registry
//!
//! Total mapping from [`SpecialistKind`] to a constructed specialist, plus
//! the coordinator and the shared base agent. Built once, read-only after.

use std::sync::Arc;

use crate::config::Settings;
use crate::coordinator::{self, Coordinator, LlmCoordinator};
use crate::llm::Generator;
use crate::models::{SpecialistDescriptor, SpecialistKind};
use crate::specialists::{BaseAgent, Specialist, SpecialistAgent};
use crate::supplementary::SupplementaryData;

pub struct AgentRegistry {
    specialists: [Arc<dyn Specialist>; 7],
    coordinator: Arc<dyn Coordinator>,
    base: BaseAgent,
}

impl AgentRegistry {
    /// Every specialist backed by `generator`; the coordinator is generative too
    pub fn new(
        generator: Arc<dyn Generator>,
        data: Arc<dyn SupplementaryData>,
        settings: &Settings,
    ) -> Self {
        let specialists = SpecialistKind::ALL.map(|kind| {
            Arc::new(SpecialistAgent::new(
                kind,
                generator.clone(),
                data.clone(),
                settings.supplementary_timeout,
            )) as Arc<dyn Specialist>
        });

        Self {
            specialists,
            coordinator: Arc::new(LlmCoordinator::new(generator.clone())),
            base: BaseAgent::new(generator),
        }
    }

    /// Replace the specialist for its own kind
    pub fn register(&mut self, specialist: Arc<dyn Specialist>) {
        let slot = specialist.kind().index();
        self.specialists[slot] = specialist;
    }

    pub fn set_coordinator(&mut self, coordinator: Arc<dyn Coordinator>) {
        self.coordinator = coordinator;
    }

    pub fn get(&self, kind: SpecialistKind) -> Arc<dyn Specialist> {
        self.specialists[kind.index()].clone()
    }

    pub fn coordinator(&self) -> Arc<dyn Coordinator> {
        self.coordinator.clone()
    }

    /// Generic prompt + contract capability shared by every agent
    pub fn base(&self) -> &BaseAgent {
        &self.base
    }

    /// Coordinator first, then specialists in [`SpecialistKind::ALL`] order
    pub fn descriptors(&self) -> Vec<SpecialistDescriptor> {
        std::iter::once(coordinator::descriptor())
            .chain(self.specialists.iter().map(|s| s.descriptor().clone()))
            .collect()
    }
}
