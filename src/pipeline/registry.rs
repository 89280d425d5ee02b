// ABOUTME: Explicit stage-to-behaviours registry built at startup.
// ABOUTME: Factories produce fresh behaviour instances per run, in registration order.

use std::collections::HashMap;

use super::{Behaviour, Stage};

type BehaviourFactory = Box<dyn Fn() -> Box<dyn Behaviour> + Send + Sync>;

#[derive(Default)]
pub struct BehaviourRegistry {
    stages: HashMap<Stage, Vec<BehaviourFactory>>,
}

impl std::fmt::Debug for BehaviourRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for stage in Stage::SEQUENCE.iter().chain([&Stage::DeployFailed]) {
            map.entry(stage, &self.count(*stage));
        }
        map.finish()
    }
}

impl BehaviourRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a behaviour factory to `stage`.
    pub fn register<B, F>(&mut self, stage: Stage, factory: F) -> &mut Self
    where
        B: Behaviour + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.stages
            .entry(stage)
            .or_default()
            .push(Box::new(move || Box::new(factory())));
        self
    }

    /// Fresh instances for `stage`, in registration order.
    pub fn resolve(&self, stage: Stage) -> Vec<Box<dyn Behaviour>> {
        self.stages
            .get(&stage)
            .map(|factories| factories.iter().map(|f| f()).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.stages.get(&stage).map_or(0, Vec::len)
    }
}
