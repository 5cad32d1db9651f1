//! Pipelines cached per particle type for the lifetime of the renderer

use std::collections::HashMap;

use crate::batch::ParticleTypeId;

/// Create-if-absent registry; each pipeline is owned here and only lent out.
#[derive(Debug)]
pub struct PipelineRegistry<P> {
    entries: HashMap<ParticleTypeId, P>,
}

impl<P> Default for PipelineRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PipelineRegistry<P> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get_or_insert_with(&mut self, id: ParticleTypeId, create: impl FnOnce() -> P) -> &P {
        self.entries.entry(id).or_insert_with(|| {
            log::debug!("Creating pipeline for particle type {}", id.0);
            create()
        })
    }

    pub fn get(&self, id: ParticleTypeId) -> Option<&P> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: ParticleTypeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
