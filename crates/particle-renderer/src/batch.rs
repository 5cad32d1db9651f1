//! Per-frame grouping of CPU-driven particles into fixed-capacity draw batches

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Instances per draw batch
pub const BATCH_CAPACITY: usize = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleTypeId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Alpha,
    Additive,
}

impl BlendMode {
    pub fn blend_state(self) -> wgpu::BlendState {
        match self {
            BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }
}

/// Shared visual type: every particle of a type is drawn with the same
/// radius, colour and pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleType {
    pub id: ParticleTypeId,
    pub radius: f32,
    /// Linear RGB
    pub color: [f32; 3],
    pub blend: BlendMode,
}

/// Instance record for `batch.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BatchInstance {
    pub position: [f32; 2],
    pub radius: f32,
    pub color: [f32; 3],
}

pub const BATCH_INSTANCE_STRIDE: usize = std::mem::size_of::<BatchInstance>();

impl BatchInstance {
    pub fn new(particle_type: &ParticleType, position: Vec2) -> Self {
        Self {
            position: position.to_array(),
            radius: particle_type.radius,
            color: particle_type.color,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DrawBatch {
    particle_type: ParticleType,
    instances: Vec<BatchInstance>,
    capacity: usize,
}

impl DrawBatch {
    fn new(particle_type: ParticleType, capacity: usize) -> Self {
        Self {
            particle_type,
            instances: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn particle_type(&self) -> &ParticleType {
        &self.particle_type
    }

    pub fn instances(&self) -> &[BatchInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.instances.len() >= self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// One frame's generation of batches.
///
/// `begin_frame` resets everything: the batches, the per-type index and the
/// last-drawn type. Types keep the order they were first drawn in.
#[derive(Debug)]
pub struct BatchBuilder {
    capacity: usize,
    groups: Vec<(ParticleTypeId, Vec<DrawBatch>)>,
    index: HashMap<ParticleTypeId, usize>,
    current: Option<(ParticleTypeId, usize)>,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new(BATCH_CAPACITY)
    }
}

impl BatchBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            groups: Vec::new(),
            index: HashMap::new(),
            current: None,
        }
    }

    pub fn begin_frame(&mut self) {
        self.groups.clear();
        self.index.clear();
        self.current = None;
    }

    /// Type of the most recent `push` this frame
    pub fn current_type(&self) -> Option<ParticleTypeId> {
        self.current.map(|(id, _)| id)
    }

    pub fn push(&mut self, particle_type: &ParticleType, position: Vec2) {
        let group = match self.current {
            Some((id, group)) if id == particle_type.id => group,
            _ => {
                let next = self.groups.len();
                let group = *self.index.entry(particle_type.id).or_insert(next);
                if group == next {
                    self.groups.push((particle_type.id, Vec::new()));
                }
                self.current = Some((particle_type.id, group));
                group
            }
        };

        let capacity = self.capacity;
        let batches = &mut self.groups[group].1;
        if batches.last().is_none_or(DrawBatch::is_full) {
            batches.push(DrawBatch::new(*particle_type, capacity));
        }
        if let Some(batch) = batches.last_mut() {
            batch.instances.push(BatchInstance::new(particle_type, position));
        }
    }

    /// All batches, grouped by type in first-drawn order
    pub fn batches(&self) -> impl Iterator<Item = &DrawBatch> {
        self.groups.iter().flat_map(|(_, batches)| batches.iter())
    }

    pub fn batches_for(&self, id: ParticleTypeId) -> &[DrawBatch] {
        self.index
            .get(&id)
            .map(|&group| self.groups[group].1.as_slice())
            .unwrap_or(&[])
    }

    pub fn batch_count(&self) -> usize {
        self.groups.iter().map(|(_, batches)| batches.len()).sum()
    }

    pub fn instance_count(&self) -> usize {
        self.batches().map(DrawBatch::len).sum()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle_type(id: u32) -> ParticleType {
        ParticleType {
            id: ParticleTypeId(id),
            radius: 2.0 + id as f32,
            color: [0.1, 0.2, 0.3],
            blend: BlendMode::Alpha,
        }
    }

    #[test]
    fn test_instance_layout() {
        assert_eq!(BATCH_INSTANCE_STRIDE, 24);
        assert_eq!(std::mem::offset_of!(BatchInstance, position), 0);
        assert_eq!(std::mem::offset_of!(BatchInstance, radius), 8);
        assert_eq!(std::mem::offset_of!(BatchInstance, color), 12);
    }

    #[test]
    fn test_overflow_opens_new_batch() {
        let capacity = 4;
        let mut builder = BatchBuilder::new(capacity);
        let ty = particle_type(0);

        for i in 0..capacity {
            builder.push(&ty, Vec2::splat(i as f32));
        }
        assert_eq!(builder.batch_count(), 1);
        assert!(builder.batches_for(ty.id)[0].is_full());

        builder.push(&ty, Vec2::splat(99.0));
        let batches = builder.batches_for(ty.id);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), capacity);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1].instances()[0].position, [99.0, 99.0]);
    }

    #[test]
    fn test_no_batch_exceeds_capacity() {
        let mut builder = BatchBuilder::new(7);
        let types = [particle_type(0), particle_type(1), particle_type(2)];

        for i in 0..100 {
            builder.push(&types[i % 3], Vec2::ZERO);
        }

        assert_eq!(builder.instance_count(), 100);
        assert!(builder.batches().all(|b| !b.is_empty() && b.len() <= 7));
        // 34 + 33 + 33 instances
        assert_eq!(builder.batch_count(), 5 + 5 + 5);
    }

    #[test]
    fn test_types_stay_separate_and_ordered() {
        let mut builder = BatchBuilder::new(10);
        let a = particle_type(5);
        let b = particle_type(2);

        builder.push(&a, Vec2::ZERO);
        builder.push(&b, Vec2::ONE);
        builder.push(&a, Vec2::ONE);
        assert_eq!(builder.current_type(), Some(a.id));

        let order: Vec<ParticleTypeId> = builder.batches().map(|b| b.particle_type().id).collect();
        assert_eq!(order, vec![a.id, b.id]);
        assert_eq!(builder.batches_for(a.id)[0].len(), 2);
        assert_eq!(builder.batches_for(b.id)[0].len(), 1);
        assert_eq!(builder.batches_for(b.id)[0].instances()[0].radius, b.radius);
    }

    #[test]
    fn test_begin_frame_resets_generation() {
        let mut builder = BatchBuilder::new(3);
        let ty = particle_type(1);
        for _ in 0..5 {
            builder.push(&ty, Vec2::ZERO);
        }

        builder.begin_frame();
        assert_eq!(builder.batch_count(), 0);
        assert_eq!(builder.current_type(), None);
        assert!(builder.batches_for(ty.id).is_empty());

        builder.push(&ty, Vec2::ZERO);
        assert_eq!(builder.batch_count(), 1);
    }
}
