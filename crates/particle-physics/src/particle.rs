//! Particle record and the packed layout shared with the GPU stages

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::Rng;

use crate::constants::{PARTICLE_MASS, PARTICLE_RADIUS};
use crate::error::LayoutError;

/// GPU-compatible particle structure.
///
/// The byte layout is a contract with `update.wgsl` (storage array element)
/// and with the render stage's per-instance vertex layout. Change all three
/// together or not at all.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Position in canvas pixels
    pub position: [f32; 2],
    /// Velocity in pixels per simulation second
    pub velocity: [f32; 2],
    /// Visual radius
    pub radius: f32,
    /// Carried through the compute stage unchanged
    pub mass: f32,
}

/// Size of one packed particle record in bytes
pub const PARTICLE_STRIDE: usize = std::mem::size_of::<Particle>();

/// Number of `f32` values in one packed record
pub const FLOATS_PER_PARTICLE: usize = PARTICLE_STRIDE / std::mem::size_of::<f32>();

pub const OFFSET_POSITION: usize = std::mem::offset_of!(Particle, position);
pub const OFFSET_VELOCITY: usize = std::mem::offset_of!(Particle, velocity);
pub const OFFSET_RADIUS: usize = std::mem::offset_of!(Particle, radius);
pub const OFFSET_MASS: usize = std::mem::offset_of!(Particle, mass);

impl Particle {
    pub fn new(position: Vec2, velocity: Vec2, radius: f32, mass: f32) -> Self {
        Self {
            position: position.to_array(),
            velocity: velocity.to_array(),
            radius,
            mass,
        }
    }

    /// A particle with zero velocity and the default radius/mass
    pub fn at_rest(position: Vec2) -> Self {
        Self::new(position, Vec2::ZERO, PARTICLE_RADIUS, PARTICLE_MASS)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::from_array(self.velocity)
    }
}

/// Fixed-cardinality, ordered particle collection.
///
/// Serialized once into the initial contents of both storage regions.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    pub fn new(particles: Vec<Particle>) -> Result<Self, LayoutError> {
        if particles.is_empty() {
            return Err(LayoutError::Empty);
        }
        Ok(Self { particles })
    }

    /// Uniformly scatter `count` resting particles over a `width` x `height` canvas
    pub fn scatter<R: Rng + ?Sized>(
        count: usize,
        width: f32,
        height: f32,
        rng: &mut R,
    ) -> Result<Self, LayoutError> {
        let particles = (0..count)
            .map(|_| {
                let position = Vec2::new(
                    rng.random::<f32>() * width,
                    rng.random::<f32>() * height,
                );
                Particle::at_rest(position)
            })
            .collect();
        Self::new(particles)
    }

    /// Rebuild a set from a flat buffer produced by [`ParticleSet::pack`]
    pub fn unpack(data: &[f32]) -> Result<Self, LayoutError> {
        if data.len() % FLOATS_PER_PARTICLE != 0 {
            return Err(LayoutError::Misaligned { len: data.len() });
        }
        let particles: &[Particle] = bytemuck::cast_slice(data);
        Self::new(particles.to_vec())
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Flat numeric buffer, `FLOATS_PER_PARTICLE` values per record
    pub fn pack(&self) -> Vec<f32> {
        bytemuck::cast_slice::<Particle, f32>(&self.particles).to_vec()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }

    /// Total size of the packed records in bytes
    pub fn byte_len(&self) -> usize {
        self.particles.len() * PARTICLE_STRIDE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_layout_matches_contract() {
        assert_eq!(PARTICLE_STRIDE, 24);
        assert_eq!(FLOATS_PER_PARTICLE, 6);
        assert_eq!(OFFSET_POSITION, 0);
        assert_eq!(OFFSET_VELOCITY, 8);
        assert_eq!(OFFSET_RADIUS, 16);
        assert_eq!(OFFSET_MASS, 20);
    }

    #[test]
    fn test_pack_field_order() {
        let set = ParticleSet::new(vec![Particle::new(
            Vec2::new(1.0, 2.0),
            Vec2::new(3.0, 4.0),
            5.0,
            6.0,
        )])
        .unwrap();

        assert_eq!(set.pack(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(set.as_bytes().len(), set.byte_len());
    }

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(ParticleSet::new(Vec::new()), Err(LayoutError::Empty));
        assert_eq!(ParticleSet::unpack(&[]), Err(LayoutError::Empty));
    }

    #[test]
    fn test_unpack_rejects_partial_record() {
        assert_eq!(
            ParticleSet::unpack(&[0.0; 7]),
            Err(LayoutError::Misaligned { len: 7 })
        );
    }

    #[test]
    fn test_unpack_restores_packed_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = ParticleSet::scatter(32, 800.0, 600.0, &mut rng).unwrap();
        let restored = ParticleSet::unpack(&set.pack()).unwrap();
        assert_eq!(restored, set);
    }

    #[test]
    fn test_scatter_stays_inside_canvas() {
        let mut rng = StdRng::seed_from_u64(42);
        let set = ParticleSet::scatter(1_000, 640.0, 480.0, &mut rng).unwrap();

        assert_eq!(set.len(), 1_000);
        for p in set.particles() {
            assert!((0.0..640.0).contains(&p.position[0]));
            assert!((0.0..480.0).contains(&p.position[1]));
            assert_eq!(p.velocity, [0.0, 0.0]);
            assert_eq!(p.radius, PARTICLE_RADIUS);
            assert_eq!(p.mass, PARTICLE_MASS);
        }
    }
}
