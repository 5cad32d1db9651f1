//! GPU-resident double-buffered particle storage

use particle_physics::{ParticleSet, PARTICLE_STRIDE};
use wgpu::util::DeviceExt;

use crate::double_buffer::{DoubleBuffer, Parity};
use crate::error::{scoped, SimulationError};

const REGION_LABELS: [&str; 2] = ["Particle Buffer 0", "Particle Buffer 1"];

/// Owns both particle regions. Nothing outside the compute and render
/// stages gets at the buffers, and only through the parity accessors.
pub struct ParticleStorage {
    regions: DoubleBuffer<wgpu::Buffer>,
    particle_count: u32,
    region_size: u64,
}

impl ParticleStorage {
    /// Upload the packed particle set identically into both regions
    pub async fn new(device: &wgpu::Device, particles: &ParticleSet) -> Result<Self, SimulationError> {
        let contents = particles.as_bytes();
        let region_size = contents.len() as u64;
        let expected = (particles.len() * PARTICLE_STRIDE) as u64;
        if region_size != expected {
            return Err(SimulationError::LayoutMismatch {
                what: "particle region",
                expected,
                actual: region_size,
            });
        }

        let limits = device.limits();
        let limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        if region_size > limit {
            return Err(SimulationError::BufferTooLarge {
                label: "particle region",
                requested: region_size,
                limit,
            });
        }

        let particle_count =
            u32::try_from(particles.len()).map_err(|_| SimulationError::BufferTooLarge {
                label: "particle region",
                requested: region_size,
                limit,
            })?;

        let regions = scoped(device, || {
            DoubleBuffer::from_fn(|index| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(REGION_LABELS[index]),
                    contents,
                    usage: wgpu::BufferUsages::VERTEX
                        | wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                })
            })
        })
        .await
        .map_err(|source| SimulationError::ResourceCreation {
            label: "particle buffers",
            source,
        })?;

        for buffer in regions.regions() {
            if buffer.size() != region_size {
                return Err(SimulationError::LayoutMismatch {
                    what: "uploaded particle region",
                    expected: region_size,
                    actual: buffer.size(),
                });
            }
        }

        log::info!(
            "Particle storage: 2 x {} bytes ({} particles, stride {})",
            region_size,
            particle_count,
            PARTICLE_STRIDE
        );

        Ok(Self {
            regions,
            particle_count,
            region_size,
        })
    }

    pub fn parity(&self) -> Parity {
        self.regions.parity()
    }

    /// Region the next compute dispatch reads
    pub fn current(&self) -> &wgpu::Buffer {
        self.regions.current()
    }

    /// Region the next compute dispatch writes; the freshest state once that dispatch is recorded
    pub fn next(&self) -> &wgpu::Buffer {
        self.regions.next()
    }

    pub fn region(&self, index: usize) -> &wgpu::Buffer {
        self.regions.region(index)
    }

    pub fn advance(&mut self) -> Parity {
        self.regions.advance()
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    pub fn region_size(&self) -> u64 {
        self.region_size
    }
}
