//! CPU-driven drifting scene drawn through the batched renderer

use glam::{Mat4, Vec2};
use particle_renderer::{palette, BatchRenderer, BlendMode, ParticleType, ParticleTypeId};
use rand::Rng;

/// Horizontal distance every particle moves per frame
pub const DRIFT_STEP: f32 = 0.6;

const RADIUS_CLASSES: [f32; 4] = [1.5, 2.5, 3.5, 5.0];

/// One type per palette accent; radius class cycles, every third type is additive
pub fn particle_types() -> Vec<ParticleType> {
    palette::accents()
        .into_iter()
        .enumerate()
        .map(|(i, color)| ParticleType {
            id: ParticleTypeId(i as u32),
            radius: RADIUS_CLASSES[i % RADIUS_CLASSES.len()],
            color,
            blend: if i % 3 == 2 {
                BlendMode::Additive
            } else {
                BlendMode::Alpha
            },
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftParticle {
    pub position: Vec2,
    pub type_index: usize,
}

#[derive(Debug)]
pub struct DriftScene {
    types: Vec<ParticleType>,
    particles: Vec<DriftParticle>,
    width: f32,
    height: f32,
}

impl DriftScene {
    /// Scatter `count` particles of random type over the canvas, ordered by
    /// type so consecutive draws rarely switch pipelines.
    pub fn new<R: Rng + ?Sized>(count: usize, width: f32, height: f32, rng: &mut R) -> Self {
        let types = particle_types();
        let mut particles: Vec<DriftParticle> = (0..count)
            .map(|_| DriftParticle {
                position: Vec2::new(
                    rng.random::<f32>() * width,
                    rng.random::<f32>() * height,
                ),
                type_index: rng.random_range(0..types.len()),
            })
            .collect();
        particles.sort_by_key(|p| p.type_index);

        Self {
            types,
            particles,
            width,
            height,
        }
    }

    /// Move every particle right by `DRIFT_STEP`; past the right edge plus its
    /// radius it re-enters fully hidden on the left.
    pub fn step(&mut self) {
        for particle in &mut self.particles {
            let radius = self.types[particle.type_index].radius;
            particle.position.x += DRIFT_STEP;
            if particle.position.x > self.width + radius {
                particle.position.x = -radius;
            }
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn draw(&self, renderer: &mut BatchRenderer, device: &wgpu::Device) {
        for particle in &self.particles {
            renderer.draw_particle(device, &self.types[particle.type_index], particle.position);
        }
    }

    pub fn particles(&self) -> &[DriftParticle] {
        &self.particles
    }

    pub fn types(&self) -> &[ParticleType] {
        &self.types
    }
}

/// Drift scene plus the renderer that draws it
pub struct BatchedPath {
    scene: DriftScene,
    renderer: BatchRenderer,
}

impl BatchedPath {
    pub fn new(renderer: BatchRenderer, scene: DriftScene) -> Self {
        Self { scene, renderer }
    }

    /// Advance the scene one step and draw it. Returns the number of draw calls.
    pub fn frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_view: &wgpu::TextureView,
        view_proj: Mat4,
    ) -> usize {
        self.scene.step();

        self.renderer.begin_frame();
        self.scene.draw(&mut self.renderer, device);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Batch Encoder"),
        });
        let draws = self
            .renderer
            .end_frame(device, queue, &mut encoder, surface_view, view_proj);
        queue.submit(std::iter::once(encoder.finish()));

        log::trace!(
            "Batched frame: {} draws, {} pipelines, {} pooled buffers",
            draws,
            self.renderer.pipeline_count(),
            self.renderer.pooled_buffers()
        );
        draws
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width as f32, height as f32);
    }

    pub fn scene(&self) -> &DriftScene {
        &self.scene
    }
}
