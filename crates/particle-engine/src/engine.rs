//! Facade the host drives: initialize once, then compute + render every frame

use glam::{Mat4, Vec2};
use particle_physics::{ParticleSet, PointerState, SimulationParameters};
use particle_renderer::ParticleRenderer;
use particle_simulation::{scoped, workgroup_count, Parity, ParticleSimulation, WORKGROUP_SIZE};

use crate::error::EngineError;
use crate::frame::{FrameDriver, FrameUpdate};

/// Storage regions bound by the compute pass
const STORAGE_BUFFERS_PER_STAGE: u32 = 2;
/// Uniform blocks bound by the compute pass
const UNIFORM_BUFFERS_PER_STAGE: u32 = 2;
/// Per-instance attributes of the particle record
const VERTEX_ATTRIBUTES: u32 = 4;

/// Reject adapters that cannot run the compute and render stages for
/// `particle_count` particles.
pub fn check_support(
    flags: wgpu::DownlevelFlags,
    limits: &wgpu::Limits,
    particle_count: u32,
) -> Result<(), EngineError> {
    if !flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        return Err(EngineError::UnsupportedPlatform(
            "compute shaders are not supported".into(),
        ));
    }

    let requirements = [
        (
            "max_compute_workgroup_size_x",
            WORKGROUP_SIZE,
            limits.max_compute_workgroup_size_x,
        ),
        (
            "max_compute_invocations_per_workgroup",
            WORKGROUP_SIZE,
            limits.max_compute_invocations_per_workgroup,
        ),
        (
            "max_compute_workgroups_per_dimension",
            workgroup_count(particle_count),
            limits.max_compute_workgroups_per_dimension,
        ),
        (
            "max_storage_buffers_per_shader_stage",
            STORAGE_BUFFERS_PER_STAGE,
            limits.max_storage_buffers_per_shader_stage,
        ),
        (
            "max_uniform_buffers_per_shader_stage",
            UNIFORM_BUFFERS_PER_STAGE,
            limits.max_uniform_buffers_per_shader_stage,
        ),
        (
            "max_vertex_attributes",
            VERTEX_ATTRIBUTES,
            limits.max_vertex_attributes,
        ),
    ];

    match requirements
        .iter()
        .find(|(_, required, available)| available < required)
    {
        Some((name, required, available)) => Err(EngineError::UnsupportedPlatform(format!(
            "{name} is {available}, need at least {required}"
        ))),
        None => Ok(()),
    }
}

pub struct ParticleEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,

    simulation: ParticleSimulation,
    renderer: ParticleRenderer,
    driver: FrameDriver,
}

impl ParticleEngine {
    /// Check platform support, upload `particles` into both storage regions and
    /// build the compute and render pipelines. Fails before any frame is produced.
    pub async fn initialize(
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        particles: &ParticleSet,
        parameters: SimulationParameters,
    ) -> Result<Self, EngineError> {
        let particle_count = u32::try_from(particles.len()).map_err(|_| {
            EngineError::UnsupportedPlatform(format!("{} particles exceed u32", particles.len()))
        })?;
        check_support(
            adapter.get_downlevel_capabilities().flags,
            &device.limits(),
            particle_count,
        )?;

        let driver = FrameDriver::new(parameters);

        let simulation =
            ParticleSimulation::new(device.clone(), queue.clone(), particles, &driver.snapshot())
                .await?;
        log::info!("✓ Simulation initialized");

        let renderer = scoped(&device, || ParticleRenderer::new(&device, format))
            .await
            .map_err(|source| EngineError::ResourceCreation {
                label: "particle renderer",
                source,
            })?;
        log::info!("✓ Renderer initialized");

        Ok(Self {
            device,
            queue,
            simulation,
            renderer,
            driver,
        })
    }

    /// Apply pending edits and run one integration step
    pub fn compute_frame(&mut self) -> Result<(), EngineError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Compute Encoder"),
            });
        self.record_compute(&mut encoder)?;
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Draw the region this frame's compute step wrote, then advance parity
    pub fn render_frame(
        &mut self,
        surface_view: &wgpu::TextureView,
        view_proj: Mat4,
    ) -> Result<Parity, EngineError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.record_render(&mut encoder, surface_view, view_proj)?;
        self.queue.submit(std::iter::once(encoder.finish()));
        self.finish_frame()
    }

    /// Compute and render recorded into one command buffer, submitted once
    pub fn frame(
        &mut self,
        surface_view: &wgpu::TextureView,
        view_proj: Mat4,
    ) -> Result<Parity, EngineError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.record_compute(&mut encoder)?;
        self.record_render(&mut encoder, surface_view, view_proj)?;
        self.queue.submit(std::iter::once(encoder.finish()));
        self.finish_frame()
    }

    fn record_compute(&mut self, encoder: &mut wgpu::CommandEncoder) -> Result<(), EngineError> {
        let ticket = self.driver.begin_compute()?;
        debug_assert_eq!(ticket.parity, self.simulation.parity());

        if let Some(uniforms) = &ticket.uniforms {
            self.simulation.update_params(uniforms);
        }
        self.simulation.step(encoder);
        Ok(())
    }

    fn record_render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        view_proj: Mat4,
    ) -> Result<(), EngineError> {
        self.driver.begin_render()?;
        self.renderer.render(
            &self.queue,
            encoder,
            surface_view,
            self.simulation.particle_buffer(),
            self.simulation.particle_count(),
            view_proj,
        );
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<Parity, EngineError> {
        let parity = self.driver.finish_frame()?;
        self.simulation.advance();
        Ok(parity)
    }

    pub fn update_pointer_state(&mut self, position: Vec2, button_down: bool) {
        self.driver
            .submit(FrameUpdate::Pointer(PointerState::new(position, button_down)));
    }

    /// Park the pointer outside the canvas, e.g. when the cursor leaves the window
    pub fn clear_pointer(&mut self) {
        self.driver.submit(FrameUpdate::ClearPointer);
    }

    pub fn update_simulation_parameters(&mut self, parameters: SimulationParameters) {
        let sanitized = parameters.sanitized();
        if sanitized != parameters {
            log::warn!(
                "Clamped simulation parameters: dt {} -> {}, radius {} -> {}, multiplier {} -> {}",
                parameters.delta_t,
                sanitized.delta_t,
                parameters.pointer_radius,
                sanitized.pointer_radius,
                parameters.velocity_multiplier,
                sanitized.velocity_multiplier
            );
        }
        self.driver.submit(FrameUpdate::Parameters(sanitized));
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.driver.submit(FrameUpdate::Resize { width, height });
    }

    /// Parameters as of the last applied snapshot
    pub fn parameters(&self) -> &SimulationParameters {
        self.driver.parameters()
    }

    /// Parameters including edits not yet applied
    pub fn latest_parameters(&self) -> SimulationParameters {
        self.driver.latest_parameters()
    }

    pub fn frame_count(&self) -> u64 {
        self.driver.frame()
    }

    pub fn parity(&self) -> Parity {
        self.simulation.parity()
    }

    pub fn particle_count(&self) -> u32 {
        self.simulation.particle_count()
    }
}
