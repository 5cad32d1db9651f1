//! GPU compute stage: one integration step per frame over the double-buffered storage

use particle_physics::{ParticleSet, PARTICLE_STRIDE};
use wgpu::util::DeviceExt;

use crate::double_buffer::Parity;
use crate::error::{scoped, SimulationError};
use crate::params::{PointerUniform, SimParamsUniform, UniformSnapshot};
use crate::storage::ParticleStorage;

/// Threads per workgroup; must equal `@workgroup_size` in `update.wgsl`
pub const WORKGROUP_SIZE: u32 = 64;

/// Workgroups needed to cover `particle_count` invocations
pub fn workgroup_count(particle_count: u32) -> u32 {
    particle_count.div_ceil(WORKGROUP_SIZE)
}

/// GPU-based particle simulation
pub struct ParticleSimulation {
    queue: wgpu::Queue,

    storage: ParticleStorage,
    params_buffer: wgpu::Buffer,
    pointer_buffer: wgpu::Buffer,

    pipeline: wgpu::ComputePipeline,
    // Indexed by `Parity::read_index`: group i reads region i, writes the other.
    bind_groups: [wgpu::BindGroup; 2],

    workgroup_count: u32,
}

impl ParticleSimulation {
    pub async fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        particles: &ParticleSet,
        uniforms: &UniformSnapshot,
    ) -> Result<Self, SimulationError> {
        log::info!("Initializing ParticleSimulation...");

        let storage = ParticleStorage::new(&device, particles).await?;

        let expected = u64::from(storage.particle_count()) * PARTICLE_STRIDE as u64;
        if storage.region_size() != expected {
            return Err(SimulationError::LayoutMismatch {
                what: "compute binding",
                expected,
                actual: storage.region_size(),
            });
        }

        let (params_buffer, pointer_buffer) = scoped(&device, || {
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sim Params Buffer"),
                contents: bytemuck::cast_slice(&[uniforms.params]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let pointer_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Pointer Buffer"),
                contents: bytemuck::cast_slice(&[uniforms.pointer]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            (params_buffer, pointer_buffer)
        })
        .await
        .map_err(|source| SimulationError::ResourceCreation {
            label: "uniform buffers",
            source,
        })?;

        log::info!("Buffers created");

        let (pipeline, bind_groups) = scoped(&device, || {
            Self::create_pipeline(&device, &storage, &params_buffer, &pointer_buffer)
        })
        .await
        .map_err(|source| SimulationError::ResourceCreation {
            label: "compute pipeline",
            source,
        })?;

        log::info!("Pipelines created");

        let workgroup_count = workgroup_count(storage.particle_count());
        debug_assert!(workgroup_count * WORKGROUP_SIZE >= storage.particle_count());

        Ok(Self {
            queue,
            storage,
            params_buffer,
            pointer_buffer,
            pipeline,
            bind_groups,
            workgroup_count,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        storage: &ParticleStorage,
        params_buffer: &wgpu::Buffer,
        pointer_buffer: &wgpu::Buffer,
    ) -> (wgpu::ComputePipeline, [wgpu::BindGroup; 2]) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Update Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/update.wgsl").into()),
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let storage_entry = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(PARTICLE_STRIDE as u64),
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Update Bind Group Layout"),
            entries: &[
                // Simulation parameters (Uniform) - Binding 0
                uniform_entry(0),
                // Pointer state (Uniform) - Binding 1
                uniform_entry(1),
                // Current region (Storage, read) - Binding 2
                storage_entry(2, true),
                // Next region (Storage, read_write) - Binding 3
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Update Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Update Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let bind_groups = std::array::from_fn(|read| {
            let write = (read + 1) % 2;
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(if read == 0 {
                    "Particle Update Bind Group 0->1"
                } else {
                    "Particle Update Bind Group 1->0"
                }),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: pointer_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: storage.region(read).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: storage.region(write).as_entire_binding(),
                    },
                ],
            })
        });

        (pipeline, bind_groups)
    }

    /// Write both uniform blocks. Queue writes land before the next submission,
    /// so the following dispatch sees exactly this snapshot.
    pub fn update_params(&self, snapshot: &UniformSnapshot) {
        self.queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::cast_slice::<SimParamsUniform, u8>(&[snapshot.params]),
        );
        self.queue.write_buffer(
            &self.pointer_buffer,
            0,
            bytemuck::cast_slice::<PointerUniform, u8>(&[snapshot.pointer]),
        );
    }

    /// Record one integration step: current region -> next region
    pub fn step(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle Update Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &self.bind_groups[self.parity().read_index()], &[]);
        compute_pass.dispatch_workgroups(self.workgroup_count, 1, 1);
    }

    /// Region holding the freshest state after this frame's `step`
    pub fn particle_buffer(&self) -> &wgpu::Buffer {
        self.storage.next()
    }

    /// Flip parity once the frame's compute and render work is recorded
    pub fn advance(&mut self) -> Parity {
        self.storage.advance()
    }

    pub fn parity(&self) -> Parity {
        self.storage.parity()
    }

    pub fn particle_count(&self) -> u32 {
        self.storage.particle_count()
    }

    pub fn workgroup_count(&self) -> u32 {
        self.workgroup_count
    }

    pub fn storage(&self) -> &ParticleStorage {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use naga::{ShaderStage, TypeInner};

    fn parse_update_shader() -> naga::Module {
        let source = include_str!("shaders/update.wgsl");
        let module = naga::front::wgsl::parse_str(source).expect("update.wgsl failed to parse");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .expect("update.wgsl failed to validate");
        module
    }

    fn struct_layout(module: &naga::Module, name: &str) -> (u32, Vec<u32>) {
        module
            .types
            .iter()
            .find_map(|(_, ty)| match (&ty.name, &ty.inner) {
                (Some(n), TypeInner::Struct { members, span }) if n == name => {
                    Some((*span, members.iter().map(|m| m.offset).collect()))
                }
                _ => None,
            })
            .unwrap_or_else(|| panic!("struct {name} not found"))
    }

    #[test]
    fn test_update_shader_parses() {
        parse_update_shader();
    }

    #[test]
    fn test_shader_particle_layout_matches_record() {
        let module = parse_update_shader();
        let (span, offsets) = struct_layout(&module, "Particle");

        assert_eq!(span as usize, PARTICLE_STRIDE);
        assert_eq!(
            offsets,
            vec![
                particle_physics::OFFSET_POSITION as u32,
                particle_physics::OFFSET_VELOCITY as u32,
                particle_physics::OFFSET_RADIUS as u32,
                particle_physics::OFFSET_MASS as u32,
            ]
        );
    }

    #[test]
    fn test_shader_uniform_sizes_match() {
        let module = parse_update_shader();
        let (params_span, _) = struct_layout(&module, "SimParams");
        let (pointer_span, _) = struct_layout(&module, "Pointer");

        assert_eq!(params_span as usize, std::mem::size_of::<SimParamsUniform>());
        assert_eq!(pointer_span as usize, std::mem::size_of::<PointerUniform>());
    }

    #[test]
    fn test_shader_workgroup_size() {
        let module = parse_update_shader();
        let entry = module
            .entry_points
            .iter()
            .find(|e| e.name == "main")
            .expect("main entry point");

        assert_eq!(entry.stage, ShaderStage::Compute);
        assert_eq!(entry.workgroup_size, [WORKGROUP_SIZE, 1, 1]);
    }

    #[test]
    fn test_workgroup_count_covers_particles() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(65), 2);
        assert_eq!(workgroup_count(10_000), 157);

        for n in 1..2_000 {
            let groups = workgroup_count(n);
            assert!(groups * WORKGROUP_SIZE >= n);
            assert!((groups - 1) * WORKGROUP_SIZE < n);
        }
    }
}
