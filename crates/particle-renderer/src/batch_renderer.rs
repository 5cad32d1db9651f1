//! Alternate render path for CPU-positioned particles grouped by type

use glam::{Mat4, Vec2};

use crate::batch::{
    BatchBuilder, BatchInstance, ParticleType, BATCH_CAPACITY, BATCH_INSTANCE_STRIDE,
};
use crate::camera::CameraUniform;
use crate::palette;
use crate::pipeline_cache::PipelineRegistry;
use crate::pool::InstanceBufferPool;
use crate::renderer::QUAD_VERTICES;

pub const BATCH_INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32,
    2 => Float32x3,
];

pub fn batch_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: BATCH_INSTANCE_STRIDE as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &BATCH_INSTANCE_ATTRIBUTES,
    }
}

/// Usage per frame: `begin_frame`, any number of `draw_particle`, `end_frame`.
pub struct BatchRenderer {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    camera_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    pipelines: PipelineRegistry<wgpu::RenderPipeline>,
    builder: BatchBuilder,
    pool: InstanceBufferPool<wgpu::Buffer>,
}

impl BatchRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Batch Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Batch Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/batch.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Batch Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Batch Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Batch Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Self {
            shader,
            pipeline_layout,
            format,
            camera_buffer,
            bind_group,
            pipelines: PipelineRegistry::new(),
            builder: BatchBuilder::new(BATCH_CAPACITY),
            pool: InstanceBufferPool::new(),
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
        particle_type: &ParticleType,
    ) -> wgpu::RenderPipeline {
        let label = format!("Batch Pipeline (type {})", particle_type.id.0);
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vertex"),
                buffers: &[batch_instance_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fragment"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(particle_type.blend.blend_state()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Start a new generation of batches
    pub fn begin_frame(&mut self) {
        self.builder.begin_frame();
    }

    pub fn draw_particle(&mut self, device: &wgpu::Device, particle_type: &ParticleType, position: Vec2) {
        if self.builder.current_type() != Some(particle_type.id) {
            let (shader, layout, format) = (&self.shader, &self.pipeline_layout, self.format);
            self.pipelines.get_or_insert_with(particle_type.id, || {
                Self::create_pipeline(device, shader, layout, format, particle_type)
            });
        }
        self.builder.push(particle_type, position);
    }

    /// Upload every non-empty batch into a pooled buffer and record one draw
    /// per batch. Returns the number of draw calls.
    pub fn end_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        view_proj: Mat4,
    ) -> usize {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::new(view_proj)]),
        );

        let mut draws = Vec::with_capacity(self.builder.batch_count());
        for batch in self.builder.batches() {
            let buffer = self.pool.acquire(|| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Batch Instance Buffer"),
                    size: (BATCH_CAPACITY * std::mem::size_of::<BatchInstance>()) as u64,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            });
            queue.write_buffer(&buffer, 0, batch.as_bytes());
            draws.push((batch.particle_type().id, buffer, batch.len() as u32));
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Batch Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(palette::clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_bind_group(0, &self.bind_group, &[]);

            for (id, buffer, count) in &draws {
                let Some(pipeline) = self.pipelines.get(*id) else {
                    log::warn!("No pipeline for particle type {}, skipping batch", id.0);
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..QUAD_VERTICES, 0..*count);
            }
        }

        let draw_count = draws.len();
        for (_, buffer, _) in draws {
            self.pool.release(buffer);
        }
        self.pool.end_frame();

        draw_count
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn pooled_buffers(&self) -> usize {
        self.pool.allocated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use naga::ShaderStage;

    #[test]
    fn test_batch_layout_matches_instance_record() {
        let layout = batch_instance_layout();
        assert_eq!(layout.array_stride, 24);

        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(
            offsets,
            vec![
                std::mem::offset_of!(BatchInstance, position) as u64,
                std::mem::offset_of!(BatchInstance, radius) as u64,
                std::mem::offset_of!(BatchInstance, color) as u64,
            ]
        );
    }

    #[test]
    fn test_batch_shader_validates() {
        let module = naga::front::wgsl::parse_str(include_str!("shaders/batch.wgsl"))
            .expect("batch.wgsl failed to parse");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .expect("batch.wgsl failed to validate");

        let vertex = module
            .entry_points
            .iter()
            .find(|e| e.name == "vertex")
            .expect("vertex entry point");
        assert_eq!(vertex.stage, ShaderStage::Vertex);
    }
}
