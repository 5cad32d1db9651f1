//! Interactive particle field
//!
//! Thousands of particles advanced on the GPU every frame and pushed around
//! by the pointer: hold the left button to attract, release to repel.

use glam::Vec2;
use particle_engine::{BatchedPath, DriftScene, EngineError, ParticleEngine};
use particle_physics::{ParticleSet, SimulationParameters, DEFAULT_PARTICLE_COUNT};
use particle_renderer::{BatchRenderer, CanvasCamera};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const BATCHED_PARTICLE_COUNT: usize = 5_000;
const FRAME_WINDOW: usize = 60;

const DELTA_T_STEP: f32 = 0.05;
const POINTER_RADIUS_STEP: f32 = 10.0;
const VELOCITY_MULTIPLIER_STEP: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderMode {
    Compute,
    Batched,
}

#[derive(Debug)]
enum FrameError {
    Surface(wgpu::SurfaceError),
    Engine(EngineError),
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(error: wgpu::SurfaceError) -> Self {
        FrameError::Surface(error)
    }
}

impl From<EngineError> for FrameError {
    fn from(error: EngineError) -> Self {
        FrameError::Engine(error)
    }
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    engine: ParticleEngine,
    batched: BatchedPath,
    camera: CanvasCamera,
    mode: RenderMode,

    pointer: Vec2,
    pointer_down: bool,

    frame_times: VecDeque<f32>,
    last_frame_time: Instant,
}

impl GpuState {
    async fn new(window: Arc<Window>) -> Result<Self, EngineError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| EngineError::UnsupportedPlatform(format!("no surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| EngineError::UnsupportedPlatform(format!("no adapter: {e}")))?;

        log::info!("✓ Using GPU: {}", adapter.get_info().name);

        // Request what the adapter has; the engine checks it against what it needs.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| EngineError::UnsupportedPlatform(format!("no device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or_else(|| EngineError::UnsupportedPlatform("surface has no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let (width, height) = (config.width as f32, config.height as f32);
        let mut rng = rand::rng();

        let particles = ParticleSet::scatter(DEFAULT_PARTICLE_COUNT, width, height, &mut rng)?;
        log::info!(
            "✓ Initialized {} particles ({} bytes each)",
            particles.len(),
            particle_physics::PARTICLE_STRIDE
        );

        let engine = ParticleEngine::initialize(
            &adapter,
            device.clone(),
            queue.clone(),
            config.format,
            &particles,
            SimulationParameters::new(width, height),
        )
        .await?;

        let batched = BatchedPath::new(
            BatchRenderer::new(&device, config.format),
            DriftScene::new(BATCHED_PARTICLE_COUNT, width, height, &mut rng),
        );
        log::info!("✓ Batched renderer initialized");

        Ok(Self {
            surface,
            device,
            queue,
            camera: CanvasCamera::new(config.width, config.height),
            config,
            engine,
            batched,
            mode: RenderMode::Compute,
            pointer: Vec2::ZERO,
            pointer_down: false,
            frame_times: VecDeque::with_capacity(FRAME_WINDOW),
            last_frame_time: Instant::now(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.camera.resize(new_size.width, new_size.height);
            self.engine.resize(new_size.width, new_size.height);
            self.batched.resize(new_size.width, new_size.height);
        }
    }

    fn update_pointer(&mut self) {
        self.engine
            .update_pointer_state(self.pointer, self.pointer_down);
    }

    /// Apply one keyboard parameter edit. Returns false for unbound keys.
    fn edit_parameters(&mut self, key: KeyCode) -> bool {
        let current = self.engine.latest_parameters();
        let edited = match key {
            KeyCode::ArrowUp => SimulationParameters {
                delta_t: current.delta_t + DELTA_T_STEP,
                ..current
            },
            KeyCode::ArrowDown => SimulationParameters {
                delta_t: current.delta_t - DELTA_T_STEP,
                ..current
            },
            KeyCode::ArrowRight => SimulationParameters {
                pointer_radius: current.pointer_radius + POINTER_RADIUS_STEP,
                ..current
            },
            KeyCode::ArrowLeft => SimulationParameters {
                pointer_radius: current.pointer_radius - POINTER_RADIUS_STEP,
                ..current
            },
            KeyCode::BracketRight | KeyCode::Equal => SimulationParameters {
                velocity_multiplier: current.velocity_multiplier + VELOCITY_MULTIPLIER_STEP,
                ..current
            },
            KeyCode::BracketLeft | KeyCode::Minus => SimulationParameters {
                velocity_multiplier: current.velocity_multiplier - VELOCITY_MULTIPLIER_STEP,
                ..current
            },
            KeyCode::KeyR => SimulationParameters::new(current.canvas_width, current.canvas_height),
            _ => return false,
        };

        log::debug!(
            "Parameter edit: dt {:.2}, radius {:.0}, multiplier {:.1}",
            edited.delta_t,
            edited.pointer_radius,
            edited.velocity_multiplier
        );
        self.engine.update_simulation_parameters(edited);
        true
    }

    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            RenderMode::Compute => RenderMode::Batched,
            RenderMode::Batched => RenderMode::Compute,
        };
        log::info!("Render path: {:?}", self.mode);
    }

    fn render(&mut self) -> Result<(f32, f32), FrameError> {
        // Track frame time
        let now = Instant::now();
        let frame_time = (now - self.last_frame_time).as_secs_f32() * 1000.0;
        self.last_frame_time = now;

        if self.frame_times.len() == FRAME_WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let view_proj = self.camera.build_view_projection_matrix();

        match self.mode {
            RenderMode::Compute => {
                self.engine.frame(&view, view_proj)?;
            }
            RenderMode::Batched => {
                self.batched
                    .frame(&self.device, &self.queue, &view, view_proj);
            }
        }

        output.present();

        let avg_frame_time = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        let fps = if avg_frame_time > 0.0 {
            1000.0 / avg_frame_time
        } else {
            0.0
        };
        Ok((fps, avg_frame_time))
    }

    fn title(&self, fps: f32, frame_time: f32) -> String {
        let params = self.engine.parameters();
        match self.mode {
            RenderMode::Compute => format!(
                "Particle Field - {:.0} FPS ({:.2}ms) - {} particles - dt {:.2} radius {:.0} x{:.1}",
                fps,
                frame_time,
                self.engine.particle_count(),
                params.delta_t,
                params.pointer_radius,
                params.velocity_multiplier
            ),
            RenderMode::Batched => format!(
                "Particle Field - {:.0} FPS ({:.2}ms) - {} particles - batched",
                fps,
                frame_time,
                self.batched.scene().particles().len()
            ),
        }
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window_attributes = Window::default_attributes()
                .with_title("Particle Field")
                .with_inner_size(winit::dpi::LogicalSize::new(1280, 800));

            let window = match event_loop.create_window(window_attributes) {
                Ok(window) => Arc::new(window),
                Err(e) => {
                    log::error!("Failed to create window: {e}");
                    event_loop.exit();
                    return;
                }
            };
            self.window = Some(window.clone());

            match pollster::block_on(GpuState::new(window)) {
                Ok(gpu_state) => self.gpu_state = Some(gpu_state),
                Err(e) => {
                    log::error!("Initialization failed: {e}");
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyB),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => gpu_state.toggle_mode(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                gpu_state.edit_parameters(key);
            }

            WindowEvent::Resized(physical_size) => gpu_state.resize(physical_size),

            WindowEvent::CursorMoved { position, .. } => {
                gpu_state.pointer = Vec2::new(position.x as f32, position.y as f32);
                gpu_state.update_pointer();
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                gpu_state.pointer_down = state == ElementState::Pressed;
                gpu_state.update_pointer();
            }

            WindowEvent::CursorLeft { .. } => {
                gpu_state.pointer_down = false;
                gpu_state.engine.clear_pointer();
            }

            WindowEvent::RedrawRequested => {
                if let Some(window) = &self.window {
                    match gpu_state.render() {
                        Ok((fps, frame_time)) => {
                            window.set_title(&gpu_state.title(fps, frame_time));
                        }
                        Err(FrameError::Surface(
                            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                        )) => gpu_state.resize(window.inner_size()),
                        Err(FrameError::Surface(wgpu::SurfaceError::Timeout)) => {
                            log::warn!("Surface timeout, skipping frame");
                        }
                        Err(FrameError::Surface(e)) => {
                            log::error!("Surface error: {e}");
                            event_loop.exit();
                        }
                        Err(FrameError::Engine(e)) => {
                            log::error!("Frame failed: {e}");
                            event_loop.exit();
                        }
                    }
                }
            }

            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting particle field...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {e}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        window: None,
        gpu_state: None,
    };

    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {e}");
    }
}
