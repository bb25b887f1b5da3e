//! Window shell
//!
//! Owns the window, surface and egui glue. Each redraw runs the UI, renders the
//! effect chain, then paints egui (including the preview texture) to the surface.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::context::Context;
use crate::effects::{PipelineManager, Slot};
use crate::file_loader::FileLoader;
use crate::gpu_context::{self, GpuContext, GpuError};
use crate::resources::ResourceManager;
use crate::settings::PreviewSettings;

const WINDOW_TITLE: &str = "Shader Stack";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Which target view the registered egui texture currently shows.
struct PreviewTexture {
    id: egui::TextureId,
    slot: Slot,
    generation: u64,
}

struct Running {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    context: Context<'static>,
    manager: PipelineManager,
    loader: FileLoader<ResourceManager>,
    preview: Option<PreviewTexture>,
}

pub struct ShaderStackApp {
    settings: PreviewSettings,
    running: Option<Running>,
    error: Option<AppError>,
}

impl ShaderStackApp {
    pub fn new(settings: PreviewSettings) -> Self {
        Self {
            settings,
            running: None,
            error: None,
        }
    }

    /// Startup failure recorded while the event loop ran, if any.
    pub fn finish(self) -> Result<(), AppError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn save_settings(&mut self) {
        if let Some(running) = &self.running {
            let size = running.window.inner_size().to_logical::<u32>(running.window.scale_factor());
            self.settings.window_width = size.width;
            self.settings.window_height = size.height;
            let [width, height] = running.manager.render_size();
            self.settings.render_width = width;
            self.settings.render_height = height;
        }
        if let Err(e) = self.settings.save() {
            tracing::warn!("Failed to save preferences: {}", e);
        }
    }
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, settings: &PreviewSettings) -> Result<Self, AppError> {
        let window = Arc::new(
            event_loop.create_window(
                WindowAttributes::default()
                    .with_title(WINDOW_TITLE)
                    .with_inner_size(LogicalSize::new(settings.window_width, settings.window_height)),
            )?,
        );
        tracing::info!("Window created: {}x{}", window.inner_size().width, window.inner_size().height);

        let instance = gpu_context::default_instance();
        let surface = instance.create_surface(window.clone())?;
        let gpu: &'static GpuContext =
            gpu_context::init(pollster::block_on(GpuContext::new(instance, Some(&surface)))?)?;

        let caps = surface.get_capabilities(gpu.adapter());
        // egui expects a non-sRGB framebuffer.
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(AppError::NoSurfaceFormat)?;
        tracing::info!("Surface format: {:?}", format);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(gpu.device(), &config);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(gpu.device(), format, None, 1, false);

        let context = Context::new(gpu);
        let manager = PipelineManager::new(gpu, settings.render_size());
        let mut loader = FileLoader::new();
        loader.set_start_dir(settings.last_image_dir());

        Ok(Self {
            window,
            surface,
            config,
            egui_ctx,
            egui_state,
            egui_renderer,
            context,
            manager,
            loader,
            preview: None,
        })
    }

    fn resize_surface(&mut self, size: PhysicalSize<u32>) {
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(self.context.gpu.device(), &self.config);
    }

    /// Point the egui preview texture at the current output view if it moved.
    fn sync_preview(&mut self) {
        let device = self.context.gpu.device();
        let slot = self.manager.output_slot();
        let generation = self.manager.targets_generation();
        let view = self.manager.output_view();

        if let Some(preview) = &mut self.preview {
            if preview.slot != slot || preview.generation != generation {
                self.egui_renderer
                    .update_egui_texture_from_wgpu_texture(device, view, wgpu::FilterMode::Linear, preview.id);
                preview.slot = slot;
                preview.generation = generation;
            }
            return;
        }
        let id = self.egui_renderer.register_native_texture(device, view, wgpu::FilterMode::Linear);
        self.preview = Some(PreviewTexture { id, slot, generation });
    }

    /// One frame: UI, effect chain, then egui onto the surface.
    ///
    /// Returns true when an image import finished this frame.
    fn redraw(&mut self) -> bool {
        let imported = self.loader.check(&mut self.context.resources);

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let preview_id = self.preview.as_ref().map(|preview| preview.id);
        let egui_ctx = self.egui_ctx.clone();
        let manager = &mut self.manager;
        let context = &mut self.context;
        let loader = &mut self.loader;
        let full_output = egui_ctx.run(raw_input, |ctx| {
            egui::SidePanel::left("stage_list")
                .resizable(true)
                .default_width(360.0)
                .show(ctx, |ui| manager.display(ui, context, loader));
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| manager.display_output(ui, preview_id));
        });
        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let gpu = self.context.gpu;
        self.manager.render(gpu);
        self.sync_preview();

        let paint_jobs = self.egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.resize_surface(self.window.inner_size());
                return imported;
            }
            Err(e) => {
                tracing::warn!("Skipping frame: {}", e);
                return imported;
            }
        };
        let surface_view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let device = gpu.device();
        let queue = gpu.queue();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("UI Encoder"),
        });

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };
        self.egui_renderer
            .update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &surface_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        queue.submit(Some(encoder.finish()));
        frame.present();
        imported
    }
}

impl ApplicationHandler for ShaderStackApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match Running::new(event_loop, &self.settings) {
            Ok(running) => {
                tracing::info!("Shader Stack ready");
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => {
                tracing::error!("Startup failed: {}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else { return };

        let response = running.egui_state.on_window_event(&running.window, &event);
        if response.repaint {
            running.window.request_redraw();
        }

        match event {
            WindowEvent::CloseRequested => {
                self.save_settings();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => running.resize_surface(size),
            WindowEvent::RedrawRequested => {
                if running.redraw() {
                    if let Some(dir) = running.loader.start_dir() {
                        self.settings.set_last_image_dir(dir);
                    }
                }
                // Stages animate with time, so keep drawing.
                running.window.request_redraw();
            }
            _ => {}
        }
    }
}
