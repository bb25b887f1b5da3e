//! Pipeline manager
//!
//! Owns the ordered stage list and the ping-pong targets, and turns one UI
//! frame into one pass per stage. List order is execution order; each stage
//! reads exactly the output of the stage before it.

use std::time::Instant;

use egui::{Color32, PointerButton, Sense, Ui};

use crate::compositor::DisplayState;
use crate::context::Context;
use crate::effects::ping_pong::{PingPong, Slot};
use crate::effects::stage::{Effect, EffectStage, NewStage, StageEnv, StageError, StageId};
use crate::effects::targets::RenderTargets;
use crate::file_loader::{FileLoader, IMAGE_FILTER};
use crate::gpu_context::GpuContext;
use crate::resources::{ImageSource, ResourceManager};
use crate::ui::stage_list::{render_size_editor, stage_card, AddStageDialog, StageAction};
use crate::ui::widgets::{draw_texture_placeholder, FULL_UV};

/// Scroll distance in points that counts as one zoom notch.
const SCROLL_NOTCH: f32 = 50.0;

/// What one `render` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Write target of each executed pass, in order
    pub passes: Vec<Slot>,
    /// Slot holding the finished image
    pub displayed: Slot,
}

/// Move the element at `from` to `to`, keeping the relative order of the rest.
///
/// Returns false and leaves `items` untouched when either index is out of range.
pub fn reorder<T>(items: &mut [T], from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from < to {
        items[from..=to].rotate_left(1);
    } else if from > to {
        items[to..=from].rotate_right(1);
    }
    true
}

pub struct PipelineManager {
    stages: Vec<EffectStage>,
    targets: RenderTargets,
    next_stage_id: StageId,
    generation: u64,
    start_time: Instant,
    display_state: DisplayState,
    add_dialog: AddStageDialog,
    /// Size typed into the editor, applied on demand
    pending_size: [u32; 2],
}

impl PipelineManager {
    /// Allocate targets of `size` with an empty stage list.
    pub fn new(gpu: &GpuContext, size: [u32; 2]) -> Self {
        let targets = RenderTargets::new(gpu.device(), size, 0);
        let pending_size = targets.size();
        tracing::info!("Pipeline manager ready at {}x{}", pending_size[0], pending_size[1]);

        Self {
            stages: Vec::new(),
            targets,
            next_stage_id: 0,
            generation: 0,
            start_time: Instant::now(),
            display_state: DisplayState::new(),
            add_dialog: AddStageDialog::default(),
            pending_size,
        }
    }

    /// Reallocate the ping-pong targets and rebuild every stage pipeline.
    ///
    /// Stage parameters are kept.
    pub fn resize(&mut self, ctx: &mut Context<'_>, width: u32, height: u32) {
        let device = ctx.gpu.device();
        self.generation += 1;
        self.targets = RenderTargets::new(device, [width, height], self.generation);
        let size = self.targets.size();

        for stage in &mut self.stages {
            stage.init_pipeline(device, &mut ctx.shaders, self.targets.layout());
            if let Effect::Image(image) = stage.effect_mut() {
                image.set_render_size(size);
            }
        }

        self.pending_size = size;
        tracing::info!(
            "Resized render targets to {}x{}, rebuilt {} stage(s)",
            size[0],
            size[1],
            self.stages.len()
        );
    }

    /// Create a stage for `request` and append it to the chain.
    pub fn add_shader(&mut self, ctx: &mut Context<'_>, request: NewStage) -> Result<StageId, StageError> {
        let device = ctx.gpu.device();
        let effect = Effect::create(request, device, &mut ctx.resources, self.targets.size())
            .inspect_err(|e| tracing::error!("Failed to add {:?} stage: {}", request.kind(), e))?;

        let id = self.next_stage_id;
        self.next_stage_id += 1;

        let name = request.kind().default_name();
        let stage = EffectStage::new(id, name, effect, device, &mut ctx.shaders, self.targets.layout());
        self.stages.push(stage);
        tracing::info!("Added stage '{}' at position {}", name, self.stages.len() - 1);
        Ok(id)
    }

    pub fn remove(&mut self, index: usize) -> Option<EffectStage> {
        if index >= self.stages.len() {
            tracing::warn!("Cannot remove stage {}: only {} stage(s)", index, self.stages.len());
            return None;
        }
        let stage = self.stages.remove(index);
        tracing::info!("Removed stage '{}'", stage.name());
        Some(stage)
    }

    /// Move the stage at `from` to position `to`.
    pub fn reorder_element(&mut self, from: usize, to: usize) -> bool {
        let moved = reorder(&mut self.stages, from, to);
        if !moved {
            tracing::warn!("Ignoring reorder {} -> {} of {} stage(s)", from, to, self.stages.len());
        }
        moved
    }

    /// Run the chain once and submit it.
    pub fn render(&mut self, gpu: &GpuContext) -> FrameReport {
        let device = gpu.device();
        let queue = gpu.queue();

        self.targets
            .write_uniforms(queue, self.start_time.elapsed().as_secs_f32());
        for stage in &self.stages {
            stage.write_buffers(queue);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Stage Chain Encoder"),
        });

        // Stage 0 reads B, and an empty chain displays it.
        clear_target(&mut encoder, self.targets.view(Slot::B));

        let [width, height] = self.targets.size();
        let mut cursor = PingPong::new(Slot::A, Slot::B);
        let mut passes = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let target = *cursor.current();
            let source = *cursor.other();
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(stage.name()),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: self.targets.view(target),
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
                pass.set_scissor_rect(0, 0, width, height);
                stage.record(&mut pass, self.targets.sampling_group(source));
            }
            passes.push(target);
            cursor.swap();
        }

        queue.submit(Some(encoder.finish()));

        FrameReport {
            passes,
            displayed: Slot::final_output(self.stages.len()),
        }
    }

    /// Stage cards, the add-stage affordance and the render size editor.
    ///
    /// Structural edits requested by the widgets are applied after drawing.
    pub fn display(&mut self, ui: &mut Ui, ctx: &mut Context<'_>, loader: &mut FileLoader<ResourceManager>) {
        let mut actions = Vec::new();

        if let Some(action) = render_size_editor(ui, &mut self.pending_size, self.targets.size()) {
            actions.push(action);
        }
        ui.separator();

        ui.strong("Add stage");
        if let Some(action) = self.add_dialog.show(ui, &ctx.resources, loader.is_pending()) {
            actions.push(action);
        }
        ui.separator();

        let env = StageEnv {
            render_size: self.targets.size(),
            resources: &ctx.resources,
        };
        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            if self.stages.is_empty() {
                ui.weak("No stages");
            }
            for (index, stage) in self.stages.iter_mut().enumerate() {
                stage_card(ui, index, stage, &env, &mut actions);
                ui.add_space(4.0);
            }
        });

        for action in actions {
            self.apply(action, ctx, loader);
        }
    }

    fn apply(&mut self, action: StageAction, ctx: &mut Context<'_>, loader: &mut FileLoader<ResourceManager>) {
        match action {
            StageAction::Reorder { from, to } => {
                self.reorder_element(from, to);
            }
            StageAction::Reset(index) => {
                if let Some(stage) = self.stages.get_mut(index) {
                    stage.reset();
                }
            }
            StageAction::Remove(index) => {
                self.remove(index);
            }
            StageAction::Add(request) => {
                // Failures are logged by add_shader.
                let _ = self.add_shader(ctx, request);
            }
            StageAction::Resize([width, height]) => self.resize(ctx, width, height),
            StageAction::ImportImage => {
                loader.open_dialog(IMAGE_FILTER, |resources: &mut ResourceManager, paths| {
                    for path in paths {
                        let name = path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string());
                        // Decode errors are logged by the resource manager.
                        let _ = resources.add_image(name, ImageSource::Path(path));
                    }
                });
            }
        }
    }

    /// Draw the finished image into the remaining space with pan and zoom.
    ///
    /// Scroll zooms, primary drag pans and double-click resets the view.
    pub fn display_output(&mut self, ui: &mut Ui, texture: Option<egui::TextureId>) -> egui::Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                self.display_state.on_scroll(scroll / SCROLL_NOTCH);
            }
        }
        if response.dragged_by(PointerButton::Primary) {
            self.display_state.on_drag(response.drag_delta());
        }
        if response.double_clicked() {
            self.display_state.reset();
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_gray(24));
        match texture {
            Some(id) => {
                let image_rect = self.display_state.fit_rect(rect, self.targets.size());
                painter.image(id, image_rect, FULL_UV, Color32::WHITE);
            }
            None => draw_texture_placeholder(&painter, rect, "No preview"),
        }

        response
    }

    /// View of the slot the last `render` finished in.
    pub fn output_view(&self) -> &wgpu::TextureView {
        self.targets.view(self.output_slot())
    }

    pub fn output_slot(&self) -> Slot {
        Slot::final_output(self.stages.len())
    }

    /// Changes whenever the targets are reallocated.
    pub fn targets_generation(&self) -> u64 {
        self.targets.generation()
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    pub fn render_size(&self) -> [u32; 2] {
        self.targets.size()
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.display_state
    }

    pub fn stages(&self) -> &[EffectStage] {
        &self.stages
    }

    pub fn stage_mut(&mut self, index: usize) -> Option<&mut EffectStage> {
        self.stages.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn clear_target(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Clear Input"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
}
