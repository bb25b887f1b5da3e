//! Stage cards, the add-stage dialog and the render size editor
//!
//! Nothing here mutates the stage list. Structural changes are returned as
//! `StageAction`s and applied by the manager after the whole list was drawn.

use egui::{Align, CornerRadius, Layout, Margin, Ui};

use crate::effects::stage::{EffectKind, EffectStage, NewStage, StageEnv};
use crate::resources::{ImageId, ResourceManager};

/// Largest render target edge offered in the size editor.
pub const MAX_RENDER_EDGE: u32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// Move the stage at `from` to position `to`
    Reorder { from: usize, to: usize },
    Reset(usize),
    Remove(usize),
    Add(NewStage),
    Resize([u32; 2]),
    /// Open the file dialog to import images
    ImportImage,
}

/// One stage as a bordered card: drag grip, name, reset and remove buttons,
/// then the stage's own parameters in a collapsible section.
///
/// Dropping another card's grip onto this card moves that stage here.
pub fn stage_card(
    ui: &mut Ui,
    index: usize,
    stage: &mut EffectStage,
    env: &StageEnv<'_>,
    actions: &mut Vec<StageAction>,
) {
    let frame = egui::Frame::group(ui.style())
        .corner_radius(CornerRadius::same(6))
        .inner_margin(Margin::same(6));

    let (_, dropped) = ui.dnd_drop_zone::<usize, ()>(frame, |ui| {
        ui.horizontal(|ui| {
            ui.dnd_drag_source(egui::Id::new(("stage-grip", stage.id())), index, |ui| {
                ui.label("☰");
            })
            .response
            .on_hover_text("Drag to reorder");
            ui.strong(stage.name());
            ui.weak(stage.kind().display_name());

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.small_button("✖").on_hover_text("Remove stage").clicked() {
                    actions.push(StageAction::Remove(index));
                }
                if ui.small_button("⟲").on_hover_text("Reset parameters").clicked() {
                    actions.push(StageAction::Reset(index));
                }
            });
        });

        egui::CollapsingHeader::new("parameters")
            .id_salt(("stage-params", stage.id()))
            .default_open(true)
            .show(ui, |ui| stage.display(ui, env));
    });

    if let Some(from) = dropped {
        if *from != index {
            actions.push(StageAction::Reorder { from: *from, to: index });
        }
    }
}

/// Width and height editor for the render targets.
pub fn render_size_editor(ui: &mut Ui, pending: &mut [u32; 2], current: [u32; 2]) -> Option<StageAction> {
    ui.horizontal(|ui| {
        ui.label("Render size");
        ui.add(egui::DragValue::new(&mut pending[0]).range(1..=MAX_RENDER_EDGE).suffix(" px"));
        ui.label("×");
        ui.add(egui::DragValue::new(&mut pending[1]).range(1..=MAX_RENDER_EDGE).suffix(" px"));
        let apply = ui.add_enabled(*pending != current, egui::Button::new("Apply"));
        apply.clicked().then_some(StageAction::Resize(*pending))
    })
    .inner
}

// ============================================================================
// Add Stage Dialog
// ============================================================================

/// Kind picker plus the kind-specific inputs needed before a stage can be added.
#[derive(Debug, Default)]
pub struct AddStageDialog {
    kind: usize,
    image: Option<ImageId>,
}

impl AddStageDialog {
    pub fn kind(&self) -> EffectKind {
        EffectKind::ALL.get(self.kind).copied().unwrap_or(EffectKind::Passthrough)
    }

    pub fn select_kind(&mut self, kind: EffectKind) {
        self.kind = EffectKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
    }

    pub fn select_image(&mut self, image: Option<ImageId>) {
        self.image = image;
    }

    /// The stage to create, once every required input is chosen.
    pub fn request(&self) -> Option<NewStage> {
        Some(match self.kind() {
            EffectKind::Passthrough => NewStage::Passthrough,
            EffectKind::Circle => NewStage::Circle,
            EffectKind::ChromaticAberration => NewStage::ChromaticAberration,
            EffectKind::Noise => NewStage::Noise,
            EffectKind::Dithering => NewStage::Dithering,
            EffectKind::Image => NewStage::Image(self.image?),
        })
    }

    pub fn show(&mut self, ui: &mut Ui, resources: &ResourceManager, import_pending: bool) -> Option<StageAction> {
        let mut action = None;

        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("add-stage-kind")
                .selected_text(self.kind().display_name())
                .show_ui(ui, |ui| {
                    for (index, kind) in EffectKind::ALL.iter().enumerate() {
                        ui.selectable_value(&mut self.kind, index, kind.display_name());
                    }
                });

            if let Some(request) = self.request() {
                if ui.button("Add").clicked() {
                    action = Some(StageAction::Add(request));
                }
            } else {
                ui.add_enabled(false, egui::Button::new("Add"));
            }
        });

        if self.kind().needs_image() {
            // Drop stale selections and default to the newest import.
            if self.image.is_some_and(|id| resources.get_image(id).is_err()) {
                self.image = None;
            }
            if self.image.is_none() {
                self.image = resources.images().last().map(|image| image.id());
            }

            ui.horizontal(|ui| {
                let selected = self
                    .image
                    .and_then(|id| resources.get_image(id).ok())
                    .map(|image| image.name().to_owned())
                    .unwrap_or_else(|| "no image".to_owned());
                egui::ComboBox::from_id_salt("add-stage-image")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for image in resources.images() {
                            ui.selectable_value(&mut self.image, Some(image.id()), image.name());
                        }
                    });

                let import = ui.add_enabled(!import_pending, egui::Button::new("Import…"));
                if import.clicked() {
                    action = Some(StageAction::ImportImage);
                }
            });

            if resources.is_empty() {
                ui.weak("Import an image to add an image stage");
            }
        }

        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_for_parameter_only_kinds() {
        let mut dialog = AddStageDialog::default();
        assert_eq!(dialog.request(), Some(NewStage::Passthrough));

        dialog.select_kind(EffectKind::Noise);
        assert_eq!(dialog.kind(), EffectKind::Noise);
        assert_eq!(dialog.request(), Some(NewStage::Noise));
    }

    #[test]
    fn test_image_request_is_gated_on_selection() {
        let mut dialog = AddStageDialog::default();
        dialog.select_kind(EffectKind::Image);
        assert_eq!(dialog.request(), None);

        let mut ids = crate::resources::IdAllocator::default();
        let id = ids.allocate();
        dialog.select_image(Some(id));
        assert_eq!(dialog.request(), Some(NewStage::Image(id)));
    }

    #[test]
    fn test_size_editor_idle_without_input() {
        let ctx = egui::Context::default();
        let mut pending = [640, 480];
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                assert_eq!(render_size_editor(ui, &mut pending, [640, 480]), None);
            });
        });
        assert_eq!(pending, [640, 480]);
    }
}
