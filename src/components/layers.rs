use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::canvas::{LayerId, LayerStore};
use crate::compositor::to_color_image;
use crate::editor::{EditorEvent, EditorSession};

const THUMBNAIL_SIZE: f32 = 40.0;
const THUMBNAIL_REFRESH: Duration = Duration::from_millis(250);

struct ThumbnailCache {
    texture: TextureHandle,
    /// Store dirty_generation at last upload.
    last_generation: u64,
    last_update: Instant,
}

/// Layer selector with per-layer thumbnails plus the overlay toggles.
#[derive(Default)]
pub struct LayersPanel {
    thumbnail_cache: HashMap<LayerId, ThumbnailCache>,
}

impl LayersPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, store: &LayerStore, session: &EditorSession) -> Vec<EditorEvent> {
        let mut events = Vec::new();

        ui.heading("Layers");
        egui::ScrollArea::vertical()
            .id_source("layer_list")
            .max_height((ui.available_height() - 80.0).max(120.0))
            .show(ui, |ui| {
                for &layer in LayerId::all() {
                    if self.show_layer_row(ui, store, layer, session.active_layer == layer) {
                        events.push(EditorEvent::SelectLayer(layer));
                    }
                }
            });

        ui.separator();
        let mut show_template = session.show_template;
        if ui.checkbox(&mut show_template, "Show template").changed() {
            events.push(EditorEvent::ToggleTemplate);
        }
        let mut show_bounds = session.show_bounds;
        if ui.checkbox(&mut show_bounds, "Show bounds").changed() {
            events.push(EditorEvent::ToggleBounds);
        }

        events
    }

    /// One row: thumbnail and name. Returns true when clicked.
    fn show_layer_row(&mut self, ui: &mut egui::Ui, store: &LayerStore, layer: LayerId, active: bool) -> bool {
        let texture_id = self.thumbnail(ui.ctx(), store, layer).id();
        let mut clicked = false;
        ui.horizontal(|ui| {
            let (rect, response) = ui.allocate_exact_size(Vec2::splat(THUMBNAIL_SIZE), Sense::click());
            let painter = ui.painter();
            painter.rect_filled(rect, 2.0, Color32::from_gray(60));
            painter.image(
                texture_id,
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
            if active {
                painter.rect_stroke(rect, 2.0, (2.0, ui.visuals().selection.bg_fill));
            }
            clicked |= response.clicked();
            clicked |= ui.selectable_label(active, layer.name()).clicked();
        });
        clicked && !active
    }

    fn thumbnail(&mut self, ctx: &egui::Context, store: &LayerStore, layer: LayerId) -> &TextureHandle {
        let generation = store.dirty_generation;
        let entry = self.thumbnail_cache.entry(layer).or_insert_with(|| ThumbnailCache {
            texture: ctx.load_texture(
                format!("layer_thumb_{}", layer.name()),
                to_color_image(store.pixels(layer)),
                TextureOptions::NEAREST,
            ),
            last_generation: generation,
            last_update: Instant::now(),
        });
        if entry.last_generation != generation {
            if entry.last_update.elapsed() >= THUMBNAIL_REFRESH {
                entry
                    .texture
                    .set(to_color_image(store.pixels(layer)), TextureOptions::NEAREST);
                entry.last_generation = generation;
                entry.last_update = Instant::now();
            } else {
                // Come back once the throttle window has passed.
                ctx.request_repaint_after(THUMBNAIL_REFRESH);
            }
        }
        &entry.texture
    }
}
