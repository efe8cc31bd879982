use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::canvas::CANVAS_SIZE;
use crate::components::history::HistoryPanel;
use crate::components::layers::LayersPanel;
use crate::components::tools::{Tool, ToolsPanel};
use crate::compositor::{self, to_color_image};
use crate::editor::{Editor, EditorEvent, EditorSession};
use crate::io::{self, IoResult};
use crate::settings::{AppSettings, BindableAction};

const PREVIEW_SIZE: f32 = 192.0;

/// Everything the editor view depends on besides pixels.
#[derive(Clone, PartialEq)]
struct ViewKey {
    generation: u64,
    size: (u32, u32),
    session: EditorSession,
    has_template: bool,
}

pub struct SkinFEApp {
    editor: Editor,
    settings: AppSettings,

    tools_panel: ToolsPanel,
    layers_panel: LayersPanel,
    history_panel: HistoryPanel,

    /// Guide image; `None` until the background load completes (or if it failed).
    template: Option<RgbaImage>,

    io_sender: mpsc::Sender<IoResult>,
    io_receiver: mpsc::Receiver<IoResult>,
    pending_io_ops: usize,

    view_texture: Option<TextureHandle>,
    view_key: Option<ViewKey>,
    preview_texture: Option<TextureHandle>,
    preview_generation: Option<u64>,

    last_export_dir: Option<PathBuf>,
    status: String,
}

impl SkinFEApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();

        let mut editor = Editor::new(settings.layout, settings.max_undo_steps);
        editor.session = EditorSession {
            tool: Tool::Pen,
            brush_size: settings.brush_size,
            brush_color: settings.brush_color,
            active_layer: settings.active_layer,
            show_template: settings.show_template,
            show_bounds: settings.show_bounds,
        };

        let (io_sender, io_receiver) = mpsc::channel();
        io::spawn_template_load(PathBuf::from(&settings.template_path), io_sender.clone());
        log::info!("Loading template from {}", settings.template_path);

        Self {
            editor,
            settings,
            tools_panel: ToolsPanel,
            layers_panel: LayersPanel::default(),
            history_panel: HistoryPanel::default(),
            template: None,
            io_sender,
            io_receiver,
            pending_io_ops: 1,
            view_texture: None,
            view_key: None,
            preview_texture: None,
            preview_generation: None,
            last_export_dir: None,
            status: String::new(),
        }
    }

    /// Forward one event to the editor and act on what comes back.
    fn dispatch(&mut self, event: EditorEvent) {
        let response = self.editor.handle(event);
        if let Some(bytes) = response.export_png {
            self.start_export(bytes);
        }
    }

    fn start_export(&mut self, bytes: Vec<u8>) {
        let Some(path) = io::pick_export_path(self.last_export_dir.as_deref()) else {
            return;
        };
        self.last_export_dir = path.parent().map(Path::to_path_buf);
        self.pending_io_ops += 1;
        self.status = format!("Exporting {}…", path.display());
        io::spawn_export_write(bytes, path, self.io_sender.clone());
    }

    fn poll_io(&mut self) {
        while let Ok(result) = self.io_receiver.try_recv() {
            self.pending_io_ops = self.pending_io_ops.saturating_sub(1);
            match result {
                IoResult::TemplateLoaded { image, path } => {
                    log::info!(
                        "Template loaded: {} ({}x{})",
                        path.display(),
                        image.width(),
                        image.height()
                    );
                    self.template = Some(image);
                }
                IoResult::TemplateFailed { path, error } => {
                    log::warn!("Template {} unavailable: {}", path.display(), error);
                    self.status = "Template not found; overlay disabled".to_string();
                }
                IoResult::ExportComplete { path } => {
                    log::info!("Exported skin to {}", path.display());
                    self.status = format!("Saved {}", path.display());
                }
                IoResult::ExportFailed { path, error } => {
                    log::error!("Export to {} failed: {}", path.display(), error);
                    self.status = format!("Export failed: {}", error);
                }
            }
        }
    }

    fn collect_shortcuts(&self, ctx: &egui::Context) -> Vec<EditorEvent> {
        if ctx.wants_keyboard_input() {
            return Vec::new();
        }
        let keys = &self.settings.keybindings;
        let session = &self.editor.session;
        let mut events = Vec::new();
        for &action in BindableAction::all() {
            if !keys.is_pressed(ctx, action) {
                continue;
            }
            events.push(match action {
                BindableAction::Undo => EditorEvent::Undo,
                BindableAction::Export => EditorEvent::Export,
                BindableAction::ToolPen => EditorEvent::SelectTool(Tool::Pen),
                BindableAction::ToolEraser => EditorEvent::SelectTool(Tool::Eraser),
                BindableAction::ToolBucket => EditorEvent::SelectTool(Tool::Bucket),
                BindableAction::BrushSizeDecrease => {
                    EditorEvent::SetBrushSize(session.brush_size.saturating_sub(1))
                }
                BindableAction::BrushSizeIncrease => EditorEvent::SetBrushSize(session.brush_size + 1),
                BindableAction::ToggleTemplate => EditorEvent::ToggleTemplate,
                BindableAction::ToggleBounds => EditorEvent::ToggleBounds,
            });
        }
        events
    }

    /// Translate raw pointer state over the canvas rect into editor events.
    fn collect_pointer_events(&self, ctx: &egui::Context, display: Rect) -> Vec<EditorEvent> {
        let dragging = self.editor.gesture() == crate::editor::GestureState::Dragging;
        ctx.input(|i| {
            let mut events = Vec::new();
            let pos = i.pointer.interact_pos();
            if i.pointer.primary_pressed()
                && let Some(pos) = pos
                && display.contains(pos)
            {
                events.push(EditorEvent::PointerDown { pos, display });
            } else if dragging
                && i.pointer.primary_down()
                && i.pointer.delta() != Vec2::ZERO
                && let Some(pos) = pos
            {
                events.push(EditorEvent::PointerMove { pos, display });
            }
            if i.pointer.primary_released() {
                events.push(EditorEvent::PointerUp);
            }
            events
        })
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let avail = ui.available_size();
        let side = avail.x.min(avail.y).max(1.0);
        // Whole multiples of the raster size keep pixels square.
        let scale = (side / CANVAS_SIZE as f32).floor().max(1.0);
        let display_side = (CANVAS_SIZE as f32 * scale).min(side.max(CANVAS_SIZE as f32));
        let rect = Rect::from_center_size(ui.max_rect().center(), Vec2::splat(display_side));
        let response = ui.allocate_rect(rect, Sense::click_and_drag());

        for event in self.collect_pointer_events(ui.ctx(), rect) {
            self.dispatch(event);
        }

        let size = (display_side.round() as u32, display_side.round() as u32);
        let key = ViewKey {
            generation: self.editor.store.dirty_generation,
            size,
            session: self.editor.session.clone(),
            has_template: self.template.is_some(),
        };
        if self.view_key.as_ref() != Some(&key) {
            let view = compositor::render_editor_view(
                &self.editor.store,
                &self.editor.layout,
                &self.editor.session,
                self.template.as_ref(),
                size.0,
                size.1,
            );
            let image = to_color_image(&view);
            match &mut self.view_texture {
                Some(tex) => tex.set(image, TextureOptions::NEAREST),
                None => {
                    self.view_texture =
                        Some(ui.ctx().load_texture("editor_view", image, TextureOptions::NEAREST))
                }
            }
            self.view_key = Some(key);
        }

        let painter = ui.painter();
        draw_checkerboard(painter, rect);
        if let Some(tex) = &self.view_texture {
            painter.image(
                tex.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        painter.rect_stroke(rect, 0.0, (1.0, Color32::from_gray(90)));

        if response.hovered() {
            let cursor = match self.editor.session.tool {
                Tool::Bucket => egui::CursorIcon::PointingHand,
                _ => egui::CursorIcon::Crosshair,
            };
            ui.ctx().set_cursor_icon(cursor);
        }
    }

    fn show_preview(&mut self, ui: &mut egui::Ui) {
        ui.heading("Preview");
        let generation = self.editor.store.dirty_generation;
        if self.preview_generation != Some(generation) || self.preview_texture.is_none() {
            let image = to_color_image(&self.editor.preview_image());
            match &mut self.preview_texture {
                Some(tex) => tex.set(image, TextureOptions::NEAREST),
                None => {
                    self.preview_texture =
                        Some(ui.ctx().load_texture("tee_preview", image, TextureOptions::NEAREST))
                }
            }
            self.preview_generation = Some(generation);
        }
        let (rect, _) = ui.allocate_exact_size(Vec2::splat(PREVIEW_SIZE), Sense::hover());
        let painter = ui.painter();
        draw_checkerboard(painter, rect);
        if let Some(tex) = &self.preview_texture {
            painter.image(
                tex.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }

    /// Copy the session back into the settings and write them out.
    fn persist_settings(&mut self) {
        let session = &self.editor.session;
        self.settings.brush_size = session.brush_size;
        self.settings.brush_color = session.brush_color;
        self.settings.show_template = session.show_template;
        self.settings.show_bounds = session.show_bounds;
        self.settings.active_layer = session.active_layer;
        self.settings.max_undo_steps = self.editor.history.max_history_size();
        self.settings.save();
    }
}

/// Two-tone 8px checkerboard behind transparent pixels.
fn draw_checkerboard(painter: &egui::Painter, rect: Rect) {
    const CELL: f32 = 8.0;
    painter.rect_filled(rect, 0.0, Color32::from_gray(200));
    let cols = (rect.width() / CELL).ceil() as i32;
    let rows = (rect.height() / CELL).ceil() as i32;
    for row in 0..rows {
        for col in 0..cols {
            if (row + col) % 2 == 0 {
                continue;
            }
            let min = rect.min + Vec2::new(col as f32 * CELL, row as f32 * CELL);
            let cell = Rect::from_min_size(min, Vec2::splat(CELL)).intersect(rect);
            painter.rect_filled(cell, 0.0, Color32::from_gray(160));
        }
    }
}

impl eframe::App for SkinFEApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_io();
        if self.pending_io_ops > 0 {
            ctx.request_repaint();
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.persist_settings();
        }

        for event in self.collect_shortcuts(ctx) {
            self.dispatch(event);
        }

        let mut events: Vec<EditorEvent> = Vec::new();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!(
                    "{}  ·  {}  ·  size {}",
                    self.editor.session.active_layer,
                    self.editor.session.tool.label(),
                    self.editor.session.brush_size
                ));
                ui.separator();
                ui.label(&self.status);
            });
        });

        egui::SidePanel::left("tools_panel")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| {
                events.extend(self.tools_panel.show(
                    ui,
                    &self.editor.session,
                    self.editor.history.can_undo(),
                    &self.settings.keybindings,
                ));
                ui.separator();
                ui.heading("History");
                if let Some(steps) = self.history_panel.show(ui, &self.editor.history) {
                    events.push(EditorEvent::UndoSteps(steps));
                }
            });

        egui::SidePanel::right("layers_panel")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| {
                self.show_preview(ui);
                ui.separator();
                events.extend(self.layers_panel.show(ui, &self.editor.store, &self.editor.session));
            });

        for event in events {
            self.dispatch(event);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_canvas(ui);
        });
    }
}
