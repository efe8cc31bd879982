use eframe::egui::{Pos2, Rect};
use image::RgbaImage;

use crate::canvas::{LayerId, LayerStore, SkinLayout};
use crate::components::history::{HistoryManager, MAX_HISTORY};
use crate::components::tools::{self, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, Tool};
use crate::compositor;
use crate::io;

pub const DEFAULT_BRUSH_SIZE: u32 = 16;
pub const DEFAULT_BRUSH_COLOR: [u8; 3] = [255, 0, 0];

/// User-facing editor state. Only `Editor::handle` mutates it.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSession {
    pub tool: Tool,
    pub brush_size: u32,
    pub brush_color: [u8; 3],
    pub active_layer: LayerId,
    pub show_template: bool,
    pub show_bounds: bool,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self {
            tool: Tool::Pen,
            brush_size: DEFAULT_BRUSH_SIZE,
            brush_color: DEFAULT_BRUSH_COLOR,
            active_layer: LayerId::Body,
            show_template: false,
            show_bounds: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging,
}

/// Everything the UI can ask the editor to do. Pointer events carry the
/// on-screen rect the canvas was drawn into so the position can be mapped.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    SelectTool(Tool),
    SetBrushSize(u32),
    SetBrushColor([u8; 3]),
    SelectLayer(LayerId),
    ToggleTemplate,
    ToggleBounds,
    PointerDown { pos: Pos2, display: Rect },
    PointerMove { pos: Pos2, display: Rect },
    PointerUp,
    Undo,
    /// Undo several steps at once (history panel).
    UndoSteps(usize),
    Export,
}

#[derive(Debug, Default)]
pub struct EditorResponse {
    pub redraw: bool,
    /// Encoded export sheet, present only after `EditorEvent::Export`.
    pub export_png: Option<Vec<u8>>,
}

impl EditorResponse {
    fn redraw(redraw: bool) -> Self {
        Self {
            redraw,
            export_png: None,
        }
    }
}

/// The single open skin: layers, undo history, bounds table and session.
pub struct Editor {
    pub store: LayerStore,
    pub history: HistoryManager,
    pub layout: SkinLayout,
    pub session: EditorSession,
    gesture: GestureState,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(SkinLayout::default(), MAX_HISTORY)
    }
}

impl Editor {
    pub fn new(layout: SkinLayout, max_undo_steps: usize) -> Self {
        Self {
            store: LayerStore::new(),
            history: HistoryManager::new(max_undo_steps),
            layout,
            session: EditorSession::default(),
            gesture: GestureState::Idle,
        }
    }

    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    pub fn handle(&mut self, event: EditorEvent) -> EditorResponse {
        match event {
            EditorEvent::SelectTool(tool) => {
                self.session.tool = tool;
                EditorResponse::redraw(true)
            }
            EditorEvent::SetBrushSize(size) => {
                self.session.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
                EditorResponse::redraw(true)
            }
            EditorEvent::SetBrushColor(color) => {
                self.session.brush_color = color;
                EditorResponse::redraw(true)
            }
            EditorEvent::SelectLayer(layer) => {
                self.session.active_layer = layer;
                EditorResponse::redraw(true)
            }
            EditorEvent::ToggleTemplate => {
                self.session.show_template = !self.session.show_template;
                EditorResponse::redraw(true)
            }
            EditorEvent::ToggleBounds => {
                self.session.show_bounds = !self.session.show_bounds;
                EditorResponse::redraw(true)
            }
            EditorEvent::PointerDown { pos, display } => self.pointer_down(pos, display),
            EditorEvent::PointerMove { pos, display } => self.pointer_move(pos, display),
            EditorEvent::PointerUp => {
                self.gesture = GestureState::Idle;
                EditorResponse::default()
            }
            EditorEvent::Undo => EditorResponse::redraw(self.history.undo(&mut self.store)),
            EditorEvent::UndoSteps(steps) => {
                EditorResponse::redraw(self.history.undo_to(steps, &mut self.store) > 0)
            }
            EditorEvent::Export => EditorResponse {
                redraw: false,
                export_png: self.export_png(),
            },
        }
    }

    fn pointer_down(&mut self, pos: Pos2, display: Rect) -> EditorResponse {
        let tool = self.session.tool;
        self.history.snapshot(&self.store, tool.history_description());

        if tool == Tool::Bucket {
            let (cx, cy) = tools::screen_to_canvas(pos, display);
            if cx < 0.0 || cy < 0.0 {
                return EditorResponse::default();
            }
            let layer = self.session.active_layer;
            let filled = tools::flood_fill(
                &mut self.store,
                layer,
                self.layout.bounds(layer),
                (cx.floor() as u32, cy.floor() as u32),
                self.session.brush_color,
            );
            if filled > 0 {
                log::debug!("Filled {} pixels on {}", filled, layer);
            }
            return EditorResponse::redraw(filled > 0);
        }

        self.gesture = GestureState::Dragging;
        EditorResponse::default()
    }

    fn pointer_move(&mut self, pos: Pos2, display: Rect) -> EditorResponse {
        if self.gesture != GestureState::Dragging || self.session.tool == Tool::Bucket {
            return EditorResponse::default();
        }
        let layer = self.session.active_layer;
        let touched = tools::stamp_brush(
            &mut self.store,
            layer,
            self.layout.bounds(layer),
            tools::screen_to_canvas(pos, display),
            self.session.brush_size as f32,
            self.session.tool,
            self.session.brush_color,
        );
        EditorResponse::redraw(touched)
    }

    pub fn export_image(&self) -> RgbaImage {
        compositor::render_export(&self.store, &self.layout)
    }

    pub fn preview_image(&self) -> RgbaImage {
        compositor::render_preview(&self.store, &self.layout)
    }

    fn export_png(&self) -> Option<Vec<u8>> {
        match io::encode_png(&self.export_image()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::error!("Export encode failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;
    use eframe::egui::vec2;
    use image::Rgba;

    fn native_rect() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(192.0, 192.0))
    }

    fn rasters(editor: &Editor) -> Vec<RgbaImage> {
        LayerId::all().iter().map(|&id| editor.store.pixels(id).clone()).collect()
    }

    fn drag(editor: &mut Editor, points: &[(f32, f32)]) {
        let display = native_rect();
        let (x, y) = points[0];
        editor.handle(EditorEvent::PointerDown { pos: Pos2::new(x, y), display });
        for &(x, y) in points {
            editor.handle(EditorEvent::PointerMove { pos: Pos2::new(x, y), display });
        }
        editor.handle(EditorEvent::PointerUp);
    }

    #[test]
    fn test_session_defaults() {
        let s = EditorSession::default();
        assert_eq!(s.tool, Tool::Pen);
        assert_eq!(s.brush_size, 16);
        assert_eq!(s.brush_color, [255, 0, 0]);
        assert_eq!(s.active_layer, LayerId::Body);
        assert!(!s.show_template && !s.show_bounds);
    }

    #[test]
    fn test_gesture_then_undo_restores_everything() {
        let mut editor = Editor::default();
        editor.store.write_pixel(LayerId::Eye5, 90, 90, Rgba([1, 2, 3, 255]));
        let before = rasters(&editor);

        drag(&mut editor, &[(20.0, 20.0), (40.0, 30.0), (60.0, 60.0)]);
        assert_ne!(rasters(&editor), before);

        assert!(editor.handle(EditorEvent::Undo).redraw);
        assert_eq!(rasters(&editor), before);
    }

    #[test]
    fn test_one_snapshot_per_gesture() {
        let mut editor = Editor::default();
        drag(&mut editor, &[(10.0, 10.0), (11.0, 10.0), (12.0, 10.0), (13.0, 10.0)]);
        assert_eq!(editor.history.undo_count(), 1);
        assert_eq!(editor.history.undo_description(), Some("Pen stroke"));
        assert_eq!(editor.gesture(), GestureState::Idle);
    }

    #[test]
    fn test_pointer_down_alone_does_not_paint() {
        let mut editor = Editor::default();
        editor.handle(EditorEvent::PointerDown { pos: Pos2::new(96.0, 96.0), display: native_rect() });
        assert_eq!(editor.gesture(), GestureState::Dragging);
        assert_eq!(editor.store.read_pixel(LayerId::Body, 96, 96), TRANSPARENT);
    }

    #[test]
    fn test_move_without_press_is_ignored() {
        let mut editor = Editor::default();
        let r = editor.handle(EditorEvent::PointerMove { pos: Pos2::new(96.0, 96.0), display: native_rect() });
        assert!(!r.redraw);
        assert_eq!(editor.store.read_pixel(LayerId::Body, 96, 96), TRANSPARENT);
        assert!(!editor.history.can_undo());
    }

    #[test]
    fn test_pointer_maps_through_display_rect() {
        let mut editor = Editor::default();
        // Canvas drawn at 2x, offset by (40, 40).
        let display = Rect::from_min_size(Pos2::new(40.0, 40.0), vec2(384.0, 384.0));
        editor.handle(EditorEvent::SetBrushSize(2));
        editor.handle(EditorEvent::PointerDown { pos: Pos2::new(241.0, 241.0), display });
        editor.handle(EditorEvent::PointerMove { pos: Pos2::new(241.0, 241.0), display });
        assert_eq!(editor.store.read_pixel(LayerId::Body, 100, 100), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_bucket_fills_on_press() {
        let mut editor = Editor::default();
        editor.handle(EditorEvent::SelectTool(Tool::Bucket));
        editor.handle(EditorEvent::SelectLayer(LayerId::Hand));
        editor.handle(EditorEvent::SetBrushColor([0, 0, 255]));
        let r = editor.handle(EditorEvent::PointerDown { pos: Pos2::new(140.5, 80.9), display: native_rect() });
        assert!(r.redraw);
        assert_eq!(editor.gesture(), GestureState::Idle);
        assert_eq!(editor.history.undo_description(), Some("Fill"));

        let hand = editor.layout.hand;
        assert_eq!(editor.store.read_pixel(LayerId::Hand, hand.x, hand.y), Rgba([0, 0, 255, 255]));
        assert_eq!(editor.store.read_pixel(LayerId::Hand, 0, 0), TRANSPARENT);
        // Drags with the bucket never stamp.
        editor.handle(EditorEvent::PointerMove { pos: Pos2::new(10.0, 10.0), display: native_rect() });
        assert_eq!(editor.store.read_pixel(LayerId::Hand, 10, 10), TRANSPARENT);
    }

    #[test]
    fn test_painting_outside_bounds_changes_nothing() {
        let mut editor = Editor::default();
        editor.handle(EditorEvent::SelectLayer(LayerId::Foot));
        let before = rasters(&editor);
        drag(&mut editor, &[(5.0, 5.0), (30.0, 30.0)]);
        assert_eq!(rasters(&editor), before);
    }

    #[test]
    fn test_brush_size_is_clamped() {
        let mut editor = Editor::default();
        editor.handle(EditorEvent::SetBrushSize(0));
        assert_eq!(editor.session.brush_size, 1);
        editor.handle(EditorEvent::SetBrushSize(500));
        assert_eq!(editor.session.brush_size, 64);
    }

    #[test]
    fn test_toggles() {
        let mut editor = Editor::default();
        editor.handle(EditorEvent::ToggleTemplate);
        editor.handle(EditorEvent::ToggleBounds);
        editor.handle(EditorEvent::ToggleBounds);
        assert!(editor.session.show_template);
        assert!(!editor.session.show_bounds);
    }

    #[test]
    fn test_undo_on_empty_is_silent() {
        let mut editor = Editor::default();
        let r = editor.handle(EditorEvent::Undo);
        assert!(!r.redraw);
        assert!(r.export_png.is_none());
    }

    #[test]
    fn test_export_returns_png() {
        let mut editor = Editor::default();
        drag(&mut editor, &[(50.0, 50.0)]);
        let r = editor.handle(EditorEvent::Export);
        let bytes = r.export_png.unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (512, 256));
        assert_eq!(*decoded.get_pixel(50, 50), Rgba([255, 0, 0, 255]));
    }
}
