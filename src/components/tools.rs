use eframe::egui;
use egui::{Pos2, Rect};
use image::Rgba;

use crate::canvas::{Bounds, CANVAS_SIZE, LayerId, LayerStore, TRANSPARENT};
use crate::editor::{EditorEvent, EditorSession};
use crate::settings::{BindableAction, KeyBindings};

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
    Bucket,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Pen, Tool::Eraser, Tool::Bucket]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pen => "Pen",
            Tool::Eraser => "Eraser",
            Tool::Bucket => "Bucket",
        }
    }

    /// Description recorded in the undo history for a gesture with this tool.
    pub fn history_description(&self) -> &'static str {
        match self {
            Tool::Pen => "Pen stroke",
            Tool::Eraser => "Eraser stroke",
            Tool::Bucket => "Fill",
        }
    }

    pub fn uses_brush_size(&self) -> bool {
        !matches!(self, Tool::Bucket)
    }
}

/// Brush color as opaque RGBA.
pub fn opaque(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

/// Parse "#rrggbb" (the leading '#' is optional).
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let v = s.trim().trim_start_matches('#');
    if v.len() != 6 || !v.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&v[0..2], 16).ok()?;
    let g = u8::from_str_radix(&v[2..4], 16).ok()?;
    let b = u8::from_str_radix(&v[4..6], 16).ok()?;
    Some([r, g, b])
}

pub fn to_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

// ============================================================================
// COORDINATE MAPPING
// ============================================================================

/// Map a screen position into canvas space, scaling by the ratio of the
/// raster size to the on-screen rendered size. The result is not clamped.
pub fn screen_to_canvas(screen_pos: Pos2, display_rect: Rect) -> (f32, f32) {
    let w = display_rect.width().max(f32::EPSILON);
    let h = display_rect.height().max(f32::EPSILON);
    (
        (screen_pos.x - display_rect.min.x) * (CANVAS_SIZE as f32 / w),
        (screen_pos.y - display_rect.min.y) * (CANVAS_SIZE as f32 / h),
    )
}

// ============================================================================
// BRUSH
// ============================================================================

/// Stamp one disc of diameter `size` centered at `center` (canvas space).
///
/// `Pen` paints `color` at full opacity, `Eraser` clears to transparent.
/// A center outside `bounds` rejects the whole stamp; covered pixels are
/// clipped to `bounds` so nothing outside it is ever touched.
/// Returns `false` when the stamp was rejected or covered no pixel.
pub fn stamp_brush(
    store: &mut LayerStore,
    layer: LayerId,
    bounds: Bounds,
    center: (f32, f32),
    size: f32,
    tool: Tool,
    color: [u8; 3],
) -> bool {
    let (cx, cy) = center;
    if !bounds.contains_point(cx, cy) {
        return false;
    }
    let Some(clip) = bounds.clamped_to_canvas() else {
        return false;
    };
    let radius = size / 2.0;
    let radius_sq = radius * radius;
    if radius_sq < 0.001 {
        return false;
    }

    let min_x = ((cx - radius).floor().max(clip.x as f32)) as u32;
    let min_y = ((cy - radius).floor().max(clip.y as f32)) as u32;
    let max_x = ((cx + radius).ceil() as u32).min(clip.max_x());
    let max_y = ((cy + radius).ceil() as u32).min(clip.max_y());

    let paint = match tool {
        Tool::Eraser => TRANSPARENT,
        _ => opaque(color),
    };

    let mut touched = false;
    for y in min_y..max_y {
        let dy = y as f32 + 0.5 - cy;
        for x in min_x..max_x {
            let dx = x as f32 + 0.5 - cx;
            if dx * dx + dy * dy <= radius_sq {
                store.write_pixel(layer, x, y, paint);
                touched = true;
            }
        }
    }

    // A disc smaller than a pixel can miss every pixel centre; it still
    // covers the pixel under the pointer.
    let (px, py) = (cx.floor() as u32, cy.floor() as u32);
    if !touched && clip.contains(px, py) {
        store.write_pixel(layer, px, py, paint);
        touched = true;
    }
    touched
}

// ============================================================================
// FLOOD FILL
// ============================================================================

const NEIGHBORS_8: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// 8-connected flood fill from `seed`, confined to `bounds`.
///
/// Pixels matching the seed color exactly (RGBA) and reachable through
/// matching neighbours are repainted with `color` at full opacity. The work
/// is done on a copy of the layer and written back in one batch. Returns the
/// number of pixels filled; 0 when the seed lies outside `bounds` or already
/// has the fill color.
pub fn flood_fill(
    store: &mut LayerStore,
    layer: LayerId,
    bounds: Bounds,
    seed: (u32, u32),
    color: [u8; 3],
) -> usize {
    let Some(bounds) = bounds.clamped_to_canvas() else {
        return 0;
    };
    let (sx, sy) = seed;
    if !bounds.contains(sx, sy) {
        return 0;
    }

    let fill = opaque(color);
    let target = store.read_pixel(layer, sx, sy);
    if target == fill {
        return 0;
    }

    let mut pixels = store.pixels(layer).clone();
    let bw = bounds.w as usize;
    // Indexed relative to the bounds origin; one slot per pixel of the area.
    let mut visited = vec![false; bounds.area()];
    let mut stack: Vec<(u32, u32)> = Vec::with_capacity(1024);
    stack.push((sx, sy));
    let mut filled = 0usize;

    while let Some((x, y)) = stack.pop() {
        let vi = (y - bounds.y) as usize * bw + (x - bounds.x) as usize;
        if visited[vi] {
            continue;
        }
        visited[vi] = true;
        if *pixels.get_pixel(x, y) != target {
            continue;
        }
        pixels.put_pixel(x, y, fill);
        filled += 1;

        for (dx, dy) in NEIGHBORS_8 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < bounds.x as i64
                || ny < bounds.y as i64
                || nx >= bounds.max_x() as i64
                || ny >= bounds.max_y() as i64
            {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            let ni = (ny - bounds.y) as usize * bw + (nx - bounds.x) as usize;
            if !visited[ni] {
                stack.push((nx, ny));
            }
        }
    }

    if filled > 0
        && let Err(e) = store.set_pixels(layer, pixels)
    {
        log::error!("Flood fill write-back failed on {}: {}", layer, e);
        return 0;
    }
    filled
}

// ============================================================================
// TOOLS PANEL
// ============================================================================

/// Hover text for a button, suffixed with its current binding if it has one.
fn shortcut_hint(text: &str, keybindings: &KeyBindings, action: BindableAction) -> String {
    match keybindings.get(action) {
        Some(combo) => format!("{} ({})", text, combo.display()),
        None => text.to_string(),
    }
}

#[derive(Default)]
pub struct ToolsPanel;

impl ToolsPanel {
    /// Tool buttons, brush size, color picker and the undo/export actions.
    /// Returns the events produced by the user this frame.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        session: &EditorSession,
        can_undo: bool,
        keybindings: &KeyBindings,
    ) -> Vec<EditorEvent> {
        let mut events = Vec::new();

        ui.heading("Tools");
        ui.horizontal(|ui| {
            for tool in Tool::all() {
                if ui
                    .selectable_label(session.tool == *tool, tool.label())
                    .clicked()
                    && session.tool != *tool
                {
                    events.push(EditorEvent::SelectTool(*tool));
                }
            }
        });

        ui.add_space(4.0);
        let mut size = session.brush_size;
        ui.horizontal(|ui| {
            ui.label("Brush");
            let slider = egui::Slider::new(&mut size, MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).show_value(false);
            if ui.add_enabled(session.tool.uses_brush_size(), slider).changed() {
                events.push(EditorEvent::SetBrushSize(size));
            }
            ui.monospace(format!("{:>2}", session.brush_size));
        });

        let mut color = session.brush_color;
        ui.horizontal(|ui| {
            ui.label("Color");
            if ui.color_edit_button_srgb(&mut color).changed() {
                events.push(EditorEvent::SetBrushColor(color));
            }
            ui.monospace(to_hex_color(session.brush_color));
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(can_undo, egui::Button::new("⟲ Undo"))
                .on_hover_text(shortcut_hint("Undo", keybindings, BindableAction::Undo))
                .clicked()
            {
                events.push(EditorEvent::Undo);
            }
            if ui
                .button("⬇ Download")
                .on_hover_text(shortcut_hint("Export ddnet_skin.png", keybindings, BindableAction::Export))
                .clicked()
            {
                events.push(EditorEvent::Export);
            }
        });

        events
    }
}
