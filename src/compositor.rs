use eframe::egui;
use image::{Rgba, RgbaImage, imageops};
use rayon::prelude::*;

use crate::canvas::{Bounds, CANVAS_SIZE, LayerId, LayerStore, SkinLayout, TRANSPARENT};
use crate::editor::EditorSession;

pub const EXPORT_WIDTH: u32 = 512;
pub const EXPORT_HEIGHT: u32 = 256;

pub const TEMPLATE_OPACITY: f32 = 0.3;
pub const INACTIVE_LAYER_OPACITY: f32 = 0.2;

const GUIDE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GUIDE_WIDTH: i64 = 2;
const GUIDE_DASH_ON: i64 = 5;
const GUIDE_DASH_OFF: i64 = 3;

// ============================================================================
// BLENDING
// ============================================================================

/// Straight-alpha source-over of `top` onto `base`, with `top`'s alpha
/// further multiplied by `opacity` (0.0..=1.0).
#[inline]
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity >= 1.0 && (top[3] == 255 || base[3] == 0) {
        return top;
    }
    let sa = top[3] as f32 / 255.0 * opacity;
    if sa <= 0.0 {
        return base;
    }
    let da = base[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (top[c] as f32 * sa + base[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Composite the `src_rect` region of `src` onto `dst` with its top-left
/// corner at (`dst_x`, `dst_y`). Anything falling off `dst` is dropped.
pub fn draw_region(dst: &mut RgbaImage, src: &RgbaImage, src_rect: Bounds, dst_x: u32, dst_y: u32) {
    let max_sx = src_rect.max_x().min(src.width());
    let max_sy = src_rect.max_y().min(src.height());
    for sy in src_rect.y..max_sy {
        let ty = dst_y + (sy - src_rect.y);
        if ty >= dst.height() {
            break;
        }
        for sx in src_rect.x..max_sx {
            let tx = dst_x + (sx - src_rect.x);
            if tx >= dst.width() {
                break;
            }
            let top = *src.get_pixel(sx, sy);
            if top[3] == 0 {
                continue;
            }
            let base = *dst.get_pixel(tx, ty);
            dst.put_pixel(tx, ty, blend_over(base, top, 1.0));
        }
    }
}

// ============================================================================
// EDITOR VIEW
// ============================================================================

/// Render the editing surface at `display_w × display_h`.
///
/// Template (30%) first, then every layer in `LayerId` order scaled
/// nearest-neighbour, the active one opaque and the rest at 20%, then the
/// dashed bounds guide for the active layer when enabled.
pub fn render_editor_view(
    store: &LayerStore,
    layout: &SkinLayout,
    session: &EditorSession,
    template: Option<&RgbaImage>,
    display_w: u32,
    display_h: u32,
) -> RgbaImage {
    let display_w = display_w.max(1);
    let display_h = display_h.max(1);
    let mut out = RgbaImage::from_pixel(display_w, display_h, TRANSPARENT);

    let scaled_template = match template {
        Some(t) if session.show_template => {
            if t.dimensions() == (display_w, display_h) {
                Some(std::borrow::Cow::Borrowed(t))
            } else {
                Some(std::borrow::Cow::Owned(imageops::resize(
                    t,
                    display_w,
                    display_h,
                    imageops::FilterType::Triangle,
                )))
            }
        }
        _ => None,
    };

    // Nearest-neighbour source column for each display column.
    let src_x: Vec<u32> = (0..display_w)
        .map(|x| ((x as u64 * CANVAS_SIZE as u64) / display_w as u64) as u32)
        .collect();
    let layers: Vec<(&RgbaImage, f32)> = LayerId::all()
        .iter()
        .map(|&id| {
            let opacity = if id == session.active_layer { 1.0 } else { INACTIVE_LAYER_OPACITY };
            (store.pixels(id), opacity)
        })
        .collect();

    let row_bytes = display_w as usize * 4;
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(row_bytes).enumerate().for_each(|(y, row)| {
        let y = y as u32;
        let sy = ((y as u64 * CANVAS_SIZE as u64) / display_h as u64) as u32;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let mut acc = TRANSPARENT;
            if let Some(t) = &scaled_template {
                acc = blend_over(acc, *t.get_pixel(x as u32, y), TEMPLATE_OPACITY);
            }
            let sx = src_x[x];
            for (pixels, opacity) in &layers {
                acc = blend_over(acc, *pixels.get_pixel(sx, sy), *opacity);
            }
            px.copy_from_slice(&acc.0);
        }
    });

    if session.show_bounds {
        let bounds = layout.bounds(session.active_layer);
        draw_dashed_rect(&mut out, bounds, display_w, display_h);
    }

    out
}

/// Outline `bounds` (raster space) scaled to the display, dashed 5-on/3-off.
fn draw_dashed_rect(out: &mut RgbaImage, bounds: Bounds, display_w: u32, display_h: u32) {
    let scale_x = display_w as f32 / CANVAS_SIZE as f32;
    let scale_y = display_h as f32 / CANVAS_SIZE as f32;
    let x0 = (bounds.x as f32 * scale_x).round() as i64;
    let y0 = (bounds.y as f32 * scale_y).round() as i64;
    let x1 = (bounds.max_x() as f32 * scale_x).round() as i64;
    let y1 = (bounds.max_y() as f32 * scale_y).round() as i64;
    let half = GUIDE_WIDTH / 2;

    let mut plot = |x: i64, y: i64| {
        if x >= 0 && y >= 0 && (x as u32) < out.width() && (y as u32) < out.height() {
            out.put_pixel(x as u32, y as u32, GUIDE_COLOR);
        }
    };
    let dash_on = |offset: i64| offset % (GUIDE_DASH_ON + GUIDE_DASH_OFF) < GUIDE_DASH_ON;

    // Stroke straddles the edge line like a 2px canvas stroke.
    for x in x0..x1 {
        if !dash_on(x - x0) {
            continue;
        }
        for w in -half..(GUIDE_WIDTH - half) {
            plot(x, y0 + w);
            plot(x, y1 + w);
        }
    }
    for y in y0..y1 {
        if !dash_on(y - y0) {
            continue;
        }
        for w in -half..(GUIDE_WIDTH - half) {
            plot(x0 + w, y);
            plot(x1 + w, y);
        }
    }
}

// ============================================================================
// LIVE PREVIEW
// ============================================================================

/// One step of the preview: which layer, which region of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PreviewDraw {
    Full(LayerId),
    FootLeft,
    FootRight,
}

const PREVIEW_ORDER: [PreviewDraw; 13] = [
    PreviewDraw::Full(LayerId::BodyShadow),
    PreviewDraw::Full(LayerId::HandShadow),
    PreviewDraw::Full(LayerId::FootShadow),
    PreviewDraw::Full(LayerId::Hand),
    PreviewDraw::FootLeft,
    PreviewDraw::Full(LayerId::Body),
    PreviewDraw::FootRight,
    PreviewDraw::Full(LayerId::Eye1),
    PreviewDraw::Full(LayerId::Eye2),
    PreviewDraw::Full(LayerId::Eye3),
    PreviewDraw::Full(LayerId::Eye4),
    PreviewDraw::Full(LayerId::Eye5),
    PreviewDraw::Full(LayerId::Eye6),
];

/// How the assembled tee looks in game, at native 192×192. The foot is drawn
/// in two halves so the back foot sits behind the body and the front foot
/// in front of it.
pub fn render_preview(store: &LayerStore, layout: &SkinLayout) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, TRANSPARENT);
    for step in PREVIEW_ORDER {
        let (layer, rect) = match step {
            PreviewDraw::Full(id) => (id, Bounds::full_canvas()),
            PreviewDraw::FootLeft => (LayerId::Foot, layout.foot.left_half()),
            PreviewDraw::FootRight => (LayerId::Foot, layout.foot.right_half()),
        };
        draw_region(&mut out, store.pixels(layer), rect, rect.x, rect.y);
    }
    out
}

// ============================================================================
// EXPORT SHEET
// ============================================================================

/// Export drawing order and destination of each layer's bounds rectangle.
pub const EXPORT_PLACEMENTS: [(LayerId, u32, u32); 12] = [
    (LayerId::BodyShadow, 192, 0),
    (LayerId::HandShadow, 448, 0),
    (LayerId::FootShadow, 384, 128),
    (LayerId::Body, 0, 0),
    (LayerId::Hand, 384, 0),
    (LayerId::Foot, 384, 64),
    (LayerId::Eye1, 448, 192),
    (LayerId::Eye2, 384, 192),
    (LayerId::Eye3, 320, 192),
    (LayerId::Eye4, 256, 192),
    (LayerId::Eye5, 192, 192),
    (LayerId::Eye6, 128, 192),
];

/// Build the 512×256 texture sheet in the game's layout.
pub fn render_export(store: &LayerStore, layout: &SkinLayout) -> RgbaImage {
    let mut sheet = RgbaImage::from_pixel(EXPORT_WIDTH, EXPORT_HEIGHT, TRANSPARENT);
    for (layer, dx, dy) in EXPORT_PLACEMENTS {
        let Some(rect) = layout.bounds(layer).clamped_to_canvas() else {
            continue;
        };
        draw_region(&mut sheet, store.pixels(layer), rect, dx, dy);
    }
    sheet
}

/// Convert for upload as an egui texture.
pub fn to_color_image(img: &RgbaImage) -> egui::ColorImage {
    let size = [img.width() as usize, img.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn fill_rect(store: &mut LayerStore, layer: LayerId, b: Bounds, color: Rgba<u8>) {
        for y in b.y..b.max_y() {
            for x in b.x..b.max_x() {
                store.write_pixel(layer, x, y, color);
            }
        }
    }

    fn make_session(active: LayerId) -> EditorSession {
        EditorSession {
            active_layer: active,
            ..EditorSession::default()
        }
    }

    #[test]
    fn test_blend_over() {
        assert_eq!(blend_over(TRANSPARENT, RED, 1.0), RED);
        assert_eq!(blend_over(BLUE, RED, 1.0), RED);
        assert_eq!(blend_over(BLUE, TRANSPARENT, 1.0), BLUE);
        assert_eq!(blend_over(BLUE, RED, 0.0), BLUE);
        let half = blend_over(TRANSPARENT, RED, 0.2);
        assert_eq!(half, Rgba([255, 0, 0, 51]));
        let mixed = blend_over(BLUE, RED, 0.5);
        assert_eq!(mixed[3], 255);
        assert!((mixed[0] as i32 - 128).abs() <= 1);
        assert!((mixed[2] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_export_origin_matches_body() {
        let mut store = LayerStore::new();
        let c = Rgba([12, 34, 56, 200]);
        store.write_pixel(LayerId::Body, 0, 0, c);
        let sheet = render_export(&store, &SkinLayout::default());
        assert_eq!(sheet.dimensions(), (EXPORT_WIDTH, EXPORT_HEIGHT));
        assert_eq!(*sheet.get_pixel(0, 0), c);
    }

    #[test]
    fn test_export_places_bounds_rectangles() {
        let layout = SkinLayout::default();
        let mut store = LayerStore::new();
        store.write_pixel(LayerId::Hand, layout.hand.x, layout.hand.y, RED);
        store.write_pixel(LayerId::FootShadow, layout.foot.x + 127, layout.foot.y + 63, GREEN);
        store.write_pixel(LayerId::Eye3, layout.eye.x + 1, layout.eye.y + 2, BLUE);
        store.write_pixel(LayerId::BodyShadow, 191, 191, RED);

        let sheet = render_export(&store, &layout);
        assert_eq!(*sheet.get_pixel(384, 0), RED);
        assert_eq!(*sheet.get_pixel(511, 191), GREEN);
        assert_eq!(*sheet.get_pixel(321, 194), BLUE);
        assert_eq!(*sheet.get_pixel(383, 191), RED);
    }

    #[test]
    fn test_export_ignores_pixels_outside_bounds() {
        let layout = SkinLayout::default();
        let mut store = LayerStore::new();
        // Outside the hand rectangle: never copied anywhere.
        store.write_pixel(LayerId::Hand, 0, 0, RED);
        store.write_pixel(LayerId::Eye1, 10, 10, RED);
        let sheet = render_export(&store, &layout);
        assert!(sheet.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_export_eye_row() {
        let layout = SkinLayout::default();
        let mut store = LayerStore::new();
        for eye in LayerId::EYES {
            fill_rect(&mut store, eye, layout.eye, Rgba([eye.index() as u8, 0, 0, 255]));
        }
        let sheet = render_export(&store, &layout);
        for (i, eye) in LayerId::EYES.iter().enumerate() {
            let x = 448 - 64 * i as u32;
            assert_eq!(*sheet.get_pixel(x + 32, 224), Rgba([eye.index() as u8, 0, 0, 255]));
        }
        // Nothing lands left of eye-6.
        assert_eq!(*sheet.get_pixel(127, 224), TRANSPARENT);
    }

    #[test]
    fn test_preview_split_foot_occlusion() {
        let layout = SkinLayout::default();
        let mut store = LayerStore::new();
        fill_rect(&mut store, LayerId::Body, Bounds::full_canvas(), BLUE);
        fill_rect(&mut store, LayerId::Foot, layout.foot, GREEN);

        let preview = render_preview(&store, &layout);
        let left = layout.foot.left_half();
        let right = layout.foot.right_half();
        assert_eq!(*preview.get_pixel(left.x + 5, left.y + 5), BLUE);
        assert_eq!(*preview.get_pixel(left.max_x() - 1, left.y + 30), BLUE);
        assert_eq!(*preview.get_pixel(right.x, right.y + 30), GREEN);
        assert_eq!(*preview.get_pixel(right.max_x() - 1, right.max_y() - 1), GREEN);
    }

    #[test]
    fn test_preview_eyes_over_body_and_shadow_under() {
        let mut store = LayerStore::new();
        fill_rect(&mut store, LayerId::Body, Bounds::full_canvas(), BLUE);
        store.write_pixel(LayerId::Eye2, 100, 80, RED);
        store.write_pixel(LayerId::BodyShadow, 10, 10, GREEN);
        let preview = render_preview(&store, &SkinLayout::default());
        assert_eq!(*preview.get_pixel(100, 80), RED);
        assert_eq!(*preview.get_pixel(10, 10), BLUE);
    }

    #[test]
    fn test_editor_view_layer_opacity() {
        let layout = SkinLayout::default();
        let mut store = LayerStore::new();
        store.write_pixel(LayerId::Body, 10, 10, RED);

        let active = render_editor_view(&store, &layout, &make_session(LayerId::Body), None, 192, 192);
        assert_eq!(*active.get_pixel(10, 10), RED);

        let inactive = render_editor_view(&store, &layout, &make_session(LayerId::Hand), None, 192, 192);
        assert_eq!(*inactive.get_pixel(10, 10), Rgba([255, 0, 0, 51]));
    }

    #[test]
    fn test_editor_view_scales_nearest() {
        let mut store = LayerStore::new();
        store.write_pixel(LayerId::Body, 10, 10, RED);
        let view = render_editor_view(&store, &SkinLayout::default(), &make_session(LayerId::Body), None, 384, 384);
        assert_eq!(view.dimensions(), (384, 384));
        for (x, y) in [(20, 20), (21, 21), (20, 21)] {
            assert_eq!(*view.get_pixel(x, y), RED);
        }
        assert_eq!(*view.get_pixel(22, 20), TRANSPARENT);
        assert_eq!(*view.get_pixel(19, 20), TRANSPARENT);
    }

    #[test]
    fn test_editor_view_template_overlay() {
        let template = RgbaImage::from_pixel(96, 96, GREEN);
        let store = LayerStore::new();
        let mut session = make_session(LayerId::Body);

        let hidden = render_editor_view(&store, &SkinLayout::default(), &session, Some(&template), 192, 192);
        assert_eq!(*hidden.get_pixel(50, 50), TRANSPARENT);

        session.show_template = true;
        let shown = render_editor_view(&store, &SkinLayout::default(), &session, Some(&template), 192, 192);
        let p = *shown.get_pixel(50, 50);
        assert_eq!(p[1], 255);
        assert!((76..=77).contains(&p[3]));
    }

    #[test]
    fn test_editor_view_bounds_guide_is_dashed() {
        let layout = SkinLayout::default();
        let store = LayerStore::new();
        let mut session = make_session(LayerId::Hand);
        session.show_bounds = true;
        let view = render_editor_view(&store, &layout, &session, None, 192, 192);

        let (x0, y0) = (layout.hand.x, layout.hand.y);
        assert_eq!(*view.get_pixel(x0, y0), GUIDE_COLOR);
        assert_eq!(*view.get_pixel(x0 + 4, y0 - 1), GUIDE_COLOR);
        assert_eq!(*view.get_pixel(x0 + 5, y0), TRANSPARENT);
        assert_eq!(*view.get_pixel(x0 + 8, y0), GUIDE_COLOR);
        assert_eq!(*view.get_pixel(x0, y0 + 2), GUIDE_COLOR);
        // Interior stays clear.
        assert_eq!(*view.get_pixel(x0 + 10, y0 + 10), TRANSPARENT);

        session.show_bounds = false;
        let plain = render_editor_view(&store, &layout, &session, None, 192, 192);
        assert!(plain.pixels().all(|p| *p == TRANSPARENT));
    }
}
