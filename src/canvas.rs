use image::{Rgba, RgbaImage};

use crate::error::SkinError;

/// Edge length of every layer raster, in pixels.
pub const CANVAS_SIZE: u32 = 192;

/// A pixel with zero alpha.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// LAYER IDENTIFIERS
// ============================================================================

/// The closed set of skin layers, in editor draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LayerId {
    #[default]
    Body,
    BodyShadow,
    Hand,
    HandShadow,
    Foot,
    FootShadow,
    Eye1,
    Eye2,
    Eye3,
    Eye4,
    Eye5,
    Eye6,
}

impl LayerId {
    pub const COUNT: usize = 12;

    pub const EYES: [LayerId; 6] = [
        LayerId::Eye1,
        LayerId::Eye2,
        LayerId::Eye3,
        LayerId::Eye4,
        LayerId::Eye5,
        LayerId::Eye6,
    ];

    /// All layers in the fixed editor order.
    pub fn all() -> &'static [LayerId; LayerId::COUNT] {
        use LayerId::*;
        &[
            Body, BodyShadow, Hand, HandShadow, Foot, FootShadow,
            Eye1, Eye2, Eye3, Eye4, Eye5, Eye6,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable kebab-case name, also used for layer file names in CLI mode.
    pub fn name(self) -> &'static str {
        match self {
            LayerId::Body => "body",
            LayerId::BodyShadow => "body-shadow",
            LayerId::Hand => "hand",
            LayerId::HandShadow => "hand-shadow",
            LayerId::Foot => "foot",
            LayerId::FootShadow => "foot-shadow",
            LayerId::Eye1 => "eye-1",
            LayerId::Eye2 => "eye-2",
            LayerId::Eye3 => "eye-3",
            LayerId::Eye4 => "eye-4",
            LayerId::Eye5 => "eye-5",
            LayerId::Eye6 => "eye-6",
        }
    }

    pub fn from_name(name: &str) -> Option<LayerId> {
        LayerId::all().iter().copied().find(|l| l.name() == name)
    }

}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LayerId {
    type Err = SkinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerId::from_name(s.trim()).ok_or_else(|| SkinError::UnknownLayer(s.to_string()))
    }
}

// ============================================================================
// BOUNDS
// ============================================================================

/// Axis-aligned editable rectangle in canvas pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Bounds {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub const fn full_canvas() -> Self {
        Self::new(0, 0, CANVAS_SIZE, CANVAS_SIZE)
    }

    pub fn max_x(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn max_y(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn area(&self) -> usize {
        (self.w as usize) * (self.h as usize)
    }

    /// Half-open pixel test: `x ∈ [x, x + w)`.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.max_x() && y >= self.y && y < self.max_y()
    }

    /// Gesture gate for pointer positions. The far edge is inclusive, so a
    /// pointer sitting exactly on the right/bottom border still counts.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x as f32
            && x <= self.max_x() as f32
            && y >= self.y as f32
            && y <= self.max_y() as f32
    }

    /// Left half (`w / 2` wide) of this rectangle.
    pub fn left_half(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.w / 2, self.h)
    }

    /// Right half of this rectangle, starting at `x + w / 2`.
    pub fn right_half(&self) -> Bounds {
        let half = self.w / 2;
        Bounds::new(self.x + half, self.y, self.w - half, self.h)
    }

    /// Intersection with the canvas; `None` when nothing remains.
    pub fn clamped_to_canvas(&self) -> Option<Bounds> {
        let min_x = self.x.min(CANVAS_SIZE);
        let min_y = self.y.min(CANVAS_SIZE);
        let max_x = self.max_x().min(CANVAS_SIZE);
        let max_y = self.max_y().min(CANVAS_SIZE);
        if max_x <= min_x || max_y <= min_y {
            return None;
        }
        Some(Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Serialize as "x,y,w,h" for the settings file.
    pub fn to_config_string(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.w, self.h)
    }

    /// Parse "x,y,w,h". Rejects empty rectangles and anything reaching past
    /// the canvas.
    pub fn from_config_string(s: &str) -> Option<Bounds> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let x = parts[0].trim().parse::<u32>().ok()?;
        let y = parts[1].trim().parse::<u32>().ok()?;
        let w = parts[2].trim().parse::<u32>().ok()?;
        let h = parts[3].trim().parse::<u32>().ok()?;
        if w == 0 || h == 0 {
            return None;
        }
        let max_x = x.checked_add(w)?;
        let max_y = y.checked_add(h)?;
        if max_x > CANVAS_SIZE || max_y > CANVAS_SIZE {
            return None;
        }
        Some(Bounds::new(x, y, w, h))
    }
}

// ============================================================================
// SKIN LAYOUT – static bounds table
// ============================================================================

/// The per-region bounds table. Body layers always cover the whole canvas;
/// the hand, foot and eye rectangles are configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkinLayout {
    pub hand: Bounds,
    pub foot: Bounds,
    pub eye: Bounds,
}

impl Default for SkinLayout {
    fn default() -> Self {
        Self {
            hand: Bounds::new(126, 63, 64, 64),
            foot: Bounds::new(52, 108, 128, 64),
            eye: Bounds::new(72, 52, 64, 64),
        }
    }
}

impl SkinLayout {
    pub fn bounds(&self, layer: LayerId) -> Bounds {
        match layer {
            LayerId::Body | LayerId::BodyShadow => Bounds::full_canvas(),
            LayerId::Hand | LayerId::HandShadow => self.hand,
            LayerId::Foot | LayerId::FootShadow => self.foot,
            _ => self.eye,
        }
    }

    /// Name-based lookup. Every `eye-*` name resolves to the shared eye
    /// rectangle and unknown names get the full canvas.
    pub fn bounds_for_name(&self, name: &str) -> Bounds {
        if name.starts_with("eye-") {
            return self.eye;
        }
        match LayerId::from_name(name) {
            Some(layer) => self.bounds(layer),
            None => Bounds::full_canvas(),
        }
    }
}

// ============================================================================
// LAYER STORE
// ============================================================================

fn blank_layer() -> RgbaImage {
    RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, TRANSPARENT)
}

/// Owns one raster per layer, indexed by `LayerId` ordinal.
pub struct LayerStore {
    layers: [RgbaImage; LayerId::COUNT],
    /// Monotonically increasing counter, bumped on every pixel mutation.
    pub dirty_generation: u64,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    pub fn new() -> Self {
        Self {
            layers: std::array::from_fn(|_| blank_layer()),
            dirty_generation: 0,
        }
    }

    pub fn pixels(&self, id: LayerId) -> &RgbaImage {
        &self.layers[id.index()]
    }

    /// Replace a layer's raster. The replacement must be exactly
    /// `CANVAS_SIZE × CANVAS_SIZE`.
    pub fn set_pixels(&mut self, id: LayerId, pixels: RgbaImage) -> Result<(), SkinError> {
        if pixels.dimensions() != (CANVAS_SIZE, CANVAS_SIZE) {
            return Err(SkinError::InvalidSize {
                layer: id.name().to_string(),
                width: pixels.width(),
                height: pixels.height(),
            });
        }
        self.layers[id.index()] = pixels;
        self.mark_dirty();
        Ok(())
    }

    /// Out-of-range reads return transparent.
    pub fn read_pixel(&self, id: LayerId, x: u32, y: u32) -> Rgba<u8> {
        if x >= CANVAS_SIZE || y >= CANVAS_SIZE {
            return TRANSPARENT;
        }
        *self.layers[id.index()].get_pixel(x, y)
    }

    /// Out-of-range writes are ignored.
    pub fn write_pixel(&mut self, id: LayerId, x: u32, y: u32, pixel: Rgba<u8>) {
        if x >= CANVAS_SIZE || y >= CANVAS_SIZE {
            return;
        }
        self.layers[id.index()].put_pixel(x, y, pixel);
        self.mark_dirty();
    }

    pub fn mark_dirty(&mut self) {
        self.dirty_generation = self.dirty_generation.wrapping_add(1);
    }

    pub fn memory_bytes(&self) -> usize {
        LayerId::COUNT * (CANVAS_SIZE * CANVAS_SIZE * 4) as usize
    }
}
