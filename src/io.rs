use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use rfd::FileDialog;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::canvas::{CANVAS_SIZE, LayerId, LayerStore};
use crate::error::SkinError;

/// Suggested file name for the exported sheet.
pub const DEFAULT_EXPORT_NAME: &str = "ddnet_skin.png";

/// Results of background IO, delivered to the UI thread over a channel.
pub enum IoResult {
    TemplateLoaded { image: RgbaImage, path: PathBuf },
    TemplateFailed { path: PathBuf, error: String },
    ExportComplete { path: PathBuf },
    ExportFailed { path: PathBuf, error: String },
}

// ============================================================================
// PNG ENCODING
// ============================================================================

/// Encode an RGBA raster as PNG into memory.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SkinError> {
    let mut bytes = Vec::with_capacity(image.as_raw().len() / 4);
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Encode and write an RGBA raster as a PNG file.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), SkinError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    writer.flush()?;
    Ok(())
}

/// Write already-encoded PNG bytes.
pub fn write_bytes(bytes: &[u8], path: &Path) -> Result<(), SkinError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// LOADING
// ============================================================================

/// Decode the guide template. Any size is accepted; it is scaled at draw time.
pub fn load_template(path: &Path) -> Result<RgbaImage, SkinError> {
    Ok(image::open(path)?.to_rgba8())
}

/// Decode one layer raster. It must already be `CANVAS_SIZE × CANVAS_SIZE`.
pub fn load_layer_image(path: &Path, layer: LayerId) -> Result<RgbaImage, SkinError> {
    let img = image::open(path)?.to_rgba8();
    if img.dimensions() != (CANVAS_SIZE, CANVAS_SIZE) {
        return Err(SkinError::InvalidSize {
            layer: layer.name().to_string(),
            width: img.width(),
            height: img.height(),
        });
    }
    Ok(img)
}

/// Fill `store` from `<dir>/<layer-name>.png` files. Layers without a file
/// stay as they are. Returns the number of layers loaded.
pub fn load_layers_dir(dir: &Path, store: &mut LayerStore) -> Result<usize, SkinError> {
    let mut loaded = 0;
    for &layer in LayerId::all() {
        let path = layer_file_path(dir, layer);
        if !path.is_file() {
            log::debug!("No file for layer {} at {}", layer, path.display());
            continue;
        }
        let pixels = load_layer_image(&path, layer)?;
        store.set_pixels(layer, pixels)?;
        log::info!("Loaded layer {} from {}", layer, path.display());
        loaded += 1;
    }
    Ok(loaded)
}

pub fn layer_file_path(dir: &Path, layer: LayerId) -> PathBuf {
    dir.join(format!("{}.png", layer.name()))
}

// ============================================================================
// BACKGROUND IO
// ============================================================================

/// Decode the template on a rayon worker and report back over `sender`.
pub fn spawn_template_load(path: PathBuf, sender: mpsc::Sender<IoResult>) {
    rayon::spawn(move || {
        let result = match load_template(&path) {
            Ok(image) => IoResult::TemplateLoaded { image, path },
            Err(e) => IoResult::TemplateFailed {
                path,
                error: e.to_string(),
            },
        };
        let _ = sender.send(result);
    });
}

/// Write encoded export bytes on a rayon worker.
pub fn spawn_export_write(bytes: Vec<u8>, path: PathBuf, sender: mpsc::Sender<IoResult>) {
    rayon::spawn(move || {
        let result = match write_bytes(&bytes, &path) {
            Ok(()) => IoResult::ExportComplete { path },
            Err(e) => IoResult::ExportFailed {
                path,
                error: e.to_string(),
            },
        };
        let _ = sender.send(result);
    });
}

/// Native save dialog for the export sheet. `None` when cancelled.
pub fn pick_export_path(last_dir: Option<&Path>) -> Option<PathBuf> {
    let mut dialog = FileDialog::new()
        .set_file_name(DEFAULT_EXPORT_NAME)
        .add_filter("PNG Image", &["png"]);
    if let Some(dir) = last_dir {
        dialog = dialog.set_directory(dir);
    }
    let mut path = dialog.save_file()?;
    if path.extension().is_none() {
        path.set_extension("png");
    }
    Some(path)
}
