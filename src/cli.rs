// ============================================================================
// SkinFE CLI: headless skin export from per-layer PNG files
// ============================================================================
//
// Usage examples:
//   skinfe --layers my_tee/ --output ddnet_skin.png
//   skinfe -l my_tee/ -o sheet.png --preview tee.png --verbose
//   skinfe -l my_tee/ -o sheet.png --foot-bounds 52,108,128,64
//
// The layer directory holds `<layer-name>.png` files (body.png,
// body-shadow.png, hand.png, ..., eye-6.png), each 192×192. Missing files
// leave that layer transparent. No GUI is opened in CLI mode.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{Bounds, LayerStore, SkinLayout};
use crate::compositor::{render_export, render_preview};
use crate::error::SkinError;
use crate::io::{load_layers_dir, write_png};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// SkinFE headless skin exporter.
///
/// Compose the 512×256 DDNet skin sheet from a directory of layer images.
#[derive(Parser, Debug)]
#[command(
    name = "skinfe",
    about = "SkinFE headless skin exporter",
    long_about = "Compose the 512x256 DDNet skin texture from a directory of 192x192\n\
                  layer images without opening the GUI.\n\n\
                  Example:\n  \
                  skinfe --layers my_tee/ --output ddnet_skin.png\n  \
                  skinfe -l my_tee/ -o sheet.png --preview tee.png"
)]
pub struct CliArgs {
    /// Directory containing `<layer-name>.png` files.
    #[arg(short, long, value_name = "DIR")]
    pub layers: PathBuf,

    /// Output path for the 512×256 export sheet.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Also write the assembled 192×192 tee preview.
    #[arg(short, long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    /// Override the hand rectangle ("x,y,w,h").
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_bounds)]
    pub hand_bounds: Option<Bounds>,

    /// Override the foot rectangle ("x,y,w,h").
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_bounds)]
    pub foot_bounds: Option<Bounds>,

    /// Override the shared eye rectangle ("x,y,w,h").
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_bounds)]
    pub eye_bounds: Option<Bounds>,

    /// Print per-step timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when a CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--layers" || a == "-l")
    }

    pub fn layout(&self) -> SkinLayout {
        let mut layout = SkinLayout::default();
        if let Some(b) = self.hand_bounds {
            layout.hand = b;
        }
        if let Some(b) = self.foot_bounds {
            layout.foot = b;
        }
        if let Some(b) = self.eye_bounds {
            layout.eye = b;
        }
        layout
    }
}

fn parse_bounds(s: &str) -> Result<Bounds, String> {
    Bounds::from_config_string(s).ok_or_else(|| format!("expected x,y,w,h inside the 192x192 canvas with w,h > 0, got '{}'", s))
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the export and return an OS exit code: `0` on success, `1` on failure.
pub fn run(args: CliArgs) -> ExitCode {
    if !args.layers.is_dir() {
        eprintln!("error: layer directory '{}' does not exist.", args.layers.display());
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    match run_export(&args) {
        Ok(loaded) => {
            if args.verbose {
                println!(
                    "  {} layer(s) → {} ({:.0}ms)",
                    loaded,
                    args.output.display(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

fn run_export(args: &CliArgs) -> Result<usize, SkinError> {
    let layout = args.layout();

    // -- Step 1: Load ----------------------------------------------------
    let mut store = LayerStore::new();
    let loaded = load_layers_dir(&args.layers, &mut store)?;
    if args.verbose {
        println!("[1/2] loaded {} layer(s) from {}", loaded, args.layers.display());
    }

    // -- Step 2: Compose and save ----------------------------------------
    ensure_parent_dir(&args.output)?;
    write_png(&render_export(&store, &layout), &args.output)?;

    if let Some(preview_path) = &args.preview {
        ensure_parent_dir(preview_path)?;
        write_png(&render_preview(&store, &layout), preview_path)?;
        if args.verbose {
            println!("  preview → {}", preview_path.display());
        }
    }
    if args.verbose {
        println!("[2/2] wrote {}", args.output.display());
    }

    Ok(loaded)
}

fn ensure_parent_dir(path: &Path) -> Result<(), SkinError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args_with_bounds_override() {
        let args = CliArgs::try_parse_from([
            "skinfe", "-l", "layers", "-o", "out.png", "--foot-bounds", "50,100,128,64",
        ])
        .unwrap();
        assert_eq!(args.layers, PathBuf::from("layers"));
        assert!(args.preview.is_none());
        let layout = args.layout();
        assert_eq!(layout.foot, Bounds::new(50, 100, 128, 64));
        assert_eq!(layout.hand, SkinLayout::default().hand);
    }

    #[test]
    fn test_parse_rejects_bad_bounds() {
        let res = CliArgs::try_parse_from([
            "skinfe", "-l", "layers", "-o", "out.png", "--eye-bounds", "1,2,0,4",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_parse_rejects_off_canvas_bounds() {
        for bad in ["4294967295,0,10,10", "150,0,64,64"] {
            let res = CliArgs::try_parse_from([
                "skinfe", "-l", "layers", "-o", "out.png", "--hand-bounds", bad,
            ]);
            assert!(res.is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_output_is_required() {
        assert!(CliArgs::try_parse_from(["skinfe", "--layers", "x"]).is_err());
    }
}
