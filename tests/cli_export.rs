use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use image::{Rgba, RgbaImage};
use skinfe::cli::{CliArgs, run};
use skinfe::io::{layer_file_path, write_png};
use skinfe::{LayerId, SkinLayout};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn make_args(layers: &Path, output: &Path, extra: &[&str]) -> CliArgs {
    let mut argv = vec![
        "skinfe".to_string(),
        "--layers".to_string(),
        layers.display().to_string(),
        "--output".to_string(),
        output.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    CliArgs::try_parse_from(argv).unwrap()
}

fn write_layer(dir: &Path, layer: LayerId, color: Rgba<u8>) {
    write_png(&RgbaImage::from_pixel(192, 192, color), &layer_file_path(dir, layer)).unwrap();
}

#[test]
fn test_export_sheet_from_layer_dir() {
    let dir = tempfile::tempdir().unwrap();
    let layers = dir.path().join("layers");
    std::fs::create_dir(&layers).unwrap();
    write_layer(&layers, LayerId::Body, RED);
    write_layer(&layers, LayerId::Hand, BLUE);

    let out = dir.path().join("out").join("ddnet_skin.png");
    assert_eq!(run(make_args(&layers, &out, &[])), ExitCode::SUCCESS);

    let sheet = image::open(&out).unwrap().to_rgba8();
    assert_eq!(sheet.dimensions(), (512, 256));
    assert_eq!(*sheet.get_pixel(0, 0), RED);
    assert_eq!(*sheet.get_pixel(191, 191), RED);
    // Hand bounds land at (384, 0), 64x64.
    assert_eq!(*sheet.get_pixel(384, 0), BLUE);
    assert_eq!(*sheet.get_pixel(447, 63), BLUE);
    // Missing layers stay transparent.
    assert_eq!(sheet.get_pixel(448, 0)[3], 0);
    assert_eq!(sheet.get_pixel(300, 100)[3], 0);
}

#[test]
fn test_preview_is_written_with_split_foot() {
    let dir = tempfile::tempdir().unwrap();
    write_layer(dir.path(), LayerId::Body, BLUE);
    write_layer(dir.path(), LayerId::Foot, RED);

    let out = dir.path().join("sheet.png");
    let preview = dir.path().join("preview.png");
    let args = make_args(dir.path(), &out, &["--preview", preview.to_str().unwrap()]);
    assert_eq!(run(args), ExitCode::SUCCESS);

    let img = image::open(&preview).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (192, 192));
    let foot = SkinLayout::default().foot;
    assert_eq!(*img.get_pixel(foot.x + 10, foot.y + 10), BLUE);
    assert_eq!(*img.get_pixel(foot.max_x() - 10, foot.y + 10), RED);
}

#[test]
fn test_wrong_size_layer_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&RgbaImage::new(100, 100), &layer_file_path(dir.path(), LayerId::Eye2)).unwrap();
    let out = dir.path().join("sheet.png");
    assert_eq!(run(make_args(dir.path(), &out, &[])), ExitCode::FAILURE);
    assert!(!out.exists());
}

#[test]
fn test_missing_layer_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("sheet.png");
    let args = make_args(&dir.path().join("nope"), &out, &[]);
    assert_eq!(run(args), ExitCode::FAILURE);
}

#[test]
fn test_bounds_override_changes_copied_region() {
    let dir = tempfile::tempdir().unwrap();
    let mut hand = RgbaImage::new(192, 192);
    hand.put_pixel(0, 0, RED);
    write_png(&hand, &layer_file_path(dir.path(), LayerId::Hand)).unwrap();

    let out = dir.path().join("sheet.png");
    let args = make_args(dir.path(), &out, &["--hand-bounds", "0,0,64,64"]);
    assert_eq!(run(args), ExitCode::SUCCESS);
    let sheet = image::open(&out).unwrap().to_rgba8();
    assert_eq!(*sheet.get_pixel(384, 0), RED);
}
