//! SkinFE: a pixel-art skin editor for DDNet tees.
//!
//! Twelve fixed 192×192 layers are painted with pen, eraser and bucket
//! tools, each clipped to its region's bounds, and composited into a live
//! preview and the game's 512×256 texture sheet.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod editor;
pub mod error;
pub mod io;
pub mod logger;
pub mod settings;

pub use canvas::{Bounds, LayerId, LayerStore, SkinLayout};
pub use editor::{Editor, EditorEvent, EditorResponse, EditorSession};
pub use error::SkinError;
