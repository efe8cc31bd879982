use eframe::egui;
use image::RgbaImage;
use std::collections::VecDeque;

use crate::canvas::{LayerId, LayerStore};

/// Default number of undo steps kept in memory.
pub const MAX_HISTORY: usize = 50;

// ============================================================================
// SNAPSHOT: full multi-layer copy taken at the start of each user action
// ============================================================================

/// Owned copies of every layer raster, in `LayerId` order.
#[derive(Clone)]
pub struct SkinSnapshot {
    pub description: String,
    layers: Vec<RgbaImage>,
}

impl SkinSnapshot {
    pub fn capture(store: &LayerStore, description: &str) -> Self {
        Self {
            description: description.to_string(),
            layers: LayerId::all()
                .iter()
                .map(|&id| store.pixels(id).clone())
                .collect(),
        }
    }

    /// Replace every layer's raster with the stored copy.
    pub fn restore_into(self, store: &mut LayerStore) {
        for (id, pixels) in LayerId::all().iter().zip(self.layers) {
            if let Err(e) = store.set_pixels(*id, pixels) {
                log::error!("History restore skipped layer {}: {}", id, e);
            }
        }
    }

    fn memory_bytes(&self) -> usize {
        self.layers.iter().map(|l| l.as_raw().len()).sum::<usize>() + self.description.len()
    }
}

// ============================================================================
// HISTORY MANAGER
// ============================================================================

/// Bounded undo stack. Oldest entries are evicted first once the configured
/// depth is exceeded.
pub struct HistoryManager {
    undo_stack: VecDeque<SkinSnapshot>,
    max_history_size: usize,
    /// Running memory total across the stack.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            total_memory: 0,
        }
    }

    /// Capture all layers and push. Call once at the start of every stroke or
    /// fill, never mid-stroke.
    pub fn snapshot(&mut self, store: &LayerStore, description: &str) {
        let snap = SkinSnapshot::capture(store, description);
        self.total_memory += snap.memory_bytes();
        self.undo_stack.push_back(snap);
        self.prune();
    }

    /// Restore the most recent snapshot. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self, store: &mut LayerStore) -> bool {
        let Some(snap) = self.undo_stack.pop_back() else {
            return false;
        };
        self.total_memory = self.total_memory.saturating_sub(snap.memory_bytes());
        log::info!("Undo: {}", snap.description);
        snap.restore_into(store);
        true
    }

    /// Undo `steps` times (0 = nothing). Stops early when the stack runs dry.
    pub fn undo_to(&mut self, steps: usize, store: &mut LayerStore) -> usize {
        let mut done = 0;
        while done < steps && self.undo(store) {
            done += 1;
        }
        done
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|s| s.description.as_str())
    }

    /// Get all undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|s| s.description.clone()).collect()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_bytes());
            }
        }
    }
}

// ============================================================================
// HISTORY PANEL
// ============================================================================

#[derive(Default)]
pub struct HistoryPanel {
    show_memory_info: bool,
}

impl HistoryPanel {
    /// Draw the undo list. Clicking an entry returns how many undo steps are
    /// needed to get back to the state before that entry.
    pub fn show(&mut self, ui: &mut egui::Ui, history: &HistoryManager) -> Option<usize> {
        let mut requested = None;

        ui.horizontal(|ui| {
            ui.label(format!(
                "Undo: {} / {}",
                history.undo_count(),
                history.max_history_size()
            ));
            if ui.small_button("ℹ").on_hover_text("Show memory info").clicked() {
                self.show_memory_info = !self.show_memory_info;
            }
        });

        if self.show_memory_info {
            let mem_mb = history.memory_usage() as f64 / (1024.0 * 1024.0);
            ui.label(format!("Memory: {:.2} MB", mem_mb));
        }

        egui::ScrollArea::vertical()
            .max_height(180.0)
            .show(ui, |ui| {
                let items = history.undo_history();
                if items.is_empty() {
                    ui.weak("No history yet");
                    return;
                }
                for (i, desc) in items.iter().enumerate() {
                    let label = if i == 0 {
                        format!("▶ {}", desc)
                    } else {
                        format!("  {}", desc)
                    };
                    if ui
                        .selectable_label(false, label)
                        .on_hover_text("Undo back to before this action")
                        .clicked()
                    {
                        requested = Some(i + 1);
                    }
                }
            });

        requested
    }
}
