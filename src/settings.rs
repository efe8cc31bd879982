use eframe::egui;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::canvas::{Bounds, LayerId, SkinLayout};
use crate::components::history::MAX_HISTORY;
use crate::components::tools::{self, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE};
use crate::editor::{DEFAULT_BRUSH_COLOR, DEFAULT_BRUSH_SIZE};

pub const DEFAULT_TEMPLATE_PATH: &str = "assets/template.png";

// ═══════════════════════════════════════════════════════════════════════════
// KEYBINDINGS
// ═══════════════════════════════════════════════════════════════════════════

/// Modifier flags plus either a named key or a typed character.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Named keys like Z, S, F1.
    pub key: Option<egui::Key>,
    /// Typed characters with no `egui::Key`, like `[` and `]`.
    pub text_char: Option<String>,
}

impl KeyCombo {
    pub fn key(k: egui::Key) -> Self {
        Self { ctrl: false, shift: false, alt: false, key: Some(k), text_char: None }
    }
    pub fn ctrl_key(k: egui::Key) -> Self {
        Self { ctrl: true, shift: false, alt: false, key: Some(k), text_char: None }
    }
    pub fn text(s: &str) -> Self {
        Self { ctrl: false, shift: false, alt: false, key: None, text_char: Some(s.to_string()) }
    }

    fn modifier_names(&self) -> impl Iterator<Item = &'static str> {
        [(self.ctrl, "Ctrl"), (self.shift, "Shift"), (self.alt, "Alt")]
            .into_iter()
            .filter_map(|(held, name)| held.then_some(name))
    }

    /// Label for tooltips, e.g. "Ctrl+Z".
    pub fn display(&self) -> String {
        let mut label: Vec<&str> = self.modifier_names().collect();
        match (self.key, &self.text_char) {
            (Some(k), _) => label.push(key_name(k)),
            (None, Some(t)) => label.push(t),
            (None, None) => {}
        }
        label.join("+")
    }

    /// `keybind.*` value: lowercase modifiers, then `key:<Name>` or `text:<chars>`.
    pub fn to_config_string(&self) -> String {
        let mut out: Vec<String> = self.modifier_names().map(str::to_lowercase).collect();
        if let Some(k) = self.key {
            out.push(format!("key:{}", key_name(k)));
        } else if let Some(t) = &self.text_char {
            out.push(format!("text:{}", t));
        }
        out.join("+")
    }

    /// Inverse of `to_config_string`. Unknown tokens are skipped; a combo
    /// with modifiers but no trigger is rejected.
    pub fn from_config_string(s: &str) -> Option<Self> {
        let mut combo = Self { ctrl: false, shift: false, alt: false, key: None, text_char: None };
        for token in s.split('+').map(str::trim) {
            match token {
                "ctrl" => combo.ctrl = true,
                "shift" => combo.shift = true,
                "alt" => combo.alt = true,
                _ => match token.split_once(':') {
                    Some(("key", name)) => combo.key = parse_key_name(name),
                    Some(("text", chars)) if !chars.is_empty() => combo.text_char = Some(chars.to_string()),
                    _ => {}
                },
            }
        }
        (combo.key.is_some() || combo.text_char.is_some()).then_some(combo)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindableAction {
    Undo,
    Export,
    ToolPen,
    ToolEraser,
    ToolBucket,
    BrushSizeDecrease,
    BrushSizeIncrease,
    ToggleTemplate,
    ToggleBounds,
}

impl BindableAction {
    pub fn all() -> &'static [BindableAction] {
        use BindableAction::*;
        &[
            Undo, Export,
            ToolPen, ToolEraser, ToolBucket,
            BrushSizeDecrease, BrushSizeIncrease,
            ToggleTemplate, ToggleBounds,
        ]
    }

    /// Name used in `keybind.<Name>=` lines.
    fn config_name(&self) -> String {
        format!("{:?}", self)
    }

    fn from_config_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|a| a.config_name() == name)
    }
}

#[derive(Clone, Debug)]
pub struct KeyBindings {
    pub bindings: HashMap<BindableAction, KeyCombo>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use BindableAction::*;
        use egui::Key;
        let mut map = HashMap::new();
        map.insert(Undo,              KeyCombo::ctrl_key(Key::Z));
        map.insert(Export,            KeyCombo::ctrl_key(Key::S));
        map.insert(ToolPen,           KeyCombo::key(Key::P));
        map.insert(ToolEraser,        KeyCombo::key(Key::E));
        map.insert(ToolBucket,        KeyCombo::key(Key::B));
        map.insert(BrushSizeDecrease, KeyCombo::text("["));
        map.insert(BrushSizeIncrease, KeyCombo::text("]"));
        map.insert(ToggleTemplate,    KeyCombo::key(Key::T));
        map.insert(ToggleBounds,      KeyCombo::key(Key::G));
        Self { bindings: map }
    }
}

impl KeyBindings {
    pub fn get(&self, action: BindableAction) -> Option<&KeyCombo> {
        self.bindings.get(&action)
    }

    pub fn to_config_lines(&self) -> Vec<String> {
        BindableAction::all()
            .iter()
            .filter_map(|action| {
                self.bindings
                    .get(action)
                    .map(|combo| format!("keybind.{}={}", action.config_name(), combo.to_config_string()))
            })
            .collect()
    }

    /// Apply a single `keybind.<action>=<combo>` entry. Unknown actions and
    /// unparsable combos are ignored.
    pub fn load_config_line(&mut self, action_name: &str, combo_str: &str) {
        if let Some(action) = BindableAction::from_config_name(action_name)
            && let Some(combo) = KeyCombo::from_config_string(combo_str)
        {
            self.bindings.insert(action, combo);
        }
    }

    /// Whether the binding fired this frame. Named keys are consumed.
    pub fn is_pressed(&self, ctx: &egui::Context, action: BindableAction) -> bool {
        let Some(combo) = self.bindings.get(&action) else { return false };

        if combo.text_char.is_some() {
            ctx.input(|i| text_combo_fired(combo, &i.modifiers, &i.events))
        } else if let Some(key) = combo.key {
            let mods = egui::Modifiers {
                alt: combo.alt,
                ctrl: combo.ctrl,
                shift: combo.shift,
                mac_cmd: false,
                command: combo.ctrl,
            };
            ctx.input_mut(|i| i.consume_key(mods, key))
        } else {
            false
        }
    }
}

/// Text combos match on typed characters, so they are checked against the
/// frame's `Text` events rather than consumed like named keys.
fn text_combo_fired(combo: &KeyCombo, modifiers: &egui::Modifiers, events: &[egui::Event]) -> bool {
    let Some(text_char) = &combo.text_char else {
        return false;
    };
    if combo.ctrl != modifiers.command || combo.shift != modifiers.shift || combo.alt != modifiers.alt {
        return false;
    }
    events
        .iter()
        .any(|ev| matches!(ev, egui::Event::Text(t) if t == text_char))
}

const KEY_NAMES: &[(egui::Key, &str)] = {
    use egui::Key::*;
    &[
        (ArrowDown, "Down"), (ArrowLeft, "Left"), (ArrowRight, "Right"), (ArrowUp, "Up"),
        (Escape, "Esc"), (Tab, "Tab"), (Backspace, "Backspace"), (Enter, "Enter"),
        (Space, "Space"), (Insert, "Insert"), (Delete, "Delete"), (Home, "Home"),
        (End, "End"), (PageUp, "PageUp"), (PageDown, "PageDown"),
        (Minus, "-"), (PlusEquals, "Plus"),
        (Num0, "0"), (Num1, "1"), (Num2, "2"), (Num3, "3"), (Num4, "4"),
        (Num5, "5"), (Num6, "6"), (Num7, "7"), (Num8, "8"), (Num9, "9"),
        (A, "A"), (B, "B"), (C, "C"), (D, "D"), (E, "E"), (F, "F"), (G, "G"),
        (H, "H"), (I, "I"), (J, "J"), (K, "K"), (L, "L"), (M, "M"), (N, "N"),
        (O, "O"), (P, "P"), (Q, "Q"), (R, "R"), (S, "S"), (T, "T"), (U, "U"),
        (V, "V"), (W, "W"), (X, "X"), (Y, "Y"), (Z, "Z"),
        (F1, "F1"), (F2, "F2"), (F3, "F3"), (F4, "F4"), (F5, "F5"), (F6, "F6"),
        (F7, "F7"), (F8, "F8"), (F9, "F9"), (F10, "F10"), (F11, "F11"), (F12, "F12"),
    ]
};

fn key_name(k: egui::Key) -> &'static str {
    KEY_NAMES
        .iter()
        .find(|(key, _)| *key == k)
        .map(|(_, name)| *name)
        .unwrap_or("?")
}

fn parse_key_name(s: &str) -> Option<egui::Key> {
    KEY_NAMES.iter().find(|(_, name)| *name == s).map(|(key, _)| *key)
}

// ═══════════════════════════════════════════════════════════════════════════
// APP SETTINGS
// ═══════════════════════════════════════════════════════════════════════════

/// Settings that persist across sessions.
#[derive(Clone, Debug)]
pub struct AppSettings {
    pub brush_size: u32,
    pub brush_color: [u8; 3],
    pub max_undo_steps: usize,
    pub show_template: bool,
    pub show_bounds: bool,
    pub template_path: String,
    /// Last layer being edited; restored on the next launch.
    pub active_layer: LayerId,
    pub layout: SkinLayout,
    pub keybindings: KeyBindings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            brush_size: DEFAULT_BRUSH_SIZE,
            brush_color: DEFAULT_BRUSH_COLOR,
            max_undo_steps: MAX_HISTORY,
            show_template: false,
            show_bounds: false,
            template_path: DEFAULT_TEMPLATE_PATH.to_string(),
            active_layer: LayerId::Body,
            layout: SkinLayout::default(),
            keybindings: KeyBindings::default(),
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/skinfe/skinfe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\SkinFE\skinfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/SkinFE/skinfe_settings.cfg
    /// Fallback:   next to the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("skinfe");
            return Some(config_dir.join("skinfe_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("SkinFE").join("skinfe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("SkinFE")
                    .join("skinfe_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("skinfe_settings.cfg")))
        }
    }

    pub fn to_config_string(&self) -> String {
        let mut content = format!(
            "brush_size={}\n\
             brush_color={}\n\
             max_undo_steps={}\n\
             show_template={}\n\
             show_bounds={}\n\
             template_path={}\n\
             active_layer={}\n\
             hand_bounds={}\n\
             foot_bounds={}\n\
             eye_bounds={}\n",
            self.brush_size,
            tools::to_hex_color(self.brush_color),
            self.max_undo_steps,
            self.show_template,
            self.show_bounds,
            self.template_path,
            self.active_layer,
            self.layout.hand.to_config_string(),
            self.layout.foot.to_config_string(),
            self.layout.eye.to_config_string(),
        );
        for line in self.keybindings.to_config_lines() {
            content.push_str(&line);
            content.push('\n');
        }
        content
    }

    /// Parse `key=value` lines. Missing or corrupt values keep their defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "brush_size" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.brush_size = v.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
                    }
                }
                "brush_color" => {
                    if let Some(c) = tools::parse_hex_color(val) { s.brush_color = c; }
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse::<usize>().unwrap_or(MAX_HISTORY).max(1);
                }
                "show_template" => s.show_template = val == "true",
                "show_bounds" => s.show_bounds = val == "true",
                "template_path" => {
                    if !val.is_empty() {
                        s.template_path = val.to_string();
                    }
                }
                "active_layer" => {
                    match val.parse::<LayerId>() {
                        Ok(layer) => s.active_layer = layer,
                        Err(e) => log::warn!("Settings: {}", e),
                    }
                }
                "hand_bounds" => {
                    if let Some(b) = Bounds::from_config_string(val) {
                        s.layout.hand = b;
                    }
                }
                "foot_bounds" => {
                    if let Some(b) = Bounds::from_config_string(val) {
                        s.layout.foot = b;
                    }
                }
                "eye_bounds" => {
                    if let Some(b) = Bounds::from_config_string(val) {
                        s.layout.eye = b;
                    }
                }
                _ => {
                    if let Some(action_name) = key.strip_prefix("keybind.") {
                        s.keybindings.load_config_line(action_name, val);
                    }
                }
            }
        }
        s
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save to the platform settings file. Failures are logged.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            log::warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }

    /// Load from the platform settings file (defaults if missing or corrupt).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = AppSettings::default();
        assert_eq!(s.brush_size, 16);
        assert_eq!(s.brush_color, [255, 0, 0]);
        assert_eq!(s.max_undo_steps, 50);
        assert_eq!(s.template_path, "assets/template.png");
        assert_eq!(s.layout, SkinLayout::default());
        assert_eq!(s.keybindings.get(BindableAction::Undo).map(|c| c.display()), Some("Ctrl+Z".to_string()));
        assert_eq!(s.keybindings.get(BindableAction::BrushSizeIncrease).map(|c| c.display()), Some("]".to_string()));
    }

    #[test]
    fn test_config_round_trip() {
        let mut s = AppSettings {
            brush_size: 7,
            brush_color: [1, 2, 250],
            max_undo_steps: 20,
            show_template: true,
            show_bounds: true,
            template_path: "/tmp/tee.png".to_string(),
            active_layer: LayerId::Eye4,
            ..AppSettings::default()
        };
        s.layout.hand = Bounds::new(120, 60, 70, 70);
        s.keybindings.bindings.insert(BindableAction::Export, KeyCombo::key(egui::Key::F5));

        let parsed = AppSettings::from_config_str(&s.to_config_string());
        assert_eq!(parsed.brush_size, 7);
        assert_eq!(parsed.brush_color, [1, 2, 250]);
        assert_eq!(parsed.max_undo_steps, 20);
        assert!(parsed.show_template && parsed.show_bounds);
        assert_eq!(parsed.template_path, "/tmp/tee.png");
        assert_eq!(parsed.active_layer, LayerId::Eye4);
        assert_eq!(parsed.layout, s.layout);
        assert_eq!(parsed.keybindings.get(BindableAction::Export), Some(&KeyCombo::key(egui::Key::F5)));
    }

    #[test]
    fn test_corrupt_values_fall_back() {
        let parsed = AppSettings::from_config_str(
            "brush_size=abc\nbrush_color=#12\nmax_undo_steps=-3\nfoot_bounds=1,2\neye_bounds=4294967295,0,10,10\n\
             active_layer=cape\nkeybind.Undo=shift\nkeybind.Teleport=key:Q\nno equals sign\n",
        );
        let d = AppSettings::default();
        assert_eq!(parsed.brush_size, d.brush_size);
        assert_eq!(parsed.brush_color, d.brush_color);
        assert_eq!(parsed.max_undo_steps, d.max_undo_steps);
        assert_eq!(parsed.layout.foot, d.layout.foot);
        assert_eq!(parsed.layout.eye, d.layout.eye);
        assert_eq!(parsed.active_layer, LayerId::Body);
        assert_eq!(parsed.keybindings.get(BindableAction::Undo), d.keybindings.get(BindableAction::Undo));
    }

    #[test]
    fn test_brush_size_is_clamped_on_load() {
        assert_eq!(AppSettings::from_config_str("brush_size=0").brush_size, 1);
        assert_eq!(AppSettings::from_config_str("brush_size=900").brush_size, 64);
    }

    #[test]
    fn test_key_combo_strings() {
        let combo = KeyCombo::from_config_string("ctrl+shift+key:S").unwrap();
        assert!(combo.ctrl && combo.shift && !combo.alt);
        assert_eq!(combo.key, Some(egui::Key::S));
        assert_eq!(combo.display(), "Ctrl+Shift+S");
        assert_eq!(KeyCombo::from_config_string(&combo.to_config_string()), Some(combo));
        assert_eq!(KeyCombo::text("[").to_config_string(), "text:[");
        assert_eq!(KeyCombo::from_config_string("ctrl"), None);
        assert_eq!(KeyCombo::from_config_string("shift+text:"), None);
        let zoom = KeyCombo::ctrl_key(egui::Key::PlusEquals);
        assert_eq!(KeyCombo::from_config_string(&zoom.to_config_string()), Some(zoom));
    }

    #[test]
    fn test_text_combo_respects_shift() {
        let typed = vec![egui::Event::Text("[".to_string())];
        let plain = KeyCombo::text("[");
        let shifted = KeyCombo { shift: true, ..KeyCombo::text("[") };

        assert!(text_combo_fired(&plain, &egui::Modifiers::NONE, &typed));
        assert!(!text_combo_fired(&plain, &egui::Modifiers::SHIFT, &typed));
        assert!(text_combo_fired(&shifted, &egui::Modifiers::SHIFT, &typed));
        assert!(!text_combo_fired(&shifted, &egui::Modifiers::NONE, &typed));
        assert!(!text_combo_fired(&plain, &egui::Modifiers::NONE, &[egui::Event::Text("]".to_string())]));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("skinfe_settings.cfg");
        let s = AppSettings { brush_size: 33, ..AppSettings::default() };
        s.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path).brush_size, 33);
        assert_eq!(AppSettings::load_from(&dir.path().join("missing.cfg")).brush_size, 16);
    }
}
