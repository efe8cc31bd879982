//! Session logger, installed as the `log` backend. All output goes to a
//! single file in the OS data directory.
//!
//! The file is **truncated at each launch**, so it only ever holds the most
//! recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\SkinFE\skinfe.log`
//!   Linux:    `~/.local/share/SkinFE/skinfe.log`
//!   macOS:    `~/Library/Application Support/SkinFE/skinfe.log`
//!
//! Use the `log` macros (`log::info!`, `log::warn!`, `log::error!`) anywhere
//! in the crate. Panics are mirrored into the file through a panic hook.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOGGER: SessionLogger = SessionLogger;

struct SessionLogger;

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] [{}] {}", timestamp(), record.level(), record.args());
        // Errors also reach the terminal, which matters in CLI mode.
        if record.level() == Level::Error {
            eprintln!("{}", line);
        }
        write_line(&line);
    }

    fn flush(&self) {
        if let Some(mutex) = LOG_FILE.get()
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Write a raw line to the session log. I/O errors are ignored so that
/// logging never crashes the application.
pub fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Initialise the session logger. Call once, before any logging.
///
/// * Creates (or truncates) the log file.
/// * Registers the `log` backend at `level`.
/// * Installs a panic hook that writes the panic message to the log before
///   handing over to the default handler.
pub fn init(level: LevelFilter) {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    match file {
        Ok(f) => {
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            // Not fatal; the backend still forwards errors to stderr.
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
        }
    }

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }

    write_line(&format!(
        "=== SkinFE session started {} ===",
        human_timestamp()
    ));
    write_line(&format!("Log file: {}", path.display()));
    write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("SkinFE").join("skinfe.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// HH:MM:SS (UTC) within the current day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}
