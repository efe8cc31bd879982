// Release builds use the GUI subsystem so Windows never opens a console for
// the editor. In CLI mode (--layers/-l present) we attach to the parent
// terminal instead so println!/eprintln! reach it.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;
use skinfe::app::SkinFEApp;
use skinfe::{cli, logger};

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        #[cfg(target_os = "windows")]
        attach_parent_console();

        use clap::Parser;
        let args = cli::CliArgs::parse();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------
    logger::init(log::LevelFilter::Info);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([720.0, 480.0])
            .with_title("SkinFE"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "SkinFE",
        options,
        Box::new(|cc| Box::new(SkinFEApp::new(cc))),
    );
    if let Err(e) = &result {
        log::error!("eframe exited with error: {}", e);
    }
    result
}

/// Reconnect stdout/stderr to the launching terminal.
#[cfg(target_os = "windows")]
fn attach_parent_console() {
    unsafe extern "system" {
        fn AttachConsole(dwProcessId: u32) -> i32;
    }
    const ATTACH_PARENT_PROCESS: u32 = 0xFFFF_FFFF;
    // SAFETY: plain Win32 call with a constant argument; failure just means
    // there is no parent console to attach to.
    unsafe {
        AttachConsole(ATTACH_PARENT_PROCESS);
    }
}
