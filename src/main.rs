mod app;
mod state;
mod ui;

use std::path::PathBuf;

use app::TracescopeApp;
use eframe::egui;
use tracescope::config::Settings;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::from_env().unwrap_or_else(|e| {
        log::error!("Failed to read settings, using defaults: {e:#}");
        Settings::default()
    });
    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Tracescope",
        options,
        Box::new(move |_cc| {
            let mut app = TracescopeApp::new(settings);
            app.state.import_paths(&files);
            Ok(Box::new(app))
        }),
    )
}
