mod app;
mod camera;
mod coordinate;
mod graticule;
mod marker;
mod screen;
mod services;
mod settings;
mod startup;
mod ui;

use app::MapScreenApp;
use settings::Settings;
use tracing::info;

fn setup_logging() {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,pin_drop=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    setup_logging();

    let settings = Settings::load()?;
    info!(permission = ?settings.permission, "settings loaded");

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(settings.window.width, settings.window.height)),
        min_window_size: Some(egui::vec2(360.0, 480.0)),
        ..Default::default()
    };

    eframe::run_native(
        "Pin Drop",
        native_options,
        Box::new(|cc| Box::new(MapScreenApp::new(cc, settings))),
    )
    .map_err(|err| anyhow::anyhow!("failed to run the window: {err}"))
}
