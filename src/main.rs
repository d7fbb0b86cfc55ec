mod app;
mod editor;
mod error;
mod event;
mod files;
mod lang;
mod run;
mod settings;
mod theme;

use app::LexiusApp;
use eframe::egui;
use files::store::FileStore;
use run::client::{HttpExecutor, DEFAULT_BASE_URL};
use run::RunDispatcher;
use settings::Settings;
use std::sync::mpsc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("lexius-runtime")
        .build()?;

    let base_url =
        std::env::var("LEXIUS_RUN_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let executor = HttpExecutor::new(base_url, runtime.handle().clone(), tx.clone());
    let dispatcher = RunDispatcher::new(Box::new(executor));

    let (store, store_warnings) = FileStore::open(settings::files_dir())?;
    let (app_settings, settings_warning) = Settings::load();

    let app = LexiusApp::new(
        rx,
        dispatcher,
        store,
        store_warnings,
        app_settings,
        settings_warning,
    );
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([1024.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Lexius",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
