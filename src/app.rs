use crate::editor::{EditorSession, AUTOSAVE_QUIET};
use crate::error::Error;
use crate::event::AppEvent;
use crate::files::store::FileStore;
use crate::files::SelectionState;
use crate::lang::{detect_language, icon_for};
use crate::run::output::{OutputLog, PreviewSurface};
use crate::run::{RunDispatcher, RunId, RunOutcome};
use crate::settings::Settings;
use crate::theme::Theme;
use eframe::egui::{self, RichText, ScrollArea};
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Which prompt the files panel is currently showing.
#[derive(Debug, Clone, PartialEq)]
enum DialogState {
    None,
    NewFile,
    Rename { old_path: String },
    Delete { path: String },
}

pub struct LexiusApp {
    rx: Receiver<AppEvent>,
    store: FileStore,
    settings: Settings,
    theme: Theme,
    theme_applied: bool,
    session: EditorSession,
    dispatcher: RunDispatcher,
    selection: SelectionState,
    pending_runs: HashMap<RunId, String>,
    output: OutputLog,
    preview: PreviewSurface,
    diagnostics_log: Vec<String>,
    warning_banner: Option<String>,
    dialog: DialogState,
    dialog_input: String,
    maximized: bool,
}

impl LexiusApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        dispatcher: RunDispatcher,
        store: FileStore,
        store_warnings: Vec<String>,
        settings: Settings,
        settings_warning: Option<String>,
    ) -> Self {
        let theme = Theme::of(settings.theme);
        let mut app = Self {
            rx,
            store,
            settings,
            theme,
            theme_applied: false,
            session: EditorSession::default(),
            dispatcher,
            selection: SelectionState::default(),
            pending_runs: HashMap::new(),
            output: OutputLog::default(),
            preview: PreviewSurface::default(),
            diagnostics_log: Vec::new(),
            warning_banner: None,
            dialog: DialogState::None,
            dialog_input: String::new(),
            maximized: false,
        };

        for warning in store_warnings {
            app.log_diagnostic(format!("file store warning: {warning}"));
        }
        if let Some(warning) = settings_warning {
            app.log_diagnostic(format!("settings warning: {warning}"));
        }

        // Open the first stored file so the editor is not empty on launch.
        let first = app.store.paths().next().map(str::to_string);
        if let Some(first) = first {
            app.open_path(&first);
        }

        app
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warning_banner = Some(message.into());
    }

    fn open_path(&mut self, path: &str) {
        // Switching files must not drop pending edits in the old binding.
        if let Err(err) = self.session.flush(&mut self.store) {
            self.warn(format!("save failed: {err}"));
        }
        let content = self.store.content_of(path).unwrap_or("").to_string();
        let language = detect_language(path);
        self.selection.select(path);
        self.session.open(path, &content, language);
    }

    fn run_current(&mut self) {
        let Some(binding) = self.session.binding() else {
            return;
        };
        let path = binding.path.clone();
        let code = binding.buffer.clone();
        let language = binding.language;

        match self
            .dispatcher
            .run(&path, &code, language, &mut self.store, &mut self.preview)
        {
            Ok(RunOutcome::Rendered) => {
                self.session.note_persisted();
                self.log_diagnostic(format!("rendered {path} into the preview"));
            }
            Ok(RunOutcome::Dispatched(id)) => {
                self.session.note_persisted();
                self.pending_runs.insert(id, path.clone());
                self.log_diagnostic(format!("run id: {id} ({path})"));
            }
            Err(err @ Error::UnsupportedLanguage(_)) => {
                self.warn(err.to_string());
            }
            Err(err) => {
                self.warn(format!("run aborted: {err}"));
            }
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.apply_event(event);
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    /// Applies a run result only while its id is still outstanding; a
    /// response for an already-retired id is dropped.
    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::RunCompleted { run_id, output } => {
                let Some(path) = self.retire_run(run_id) else {
                    self.log_diagnostic(format!("dropped stale response for run {run_id}"));
                    return;
                };
                self.output.push(run_id, path, output);
            }
            AppEvent::RunFailed { run_id, message } => {
                let Some(path) = self.retire_run(run_id) else {
                    self.log_diagnostic(format!("dropped stale failure for run {run_id}"));
                    return;
                };
                self.output.push(run_id, path, format!("Error: {message}"));
            }
        }
    }

    fn retire_run(&mut self, run_id: RunId) -> Option<String> {
        if !self.dispatcher.allocator().is_outstanding(run_id) {
            return None;
        }
        self.dispatcher.allocator_mut().release(run_id);
        self.pending_runs.remove(&run_id)
    }

    fn autosave_tick(&mut self, ctx: &egui::Context) {
        if !self.settings.autosave {
            return;
        }
        let dirty = self
            .session
            .binding()
            .map(|binding| binding.is_dirty())
            .unwrap_or(false);
        if !dirty {
            return;
        }

        // Make sure a frame arrives once the quiet period elapses even
        // without further input.
        ctx.request_repaint_after(AUTOSAVE_QUIET);

        match self.session.maybe_flush(Instant::now(), &mut self.store) {
            Ok(true) => {
                if let Some(binding) = self.session.binding() {
                    let path = binding.path.clone();
                    self.log_diagnostic(format!("auto-saved {path}"));
                }
                // Live re-run: while a preview or run is active, edits track
                // through to the output surfaces.
                if self.preview.is_live() || !self.pending_runs.is_empty() {
                    self.run_current();
                }
            }
            Ok(false) => {}
            Err(err) => self.warn(format!("autosave failed: {err}")),
        }
    }

    fn create_file(&mut self, name: &str) {
        let name = name.trim();
        let name = if name.is_empty() { "Untitled" } else { name };
        if self.store.contains(name) {
            self.warn(format!("a file with that name already exists: {name}"));
            return;
        }
        match self.store.save(name, "") {
            Ok(()) => self.open_path(name),
            Err(err) => self.warn(format!("failed to create {name}: {err}")),
        }
    }

    fn rename_file(&mut self, old_path: &str, new_name: &str) {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == old_path {
            return;
        }
        match self.store.rename(old_path, new_name) {
            Ok(()) => {
                self.selection.follow_rename(old_path, new_name);
                self.session.follow_rename(old_path, new_name);
                // A rename can change the detected language; rebind.
                if self.selection.is_selected(new_name) {
                    self.open_path(new_name);
                }
                // Rename is the one two-phase mutation, so audit the cache
                // against the store afterwards.
                if let Err(err) = self.store.verify_consistent() {
                    self.warn(err.to_string());
                }
            }
            Err(err) => self.warn(format!("rename failed: {err}")),
        }
    }

    fn delete_file(&mut self, path: &str) {
        match self.store.delete(path) {
            Ok(()) => {
                if self.selection.is_selected(path) {
                    self.selection.clear();
                    self.session.dispose();
                }
                self.log_diagnostic(format!("deleted {path}"));
            }
            Err(err) => self.warn(format!("delete failed: {err}")),
        }
    }

    fn apply_theme(&mut self, ctx: &egui::Context) {
        if !self.theme_applied {
            self.theme.apply_visuals(ctx);
            self.theme_applied = true;
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.settings.theme = self.settings.theme.toggled();
        self.theme = Theme::of(self.settings.theme);
        self.theme.apply_visuals(ctx);
        if let Err(err) = self.settings.save() {
            self.log_diagnostic(format!("failed to persist theme: {err}"));
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Lexius");
                ui.separator();

                let run_enabled = self.session.is_bound();
                if ui.add_enabled(run_enabled, egui::Button::new("Run")).clicked() {
                    self.run_current();
                }

                let theme_label = match self.settings.theme.toggled() {
                    crate::theme::ThemeKind::Dark => "Dark Mode",
                    crate::theme::ThemeKind::Light => "Light Mode",
                };
                if ui.button(theme_label).clicked() {
                    self.toggle_theme(ctx);
                }

                let mut autosave = self.settings.autosave;
                if ui.checkbox(&mut autosave, "Autosave").changed() {
                    self.settings.autosave = autosave;
                    if let Err(err) = self.settings.save() {
                        self.log_diagnostic(format!("failed to persist autosave flag: {err}"));
                    }
                }

                if let Some(binding) = self.session.binding() {
                    ui.separator();
                    ui.label(
                        RichText::new(binding.language.as_str())
                            .color(self.theme.accent_muted)
                            .small(),
                    );
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("✕").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                    if ui.button("🗖").clicked() {
                        self.maximized = !self.maximized;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(self.maximized));
                    }
                    if ui.button("🗕").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                    }
                });
            });
        });
    }

    fn render_files_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("files_panel")
            .resizable(true)
            .frame(self.theme.panel_frame())
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Files");
                    if ui.button("＋").on_hover_text("New file").clicked() {
                        self.dialog = DialogState::NewFile;
                        self.dialog_input.clear();
                    }
                });
                ui.separator();

                let paths: Vec<String> = self.store.paths().map(str::to_string).collect();
                if paths.is_empty() {
                    ui.label(RichText::new("No files yet").color(self.theme.text_muted));
                }

                let mut clicked: Option<String> = None;
                let mut rename_target: Option<String> = None;
                let mut delete_target: Option<String> = None;

                for path in &paths {
                    let selected = self.selection.is_selected(path);
                    let response = ui
                        .selectable_label(selected, path)
                        .on_hover_text(icon_for(path));
                    if response.clicked() && !selected {
                        clicked = Some(path.clone());
                    }
                    response.context_menu(|ui| {
                        if ui.button("Rename").clicked() {
                            rename_target = Some(path.clone());
                            ui.close_menu();
                        }
                        if ui.button("Delete").clicked() {
                            delete_target = Some(path.clone());
                            ui.close_menu();
                        }
                    });
                }

                if let Some(path) = clicked {
                    self.open_path(&path);
                }
                if let Some(path) = rename_target {
                    self.dialog_input = path.clone();
                    self.dialog = DialogState::Rename { old_path: path };
                }
                if let Some(path) = delete_target {
                    self.dialog = DialogState::Delete { path };
                }
            });
    }

    fn render_preview_panel(&mut self, ctx: &egui::Context) {
        if !self.preview.is_live() {
            return;
        }
        egui::SidePanel::right("preview_panel")
            .resizable(true)
            .frame(self.theme.panel_frame())
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Preview");
                    if ui.button("Clear").clicked() {
                        self.preview.clear();
                    }
                });
                ui.separator();
                if let Some(document) = self.preview.document() {
                    ScrollArea::vertical()
                        .id_salt("preview_document")
                        .show(ui, |ui| {
                            ui.monospace(document);
                        });
                }
            });
    }

    fn render_terminal_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("terminal_panel")
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("Terminal");
                ScrollArea::vertical()
                    .id_salt("terminal_log")
                    .max_height(140.0)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if self.output.is_empty() {
                            ui.label(RichText::new("No runs yet").color(self.theme.text_muted));
                        }
                        for entry in self.output.entries() {
                            ui.monospace(format!(
                                "lexius {} [{}] $ {}",
                                entry.path, entry.run_id, entry.text
                            ));
                        }
                    });

                egui::CollapsingHeader::new("Diagnostics")
                    .default_open(false)
                    .show(ui, |ui| {
                        ScrollArea::vertical()
                            .id_salt("diagnostics_log")
                            .max_height(90.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for line in &self.diagnostics_log {
                                    ui.label(line);
                                }
                            });
                    });
            });
    }

    fn render_editor_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = self.warning_banner.clone() {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(message).color(self.theme.warning));
                    if ui.small_button("dismiss").clicked() {
                        self.warning_banner = None;
                    }
                });
                ui.separator();
            }

            let mut edited = false;
            if let Some(binding) = self.session.binding_mut() {
                ui.horizontal(|ui| {
                    ui.strong(&binding.path);
                });
                ui.separator();
                ScrollArea::vertical().id_salt("editor_buffer").show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::multiline(&mut binding.buffer)
                            .code_editor()
                            .desired_width(f32::INFINITY)
                            .desired_rows(24),
                    );
                    edited = response.changed();
                });
            } else {
                ui.vertical_centered(|ui| {
                    ui.add_space(80.0);
                    ui.heading("Welcome to Lexius!");
                    ui.label("Create or open a file to get started.");
                });
            }

            if edited {
                self.session.mark_edited(Instant::now());
            }
        });
    }

    fn render_dialog(&mut self, ctx: &egui::Context) {
        match self.dialog.clone() {
            DialogState::None => {}
            DialogState::NewFile => {
                let mut confirmed = false;
                let mut cancelled = false;
                egui::Window::new("New file")
                    .collapsible(false)
                    .resizable(false)
                    .show(ctx, |ui| {
                        let response = ui.text_edit_singleline(&mut self.dialog_input);
                        confirmed = response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        ui.horizontal(|ui| {
                            confirmed |= ui.button("Create").clicked();
                            cancelled = ui.button("Cancel").clicked();
                        });
                    });
                if confirmed {
                    let name = std::mem::take(&mut self.dialog_input);
                    self.dialog = DialogState::None;
                    self.create_file(&name);
                } else if cancelled {
                    self.dialog = DialogState::None;
                    self.dialog_input.clear();
                }
            }
            DialogState::Rename { old_path } => {
                let mut confirmed = false;
                let mut cancelled = false;
                egui::Window::new("Rename")
                    .collapsible(false)
                    .resizable(false)
                    .show(ctx, |ui| {
                        let response = ui.text_edit_singleline(&mut self.dialog_input);
                        confirmed = response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        ui.horizontal(|ui| {
                            confirmed |= ui.button("Rename").clicked();
                            cancelled = ui.button("Cancel").clicked();
                        });
                    });
                if confirmed {
                    let new_name = std::mem::take(&mut self.dialog_input);
                    self.dialog = DialogState::None;
                    self.rename_file(&old_path, &new_name);
                } else if cancelled {
                    self.dialog = DialogState::None;
                    self.dialog_input.clear();
                }
            }
            DialogState::Delete { path } => {
                let mut confirmed = false;
                let mut cancelled = false;
                egui::Window::new("Delete file")
                    .collapsible(false)
                    .resizable(false)
                    .show(ctx, |ui| {
                        ui.label(format!("Delete \"{path}\"?"));
                        ui.horizontal(|ui| {
                            confirmed = ui
                                .button(RichText::new("Delete").color(self.theme.danger))
                                .clicked();
                            cancelled = ui.button("Cancel").clicked();
                        });
                    });
                if confirmed {
                    self.dialog = DialogState::None;
                    self.delete_file(&path);
                } else if cancelled {
                    self.dialog = DialogState::None;
                }
            }
        }
    }
}

impl eframe::App for LexiusApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_theme(ctx);
        self.drain_events(ctx);
        self.render_top_bar(ctx);
        self.render_files_panel(ctx);
        self.render_preview_panel(ctx);
        self.render_terminal_panel(ctx);
        self.render_editor_panel(ctx);
        self.render_dialog(ctx);
        self.autosave_tick(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::LanguageId;
    use crate::run::Executor;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::{SystemTime, UNIX_EPOCH};

    struct NullExecutor;

    impl Executor for NullExecutor {
        fn execute(&self, _run_id: RunId, _code: &str, _lang: LanguageId) {}
    }

    fn temp_app(prefix: &str) -> (LexiusApp, PathBuf) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "lexius_app_{prefix}_{}_{}",
            std::process::id(),
            nanos
        ));
        let (store, warnings) = FileStore::open(dir.clone()).expect("store should open");
        let (_tx, rx) = mpsc::channel();
        let app = LexiusApp::new(
            rx,
            RunDispatcher::new(Box::new(NullExecutor)),
            store,
            warnings,
            Settings::default(),
            None,
        );
        (app, dir)
    }

    #[test]
    fn launch_opens_the_first_stored_file() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "lexius_app_launch_{}_{}",
            std::process::id(),
            nanos
        ));
        let (mut seed, _) = FileStore::open(dir.clone()).expect("store should open");
        seed.save("alpha.py", "print(1)").expect("save should succeed");
        drop(seed);

        let (store, warnings) = FileStore::open(dir.clone()).expect("reopen should succeed");
        let (_tx, rx) = mpsc::channel();
        let app = LexiusApp::new(
            rx,
            RunDispatcher::new(Box::new(NullExecutor)),
            store,
            warnings,
            Settings::default(),
            None,
        );

        assert_eq!(app.selection.selected_path(), Some("alpha.py"));
        let binding = app.session.binding().expect("session should be bound");
        assert_eq!(binding.path, "alpha.py");
        assert_eq!(binding.buffer, "print(1)");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn completed_run_lands_in_the_output_log() {
        let (mut app, dir) = temp_app("completed");
        let id = app
            .dispatcher
            .allocator_mut()
            .allocate()
            .expect("pool should have room");
        app.pending_runs.insert(id, "main.py".to_string());

        app.apply_event(AppEvent::RunCompleted {
            run_id: id,
            output: "5".to_string(),
        });

        let entry = app.output.latest().expect("log should have an entry");
        assert_eq!(entry.text, "5");
        assert_eq!(entry.path, "main.py");
        assert_eq!(entry.run_id, id);
        assert!(!app.dispatcher.allocator().is_outstanding(id));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stale_responses_are_dropped() {
        let (mut app, dir) = temp_app("stale");
        let id = app
            .dispatcher
            .allocator_mut()
            .allocate()
            .expect("pool should have room");
        app.pending_runs.insert(id, "main.py".to_string());
        // The run was retired before its response arrived.
        app.retire_run(id);

        app.apply_event(AppEvent::RunCompleted {
            run_id: id,
            output: "late".to_string(),
        });

        assert!(app.output.is_empty(), "stale output must not be applied");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn failed_run_renders_as_error_text() {
        let (mut app, dir) = temp_app("failed");
        let id = app
            .dispatcher
            .allocator_mut()
            .allocate()
            .expect("pool should have room");
        app.pending_runs.insert(id, "main.py".to_string());

        app.apply_event(AppEvent::RunFailed {
            run_id: id,
            message: "Server error: 503".to_string(),
        });

        let entry = app.output.latest().expect("log should have an entry");
        assert_eq!(entry.text, "Error: Server error: 503");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unsupported_run_warns_and_leaves_the_log_untouched() {
        let (mut app, dir) = temp_app("unsupported");
        app.store
            .save("main.rs", "fn main() {}")
            .expect("seed save should succeed");
        app.open_path("main.rs");

        app.run_current();

        assert!(app.output.is_empty());
        assert!(app
            .warning_banner
            .as_deref()
            .expect("a warning should be shown")
            .contains("not supported"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn switching_files_flushes_pending_edits() {
        let (mut app, dir) = temp_app("switch");
        app.store.save("a.py", "one").expect("save should succeed");
        app.store.save("b.py", "two").expect("save should succeed");
        app.open_path("a.py");

        app.session
            .binding_mut()
            .expect("session should be bound")
            .buffer = "edited".to_string();
        app.session.mark_edited(std::time::Instant::now());
        app.open_path("b.py");

        assert_eq!(app.store.content_of("a.py"), Some("edited"));
        assert_eq!(
            app.session.binding().expect("session should be bound").path,
            "b.py"
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn deleting_the_open_file_disposes_the_session() {
        let (mut app, dir) = temp_app("delete_open");
        app.store.save("a.md", "# hi").expect("save should succeed");
        app.open_path("a.md");
        assert!(app.session.is_bound());

        app.delete_file("a.md");

        assert!(!app.session.is_bound());
        assert_eq!(app.selection.selected_path(), None);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn renaming_the_open_file_rebinds_it() {
        let (mut app, dir) = temp_app("rename_open");
        app.store.save("a.txt", "body").expect("save should succeed");
        app.open_path("a.txt");

        app.rename_file("a.txt", "a.md");

        assert_eq!(app.selection.selected_path(), Some("a.md"));
        let binding = app.session.binding().expect("session should stay bound");
        assert_eq!(binding.path, "a.md");
        assert_eq!(binding.language, LanguageId::Markdown);
        assert_eq!(binding.buffer, "body");
        let _ = fs::remove_dir_all(dir);
    }
}
