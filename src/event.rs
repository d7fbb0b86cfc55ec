use crate::run::RunId;

/// Messages background tasks post back to the UI thread. Drained once per
/// frame; applied only while their run id is still outstanding, so a stale
/// response can never write into a reused output surface.
#[derive(Debug, Clone)]
pub enum AppEvent {
    RunCompleted { run_id: RunId, output: String },
    RunFailed { run_id: RunId, message: String },
}
