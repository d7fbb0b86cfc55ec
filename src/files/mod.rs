use serde::{Deserialize, Serialize};

pub mod store;

/// One playground file: the path doubles as the display name and the
/// storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
}

/// Which file the files panel currently has selected. Mutated only through
/// these methods so the selection never lives implicitly in widget state.
#[derive(Debug, Default)]
pub struct SelectionState {
    selected_path: Option<String>,
}

impl SelectionState {
    pub fn selected_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    pub fn select(&mut self, path: impl Into<String>) {
        self.selected_path = Some(path.into());
    }

    pub fn clear(&mut self) {
        self.selected_path = None;
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected_path.as_deref() == Some(path)
    }

    /// Keeps the selection valid after a rename.
    pub fn follow_rename(&mut self, old_path: &str, new_path: &str) {
        if self.is_selected(old_path) {
            self.select(new_path);
        }
    }
}
