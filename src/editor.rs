use crate::error::Result;
use crate::files::store::FileStore;
use crate::lang::LanguageId;
use std::time::{Duration, Instant};

/// Quiet period after the last edit before an autosave flush fires.
pub const AUTOSAVE_QUIET: Duration = Duration::from_millis(2000);

/// The one live editor binding: the buffer the text widget edits, plus the
/// identity it is bound to and a snapshot of the last persisted content.
#[derive(Debug)]
pub struct EditorBinding {
    pub path: String,
    pub language: LanguageId,
    pub buffer: String,
    last_saved: String,
    dirty_since: Option<Instant>,
}

impl EditorBinding {
    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }
}

/// At most one editor instance exists at a time: `open` disposes any
/// current binding before creating the next one, and `dispose` returns to
/// `Empty`, after which flushes are no-ops until the next `open`.
#[derive(Debug, Default)]
pub enum EditorSession {
    #[default]
    Empty,
    Bound(EditorBinding),
}

impl EditorSession {
    pub fn open(&mut self, path: impl Into<String>, content: &str, language: LanguageId) {
        *self = Self::Bound(EditorBinding {
            path: path.into(),
            language,
            buffer: content.to_string(),
            last_saved: content.to_string(),
            dirty_since: None,
        });
    }

    pub fn dispose(&mut self) {
        *self = Self::Empty;
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }

    pub fn binding(&self) -> Option<&EditorBinding> {
        match self {
            Self::Bound(binding) => Some(binding),
            Self::Empty => None,
        }
    }

    pub fn binding_mut(&mut self) -> Option<&mut EditorBinding> {
        match self {
            Self::Bound(binding) => Some(binding),
            Self::Empty => None,
        }
    }

    /// Keeps the binding pointed at the right document after a rename.
    pub fn follow_rename(&mut self, old_path: &str, new_path: &str) {
        if let Self::Bound(binding) = self {
            if binding.path == old_path {
                binding.path = new_path.to_string();
            }
        }
    }

    /// Resets the debounce window; call on every buffer change.
    pub fn mark_edited(&mut self, now: Instant) {
        if let Self::Bound(binding) = self {
            binding.dirty_since = Some(now);
        }
    }

    /// Autosave: fires at most once per quiet period, and only writes when
    /// the buffer actually differs from what was last persisted. Returns
    /// whether a write happened.
    pub fn maybe_flush(&mut self, now: Instant, store: &mut FileStore) -> Result<bool> {
        let Self::Bound(binding) = self else {
            return Ok(false);
        };
        let Some(since) = binding.dirty_since else {
            return Ok(false);
        };
        if now.duration_since(since) < AUTOSAVE_QUIET {
            return Ok(false);
        }

        binding.dirty_since = None;
        if binding.buffer == binding.last_saved {
            return Ok(false);
        }
        store.save(&binding.path, &binding.buffer)?;
        binding.last_saved = binding.buffer.clone();
        Ok(true)
    }

    /// Explicit save, debounce ignored. No-op when nothing is bound or the
    /// content is unchanged.
    pub fn flush(&mut self, store: &mut FileStore) -> Result<bool> {
        let Self::Bound(binding) = self else {
            return Ok(false);
        };
        binding.dirty_since = None;
        if binding.buffer == binding.last_saved {
            return Ok(false);
        }
        store.save(&binding.path, &binding.buffer)?;
        binding.last_saved = binding.buffer.clone();
        Ok(true)
    }

    /// Marks the current buffer as persisted without writing; used when the
    /// dispatcher has just saved it as part of a run.
    pub fn note_persisted(&mut self) {
        if let Self::Bound(binding) = self {
            binding.last_saved = binding.buffer.clone();
            binding.dirty_since = None;
        }
    }
}
