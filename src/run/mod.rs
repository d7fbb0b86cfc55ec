use crate::error::{Error, Result};
use crate::files::store::FileStore;
use crate::lang::LanguageId;
use crate::run::output::{markdown_to_html, PreviewSurface};
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;

pub mod client;
pub mod output;

pub const RUN_ID_MIN: u16 = 0;
pub const RUN_ID_MAX: u16 = 999;
pub const RUN_ID_CAPACITY: usize = (RUN_ID_MAX - RUN_ID_MIN + 1) as usize;

/// Small integer identifying one in-flight run. Unique among outstanding
/// runs; reusable after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u16);

impl RunId {
    pub fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity id pool over `[RUN_ID_MIN, RUN_ID_MAX]`. `allocate` and
/// `release` are a matched pair; exhaustion is an explicit error, not a
/// spin.
#[derive(Debug, Default)]
pub struct RunIdAllocator {
    outstanding: BTreeSet<u16>,
}

impl RunIdAllocator {
    pub fn allocate(&mut self) -> Result<RunId> {
        if self.outstanding.len() >= RUN_ID_CAPACITY {
            return Err(Error::CapacityExceeded(RUN_ID_CAPACITY));
        }
        let mut rng = rand::rng();
        loop {
            let candidate = rng.random_range(RUN_ID_MIN..=RUN_ID_MAX);
            if self.outstanding.insert(candidate) {
                return Ok(RunId(candidate));
            }
        }
    }

    pub fn release(&mut self, id: RunId) -> bool {
        self.outstanding.remove(&id.0)
    }

    pub fn is_outstanding(&self, id: RunId) -> bool {
        self.outstanding.contains(&id.0)
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }
}

/// Boundary to the remote execution service. Fire-and-forget: results come
/// back over the app event channel tagged with the run id.
pub trait Executor {
    fn execute(&self, run_id: RunId, code: &str, lang: LanguageId);
}

/// What `RunDispatcher::run` did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Markup was rendered straight into the preview surface.
    Rendered,
    /// The code went to the execution service; output arrives later.
    Dispatched(RunId),
}

/// Routes a run request: persist first, then either render markup locally
/// or ship the code to the execution service.
pub struct RunDispatcher {
    allocator: RunIdAllocator,
    executor: Box<dyn Executor>,
}

impl RunDispatcher {
    pub fn new(executor: Box<dyn Executor>) -> Self {
        Self {
            allocator: RunIdAllocator::default(),
            executor,
        }
    }

    pub fn allocator(&self) -> &RunIdAllocator {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut RunIdAllocator {
        &mut self.allocator
    }

    pub fn run(
        &mut self,
        path: &str,
        code: &str,
        lang: LanguageId,
        store: &mut FileStore,
        preview: &mut PreviewSurface,
    ) -> Result<RunOutcome> {
        // Running unsaved code would silently execute a stale buffer, so a
        // persistence failure aborts the run.
        store.save(path, code)?;

        if !lang.supported_for_run() {
            return Err(Error::UnsupportedLanguage(lang.as_str().to_string()));
        }

        if lang.directly_rendered() {
            let id = self.allocator.allocate()?;
            let document = if lang == LanguageId::Markdown {
                markdown_to_html(code)
            } else {
                code.to_string()
            };
            preview.replace_document(document);
            // The render finished before control returns, so the id is
            // retired immediately.
            self.allocator.release(id);
            return Ok(RunOutcome::Rendered);
        }

        let id = self.allocator.allocate()?;
        self.executor.execute(id, code, lang);
        Ok(RunOutcome::Dispatched(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::store::FileStore;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Rc<RefCell<Vec<(RunId, String, LanguageId)>>>,
    }

    impl Executor for RecordingExecutor {
        fn execute(&self, run_id: RunId, code: &str, lang: LanguageId) {
            self.calls.borrow_mut().push((run_id, code.to_string(), lang));
        }
    }

    fn temp_store(prefix: &str) -> (FileStore, PathBuf) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "lexius_run_{prefix}_{}_{}",
            std::process::id(),
            nanos
        ));
        let (store, _) = FileStore::open(dir.clone()).expect("store should open");
        (store, dir)
    }

    fn dispatcher() -> (RunDispatcher, Rc<RefCell<Vec<(RunId, String, LanguageId)>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let executor = RecordingExecutor {
            calls: Rc::clone(&calls),
        };
        (RunDispatcher::new(Box::new(executor)), calls)
    }

    #[test]
    fn allocated_ids_are_distinct_until_released() {
        let mut allocator = RunIdAllocator::default();
        let mut seen = BTreeSet::new();
        for _ in 0..100 {
            let id = allocator.allocate().expect("pool should have room");
            assert!(seen.insert(id.value()), "id {id} was handed out twice");
        }
        assert_eq!(allocator.outstanding_count(), 100);
    }

    #[test]
    fn exhausted_pool_is_an_explicit_error() {
        let mut allocator = RunIdAllocator::default();
        for _ in 0..RUN_ID_CAPACITY {
            allocator.allocate().expect("pool should have room");
        }
        let err = allocator.allocate().expect_err("full pool should refuse");
        assert!(matches!(err, Error::CapacityExceeded(_)));
    }

    #[test]
    fn released_ids_become_allocatable_again() {
        let mut allocator = RunIdAllocator::default();
        for _ in 0..RUN_ID_CAPACITY {
            allocator.allocate().expect("pool should have room");
        }
        let reclaimed = RunId(42);
        assert!(allocator.release(reclaimed));
        let id = allocator.allocate().expect("released id should be reusable");
        assert_eq!(id, reclaimed);
    }

    #[test]
    fn markdown_run_renders_into_the_preview() {
        let (mut store, dir) = temp_store("markdown");
        let (mut dispatcher, calls) = dispatcher();
        let mut preview = PreviewSurface::default();

        let outcome = dispatcher
            .run("notes.md", "# hi", LanguageId::Markdown, &mut store, &mut preview)
            .expect("markdown run should succeed");

        assert_eq!(outcome, RunOutcome::Rendered);
        let document = preview.document().expect("preview should be live");
        assert!(document.contains("<h1>hi</h1>"), "got: {document}");
        assert!(calls.borrow().is_empty(), "rendering must not hit the service");
        assert_eq!(dispatcher.allocator().outstanding_count(), 0);
        assert_eq!(store.content_of("notes.md"), Some("# hi"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn html_passes_through_unrendered() {
        let (mut store, dir) = temp_store("html");
        let (mut dispatcher, _) = dispatcher();
        let mut preview = PreviewSurface::default();

        dispatcher
            .run("page.html", "<b>raw</b>", LanguageId::Html, &mut store, &mut preview)
            .expect("html run should succeed");
        assert_eq!(preview.document(), Some("<b>raw</b>"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn python_run_is_dispatched_with_an_outstanding_id() {
        let (mut store, dir) = temp_store("python");
        let (mut dispatcher, calls) = dispatcher();
        let mut preview = PreviewSurface::default();

        let outcome = dispatcher
            .run("main.py", "print(5)", LanguageId::Python, &mut store, &mut preview)
            .expect("python run should dispatch");

        let RunOutcome::Dispatched(id) = outcome else {
            panic!("expected a dispatched run, got {outcome:?}");
        };
        assert!(dispatcher.allocator().is_outstanding(id));
        assert!(!preview.is_live());

        let recorded = calls.borrow();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, id);
        assert_eq!(recorded[0].1, "print(5)");
        assert_eq!(recorded[0].2, LanguageId::Python);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unsupported_language_makes_no_service_call() {
        let (mut store, dir) = temp_store("unsupported");
        let (mut dispatcher, calls) = dispatcher();
        let mut preview = PreviewSurface::default();

        let err = dispatcher
            .run("main.rs", "fn main() {}", LanguageId::Rust, &mut store, &mut preview)
            .expect_err("unsupported language should be refused");

        assert!(matches!(err, Error::UnsupportedLanguage(_)));
        assert!(calls.borrow().is_empty());
        assert_eq!(dispatcher.allocator().outstanding_count(), 0);
        assert!(!preview.is_live());
        // The buffer is still persisted before the support check.
        assert_eq!(store.content_of("main.rs"), Some("fn main() {}"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn concurrent_dispatches_get_distinct_ids() {
        let (mut store, dir) = temp_store("concurrent");
        let (mut dispatcher, _) = dispatcher();
        let mut preview = PreviewSurface::default();

        let mut ids = BTreeSet::new();
        for i in 0..10 {
            let outcome = dispatcher
                .run(
                    &format!("f{i}.py"),
                    "print()",
                    LanguageId::Python,
                    &mut store,
                    &mut preview,
                )
                .expect("dispatch should succeed");
            let RunOutcome::Dispatched(id) = outcome else {
                panic!("expected dispatch");
            };
            assert!(ids.insert(id.value()));
        }
        assert_eq!(dispatcher.allocator().outstanding_count(), 10);

        let _ = fs::remove_dir_all(dir);
    }
}
