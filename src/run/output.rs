use crate::run::RunId;
use pulldown_cmark::{html, Parser};

pub fn markdown_to_html(text: &str) -> String {
    let parser = Parser::new(text);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// One terminal line per finished run, tagged with the run id so output
/// from concurrent runs stays attributable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    pub run_id: RunId,
    pub path: String,
    pub text: String,
}

/// Append-only terminal log.
#[derive(Debug, Default)]
pub struct OutputLog {
    entries: Vec<OutputEntry>,
}

impl OutputLog {
    pub fn entries(&self) -> &[OutputEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&OutputEntry> {
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, run_id: RunId, path: impl Into<String>, text: impl Into<String>) {
        self.entries.push(OutputEntry {
            run_id,
            path: path.into(),
            text: text.into(),
        });
    }
}

/// The single sandboxed preview document. Replacing the document models the
/// original's iframe reuse: a new render always displaces the previous one,
/// surfaces never accumulate.
#[derive(Debug, Default)]
pub struct PreviewSurface {
    document: Option<String>,
}

impl PreviewSurface {
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.document.is_some()
    }

    pub fn replace_document(&mut self, html: String) {
        self.document = Some(html);
    }

    pub fn clear(&mut self) {
        self.document = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_heading_renders_to_h1() {
        let html = markdown_to_html("# hi");
        assert!(html.contains("<h1>hi</h1>"), "got: {html}");
    }

    #[test]
    fn preview_replaces_instead_of_accumulating() {
        let mut preview = PreviewSurface::default();
        preview.replace_document("<p>one</p>".to_string());
        preview.replace_document("<p>two</p>".to_string());
        assert_eq!(preview.document(), Some("<p>two</p>"));
    }
}
