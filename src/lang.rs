/// Canonical lowercase tag for a file's language, derived from its
/// extension. This is the single source of truth consulted by the editor,
/// the file list icons, and run dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Javascript,
    Typescript,
    Json,
    Html,
    Css,
    Scss,
    Less,
    Markdown,
    Mdx,
    Vue,
    Svelte,
    Php,
    Python,
    Java,
    C,
    Cpp,
    CHeader,
    CppHeader,
    Go,
    Ruby,
    Swift,
    Kotlin,
    Rust,
    Lua,
    Bash,
    Sql,
    Yaml,
    Xml,
    Plaintext,
    Svg,
    Tsv,
    Csv,
    Wasm,
    Jsonc,
    Json5,
    Diff,
    Assembly,
    ObjectiveC,
    ObjectiveCpp,
    Dart,
    Scala,
    Clojure,
    Elixir,
    Erlang,
    Groovy,
    Handlebars,
    Jinja,
    Latex,
    R,
    Perl,
    Csharp,
    Fsharp,
    VisualBasic,
    Nim,
    Hcl,
    Toml,
    Zig,
    Vlang,
    Razor,
    Unknown,
}

impl LanguageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Json => "json",
            Self::Html => "html",
            Self::Css => "css",
            Self::Scss => "scss",
            Self::Less => "less",
            Self::Markdown => "markdown",
            Self::Mdx => "mdx",
            Self::Vue => "vue",
            Self::Svelte => "svelte",
            Self::Php => "php",
            Self::Python => "python",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CHeader => "c-header",
            Self::CppHeader => "cpp-header",
            Self::Go => "go",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Rust => "rust",
            Self::Lua => "lua",
            Self::Bash => "bash",
            Self::Sql => "sql",
            Self::Yaml => "yaml",
            Self::Xml => "xml",
            Self::Plaintext => "plaintext",
            Self::Svg => "svg",
            Self::Tsv => "tsv",
            Self::Csv => "csv",
            Self::Wasm => "wasm",
            Self::Jsonc => "jsonc",
            Self::Json5 => "json5",
            Self::Diff => "diff",
            Self::Assembly => "assembly",
            Self::ObjectiveC => "objective-c",
            Self::ObjectiveCpp => "objective-cpp",
            Self::Dart => "dart",
            Self::Scala => "scala",
            Self::Clojure => "clojure",
            Self::Elixir => "elixir",
            Self::Erlang => "erlang",
            Self::Groovy => "groovy",
            Self::Handlebars => "handlebars",
            Self::Jinja => "jinja",
            Self::Latex => "latex",
            Self::R => "r",
            Self::Perl => "perl",
            Self::Csharp => "csharp",
            Self::Fsharp => "fsharp",
            Self::VisualBasic => "visual-basic",
            Self::Nim => "nim",
            Self::Hcl => "hcl",
            Self::Toml => "toml",
            Self::Zig => "zig",
            Self::Vlang => "vlang",
            Self::Razor => "razor",
            Self::Unknown => "unknown",
        }
    }

    /// Languages the run pipeline accepts at all. Everything else gets a
    /// user-visible warning and no network call.
    pub fn supported_for_run(&self) -> bool {
        matches!(
            self,
            Self::Python
                | Self::Javascript
                | Self::Typescript
                | Self::Html
                | Self::Markdown
                | Self::Svg
        )
    }

    /// Languages whose "execution" is rendering markup into the preview
    /// surface instead of a round trip to the execution service.
    pub fn directly_rendered(&self) -> bool {
        matches!(self, Self::Html | Self::Svg | Self::Markdown)
    }

    fn icon_file(&self) -> &'static str {
        match self {
            Self::Javascript => "js.svg",
            Self::Typescript => "ts.svg",
            Self::Json => "json.svg",
            Self::Html => "html.svg",
            Self::Css => "css.svg",
            Self::Scss => "scss.svg",
            Self::Less => "less.svg",
            Self::Markdown => "markdown.svg",
            Self::Mdx => "mdx.svg",
            Self::Vue => "vue.svg",
            Self::Svelte => "svelte.svg",
            Self::Php => "php.svg",
            Self::Python => "python.svg",
            Self::Java => "java.svg",
            Self::C => "c.svg",
            Self::Cpp => "cpp.svg",
            Self::CHeader => "h.svg",
            Self::CppHeader => "hpp.svg",
            Self::Go => "go.svg",
            Self::Ruby => "ruby.svg",
            Self::Swift => "swift.svg",
            Self::Kotlin => "kotlin.svg",
            Self::Rust => "rust.svg",
            Self::Lua => "lua.svg",
            Self::Bash => "bash.svg",
            Self::Sql => "sql.svg",
            Self::Yaml => "yaml.svg",
            Self::Xml => "xml.svg",
            Self::Plaintext => "file.svg",
            Self::Svg => "svg.svg",
            Self::Tsv => "tsv.svg",
            Self::Csv => "csv.svg",
            Self::Wasm => "wasm.svg",
            Self::Jsonc => "jsonc.svg",
            Self::Json5 => "json5.svg",
            Self::Diff => "diff.svg",
            Self::Assembly => "assembly.svg",
            Self::ObjectiveC => "m.svg",
            Self::ObjectiveCpp => "mpp.svg",
            Self::Dart => "dart.svg",
            Self::Scala => "scala.svg",
            Self::Clojure => "clojure.svg",
            Self::Elixir => "elixir.svg",
            Self::Erlang => "erlang.svg",
            Self::Groovy => "groovy.svg",
            Self::Handlebars => "handlebars.svg",
            Self::Jinja => "jinja.svg",
            Self::Latex => "latex.svg",
            Self::R => "r.svg",
            Self::Perl => "perl.svg",
            Self::Csharp => "csharp.svg",
            Self::Fsharp => "fsharp.svg",
            Self::VisualBasic => "vb.svg",
            Self::Nim => "nim.svg",
            Self::Hcl => "hcl.svg",
            Self::Toml => "toml.svg",
            Self::Zig => "zig.svg",
            Self::Vlang => "vlang.svg",
            Self::Razor => "razor.svg",
            Self::Unknown => "file.svg",
        }
    }
}

const ICON_BASE: &str = "assets/images/langs/";

/// Maps a file name to its language, case-insensitively, by extension.
/// Total: anything without a recognized extension is `Unknown`.
pub fn detect_language(file_name: &str) -> LanguageId {
    let lowered = file_name.to_ascii_lowercase();
    let Some((_, ext)) = lowered.rsplit_once('.') else {
        return LanguageId::Unknown;
    };

    match ext {
        "js" | "jsx" => LanguageId::Javascript,
        "ts" | "tsx" => LanguageId::Typescript,
        "json" => LanguageId::Json,
        "html" => LanguageId::Html,
        "css" => LanguageId::Css,
        "scss" => LanguageId::Scss,
        "less" => LanguageId::Less,
        "md" => LanguageId::Markdown,
        "mdx" => LanguageId::Mdx,
        "vue" => LanguageId::Vue,
        "svelte" => LanguageId::Svelte,
        "php" => LanguageId::Php,
        "py" => LanguageId::Python,
        "java" => LanguageId::Java,
        "c" => LanguageId::C,
        "cpp" | "cxx" | "cc" => LanguageId::Cpp,
        "h" => LanguageId::CHeader,
        "hpp" | "hxx" | "hh" => LanguageId::CppHeader,
        "go" => LanguageId::Go,
        "rb" => LanguageId::Ruby,
        "swift" => LanguageId::Swift,
        "kt" | "kotlin" => LanguageId::Kotlin,
        "rs" => LanguageId::Rust,
        "lua" => LanguageId::Lua,
        "sh" | "bash" => LanguageId::Bash,
        "sql" => LanguageId::Sql,
        "yaml" | "yml" => LanguageId::Yaml,
        "xml" => LanguageId::Xml,
        "txt" => LanguageId::Plaintext,
        "svg" => LanguageId::Svg,
        "tsv" => LanguageId::Tsv,
        "csv" => LanguageId::Csv,
        "wasm" => LanguageId::Wasm,
        "jsonc" => LanguageId::Jsonc,
        "json5" => LanguageId::Json5,
        "diff" | "patch" => LanguageId::Diff,
        "asm" | "s" => LanguageId::Assembly,
        "m" => LanguageId::ObjectiveC,
        "mm" => LanguageId::ObjectiveCpp,
        "dart" => LanguageId::Dart,
        "scala" => LanguageId::Scala,
        "clj" | "cljs" | "cljc" => LanguageId::Clojure,
        "elixir" => LanguageId::Elixir,
        "erl" | "hrl" => LanguageId::Erlang,
        "groovy" => LanguageId::Groovy,
        "hbs" | "handlebars" => LanguageId::Handlebars,
        "jinja" | "j2" => LanguageId::Jinja,
        "tex" => LanguageId::Latex,
        "r" | "rmd" => LanguageId::R,
        "pl" | "pm" => LanguageId::Perl,
        "cs" => LanguageId::Csharp,
        "fs" => LanguageId::Fsharp,
        "vb" => LanguageId::VisualBasic,
        "nim" => LanguageId::Nim,
        "hcl" => LanguageId::Hcl,
        "toml" => LanguageId::Toml,
        "zig" => LanguageId::Zig,
        "v" => LanguageId::Vlang,
        "cshtml" | "razor" => LanguageId::Razor,
        _ => LanguageId::Unknown,
    }
}

/// Icon path for a file, degrading to the generic file icon for languages
/// without a dedicated one.
pub fn icon_for(file_name: &str) -> String {
    format!("{ICON_BASE}{}", detect_language(file_name).icon_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_ignores_case() {
        assert_eq!(detect_language("a.PY"), LanguageId::Python);
        assert_eq!(detect_language("a.py"), LanguageId::Python);
        assert_eq!(detect_language("INDEX.HTML"), LanguageId::Html);
    }

    #[test]
    fn detection_is_total() {
        assert_eq!(detect_language("noextension"), LanguageId::Unknown);
        assert_eq!(detect_language(""), LanguageId::Unknown);
        assert_eq!(detect_language("weird.xyzzy"), LanguageId::Unknown);
        assert_eq!(detect_language("trailing."), LanguageId::Unknown);
    }

    #[test]
    fn multi_extension_aliases_share_a_language() {
        assert_eq!(detect_language("main.cpp"), detect_language("main.cxx"));
        assert_eq!(detect_language("main.cpp"), detect_language("main.cc"));
        assert_eq!(detect_language("run.sh"), detect_language("run.bash"));
    }

    #[test]
    fn tags_are_lowercase() {
        assert_eq!(LanguageId::Python.as_str(), "python");
        assert_eq!(LanguageId::ObjectiveCpp.as_str(), "objective-cpp");
        assert_eq!(LanguageId::Unknown.as_str(), "unknown");
    }

    #[test]
    fn run_support_matches_the_service() {
        for lang in [
            LanguageId::Python,
            LanguageId::Javascript,
            LanguageId::Typescript,
            LanguageId::Html,
            LanguageId::Markdown,
            LanguageId::Svg,
        ] {
            assert!(lang.supported_for_run(), "{} should run", lang.as_str());
        }
        assert!(!LanguageId::Rust.supported_for_run());
        assert!(!LanguageId::Unknown.supported_for_run());
    }

    #[test]
    fn icons_default_to_generic_file() {
        assert_eq!(icon_for("a.py"), "assets/images/langs/python.svg");
        assert_eq!(icon_for("mystery.xyzzy"), "assets/images/langs/file.svg");
        assert_eq!(icon_for("notes.txt"), "assets/images/langs/file.svg");
    }
}
