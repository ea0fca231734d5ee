//! JavaScript compression for `javascript:` URIs.
//!
//! Parsing, whitespace removal and local identifier mangling are done by
//! `minify-js`. Two steps wrap it:
//!
//! - standalone `debugger` statement lines are removed first when requested;
//! - raw line breaks left in the output (only possible inside template
//!   literals) become `\n` escapes, since bookmark URL fields strip them.
//!
//! Top-level names are left alone and `console` calls are kept.

use std::borrow::Cow;

use minify_js::{Session, TopLevelMode};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static DEBUGGER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*debugger[ \t]*;?[ \t]*\r?$").expect("debugger line pattern")
});

/// Options controlling the minifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinifyOptions {
    pub drop_debugger: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            drop_debugger: true,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MinifyError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("minifier produced invalid UTF-8")]
    Encoding,
}

/// Compress `source` into a single line of equivalent code.
pub fn minify(source: &str, options: MinifyOptions) -> Result<String, MinifyError> {
    let source = if options.drop_debugger {
        strip_debugger_statements(source)
    } else {
        Cow::Borrowed(source)
    };

    let session = Session::new();
    let mut out = Vec::with_capacity(source.len() / 2);
    minify_js::minify(&session, TopLevelMode::Global, source.as_bytes(), &mut out)
        .map_err(|err| MinifyError::Syntax(format!("{err:?}")))?;
    let code = String::from_utf8(out).map_err(|_| MinifyError::Encoding)?;

    Ok(flatten_line_breaks(&code))
}

fn strip_debugger_statements(source: &str) -> Cow<'_, str> {
    DEBUGGER_LINE.replace_all(source, "")
}

fn flatten_line_breaks(code: &str) -> String {
    if !code.contains(['\n', '\r']) {
        return code.to_owned();
    }
    code.replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min(source: &str) -> String {
        minify(source, MinifyOptions::default()).expect("minify")
    }

    #[test]
    fn shortens_local_names_and_keeps_console() {
        let source = "(function () {\n    // header\n    const selectedRowCount = 3;\n    console.log(selectedRowCount, 'a  // b');\n})();\n";
        let out = min(source);
        assert!(!out.contains("selectedRowCount"));
        assert!(!out.contains("header"));
        assert!(out.contains("console.log("));
        assert!(out.contains("'a  // b'") || out.contains("\"a  // b\""));
        assert!(out.len() < source.len());
    }

    #[test]
    fn object_literal_before_while_stays_a_separate_statement() {
        let source = "(function () {\n    const s = {\n        a: 0\n    }\n    while (s.a < 1) s.a++\n    console.log(s)\n})();\n";
        let out = min(source);
        assert!(!out.contains("}while"), "{out}");
        assert!(out.contains("while("));
    }

    #[test]
    fn return_before_a_line_break_returns_nothing() {
        let source = "(function () {\n    function f() {\n        return\n        (1)\n    }\n    console.log(f())\n})();\n";
        let out = min(source);
        assert!(!out.contains("return(1)"), "{out}");
        assert!(!out.contains("return 1"), "{out}");
    }

    #[test]
    fn output_is_a_single_line() {
        let out = min("(function () {\n    const s = `line one\nline ${1 + 2} two`;\n    console.log(s);\n})();\n");
        assert!(!out.contains('\n') && !out.contains('\r'), "{out}");
    }

    #[test]
    fn debugger_lines_are_dropped_before_minifying() {
        let stripped = strip_debugger_statements("a();\n    debugger;\nb();\ndebugger\nconst note = 'debugger';\n");
        assert_eq!(stripped, "a();\n\nb();\n\nconst note = 'debugger';\n");

        let out = min("(function () {\n    debugger;\n    console.log('kept');\n})();\n");
        assert!(!out.contains("debugger"));
        assert!(out.contains("console.log("));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = minify("var a = 'oops", MinifyOptions::default()).unwrap_err();
        assert!(matches!(err, MinifyError::Syntax(_)));
    }

    #[test]
    fn flattening_escapes_raw_breaks() {
        assert_eq!(flatten_line_breaks("`a\nb\r\nc`"), "`a\\nb\\nc`");
        assert_eq!(flatten_line_breaks("x=1;"), "x=1;");
    }
}
