//! Source transform: view blocks, imports, export detection.
//!
//! Each `view Name { ... }` block is replaced by a registration call:
//!
//! ```text
//! view Main {                      View.define("Main", "3f2a9c01d4e5b6a7", "\n  render <h1>hi</h1>\n");
//!   render <h1>hi</h1>      ->
//! }
//! ```
//!
//! Everything outside the blocks is copied through untouched, so line
//! numbers of the outside code shift only by the collapsed block lines.

use std::sync::LazyLock;

use regex::Regex;

use super::error::CompileError;
use super::syntax::parse_body;
use crate::cache::ViewSpan;
use crate::freshness::hash_str;

/// A view block found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDef {
    pub name: String,
    /// Hash of the body text
    pub hash: String,
    pub body: String,
    /// Line the body text starts on (the `view` line)
    pub start_line: usize,
    pub end_line: usize,
}

impl ViewDef {
    pub fn span(&self) -> ViewSpan {
        ViewSpan::new(&self.name, self.start_line, self.end_line)
    }
}

/// Result of transforming one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transformed {
    pub code: String,
    pub views: Vec<ViewDef>,
    /// Import specifiers in order of appearance, de-duplicated
    pub imports: Vec<String>,
    /// The file exports symbols (library code, not an app file)
    pub internal: bool,
}

impl Transformed {
    pub fn spans(&self) -> Vec<ViewSpan> {
        self.views.iter().map(ViewDef::span).collect()
    }

    pub fn view_names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.name.clone()).collect()
    }
}

static VIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*view[ \t]+([A-Za-z_][\w.]*)[ \t]*\{").expect("valid regex")
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:[^'";]+?\s+from\s+)?['"]([^'"]+)['"]|require\(\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("valid regex")
});

static EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*export\b").expect("valid regex"));

/// Transform a view source file.
pub fn transform(source: &str) -> Result<Transformed, CompileError> {
    let mut code = String::with_capacity(source.len());
    let mut views = Vec::new();
    let mut outside = String::new();
    let mut last = 0;

    for caps in VIEW_RE.captures_iter(source) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Block nested in a previous view body
        if whole.start() < last {
            continue;
        }

        let start_line = line_of(source, whole.start());
        let open = whole.end() - 1;
        let close = matching_brace(source, open).ok_or_else(|| {
            CompileError::syntax(start_line, format!("unclosed view `{}`", name.as_str()))
        })?;

        let body = &source[open + 1..close];
        parse_body(body, start_line)?;

        let def = ViewDef {
            name: name.as_str().to_string(),
            hash: hash_str(body).short(),
            body: body.to_string(),
            start_line,
            end_line: line_of(source, close),
        };

        let before = &source[last..whole.start()];
        code.push_str(before);
        outside.push_str(before);
        code.push_str(&define_call(&def));

        views.push(def);
        last = close + 1;
    }

    let rest = &source[last..];
    code.push_str(rest);
    outside.push_str(rest);

    Ok(Transformed {
        code,
        views,
        imports: collect_imports(&outside),
        internal: EXPORT_RE.is_match(&outside),
    })
}

/// `View.define("Name", "<hash>", "<body>");`
fn define_call(def: &ViewDef) -> String {
    let quote = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into());
    format!(
        "View.define({}, {}, {});",
        quote(&def.name),
        quote(&def.hash),
        quote(&def.body)
    )
}

/// Index of the `}` closing the `{` at `open`.
fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in source.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// 1-based line number of a byte offset.
fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

fn collect_imports(outside: &str) -> Vec<String> {
    let mut imports: Vec<String> = Vec::new();
    for caps in IMPORT_RE.captures_iter(outside) {
        if let Some(spec) = caps.get(1).or_else(|| caps.get(2))
            && !imports.iter().any(|i| i == spec.as_str())
        {
            imports.push(spec.as_str().to_string());
        }
    }
    imports
}
