//! View body syntax.
//!
//! ```text
//! view Counter {
//!   let count = 0
//!   let label = "clicks"
//!   render <button>{label}: {count}</button>
//!   render <Badge tone="info" key="b1"/> {props.title}
//!   // comment
//!   fail not ready yet
//! }
//! ```
//!
//! - `let <name> = <literal>` declares a memoized variable; literals are
//!   JSON (`0`, `"text"`, `true`, `[1, 2]`, `{"a": 1}`)
//! - `render <markup>` appends markup; `{name}` reads a variable,
//!   `{props.key}` a prop, `<Child k="v"/>` renders a child view
//! - `fail <message>` raises a render error
//!
//! Parsing happens once at compile time (to reject bad bodies) and again
//! when the engine installs a definition.

use std::sync::LazyLock;

use regex::Regex;

use super::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        init: serde_json::Value,
    },
    Render(Vec<Node>),
    Fail(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Var(String),
    Prop(String),
    Child {
        name: String,
        /// Attributes in source order, `key` excluded
        props: Vec<(String, String)>,
        key: Option<String>,
    },
}

/// A parsed view body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub stmts: Vec<Stmt>,
}

impl Template {
    /// Names of child views referenced by the body.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.stmts.iter().flat_map(|stmt| match stmt {
            Stmt::Render(nodes) => nodes
                .iter()
                .filter_map(|n| match n {
                    Node::Child { name, .. } => Some(name.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }
}

static LET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^let\s+([A-Za-z_]\w*)\s*=\s*(.+)$").expect("valid regex"));

static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{(props\.)?([A-Za-z_]\w*)\}|<([A-Z][\w.]*)((?:\s+[A-Za-z_][\w-]*="[^"]*")*)\s*/>"#)
        .expect("valid regex")
});

static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_][\w-]*)="([^"]*)""#).expect("valid regex"));

/// Parse a view body. `first_line` is the file line the body starts on,
/// used for error positions.
pub fn parse_body(body: &str, first_line: usize) -> Result<Template, CompileError> {
    let mut stmts = Vec::new();

    for (offset, raw) in body.lines().enumerate() {
        let line = raw.trim();
        let line_no = first_line + offset;

        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if let Some(rest) = keyword(line, "render") {
            stmts.push(Stmt::Render(parse_markup(rest)));
        } else if let Some(rest) = keyword(line, "fail") {
            stmts.push(Stmt::Fail(rest.to_string()));
        } else if let Some(caps) = LET_RE.captures(line) {
            let init = serde_json::from_str(caps[2].trim()).map_err(|_| {
                CompileError::syntax(
                    line_no,
                    format!("`{}` must be initialized with a literal", &caps[1]),
                )
            })?;
            stmts.push(Stmt::Let {
                name: caps[1].to_string(),
                init,
            });
        } else {
            return Err(CompileError::syntax(
                line_no,
                format!("unexpected `{}`", line.split_whitespace().next().unwrap_or(line)),
            ));
        }
    }

    Ok(Template { stmts })
}

/// `render x` -> `Some("x")`; a bare `render` -> `Some("")`.
fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(kw)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.starts_with(char::is_whitespace).then(|| rest.trim_start())
}

fn parse_markup(src: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut last = 0;

    for caps in MARKUP_RE.captures_iter(src) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            nodes.push(Node::Text(src[last..whole.start()].to_string()));
        }
        last = whole.end();

        if let Some(ident) = caps.get(2) {
            let ident = ident.as_str().to_string();
            nodes.push(if caps.get(1).is_some() {
                Node::Prop(ident)
            } else {
                Node::Var(ident)
            });
        } else if let Some(name) = caps.get(3) {
            let attrs = caps.get(4).map_or("", |m| m.as_str());
            let mut key = None;
            let mut props = Vec::new();
            for attr in ATTR_RE.captures_iter(attrs) {
                if &attr[1] == "key" {
                    key = Some(attr[2].to_string());
                } else {
                    props.push((attr[1].to_string(), attr[2].to_string()));
                }
            }
            nodes.push(Node::Child {
                name: name.as_str().to_string(),
                props,
                key,
            });
        }
    }

    if last < src.len() {
        nodes.push(Node::Text(src[last..].to_string()));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_let_and_render() {
        let body = "\n  let count = 0\n  render <b>{count}</b>\n";
        let template = parse_body(body, 1).unwrap();
        assert_eq!(
            template.stmts,
            vec![
                Stmt::Let {
                    name: "count".into(),
                    init: json!(0)
                },
                Stmt::Render(vec![
                    Node::Text("<b>".into()),
                    Node::Var("count".into()),
                    Node::Text("</b>".into()),
                ]),
            ]
        );
    }

    #[test]
    fn test_parse_child_with_key_and_props() {
        let template = parse_body(r#"render <Item id="3" key="k" label="x"/>"#, 1).unwrap();
        assert_eq!(
            template.stmts,
            vec![Stmt::Render(vec![Node::Child {
                name: "Item".into(),
                props: vec![("id".into(), "3".into()), ("label".into(), "x".into())],
                key: Some("k".into()),
            }])]
        );
        assert_eq!(template.children().collect::<Vec<_>>(), vec!["Item"]);
    }

    #[test]
    fn test_parse_prop_and_fail() {
        let template = parse_body("render {props.title}\nfail boom", 1).unwrap();
        assert_eq!(
            template.stmts,
            vec![
                Stmt::Render(vec![Node::Prop("title".into())]),
                Stmt::Fail("boom".into()),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let template = parse_body("\n// note\n\n", 1).unwrap();
        assert!(template.stmts.is_empty());
    }

    #[test]
    fn test_non_literal_initializer_rejected() {
        let err = parse_body("\nlet x = y + 1", 10).unwrap_err();
        assert_eq!(err.line(), Some(11));
        assert!(err.to_string().contains("`x`"));
    }

    #[test]
    fn test_unknown_statement_rejected() {
        let err = parse_body("rendr <b/>", 3).unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.to_string(), "unexpected `rendr`");
    }

    #[test]
    fn test_keyword_requires_boundary() {
        assert_eq!(keyword("render x", "render"), Some("x"));
        assert_eq!(keyword("render", "render"), Some(""));
        assert_eq!(keyword("renderer", "render"), None);
    }
}
