//! Reading view definitions back out of built artifacts.

use std::sync::LazyLock;

use regex::Regex;

/// One `View.define(name, hash, body)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub hash: String,
    pub body: String,
}

impl From<&crate::compiler::transform::ViewDef> for Definition {
    fn from(def: &crate::compiler::transform::ViewDef) -> Self {
        Self {
            name: def.name.clone(),
            hash: def.hash.clone(),
            body: def.body.clone(),
        }
    }
}

const STR: &str = r#""(?:[^"\\]|\\.)*""#;

static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"View\.define\(\s*({STR})\s*,\s*({STR})\s*,\s*({STR})\s*\)"
    ))
    .expect("valid regex")
});

/// Every definition in `code`, in order. Calls whose arguments are not
/// plain string literals are ignored.
pub fn parse_defines(code: &str) -> Vec<Definition> {
    DEFINE_RE
        .captures_iter(code)
        .filter_map(|caps| {
            let literal = |i: usize| serde_json::from_str::<String>(&caps[i]).ok();
            Some(Definition {
                name: literal(1)?,
                hash: literal(2)?,
                body: literal(3)?,
            })
        })
        .collect()
}
