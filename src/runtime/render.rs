//! Template rendering against the registry and the memo store.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::memo::{MemoMode, MemoStore};
use super::registry::{Implementation, ViewImpl, ViewRegistry};
use super::value::Value;
use crate::compiler::syntax::{Node, Stmt};
use crate::utils::hash;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("{view}: {message}")]
    Failed { view: String, message: String },

    #[error("{view}: unknown variable `{name}`")]
    UnknownVariable { view: String, name: String },

    #[error("{view}: views nested deeper than {MAX_DEPTH}")]
    TooDeep { view: String },

    #[error("render already in progress")]
    Reentered,
}

impl RenderError {
    /// View whose body raised the error.
    pub fn view(&self) -> Option<&str> {
        match self {
            Self::Failed { view, .. }
            | Self::UnknownVariable { view, .. }
            | Self::TooDeep { view } => Some(view),
            Self::Reentered => None,
        }
    }
}

/// A rendered instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub path: String,
    pub view: String,
}

/// Result of one successful render pass.
#[derive(Debug, Default)]
pub struct Rendered {
    pub html: String,
    /// Instances in render order
    pub instances: Vec<Instance>,
    /// Distinct implementations that rendered
    pub views: Vec<Arc<ViewImpl>>,
}

/// Markup shown in place of a view that cannot render.
pub fn placeholder(implementation: &Implementation) -> Option<String> {
    match implementation {
        Implementation::View(_) => None,
        Implementation::DefinedTwice(name) => Some(format!(
            r#"<div class="hotview-error">View `{name}` is defined twice</div>"#
        )),
        Implementation::NotFound(name) => Some(format!(
            r#"<div class="hotview-error">View `{name}` not found</div>"#
        )),
    }
}

/// One render pass.
pub struct Renderer<'a> {
    registry: &'a ViewRegistry,
    memo: &'a mut MemoStore,
    /// Props hash per `parent/Name[key]`, reused until the parent changes
    prop_hashes: &'a mut FxHashMap<String, String>,
    /// Occurrences of each `parent/Name[key]` in this pass
    seen: FxHashMap<String, usize>,
    out: Rendered,
}

impl<'a> Renderer<'a> {
    pub fn new(
        registry: &'a ViewRegistry,
        memo: &'a mut MemoStore,
        prop_hashes: &'a mut FxHashMap<String, String>,
    ) -> Self {
        Self {
            registry,
            memo,
            prop_hashes,
            seen: FxHashMap::default(),
            out: Rendered::default(),
        }
    }

    /// Render `root` as the top-level instance.
    pub fn render_root(mut self, root: &Arc<ViewImpl>) -> Result<Rendered, RenderError> {
        let html = self.render_view(root, root.name.clone(), &[], 0)?;
        self.out.html = html;
        Ok(self.out)
    }

    fn render_view(
        &mut self,
        view: &Arc<ViewImpl>,
        path: String,
        props: &[(String, String)],
        depth: usize,
    ) -> Result<String, RenderError> {
        if depth > MAX_DEPTH {
            return Err(RenderError::TooDeep {
                view: view.name.clone(),
            });
        }

        if !self.out.views.iter().any(|v| Arc::ptr_eq(v, view)) {
            self.out.views.push(Arc::clone(view));
        }
        self.out.instances.push(Instance {
            path: path.clone(),
            view: view.name.clone(),
        });

        let mode = self.registry.mode(&view.name);
        let mut vars: FxHashMap<&str, Value> = FxHashMap::default();
        let mut lines = Vec::new();

        for stmt in &view.template.stmts {
            match stmt {
                Stmt::Let { name, init } => {
                    let value = self
                        .memo
                        .evaluate(&path, name, mode, || Value::from_json(init));
                    vars.insert(name.as_str(), value);
                }
                Stmt::Render(nodes) => {
                    let mut line = String::new();
                    for node in nodes {
                        self.render_node(view, &path, mode, node, &vars, props, depth, &mut line)?;
                    }
                    lines.push(line);
                }
                Stmt::Fail(message) => {
                    return Err(RenderError::Failed {
                        view: view.name.clone(),
                        message: message.clone(),
                    });
                }
            }
        }

        Ok(lines.join("\n"))
    }

    #[allow(clippy::too_many_arguments)]
    fn render_node(
        &mut self,
        view: &Arc<ViewImpl>,
        path: &str,
        mode: MemoMode,
        node: &Node,
        vars: &FxHashMap<&str, Value>,
        props: &[(String, String)],
        depth: usize,
        out: &mut String,
    ) -> Result<(), RenderError> {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => {
                let value = vars.get(name.as_str()).ok_or_else(|| RenderError::UnknownVariable {
                    view: view.name.clone(),
                    name: name.clone(),
                })?;
                out.push_str(&value.to_string());
            }
            Node::Prop(key) => {
                if let Some((_, value)) = props.iter().find(|(k, _)| k == key) {
                    out.push_str(value);
                }
            }
            Node::Child {
                name,
                props: child_props,
                key,
            } => {
                let implementation = self.registry.resolve(name, Some(&view.name));
                if let Some(marker) = placeholder(&implementation) {
                    out.push_str(&marker);
                    return Ok(());
                }
                let Implementation::View(child) = implementation else {
                    return Ok(());
                };
                let child_path = self.child_path(path, name, key.as_deref(), child_props, mode);
                let html = self.render_view(&child, child_path, child_props, depth + 1)?;
                out.push_str(&html);
            }
        }
        Ok(())
    }

    /// `parent/Name[key]#<props hash>`
    fn child_path(
        &mut self,
        parent: &str,
        name: &str,
        key: Option<&str>,
        props: &[(String, String)],
        parent_mode: MemoMode,
    ) -> String {
        let base = match key {
            Some(key) => format!("{parent}/{name}[{key}]"),
            None => format!("{parent}/{name}"),
        };
        let compute = || hash::short(hash::pairs(props.iter().map(|(k, v)| (k.as_str(), v.as_str()))));

        let ordinal = self.seen.entry(base.clone()).or_default();
        let slot = format!("{base}@{ordinal}");
        *ordinal += 1;

        let props_hash = match (parent_mode, self.prop_hashes.get(&slot)) {
            (MemoMode::Preserve, Some(cached)) => cached.clone(),
            _ => {
                let fresh = compute();
                self.prop_hashes.insert(slot, fresh.clone());
                fresh
            }
        };
        format!("{base}#{props_hash}")
    }
}
