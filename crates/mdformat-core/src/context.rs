//! Render context
//!
//! Bundles the renderer table, postprocessor table, options and the mutable
//! per-pass environment that every render function receives.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::options::Options;
use crate::references::ReferenceDefinition;
use crate::tree::RenderTreeNode;

/// Renders one node to Markdown text
pub type Render =
    Arc<dyn for<'t, 'c> Fn(RenderTreeNode<'t>, &mut RenderContext<'c>) -> String + Send + Sync>;

/// Rewrites the text a renderer produced for a node
pub type Postprocess = Arc<
    dyn for<'t, 'c> Fn(String, RenderTreeNode<'t>, &mut RenderContext<'c>) -> String
        + Send
        + Sync,
>;

/// Syntax type to renderer
pub type Renderers = IndexMap<String, Render>;

/// Syntax type to postprocessors, in registration order
pub type Postprocessors = IndexMap<String, Vec<Postprocess>>;

/// Wrap a closure as a [`Render`]
pub fn renderer<F>(f: F) -> Render
where
    F: for<'t, 'c> Fn(RenderTreeNode<'t>, &mut RenderContext<'c>) -> String + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`Postprocess`]
pub fn postprocessor<F>(f: F) -> Postprocess
where
    F: for<'t, 'c> Fn(String, RenderTreeNode<'t>, &mut RenderContext<'c>) -> String
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// State shared by all render functions during one pass
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// Current left margin in columns, grown by lists and block quotes
    pub indent_width: usize,

    /// Normalized reference labels emitted so far. Only grows.
    pub used_refs: IndexSet<String>,

    /// Reference definitions of the document, keyed by normalized label
    pub references: IndexMap<String, ReferenceDefinition>,
}

impl Env {
    pub fn new(references: IndexMap<String, ReferenceDefinition>) -> Self {
        Self {
            references,
            ..Self::default()
        }
    }
}

/// Everything a render function can see
pub struct RenderContext<'c> {
    pub renderers: &'c Renderers,
    pub postprocessors: &'c Postprocessors,
    pub options: &'c Options,
    pub env: &'c mut Env,
}

impl<'c> RenderContext<'c> {
    pub fn new(
        renderers: &'c Renderers,
        postprocessors: &'c Postprocessors,
        options: &'c Options,
        env: &'c mut Env,
    ) -> Self {
        Self {
            renderers,
            postprocessors,
            options,
            env,
        }
    }

    /// Render a node and run its postprocessors.
    ///
    /// Unknown containers render their children back to back, unknown leaves
    /// render as nothing.
    pub fn render(&mut self, node: RenderTreeNode<'_>) -> String {
        let renderers = self.renderers;
        let mut text = match renderers.get(node.node_type()) {
            Some(render) => render(node, self),
            None if node.has_children() => self.render_children(node, ""),
            None => String::new(),
        };

        let postprocessors = self.postprocessors;
        if let Some(chain) = postprocessors.get(node.node_type()) {
            for postprocess in chain {
                text = postprocess(text, node, self);
            }
        }
        text
    }

    /// Render all children of a node, joined by `separator`
    pub fn render_children(&mut self, node: RenderTreeNode<'_>, separator: &str) -> String {
        let mut out = String::new();
        for (i, child) in node.children().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.push_str(&self.render(child));
        }
        out
    }

    /// Run `f` with the indent width grown by `width`, restoring it afterwards
    pub fn with_indent<R>(&mut self, width: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        self.env.indent_width += width;
        let result = f(self);
        self.env.indent_width -= width;
        result
    }

    /// Whether paragraphs are rewrapped in this pass
    pub fn do_wrap(&self) -> bool {
        self.options.do_wrap()
    }

    /// A context sharing options and env but using another renderer table
    pub fn with_renderers<'r>(&'r mut self, renderers: &'r Renderers) -> RenderContext<'r> {
        RenderContext {
            renderers,
            postprocessors: self.postprocessors,
            options: self.options,
            env: &mut *self.env,
        }
    }

    /// A copy of the renderer table with the default renderer restored for
    /// the given syntax types. Types without a default are removed.
    pub fn renderers_with_defaults_for(&self, syntax_names: &[&str]) -> Renderers {
        let defaults = crate::renderers::default_renderers();
        let mut renderers = self.renderers.clone();
        for syntax in syntax_names {
            match defaults.get(*syntax) {
                Some(render) => {
                    renderers.insert((*syntax).to_string(), render.clone());
                }
                None => {
                    renderers.shift_remove(*syntax);
                }
            }
        }
        renderers
    }
}
