//! mdformat-core - Markdown renderer core
//!
//! Renders a CommonMark token stream back into normalized Markdown. The
//! output parses to the same HTML as the source and formatting it again
//! changes nothing.
//!
//! # Architecture
//!
//! ```text
//! Token stream ──▶ RenderTree ──▶ RenderContext ──▶ renderer table ──▶ Markdown
//!                                  (options, env)    (defaults + plugins)
//! ```
//!
//! Parsing is left to the caller. The `mdformat` crate feeds this crate
//! with tokens produced from pulldown-cmark events.
//!
//! # Example
//!
//! ```rust
//! use mdformat_core::{render, Env, Options, Token};
//!
//! let tokens = vec![
//!     Token::open("heading_open").with_markup("="),
//!     Token::inline(vec![Token::text("Hello World")]),
//!     Token::close("heading_close"),
//!     Token::open("paragraph_open"),
//!     Token::inline(vec![Token::text("2*3 = 6")]),
//!     Token::close("paragraph_close"),
//! ];
//!
//! let markdown = render(tokens, &Options::default(), &mut Env::default()).unwrap();
//! assert_eq!(markdown, "# Hello World\n\n2\\*3 = 6\n");
//! ```

pub mod codepoints;
mod context;
pub mod escape;
mod options;
mod plugin;
mod references;
mod render;
pub mod renderers;
mod token;
mod tree;

pub use context::{
    postprocessor, renderer, Env, Postprocess, Postprocessors, Render, RenderContext, Renderers,
};
pub use options::{EndOfLine, Options, PluginOptions, WrapMode};
pub use plugin::{CodeFormatError, CodeFormatter, ParserExtension, ParserFeatures};
pub use references::{write_references, ReferenceDefinition};
pub use render::{render, render_tree, renderer_tables};
pub use renderers::default_renderers;
pub use token::Token;
pub use tree::{NodeId, RenderTree, RenderTreeNode};

/// Errors raised while building a render tree
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A container token was never closed
    #[error("unclosed \"{token_type}\" token")]
    UnclosedToken { token_type: String },

    /// A closing token without a matching opening token
    #[error("unexpected closing token \"{token_type}\" at index {index}")]
    UnexpectedClose { token_type: String, index: usize },

    /// A closing token of a different container than the open one
    #[error("\"{closing}\" at index {index} does not close \"{opening}\"")]
    MismatchedClose {
        opening: String,
        closing: String,
        index: usize,
    },
}

/// Result type for rendering
pub type Result<T> = std::result::Result<T, RenderError>;
