//! # mdformat
//!
//! A CommonMark compliant Markdown formatter.
//!
//! Markdown is parsed with [pulldown-cmark], converted to a flat token
//! stream and rendered back to Markdown in a consistent style by
//! [`mdformat_core`]. Formatting never changes how a document renders to
//! HTML; [`is_md_equal`] checks that.
//!
//! ## Example
//!
//! ```rust
//! use mdformat::Options;
//!
//! let formatted = mdformat::text("Title\n=====\n\n* one\n* two\n", &Options::default()).unwrap();
//! assert_eq!(formatted, "# Title\n\n- one\n- two\n");
//! ```
//!
//! ## Plugins
//!
//! Parser extensions add syntax and the renderers for it. Code formatters
//! rewrite fenced code blocks of one language. Both are collected in a
//! [`PluginRegistry`] and enabled per run through [`Options`].
//!
//! [pulldown-cmark]: https://docs.rs/pulldown-cmark

use std::path::PathBuf;

mod api;
pub mod config;
mod equivalence;
pub mod extensions;
pub mod parser;

pub use api::{detect_newline_type, file, text, text_with_newlines};
pub use config::{find_config_file, ConfigError, FileConfig, CONFIG_FILE_NAME};
pub use equivalence::{is_md_equal, parser_features};
#[cfg(feature = "strikethrough")]
pub use extensions::Strikethrough;
pub use extensions::PluginRegistry;
pub use mdformat_core::{
    CodeFormatError, CodeFormatter, EndOfLine, Options, ParserExtension, ParserFeatures,
    PluginOptions, RenderError, WrapMode,
};

/// Error type for formatting operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Formatted Markdown of \"{}\" renders to different HTML than the input", .path.display())]
    NotEquivalent { path: PathBuf },

    #[error("Cannot format \"{}\". {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("Unknown extension \"{0}\"")]
    UnknownExtension(String),
}

pub type Result<T> = std::result::Result<T, Error>;
