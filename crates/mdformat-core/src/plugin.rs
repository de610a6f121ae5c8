//! Plugin interfaces: parser extensions and code formatters.

use crate::context::{Postprocess, Render};

/// Parser syntax switches an extension can turn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserFeatures {
    /// GFM `~~strikethrough~~`
    pub strikethrough: bool,
}

/// A plugin that extends the parser and renders the syntax it adds
pub trait ParserExtension: Send + Sync {
    /// Plugin id, also the key of its options in [`Options::plugin`](crate::Options)
    fn name(&self) -> &str;

    /// Whether the plugin alters the document's HTML meaning on purpose.
    ///
    /// When any enabled plugin does, the HTML equivalence check is skipped.
    fn changes_ast(&self) -> bool {
        false
    }

    /// Enable the parser features the plugin needs
    fn update_parser(&self, _features: &mut ParserFeatures) {}

    /// Renderers for the syntax types the plugin handles
    fn renderers(&self) -> Vec<(String, Render)> {
        Vec::new()
    }

    /// Postprocessors run after the renderer of a syntax type
    fn postprocessors(&self) -> Vec<(String, Postprocess)> {
        Vec::new()
    }
}

/// Error a code formatter may return
pub type CodeFormatError = Box<dyn std::error::Error + Send + Sync>;

/// Formats the content of fenced code blocks of one language.
///
/// An error or a panic leaves the block unformatted and logs a warning.
/// A panic still goes through the process panic hook first, so the default
/// hook prints it to stderr as well.
pub trait CodeFormatter: Send + Sync {
    /// Format `code`; `info` is the full fence info string
    fn format(&self, code: &str, info: &str) -> Result<String, CodeFormatError>;
}

impl<F> CodeFormatter for F
where
    F: Fn(&str, &str) -> Result<String, CodeFormatError> + Send + Sync,
{
    fn format(&self, code: &str, info: &str) -> Result<String, CodeFormatError> {
        self(code, info)
    }
}
