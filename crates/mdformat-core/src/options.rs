//! Configuration options for Markdown rendering

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::plugin::{CodeFormatter, ParserExtension};

/// Paragraph word wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Keep line breaks as they are in the source
    #[default]
    Keep,
    /// Join every paragraph onto a single line
    NoWrap,
    /// Wrap paragraphs at the given column
    Width(usize),
}

impl FromStr for WrapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(WrapMode::Keep),
            "no" => Ok(WrapMode::NoWrap),
            _ => match s.parse::<usize>() {
                Ok(width) if width >= 1 => Ok(WrapMode::Width(width)),
                _ => Err(format!(
                    "invalid wrap mode \"{s}\": expected \"keep\", \"no\" or a positive integer"
                )),
            },
        }
    }
}

impl fmt::Display for WrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapMode::Keep => f.write_str("keep"),
            WrapMode::NoWrap => f.write_str("no"),
            WrapMode::Width(width) => write!(f, "{width}"),
        }
    }
}

/// Output line ending mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfLine {
    /// Always `\n`
    #[default]
    Lf,
    /// Always `\r\n`
    Crlf,
    /// Reuse the first line ending found in the input
    Keep,
}

impl FromStr for EndOfLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lf" => Ok(EndOfLine::Lf),
            "crlf" => Ok(EndOfLine::Crlf),
            "keep" => Ok(EndOfLine::Keep),
            _ => Err(format!(
                "invalid end of line mode \"{s}\": expected \"lf\", \"crlf\" or \"keep\""
            )),
        }
    }
}

impl fmt::Display for EndOfLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndOfLine::Lf => "lf",
            EndOfLine::Crlf => "crlf",
            EndOfLine::Keep => "keep",
        })
    }
}

/// Free-form options of a single plugin, keyed by option name
pub type PluginOptions = IndexMap<String, String>;

/// Options for Markdown rendering
///
/// Read-only for the duration of a render pass.
#[derive(Clone, Default)]
pub struct Options {
    /// Paragraph word wrap mode
    pub wrap: WrapMode,

    /// Number ordered list items consecutively
    pub number: bool,

    /// Output line ending mode
    pub end_of_line: EndOfLine,

    /// Name of the formatted file, used in log messages
    pub filename: Option<String>,

    /// Enabled parser extensions, in registration order
    pub extensions: Vec<Arc<dyn ParserExtension>>,

    /// Code formatters keyed by fence language
    pub codeformatters: IndexMap<String, Arc<dyn CodeFormatter>>,

    /// Per-plugin options keyed by plugin id
    pub plugin: IndexMap<String, PluginOptions>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn with_number(mut self, number: bool) -> Self {
        self.number = number;
        self
    }

    pub fn with_end_of_line(mut self, end_of_line: EndOfLine) -> Self {
        self.end_of_line = end_of_line;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Enable a parser extension. Enabling the same extension twice is a no-op.
    pub fn with_extension(mut self, extension: Arc<dyn ParserExtension>) -> Self {
        if !self.extensions.iter().any(|e| e.name() == extension.name()) {
            self.extensions.push(extension);
        }
        self
    }

    /// Register a code formatter for a fence language
    pub fn with_codeformatter<F>(mut self, lang: impl Into<String>, formatter: F) -> Self
    where
        F: CodeFormatter + 'static,
    {
        self.codeformatters.insert(lang.into(), Arc::new(formatter));
        self
    }

    /// Set an option of a plugin
    pub fn with_plugin_option(
        mut self,
        plugin: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.plugin
            .entry(plugin.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Look up an option of a plugin
    pub fn plugin_option(&self, plugin: &str, key: &str) -> Option<&str> {
        self.plugin
            .get(plugin)
            .and_then(|opts| opts.get(key))
            .map(String::as_str)
    }

    /// Whether paragraphs are rewrapped
    pub fn do_wrap(&self) -> bool {
        self.wrap != WrapMode::Keep
    }

    /// Whether any enabled extension changes the AST
    pub fn changes_ast(&self) -> bool {
        self.extensions.iter().any(|e| e.changes_ast())
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("wrap", &self.wrap)
            .field("number", &self.number)
            .field("end_of_line", &self.end_of_line)
            .field("filename", &self.filename)
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field(
                "codeformatters",
                &self.codeformatters.keys().collect::<Vec<_>>(),
            )
            .field("plugin", &self.plugin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_mode_from_str() {
        assert_eq!("keep".parse::<WrapMode>(), Ok(WrapMode::Keep));
        assert_eq!("no".parse::<WrapMode>(), Ok(WrapMode::NoWrap));
        assert_eq!("80".parse::<WrapMode>(), Ok(WrapMode::Width(80)));
        assert!("0".parse::<WrapMode>().is_err());
        assert!("-3".parse::<WrapMode>().is_err());
        assert!("wide".parse::<WrapMode>().is_err());
    }

    #[test]
    fn test_wrap_mode_display() {
        assert_eq!(WrapMode::Width(40).to_string(), "40");
        assert_eq!(WrapMode::NoWrap.to_string(), "no");
    }

    #[test]
    fn test_end_of_line_from_str() {
        assert_eq!("crlf".parse::<EndOfLine>(), Ok(EndOfLine::Crlf));
        assert!("cr".parse::<EndOfLine>().is_err());
    }

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.wrap, WrapMode::Keep);
        assert!(!options.number);
        assert_eq!(options.end_of_line, EndOfLine::Lf);
        assert!(!options.do_wrap());
        assert!(!options.changes_ast());
    }

    #[test]
    fn test_plugin_options() {
        let options = Options::new().with_plugin_option("tables", "wrap", "true");
        assert_eq!(options.plugin_option("tables", "wrap"), Some("true"));
        assert_eq!(options.plugin_option("tables", "other"), None);
        assert_eq!(options.plugin_option("gfm", "wrap"), None);
    }
}
