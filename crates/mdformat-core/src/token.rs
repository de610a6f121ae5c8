//! Token stream model
//!
//! Parsers hand the renderer a flat sequence of tokens. Block containers are
//! expressed as `*_open`/`*_close` pairs, inline content lives in the
//! `children` of an `inline` token.

use indexmap::IndexMap;

/// A single token produced by a Markdown parser
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token {
    /// Type tag, e.g. `paragraph_open`, `text`, `fence`
    pub kind: String,

    /// `1` opens a container, `-1` closes one, `0` is self-contained
    pub nesting: i8,

    /// Nesting depth of the token
    pub level: usize,

    /// Literal content (text, code, raw HTML)
    pub content: String,

    /// Syntax marker used in the source, e.g. `*`, `-`, `=`, `` ``` ``
    pub markup: String,

    /// Fence info string, or `auto` for autolinks
    pub info: String,

    /// Ordered attributes such as `href`, `title`, `src`, `alt`, `start`
    pub attrs: IndexMap<String, String>,

    /// Free-form plugin data, e.g. the reference `label` of a link
    pub meta: IndexMap<String, String>,

    /// Inline child tokens
    pub children: Vec<Token>,

    /// Source line range (0-based, end exclusive)
    pub map: Option<(usize, usize)>,

    /// Set on paragraphs of tight lists
    pub hidden: bool,
}

impl Token {
    pub fn new(kind: impl Into<String>, nesting: i8) -> Self {
        Self {
            kind: kind.into(),
            nesting,
            ..Self::default()
        }
    }

    /// Create an opening token
    pub fn open(kind: impl Into<String>) -> Self {
        Self::new(kind, 1)
    }

    /// Create a closing token
    pub fn close(kind: impl Into<String>) -> Self {
        Self::new(kind, -1)
    }

    /// Create a `text` token
    pub fn text(content: impl Into<String>) -> Self {
        Self::new("text", 0).with_content(content)
    }

    /// Create an `inline` token holding the given children
    pub fn inline(children: Vec<Token>) -> Self {
        Self::new("inline", 0).with_children(children)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    pub fn with_map(mut self, start: usize, end: usize) -> Self {
        self.map = Some((start, end));
        self
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Look up an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let token = Token::open("link_open")
            .with_attr("href", "https://example.com")
            .with_attr("title", "Example")
            .with_meta("label", "EX");

        assert_eq!(token.nesting, 1);
        assert_eq!(token.attr("href"), Some("https://example.com"));
        assert_eq!(token.attr("missing"), None);
        assert_eq!(
            token.attrs.keys().collect::<Vec<_>>(),
            vec!["href", "title"]
        );
        assert_eq!(token.meta.get("label").map(String::as_str), Some("EX"));
    }

    #[test]
    fn test_inline() {
        let token = Token::inline(vec![Token::text("a"), Token::new("softbreak", 0)]);
        assert_eq!(token.kind, "inline");
        assert_eq!(token.nesting, 0);
        assert_eq!(token.children.len(), 2);
    }
}
