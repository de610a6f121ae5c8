//! pulldown-cmark adapter
//!
//! Turns pulldown-cmark's offset event stream into the nested token stream
//! the renderer consumes: block `*_open`/`*_close` pairs with one `inline`
//! token per paragraph or heading.

use std::ops::Range;

use indexmap::IndexMap;
use mdformat_core::escape::normalize_label;
use mdformat_core::{ParserFeatures, ReferenceDefinition, Token};
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, LinkType, Parser, Tag, TagEnd};
use regex::Regex;
use tracing::debug;

static RE_ATX_HEADING_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}#{1,6}(?:[ \t\r\n]|$)").expect("valid regex"));

/// A parsed document: its token stream and link reference definitions
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub tokens: Vec<Token>,

    /// Reference definitions keyed by normalized label
    pub references: IndexMap<String, ReferenceDefinition>,
}

/// pulldown-cmark options for the enabled parser features
pub fn parser_options(features: &ParserFeatures) -> pulldown_cmark::Options {
    let mut options = pulldown_cmark::Options::empty();
    if features.strikethrough {
        options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
    }
    options
}

/// Parse Markdown into a token stream
pub fn parse(text: &str, features: &ParserFeatures) -> ParsedDocument {
    // NUL is not valid in CommonMark and would collide with wrap points
    let source = text.replace('\0', "\u{fffd}");

    let mut events = Parser::new_ext(&source, parser_options(features)).into_offset_iter();
    let references = events
        .reference_definitions()
        .iter()
        .map(|(label, definition)| {
            let title = definition.title.as_ref().map(|title| title.to_string());
            (
                normalize_label(label),
                ReferenceDefinition::new(definition.dest.to_string(), title),
            )
        })
        .collect();

    let mut builder = TokenBuilder::new(&source);
    for (event, range) in events.by_ref() {
        builder.event(event, range);
    }

    ParsedDocument {
        tokens: builder.finish(),
        references,
    }
}

struct TokenBuilder<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
    tokens: Vec<Token>,
    level: usize,

    /// Inline children being collected. The bottom frame belongs to the
    /// current paragraph or heading, every open image adds one.
    frames: Vec<Vec<Token>>,
    inline_start: usize,
    inline_end: usize,

    /// A paragraph synthesised for a tight list item is open
    tight_paragraph: bool,

    /// Content of the open code or HTML block
    block_content: Option<String>,

    /// Markup of open emphasis, strong and strikethrough spans
    markup: Vec<String>,

    /// Images waiting for their description to close
    images: Vec<Token>,
}

impl<'s> TokenBuilder<'s> {
    fn new(source: &'s str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
            tokens: Vec::new(),
            level: 0,
            frames: Vec::new(),
            inline_start: 0,
            inline_end: 0,
            tight_paragraph: false,
            block_content: None,
            markup: Vec::new(),
            images: Vec::new(),
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_tight_paragraph();
        self.tokens
    }

    fn line_of(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// 0-based start line and exclusive end line of a byte range
    fn line_map(&self, range: &Range<usize>) -> (usize, usize) {
        let start = self.line_of(range.start);
        let end = self.line_of(range.end.saturating_sub(1).max(range.start)) + 1;
        (start, end)
    }

    fn open(&mut self, kind: &str, range: &Range<usize>) -> Token {
        let (start, end) = self.line_map(range);
        let token = Token::open(kind)
            .with_level(self.level)
            .with_map(start, end);
        self.level += 1;
        token
    }

    fn close(&mut self, kind: &str) -> Token {
        self.level = self.level.saturating_sub(1);
        Token::close(kind).with_level(self.level)
    }

    fn leaf(&self, kind: &str, range: &Range<usize>) -> Token {
        let (start, end) = self.line_map(range);
        Token::new(kind, 0)
            .with_level(self.level)
            .with_map(start, end)
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        // Code and HTML block bodies arrive as text events
        if let Some(content) = self.block_content.as_mut() {
            match &event {
                Event::Text(text) | Event::Html(text) => {
                    content.push_str(text);
                    return;
                }
                _ => {}
            }
        }

        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag, range),
            Event::Text(text) => self.push_text(&text, &range),
            Event::Code(code) => {
                let token = Token::new("code_inline", 0)
                    .with_content(code.to_string())
                    .with_markup("`");
                self.push_inline(token, &range);
            }
            Event::InlineHtml(html) | Event::Html(html) => {
                let token = Token::new("html_inline", 0).with_content(html.to_string());
                self.push_inline(token, &range);
            }
            Event::SoftBreak => self.push_inline(Token::new("softbreak", 0), &range),
            Event::HardBreak => self.push_inline(Token::new("hardbreak", 0), &range),
            Event::Rule => {
                self.flush_tight_paragraph();
                let markup = self.source[range.clone()].trim().chars().take(3).collect::<String>();
                let token = self.leaf("hr", &range).with_markup(markup);
                self.tokens.push(token);
            }
            other => debug!(?other, "Ignoring unsupported Markdown event"),
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let source = self.source;
        if is_block_tag(&tag) {
            self.flush_tight_paragraph();
        }

        match tag {
            Tag::Paragraph => {
                let token = self.open("paragraph_open", &range);
                self.tokens.push(token);
                self.open_inline(range.start);
            }
            Tag::Heading { level, .. } => {
                let level = level as usize;
                let markup = if RE_ATX_HEADING_START.is_match(&source[range.clone()]) {
                    "#".repeat(level)
                } else if level == 1 {
                    "=".to_string()
                } else {
                    "-".to_string()
                };
                let token = self.open("heading_open", &range).with_markup(markup);
                self.tokens.push(token);
                self.open_inline(range.start);
            }
            Tag::BlockQuote(_) => {
                let token = self.open("blockquote_open", &range).with_markup(">");
                self.tokens.push(token);
            }
            Tag::List(Some(start)) => {
                let delimiter = source[range.clone()]
                    .trim_start()
                    .trim_start_matches(|c: char| c.is_ascii_digit())
                    .chars()
                    .next()
                    .filter(|c| matches!(c, '.' | ')'))
                    .unwrap_or('.');
                let token = self
                    .open("ordered_list_open", &range)
                    .with_markup(delimiter.to_string())
                    .with_attr("start", start.to_string());
                self.tokens.push(token);
            }
            Tag::List(None) => {
                let marker = source[range.clone()]
                    .trim_start()
                    .chars()
                    .next()
                    .unwrap_or('-');
                let token = self
                    .open("bullet_list_open", &range)
                    .with_markup(marker.to_string());
                self.tokens.push(token);
            }
            Tag::Item => {
                let token = self.open("list_item_open", &range);
                self.tokens.push(token);
            }
            Tag::CodeBlock(kind) => {
                self.block_content = Some(String::new());
                let token = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let fence = source[range.clone()].trim_start();
                        let fence_char = fence.chars().next().unwrap_or('`');
                        let markup: String =
                            fence.chars().take_while(|c| *c == fence_char).collect();
                        self.leaf("fence", &range)
                            .with_info(info.to_string())
                            .with_markup(markup)
                    }
                    CodeBlockKind::Indented => self.leaf("code_block", &range),
                };
                self.tokens.push(token);
            }
            Tag::HtmlBlock => {
                self.block_content = Some(String::new());
                let token = self.leaf("html_block", &range);
                self.tokens.push(token);
            }
            Tag::Emphasis => {
                let markup = self.source_markup(&range, 1);
                self.push_span_open("em_open", markup, &range);
            }
            Tag::Strong => {
                let markup = self.source_markup(&range, 2);
                self.push_span_open("strong_open", markup, &range);
            }
            Tag::Strikethrough => {
                let tildes = source[range.start..]
                    .chars()
                    .take_while(|c| *c == '~')
                    .count()
                    .clamp(1, 2);
                self.push_span_open("s_open", "~".repeat(tildes), &range);
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => {
                let token = link_token(Token::open("link_open"), "href", link_type, &dest_url);
                let token = with_title_and_label(token, &title, link_type, &id);
                self.push_inline(token, &range);
            }
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => {
                self.ensure_inline(&range);
                let token = link_token(Token::new("image", 0), "src", link_type, &dest_url);
                let token = with_title_and_label(token, &title, link_type, &id);
                self.images.push(token);
                self.frames.push(Vec::new());
            }
            other => debug!(?other, "Ignoring unsupported Markdown container"),
        }
    }

    fn end(&mut self, tag: TagEnd, range: Range<usize>) {
        match tag {
            TagEnd::Paragraph => {
                self.close_inline();
                let token = self.close("paragraph_close");
                self.tokens.push(token);
            }
            TagEnd::Heading(_) => {
                self.close_inline();
                let markup = self
                    .tokens
                    .iter()
                    .rev()
                    .find(|token| token.kind == "heading_open")
                    .map(|token| token.markup.clone())
                    .unwrap_or_default();
                let token = self.close("heading_close").with_markup(markup);
                self.tokens.push(token);
            }
            TagEnd::BlockQuote(_) => {
                self.flush_tight_paragraph();
                let token = self.close("blockquote_close");
                self.tokens.push(token);
            }
            TagEnd::List(ordered) => {
                self.flush_tight_paragraph();
                let kind = if ordered {
                    "ordered_list_close"
                } else {
                    "bullet_list_close"
                };
                let token = self.close(kind);
                self.tokens.push(token);
            }
            TagEnd::Item => {
                self.flush_tight_paragraph();
                let token = self.close("list_item_close");
                self.tokens.push(token);
            }
            TagEnd::CodeBlock | TagEnd::HtmlBlock => {
                let content = self.block_content.take().unwrap_or_default();
                if let Some(token) = self.tokens.last_mut() {
                    token.content = content;
                }
            }
            TagEnd::Emphasis => self.push_span_close("em_close", &range),
            TagEnd::Strong => self.push_span_close("strong_close", &range),
            TagEnd::Strikethrough => self.push_span_close("s_close", &range),
            TagEnd::Link => self.push_inline(Token::close("link_close"), &range),
            TagEnd::Image => {
                let children = self.frames.pop().unwrap_or_default();
                if let Some(token) = self.images.pop() {
                    let alt = plain_text(&children);
                    let token = token
                        .with_attr("alt", alt.clone())
                        .with_content(alt)
                        .with_children(children);
                    self.push_inline(token, &range);
                }
            }
            other => debug!(?other, "Ignoring unsupported Markdown container end"),
        }
    }

    fn source_markup(&self, range: &Range<usize>, len: usize) -> String {
        self.source[range.start..].chars().take(len).collect()
    }

    fn push_span_open(&mut self, kind: &str, markup: String, range: &Range<usize>) {
        self.markup.push(markup.clone());
        self.push_inline(Token::open(kind).with_markup(markup), range);
    }

    fn push_span_close(&mut self, kind: &str, range: &Range<usize>) {
        let markup = self.markup.pop().unwrap_or_default();
        self.push_inline(Token::close(kind).with_markup(markup), range);
    }

    fn open_inline(&mut self, start: usize) {
        self.frames = vec![Vec::new()];
        self.inline_start = start;
        self.inline_end = start;
    }

    fn close_inline(&mut self) {
        if self.frames.is_empty() {
            return;
        }
        // Unclosed images cannot happen with a well-formed event stream
        while self.frames.len() > 1 {
            let children = self.frames.pop().unwrap_or_default();
            if let Some(frame) = self.frames.last_mut() {
                frame.extend(children);
            }
        }
        let children = self.frames.pop().unwrap_or_default();
        let (start, end) = self.line_map(&(self.inline_start..self.inline_end));
        let token = Token::inline(children)
            .with_content(self.source[self.inline_start..self.inline_end].to_string())
            .with_level(self.level)
            .with_map(start, end);
        self.tokens.push(token);
    }

    /// Open a hidden paragraph when inline content appears directly in a
    /// tight list item
    fn ensure_inline(&mut self, range: &Range<usize>) {
        if self.frames.is_empty() {
            let token = self.open("paragraph_open", range).hidden(true);
            self.tokens.push(token);
            self.open_inline(range.start);
            self.tight_paragraph = true;
        }
        self.inline_end = self.inline_end.max(range.end);
    }

    fn flush_tight_paragraph(&mut self) {
        if !self.tight_paragraph {
            return;
        }
        self.close_inline();
        let token = self.close("paragraph_close").hidden(true);
        self.tokens.push(token);
        self.tight_paragraph = false;
    }

    fn push_inline(&mut self, token: Token, range: &Range<usize>) {
        self.ensure_inline(range);
        if let Some(frame) = self.frames.last_mut() {
            frame.push(token);
        }
    }

    fn push_text(&mut self, text: &str, range: &Range<usize>) {
        self.ensure_inline(range);
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        // pulldown-cmark splits text around escapes and entities
        match frame.last_mut() {
            Some(last) if last.kind == "text" => last.content.push_str(text),
            _ => frame.push(Token::text(text)),
        }
    }
}

fn is_block_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading { .. }
            | Tag::BlockQuote(_)
            | Tag::CodeBlock(_)
            | Tag::HtmlBlock
            | Tag::List(_)
            | Tag::Item
    )
}

/// Set the destination attribute of a link or image
fn link_token(token: Token, url_attr: &str, link_type: LinkType, dest_url: &str) -> Token {
    match link_type {
        LinkType::Email => token
            .with_attr(url_attr, format!("mailto:{dest_url}"))
            .with_info("auto")
            .with_markup("autolink"),
        LinkType::Autolink => token
            .with_attr(url_attr, dest_url)
            .with_info("auto")
            .with_markup("autolink"),
        _ => token.with_attr(url_attr, dest_url),
    }
}

fn with_title_and_label(mut token: Token, title: &str, link_type: LinkType, id: &str) -> Token {
    if !title.is_empty() {
        token = token.with_attr("title", title);
    }
    if matches!(
        link_type,
        LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown
            | LinkType::Shortcut
            | LinkType::ShortcutUnknown
    ) {
        token = token.with_meta("label", normalize_label(id));
    }
    token
}

/// Plain text of inline tokens, as used for image `alt` attributes
fn plain_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token.kind.as_str() {
            "text" | "code_inline" | "html_inline" => out.push_str(&token.content),
            "softbreak" | "hardbreak" => out.push('\n'),
            "image" => out.push_str(&plain_text(&token.children)),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.kind.as_str()).collect()
    }

    fn parse_default(text: &str) -> ParsedDocument {
        parse(text, &ParserFeatures::default())
    }

    #[test]
    fn test_paragraph_tokens() {
        let doc = parse_default("Hello *world*\n");
        assert_eq!(
            kinds(&doc.tokens),
            ["paragraph_open", "inline", "paragraph_close"]
        );
        let inline = &doc.tokens[1];
        assert_eq!(
            kinds(&inline.children),
            ["text", "em_open", "text", "em_close"]
        );
        assert_eq!(inline.children[1].markup, "*");
        assert_eq!(doc.tokens[0].map, Some((0, 1)));
    }

    #[test]
    fn test_tight_list_gets_hidden_paragraphs() {
        let doc = parse_default("- a\n- b\n");
        assert_eq!(
            kinds(&doc.tokens),
            [
                "bullet_list_open",
                "list_item_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "list_item_close",
                "list_item_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "list_item_close",
                "bullet_list_close",
            ]
        );
        assert!(doc.tokens[2].hidden);
        assert_eq!(doc.tokens[0].markup, "-");
    }

    #[test]
    fn test_loose_list_paragraphs_are_visible() {
        let doc = parse_default("- a\n\n- b\n");
        let paragraphs: Vec<&Token> = doc
            .tokens
            .iter()
            .filter(|t| t.kind == "paragraph_open")
            .collect();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs.iter().all(|t| !t.hidden));
    }

    #[test]
    fn test_heading_markup() {
        let doc = parse_default("Top\n===\n\n### Three\n\nSub\n---\n");
        let markups: Vec<&str> = doc
            .tokens
            .iter()
            .filter(|t| t.kind == "heading_open")
            .map(|t| t.markup.as_str())
            .collect();
        assert_eq!(markups, ["=", "###", "-"]);
    }

    #[test]
    fn test_ordered_list_start() {
        let doc = parse_default("3) a\n4) b\n");
        assert_eq!(doc.tokens[0].kind, "ordered_list_open");
        assert_eq!(doc.tokens[0].attr("start"), Some("3"));
        assert_eq!(doc.tokens[0].markup, ")");
    }

    #[test]
    fn test_code_blocks() {
        let doc = parse_default("```rust title\nfn main() {}\n```\n\n    indented\n");
        assert_eq!(kinds(&doc.tokens), ["fence", "code_block"]);
        assert_eq!(doc.tokens[0].info, "rust title");
        assert_eq!(doc.tokens[0].content, "fn main() {}\n");
        assert_eq!(doc.tokens[1].content, "indented\n");
    }

    #[test]
    fn test_html_block() {
        let doc = parse_default("<div>\nhi\n</div>\n");
        assert_eq!(kinds(&doc.tokens), ["html_block"]);
        assert_eq!(doc.tokens[0].content, "<div>\nhi\n</div>\n");
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        let doc = parse_default("a \\* b &amp; c\n");
        let inline = &doc.tokens[1];
        assert_eq!(kinds(&inline.children), ["text"]);
        assert_eq!(inline.children[0].content, "a * b & c");
    }

    #[test]
    fn test_reference_links() {
        let doc = parse_default("[Foo  Bar][]\n\n[foo bar]: /url \"Title\"\n");
        let link = &doc.tokens[1].children[0];
        assert_eq!(link.kind, "link_open");
        assert_eq!(link.attr("href"), Some("/url"));
        assert_eq!(link.meta.get("label").map(String::as_str), Some("FOO BAR"));
        assert_eq!(
            doc.references.get("FOO BAR"),
            Some(&ReferenceDefinition::new("/url", Some("Title".into())))
        );
    }

    #[test]
    fn test_autolinks() {
        let doc = parse_default("<https://example.com> <me@example.com>\n");
        let children = &doc.tokens[1].children;
        assert_eq!(children[0].info, "auto");
        assert_eq!(children[0].attr("href"), Some("https://example.com"));
        let email = children
            .iter()
            .filter(|t| t.kind == "link_open")
            .nth(1)
            .unwrap();
        assert_eq!(email.attr("href"), Some("mailto:me@example.com"));
    }

    #[test]
    fn test_image_alt_and_children() {
        let doc = parse_default("![a *b*](/img.png \"t\")\n");
        let image = &doc.tokens[1].children[0];
        assert_eq!(image.kind, "image");
        assert_eq!(image.attr("src"), Some("/img.png"));
        assert_eq!(image.attr("alt"), Some("a b"));
        assert_eq!(image.attr("title"), Some("t"));
        assert_eq!(kinds(&image.children), ["text", "em_open", "text", "em_close"]);
    }

    #[test]
    fn test_strikethrough_feature() {
        let enabled = ParserFeatures {
            strikethrough: true,
        };
        let doc = parse("~~gone~~\n", &enabled);
        assert_eq!(
            kinds(&doc.tokens[1].children),
            ["s_open", "text", "s_close"]
        );
        assert_eq!(doc.tokens[1].children[0].markup, "~~");

        let doc = parse_default("~~gone~~\n");
        assert_eq!(kinds(&doc.tokens[1].children), ["text"]);
    }

    #[test]
    fn test_nul_is_replaced() {
        let doc = parse_default("a\0b\n");
        assert_eq!(doc.tokens[1].children[0].content, "a\u{fffd}b");
    }
}
