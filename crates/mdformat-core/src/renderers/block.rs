//! Block-level renderers: paragraphs, headings, quotes, code and breaks.

use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::codepoints::is_unicode_whitespace;
use crate::context::RenderContext;
use crate::escape::{decimalify_leading, decimalify_trailing, longest_consecutive_sequence};
use crate::options::WrapMode;
use crate::tree::RenderTreeNode;

use super::html::{is_open_close_tag_line, starts_interrupting_html_block};
use super::wrap::{wrap, WrapWidth};

const THEMATIC_BREAK_WIDTH: usize = 70;

static RE_ATX_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}(?: |\t|$)").expect("valid regex"));
static RE_BULLET_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*+](?: |\t|$)").expect("valid regex"));
static RE_ORDERED_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\)(?: |\t|$)").expect("valid regex"));
static RE_ORDERED_DOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.(?: |\t|$)").expect("valid regex"));

pub(crate) fn root(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    ctx.render_children(node, "\n\n")
}

pub(crate) fn hr(_node: RenderTreeNode<'_>, _ctx: &mut RenderContext<'_>) -> String {
    "_".repeat(THEMATIC_BREAK_WIDTH)
}

pub(crate) fn html_block(node: RenderTreeNode<'_>, _ctx: &mut RenderContext<'_>) -> String {
    // Leading indentation is stripped from Markdown too; keep both aligned
    node.content()
        .trim_end_matches('\n')
        .trim_start_matches([' ', '\t', '\n'])
        .to_string()
}

pub(crate) fn heading(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let text = ctx.render_children(node, "");

    let prefix = match node.markup() {
        "=" | "" => "# ".to_string(),
        "-" => "## ".to_string(),
        atx => format!("{atx} "),
    };

    // Setext headings may span lines, ATX ones cannot
    let mut text = text.replace('\n', " ");
    text.truncate(text.trim_end_matches([' ', '\t']).len());

    // A trailing hash would read as a closing sequence
    if text.ends_with('#') {
        text.pop();
        text.push_str("\\#");
    }
    let text = decimalify_leading(is_unicode_whitespace, &text);
    let text = decimalify_trailing(is_unicode_whitespace, &text);

    format!("{prefix}{text}").trim_end().to_string()
}

pub(crate) fn blockquote(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    const MARKER: &str = "> ";
    ctx.with_indent(MARKER.len(), |ctx| {
        let text = ctx.render_children(node, "\n\n");
        if text.is_empty() {
            return ">".to_string();
        }
        text.split('\n')
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("{MARKER}{line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

pub(crate) fn fence(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let info = node.info().trim();
    let lang = info.split_whitespace().next().unwrap_or("");
    let mut code = node.content().to_string();

    // Backtick fence info strings can not contain backticks or tildes
    let fence_char = if info.contains(['`', '~']) { '~' } else { '`' };

    if let Some(formatter) = ctx.options.codeformatters.get(lang).filter(|_| !lang.is_empty()) {
        // The panic hook still runs before the unwind is caught
        let result = panic::catch_unwind(AssertUnwindSafe(|| formatter.format(&code, info)));
        match result {
            Ok(Ok(formatted)) => {
                code = formatted;
                if !code.is_empty() && !code.ends_with('\n') {
                    code.push('\n');
                }
            }
            Ok(Err(err)) => warn_formatter_failure(node, ctx, lang, &err.to_string()),
            Err(_) => warn_formatter_failure(node, ctx, lang, "formatter panicked"),
        }
    }

    let fence_len = (longest_consecutive_sequence(&code, fence_char) + 1).max(3);
    let fence = fence_char.to_string().repeat(fence_len);
    format!("{fence}{info}\n{code}{fence}")
}

fn warn_formatter_failure(
    node: RenderTreeNode<'_>,
    ctx: &RenderContext<'_>,
    lang: &str,
    reason: &str,
) {
    let line = node.map().map_or(0, |(start, _)| start + 1);
    match ctx.options.filename.as_deref() {
        Some(filename) => warn!(
            "Failed formatting content of a {lang} code block (line {line} before formatting). Filename: {filename}: {reason}"
        ),
        None => warn!(
            "Failed formatting content of a {lang} code block (line {line} before formatting): {reason}"
        ),
    }
}

pub(crate) fn code_block(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    fence(node, ctx)
}

pub(crate) fn paragraph(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let text = match node.child(0) {
        Some(inline) => ctx.render(inline),
        None => String::new(),
    };

    let text = match ctx.options.wrap {
        WrapMode::Keep => text,
        WrapMode::NoWrap => wrap(&text, WrapWidth::NoWrap),
        WrapMode::Width(width) => {
            let columns = width.saturating_sub(ctx.env.indent_width).max(1);
            wrap(&text, WrapWidth::Columns(columns))
        }
    };

    // Whitespace at the paragraph edges only survives as a character reference
    let text = decimalify_leading(is_unicode_whitespace, &text);
    let text = decimalify_trailing(is_unicode_whitespace, &text);

    let mut lines: Vec<String> = text.split('\n').map(escape_paragraph_line).collect();

    // A lone tag on the first line would become an HTML block
    if lines.len() > 1 && is_open_close_tag_line(&lines[0]) {
        let second = lines.remove(1);
        lines[0] = format!("{} {second}", lines[0]);
    }
    for line in lines.iter_mut().skip(1) {
        if starts_interrupting_html_block(line) {
            line.insert_str(0, "    ");
        }
    }

    lines.join("\n")
}

fn escape_first(line: &str, target: char) -> String {
    line.replacen(target, &format!("\\{target}"), 1)
}

/// Escape a paragraph line that would otherwise parse as another block.
fn escape_paragraph_line(line: &str) -> String {
    // Leading tabs or spaces could start a code block
    let mut line = line.trim_matches([' ', '\t']).to_string();

    if RE_ATX_HEADING.is_match(&line) || line.starts_with('>') {
        line.insert(0, '\\');
    }
    if RE_BULLET_MARKER.is_match(&line) {
        line.insert(0, '\\');
    }
    if RE_ORDERED_PAREN.is_match(&line) {
        line = escape_first(&line, ')');
    }
    if RE_ORDERED_DOT.is_match(&line) {
        line = escape_first(&line, '.');
    }

    // Thematic break
    let space_removed: String = line.chars().filter(|c| *c != ' ' && *c != '\t').collect();
    if space_removed.chars().count() >= 3 {
        for marker in ['*', '-', '_'] {
            if space_removed.chars().all(|c| c == marker) {
                line = escape_first(&line, marker);
                break;
            }
        }
    }

    // Setext heading underline
    if !line.is_empty() {
        if line.chars().all(|c| c == '-') {
            line = escape_first(&line, '-');
        } else if line.chars().all(|c| c == '=') {
            line = escape_first(&line, '=');
        }
    }

    // Tilde code fence
    if line.starts_with("~~~") {
        line.insert(0, '\\');
    }

    line
}
