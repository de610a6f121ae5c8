//! Inline renderers: text, code spans, breaks, emphasis, links and images.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::{renderer, RenderContext, Renderers};
use crate::escape::{
    escape_link_destination, escape_link_title, escape_spaced_emphasis, escape_text,
    longest_consecutive_sequence, normalize_label,
};
use crate::options::WrapMode;
use crate::tree::RenderTreeNode;

use super::wrap::WRAP_POINT;

static RE_WRAPPABLE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[ \t\n]+").expect("valid regex"));

/// Renderers used for image descriptions, which drop emphasis markup
static ALT_RENDERERS: Lazy<Renderers> = Lazy::new(|| {
    let mut renderers = Renderers::new();
    renderers.insert("text".into(), renderer(alt_text));
    renderers.insert("image".into(), renderer(image_alt));
    renderers.insert("link".into(), renderer(link));
    renderers.insert("softbreak".into(), renderer(|_node, _ctx| "\n".to_string()));
    renderers.insert("hardbreak".into(), renderer(hardbreak));
    renderers.insert("code_inline".into(), renderer(code_inline));
    renderers.insert("html_inline".into(), renderer(html_inline));
    renderers
});

pub(crate) fn inline(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    ctx.render_children(node, "")
}

fn is_text_inside_autolink(node: RenderTreeNode<'_>) -> bool {
    node.parent()
        .is_some_and(|parent| parent.node_type() == "link" && parent.info() == "auto")
}

fn escaped_content(node: RenderTreeNode<'_>, ctx: &RenderContext<'_>) -> String {
    // NUL is reserved for wrap points
    let content = node.content().replace(WRAP_POINT, "\u{fffd}");
    let next_is_link = node.next_sibling().is_some_and(|n| n.node_type() == "link");
    let references = &ctx.env.references;
    let mut text = escape_text(
        &content,
        |label| references.contains_key(&normalize_label(label)),
        next_is_link.then_some('['),
    );

    // "!" right before a link would turn it into an image
    if next_is_link && text.ends_with('!') {
        text.pop();
        text.push_str("\\!");
    }
    text
}

pub(crate) fn text(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    if is_text_inside_autolink(node) {
        return node.content().to_string();
    }
    let text = escaped_content(node, ctx);

    if ctx.do_wrap() && node.is_inside("paragraph") {
        // Any space may become a line edge
        let text = match ctx.options.wrap {
            WrapMode::Width(_) => escape_spaced_emphasis(&text),
            _ => text,
        };
        return RE_WRAPPABLE_WHITESPACE
            .replace_all(&text, WRAP_POINT.to_string())
            .into_owned();
    }
    text
}

fn alt_text(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    escaped_content(node, ctx)
}

pub(crate) fn code_inline(node: RenderTreeNode<'_>, _ctx: &mut RenderContext<'_>) -> String {
    let code = node.content();
    let longest_backtick_seq = longest_consecutive_sequence(code, '`');
    if longest_backtick_seq > 0 {
        let separator = "`".repeat(longest_backtick_seq + 1);
        return format!("{separator} {code} {separator}");
    }
    let all_whitespace = code.trim().is_empty();
    if code.starts_with(' ') && code.ends_with(' ') && !all_whitespace {
        return format!("` {code} `");
    }
    format!("`{code}`")
}

pub(crate) fn html_inline(node: RenderTreeNode<'_>, _ctx: &mut RenderContext<'_>) -> String {
    node.content().to_string()
}

pub(crate) fn hardbreak(node: RenderTreeNode<'_>, _ctx: &mut RenderContext<'_>) -> String {
    if node.is_inside("heading") {
        return "<br /> ".to_string();
    }
    "\\\n".to_string()
}

pub(crate) fn softbreak(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    if ctx.do_wrap() && node.is_inside("paragraph") {
        return WRAP_POINT.to_string();
    }
    "\n".to_string()
}

pub(crate) fn em(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    wrap_with_markup(node, ctx, "*")
}

pub(crate) fn strong(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    wrap_with_markup(node, ctx, "**")
}

/// Render children between two copies of the node's source marker
pub fn wrap_with_markup(
    node: RenderTreeNode<'_>,
    ctx: &mut RenderContext<'_>,
    default_markup: &str,
) -> String {
    let text = ctx.render_children(node, "");
    let markup = match node.markup() {
        "" => default_markup,
        markup => markup,
    };
    format!("{markup}{text}{markup}")
}

/// Emit `[text]` or `[text][label]` and record the label as used.
fn reference_link(
    prefix: &str,
    text: &str,
    label: &str,
    node: RenderTreeNode<'_>,
    ctx: &mut RenderContext<'_>,
) -> String {
    ctx.env.used_refs.insert(label.to_string());
    let label_repr = label.to_lowercase();

    // A shortcut reference followed by "(", "[" or ":" would parse differently
    let shortcut_is_safe = !node.next_sibling().is_some_and(|next| {
        next.node_type() == "text" && next.content().starts_with(['(', '[', ':'])
    });
    if shortcut_is_safe && text.to_lowercase() == label_repr {
        format!("{prefix}[{text}]")
    } else {
        format!("{prefix}[{text}][{label_repr}]")
    }
}

fn defined_label<'t>(node: RenderTreeNode<'t>, ctx: &RenderContext<'_>) -> Option<&'t str> {
    node.meta("label")
        .filter(|label| ctx.env.references.contains_key(*label))
}

fn inline_link(prefix: &str, text: &str, dest: &str, title: Option<&str>) -> String {
    let dest = escape_link_destination(dest);
    match title {
        Some(title) => format!("{prefix}[{text}]({dest} \"{}\")", escape_link_title(title)),
        None => format!("{prefix}[{text}]({dest})"),
    }
}

pub(crate) fn link(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    if node.info() == "auto" {
        let href = node.attr("href").unwrap_or("");
        // The parser may add "mailto:" to email autolinks
        let source_has_scheme = node
            .child(0)
            .is_some_and(|child| child.content().starts_with("mailto:"));
        let href = match href.strip_prefix("mailto:") {
            Some(address) if !source_has_scheme => address,
            _ => href,
        };
        return format!("<{href}>");
    }

    let mut text = ctx.render_children(node, "");
    if ctx.do_wrap() {
        // Link text must not be broken over lines
        text = text.replace(WRAP_POINT, " ");
    }

    if let Some(label) = defined_label(node, ctx) {
        return reference_link("", &text, label, node, ctx);
    }
    inline_link(
        "",
        &text,
        node.attr("href").unwrap_or(""),
        node.attr("title"),
    )
}

fn image_alt(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let mut alt_ctx = ctx.with_renderers(&ALT_RENDERERS);
    alt_ctx.render_children(node, "")
}

pub(crate) fn image(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let mut description = image_alt(node, ctx);
    if ctx.do_wrap() {
        description = description.replace(WRAP_POINT, " ");
    }

    if let Some(label) = defined_label(node, ctx) {
        return reference_link("!", &description, label, node, ctx);
    }
    inline_link(
        "!",
        &description,
        node.attr("src").unwrap_or(""),
        node.attr("title"),
    )
}
