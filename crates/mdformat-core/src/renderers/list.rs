//! List renderers.
//!
//! Lists render their items, then prefix the first line of each item with
//! a marker and indent the rest by the marker width.

use crate::context::RenderContext;
use crate::tree::RenderTreeNode;

/// A list is tight when none of its items' paragraphs is visible
pub fn is_tight_list(node: RenderTreeNode<'_>) -> bool {
    node.children().all(|item| {
        item.children()
            .filter(|child| child.node_type() == "paragraph")
            .all(|paragraph| paragraph.hidden())
    })
}

/// Pick the list marker.
///
/// Consecutive sibling lists of the same kind would merge on reparse, so
/// every other one uses the secondary marker (`*` or `)`).
pub fn list_marker_type(node: RenderTreeNode<'_>) -> &'static str {
    let (primary, secondary) = if node.node_type() == "bullet_list" {
        ("-", "*")
    } else {
        (".", ")")
    };
    let node_type = node.node_type();
    let mut consecutive_lists = 1;
    let mut current = node;
    while let Some(previous) = current.previous_sibling() {
        if previous.node_type() != node_type {
            break;
        }
        consecutive_lists += 1;
        current = previous;
    }
    if consecutive_lists % 2 == 1 {
        primary
    } else {
        secondary
    }
}

fn block_separator(list: RenderTreeNode<'_>) -> &'static str {
    if is_tight_list(list) {
        "\n"
    } else {
        "\n\n"
    }
}

pub(crate) fn list_item(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let separator = node.parent().map_or("\n\n", block_separator);
    let text = ctx.render_children(node, separator);
    if text.trim().is_empty() {
        return String::new();
    }
    text
}

/// Prefix the item's first line with `marker` and indent the others
fn format_item(out: &mut String, item_text: &str, marker: &str, indent: &str) {
    let mut lines = item_text.split('\n');
    match lines.next() {
        Some(first) if !first.is_empty() => {
            out.push_str(marker);
            out.push(' ');
            out.push_str(first);
        }
        _ => out.push_str(marker),
    }
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
}

pub(crate) fn bullet_list(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let marker = list_marker_type(node);
    let indent = " ".repeat(marker.len() + 1);
    let separator = block_separator(node);

    ctx.with_indent(indent.len(), |ctx| {
        let mut text = String::new();
        for (i, item) in node.children().enumerate() {
            if i > 0 {
                text.push_str(separator);
            }
            let item_text = ctx.render(item);
            format_item(&mut text, &item_text, marker, &indent);
        }
        text
    })
}

pub(crate) fn ordered_list(node: RenderTreeNode<'_>, ctx: &mut RenderContext<'_>) -> String {
    let consecutive_numbering = ctx.options.number;
    let marker_type = list_marker_type(node);
    let separator = block_separator(node);
    let list_len = node.children().len() as u64;
    let starting_number: u64 = node
        .attr("start")
        .and_then(|start| start.parse().ok())
        .unwrap_or(1);

    let widest_number = if consecutive_numbering {
        (starting_number + list_len.saturating_sub(1)).to_string()
    } else {
        starting_number.to_string()
    };
    let indent = " ".repeat(widest_number.len() + marker_type.len() + 1);

    ctx.with_indent(indent.len(), |ctx| {
        let mut text = String::new();
        for (i, item) in node.children().enumerate() {
            if i > 0 {
                text.push_str(separator);
            }
            let marker = if consecutive_numbering {
                // 002. first
                // 003. second
                // 112. last
                let number = starting_number + i as u64;
                format!("{number:0>width$}{marker_type}", width = widest_number.len())
            } else if i == 0 {
                format!("{starting_number}{marker_type}")
            } else {
                // 5321. first
                // 0001. second
                format!("{:0>width$}{marker_type}", 1, width = widest_number.len())
            };
            let item_text = ctx.render(item);
            format_item(&mut text, &item_text, &marker, &indent);
        }
        text
    })
}
