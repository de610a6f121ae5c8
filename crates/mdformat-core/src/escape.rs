//! Escaping and text utilities used by the renderers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codepoints::{is_ascii_control, is_unicode_punctuation, is_unicode_whitespace};

/// Numeric, hex and named character references.
///
/// The named form matches any entity-shaped word, which escapes a few
/// ampersands that would not have needed it.
static RE_CHAR_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#[0-9]{1,7}|#[Xx][0-9A-Fa-f]{1,6}|[A-Za-z][A-Za-z0-9]{0,31});")
        .expect("valid regex")
});

static RE_LESS_THAN_NO_FOLLOWING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new("<(?:[^ ]|$)").expect("valid regex"));

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new("[ \t]+").expect("valid regex"));

/// Length of the longest run of `ch` in `text`
pub fn longest_consecutive_sequence(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn escape_chars_where(
    text: &str,
    target: char,
    keep: impl Fn(Option<char>, Option<char>) -> bool,
) -> String {
    if !text.contains(target) {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == target {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            if !keep(prev, next) {
                out.push('\\');
            }
        }
        out.push(c);
    }
    out
}

/// Escape `*` unless both neighbours are Unicode whitespace
pub fn escape_asterisk_emphasis(text: &str) -> String {
    escape_chars_where(text, '*', |prev, next| {
        prev.is_some_and(is_unicode_whitespace) && next.is_some_and(is_unicode_whitespace)
    })
}

/// Escape `_` unless both neighbours are Unicode whitespace, or neither
/// neighbour is whitespace, punctuation or a text boundary.
pub fn escape_underscore_emphasis(text: &str) -> String {
    let is_safe_word_char =
        |c: Option<char>| c.is_some_and(|c| !is_unicode_whitespace(c) && !is_unicode_punctuation(c));
    escape_chars_where(text, '_', |prev, next| {
        (prev.is_some_and(is_unicode_whitespace) && next.is_some_and(is_unicode_whitespace))
            || (is_safe_word_char(prev) && is_safe_word_char(next))
    })
}

/// Escape `*` and `_` that sit between two whitespace characters.
///
/// Such markers are left bare by the emphasis escapes, but once word wrap
/// turns one of the spaces into a line edge they would be escaped on the
/// next pass. Wrapped paragraphs escape them up front.
pub fn escape_spaced_emphasis(text: &str) -> String {
    let spaced = |prev: Option<char>, next: Option<char>| {
        prev.is_some_and(is_unicode_whitespace) && next.is_some_and(is_unicode_whitespace)
    };
    let text = escape_chars_where(text, '*', |prev, next| !spaced(prev, next));
    escape_chars_where(&text, '_', |prev, next| !spaced(prev, next))
}

/// Escape square brackets that could form a link label after reformatting.
///
/// A closed `[...]` pair with no brackets inside is left alone, unless its
/// text is a defined reference label (`is_reference`) or it is followed by
/// `(`, `:` or `[`. `followed_by` is the character rendered right after the
/// text, if known. Every other bracket is escaped.
pub fn escape_square_brackets(
    text: &str,
    is_reference: impl Fn(&str) -> bool,
    followed_by: Option<char>,
) -> String {
    if !text.contains(['[', ']']) {
        return text.to_string();
    }

    let mut escape_at: Vec<usize> = Vec::new();
    let mut enclosure_start: Option<usize> = None;
    for (pos, c) in text.char_indices() {
        match c {
            '[' => {
                if let Some(start) = enclosure_start {
                    escape_at.push(start);
                }
                enclosure_start = Some(pos);
            }
            ']' => match enclosure_start.take() {
                None => escape_at.push(pos),
                Some(start) => {
                    let enclosed = &text[start + 1..pos];
                    let next = text[pos + 1..].chars().next().or(followed_by);
                    if is_reference(enclosed) || matches!(next, Some('(' | ':' | '[')) {
                        escape_at.push(start);
                        escape_at.push(pos);
                    }
                }
            },
            _ => {}
        }
    }
    if let Some(start) = enclosure_start {
        escape_at.push(start);
    }
    if escape_at.is_empty() {
        return text.to_string();
    }

    escape_at.sort_unstable();
    let mut out = String::with_capacity(text.len() + escape_at.len());
    let mut prev = 0;
    for pos in escape_at {
        out.push_str(&text[prev..pos]);
        out.push('\\');
        prev = pos;
    }
    out.push_str(&text[prev..]);
    out
}

/// Escape `<` unless followed by a space
pub fn escape_less_than_sign(text: &str) -> String {
    RE_LESS_THAN_NO_FOLLOWING_SPACE
        .replace_all(text, r"\$0")
        .into_owned()
}

/// Backslash-escape `&` where it would start a character reference.
///
/// Named references are not looked up in the HTML5 entity list: any
/// `&name;` shaped text is escaped, including names that are not entities.
pub fn escape_char_references(text: &str) -> String {
    RE_CHAR_REFERENCE.replace_all(text, r"\$0").into_owned()
}

/// Collapse runs of spaces and tabs into one space
pub fn collapse_spaces(text: &str) -> String {
    RE_SPACES.replace_all(text, " ").into_owned()
}

/// Escape the content of a `text` node.
///
/// Applies, in order: space collapsing, backslash doubling, emphasis marker
/// escapes, square bracket escapes, `<` and backtick escapes, character
/// reference escapes, and encoding of blank lines as `&#10;&#10;`.
pub fn escape_text(
    text: &str,
    is_reference: impl Fn(&str) -> bool,
    followed_by: Option<char>,
) -> String {
    let text = collapse_spaces(text);
    // Backslashes first, later escapes add their own
    let text = text.replace('\\', "\\\\");
    let text = escape_asterisk_emphasis(&text);
    let text = escape_underscore_emphasis(&text);
    let text = escape_square_brackets(&text, is_reference, followed_by);
    let text = escape_less_than_sign(&text);
    let text = text.replace('`', "\\`");
    let text = escape_char_references(&text);
    text.replace("\n\n", "&#10;&#10;")
}

/// Surround a link destination with `<>` when it would not parse bare
pub fn maybe_add_link_brackets(link: &str) -> String {
    let needs_brackets = link.is_empty()
        || link.starts_with('<')
        || link
            .chars()
            .any(|c| is_ascii_control(c) || c == ' ' || c == '(' || c == ')');
    if needs_brackets {
        let inner = link.replace('<', "\\<").replace('>', "\\>");
        format!("<{inner}>")
    } else {
        link.to_string()
    }
}

/// Escape a parsed link destination for output
pub fn escape_link_destination(href: &str) -> String {
    let escaped = escape_char_references(&href.replace('\\', "\\\\"));
    maybe_add_link_brackets(&escaped)
}

/// Escape a parsed link title for output inside double quotes
pub fn escape_link_title(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    escape_char_references(&escaped)
}

/// Replace the first character with its decimal reference if `pred` holds
pub fn decimalify_leading(pred: impl Fn(char) -> bool, text: &str) -> String {
    match text.chars().next() {
        Some(first) if pred(first) => {
            format!("&#{};{}", first as u32, &text[first.len_utf8()..])
        }
        _ => text.to_string(),
    }
}

/// Replace the last character with its decimal reference if `pred` holds
pub fn decimalify_trailing(pred: impl Fn(char) -> bool, text: &str) -> String {
    match text.chars().next_back() {
        Some(last) if pred(last) => {
            format!("{}&#{};", &text[..text.len() - last.len_utf8()], last as u32)
        }
        _ => text.to_string(),
    }
}

/// Normalize a link label for matching: collapse whitespace, trim, case fold
pub fn normalize_label(label: &str) -> String {
    label
        .split(is_unicode_whitespace)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .to_uppercase()
}
