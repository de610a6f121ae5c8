//! HTML block start conditions.
//!
//! A paragraph line that matches one of these would start a raw HTML block
//! when reparsed, so the paragraph renderer has to defuse it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tag names of HTML block start condition 6
pub const BLOCK_NAMES: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body",
    "caption", "center", "col", "colgroup", "dd", "details", "dialog", "dir",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form",
    "frame", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header",
    "hr", "html", "iframe", "legend", "li", "link", "main", "menu", "menuitem",
    "nav", "noframes", "ol", "optgroup", "option", "p", "param", "search",
    "section", "source", "summary", "table", "tbody", "td", "tfoot", "th",
    "thead", "title", "tr", "track", "ul",
];

const ATTR_NAME: &str = "[a-zA-Z_:][a-zA-Z0-9:._-]*";
const UNQUOTED: &str = r#"[^"'=<>`\x00-\x20]+"#;
const SINGLE_QUOTED: &str = "'[^']*'";
const DOUBLE_QUOTED: &str = r#""[^"]*""#;

/// Conditions 1 to 6, which may interrupt a paragraph
static INTERRUPTING: Lazy<Vec<Regex>> = Lazy::new(|| {
    let block_names = BLOCK_NAMES.join("|");
    [
        r"(?i)^<(?:script|pre|style|textarea)(?:\s|>|$)".to_string(),
        "^<!--".to_string(),
        r"^<\?".to_string(),
        "^<![A-Za-z]".to_string(),
        r"^<!\[CDATA\[".to_string(),
        format!(r"(?i)^</?(?:{block_names})(?:\s|/?>|$)"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Condition 7: a complete open or close tag alone on the line
static OPEN_CLOSE_TAG: Lazy<Regex> = Lazy::new(|| {
    let attr_value = format!("(?:{UNQUOTED}|{SINGLE_QUOTED}|{DOUBLE_QUOTED})");
    let attribute = format!(r"(?:\s+{ATTR_NAME}(?:\s*=\s*{attr_value})?)");
    let open_tag = format!(r"<[A-Za-z][A-Za-z0-9\-]*{attribute}*\s*/?>");
    let close_tag = r"</[A-Za-z][A-Za-z0-9\-]*\s*>";
    Regex::new(&format!(r"^(?:{open_tag}|{close_tag})\s*$")).expect("valid regex")
});

/// Whether the line starts an HTML block that can interrupt a paragraph
pub fn starts_interrupting_html_block(line: &str) -> bool {
    INTERRUPTING.iter().any(|re| re.is_match(line))
}

/// Whether the line is an HTML block of condition 7
pub fn is_open_close_tag_line(line: &str) -> bool {
    OPEN_CLOSE_TAG.is_match(line)
}
