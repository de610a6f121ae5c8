//! HTML equivalence check
//!
//! Formatting must not change what a document means. Both documents are
//! rendered to HTML with pulldown-cmark and compared after whitespace
//! normalization.

use mdformat_core::{Options, ParserFeatures};
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Parser};
use regex::Regex;

use crate::parser::parser_options;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static RE_HTML_START_SPACE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" (<[a-zA-Z][-a-zA-Z0-9]*>)").expect("valid regex"));
static RE_HTML_END_SPACE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(</[a-zA-Z][-a-zA-Z0-9]*>) ").expect("valid regex"));

/// Parser features enabled by the extensions of `options`
pub fn parser_features(options: &Options) -> ParserFeatures {
    let mut features = ParserFeatures::default();
    for extension in &options.extensions {
        extension.update_parser(&mut features);
    }
    features
}

/// Render Markdown to normalized HTML
fn normalized_html(md: &str, features: &ParserFeatures, code_langs: Option<&Regex>) -> String {
    let mut html = String::with_capacity(md.len() * 2);
    html::push_html(&mut html, Parser::new_ext(md, parser_options(features)));

    // Code formatters change code blocks on purpose
    if let Some(code_langs) = code_langs {
        html = code_langs.replace_all(&html, "").into_owned();
    }

    let html = RE_WHITESPACE.replace_all(&html, " ");
    let html = html.replace("<p> ", "<p>").replace(" </p>", "</p>");

    // Drop spaces around tags so empty paragraphs can be removed cleanly
    let html = RE_HTML_END_SPACE_SUFFIX.replace_all(&html, "$1");
    let html = RE_HTML_START_SPACE_PREFIX.replace_all(&html, "$1");

    html.replace("<p></p>", "").trim().to_string()
}

fn code_block_pattern(options: &Options) -> Option<Regex> {
    if options.codeformatters.is_empty() {
        return None;
    }
    let langs = options
        .codeformatters
        .keys()
        .map(|lang| regex::escape(lang))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r#"(?s)<code class="language-(?:{langs})">.*?</code>"#)).ok()
}

/// Check whether two Markdown documents render to the same HTML
pub fn is_md_equal(md1: &str, md2: &str, options: &Options) -> bool {
    let features = parser_features(options);
    let code_langs = code_block_pattern(options);
    normalized_html(md1, &features, code_langs.as_ref())
        == normalized_html(md2, &features, code_langs.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdformat_core::CodeFormatError;

    #[test]
    fn test_whitespace_is_insignificant() {
        let options = Options::default();
        assert!(is_md_equal("a\nb\n", "a b", &options));
        assert!(is_md_equal("# Title\n", "Title\n=====\n", &options));
        assert!(is_md_equal("", "\n\n", &options));
    }

    #[test]
    fn test_meaning_changes_are_detected() {
        let options = Options::default();
        assert!(!is_md_equal("a*b*", "a\\*b\\*", &options));
        assert!(!is_md_equal("- a\n- b\n", "- a\n\n- b\n", &options));
    }

    #[test]
    fn test_formatted_code_is_ignored() {
        let options = Options::default().with_codeformatter(
            "python",
            |code: &str, _: &str| -> Result<String, CodeFormatError> { Ok(code.to_string()) },
        );
        let before = "```python\nx=1\n```\n";
        let after = "```python\nx = 1\n```\n";
        assert!(is_md_equal(before, after, &options));
        assert!(!is_md_equal(before, after, &Options::default()));
    }
}
