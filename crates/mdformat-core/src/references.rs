//! Reference definition epilogue
//!
//! Reference-style links only record their label while rendering. The
//! definitions of every used label are written once, at the end of the
//! document.

use tracing::warn;

use crate::context::Env;
use crate::escape::{escape_link_destination, escape_link_title};

/// A link reference definition of the source document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceDefinition {
    pub href: String,
    pub title: Option<String>,
}

impl ReferenceDefinition {
    pub fn new(href: impl Into<String>, title: Option<String>) -> Self {
        Self {
            href: href.into(),
            title,
        }
    }
}

/// Sort key that orders numeric labels by value ("2" before "10")
fn label_sort_key(label: &str) -> String {
    if !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit()) {
        format!("{label:0>20}")
    } else {
        label.to_string()
    }
}

/// Write the definitions of all used reference labels, one per line
pub fn write_references(env: &Env) -> String {
    let mut labels: Vec<&String> = env.used_refs.iter().collect();
    labels.sort_by_cached_key(|label| label_sort_key(label));

    let mut lines = Vec::with_capacity(labels.len());
    for label in labels {
        let Some(definition) = env.references.get(label) else {
            warn!("Reference label \"{label}\" is used but not defined, skipping its definition");
            continue;
        };
        let mut line = format!(
            "[{}]: {}",
            label.to_lowercase(),
            escape_link_destination(&definition.href)
        );
        if let Some(title) = definition.title.as_deref().filter(|t| !t.is_empty()) {
            line.push_str(&format!(" \"{}\"", escape_link_title(title)));
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(defs: &[(&str, &str, Option<&str>)], used: &[&str]) -> Env {
        let mut env = Env::default();
        for (label, href, title) in defs {
            env.references.insert(
                label.to_string(),
                ReferenceDefinition::new(*href, title.map(str::to_string)),
            );
        }
        for label in used {
            env.used_refs.insert(label.to_string());
        }
        env
    }

    #[test]
    fn test_numeric_labels_sort_by_value() {
        let env = env(&[("10", "/ten", None), ("2", "/two", None)], &["10", "2"]);
        assert_eq!(write_references(&env), "[2]: /two\n[10]: /ten");
    }

    #[test]
    fn test_labels_are_lowercased_and_titles_escaped() {
        let env = env(&[("FOO", "/url", Some("say \"hi\""))], &["FOO"]);
        assert_eq!(write_references(&env), "[foo]: /url \"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_empty_destination() {
        let env = env(&[("X", "", None)], &["X"]);
        assert_eq!(write_references(&env), "[x]: <>");
    }

    #[test]
    fn test_missing_definition_is_skipped() {
        let env = env(&[("A", "/a", None)], &["A", "GONE"]);
        assert_eq!(write_references(&env), "[a]: /a");
    }

    #[test]
    fn test_only_used_labels_are_written() {
        let env = env(&[("A", "/a", None), ("B", "/b", None)], &["B"]);
        assert_eq!(write_references(&env), "[b]: /b");
    }
}
