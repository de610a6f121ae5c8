//! Render entrypoint
//!
//! Builds the render tree, merges plugin renderers over the defaults,
//! renders the document and writes the reference epilogue.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::{Env, Postprocessors, RenderContext, Renderers};
use crate::options::Options;
use crate::plugin::ParserExtension;
use crate::references::write_references;
use crate::renderers::default_renderers;
use crate::token::Token;
use crate::tree::RenderTree;
use crate::Result;

/// Render a token stream to Markdown
///
/// The returned text ends in a single newline unless it is empty, and is
/// followed by the definitions of all reference labels it uses.
///
/// # Errors
///
/// Returns an error when the tokens do not nest properly.
pub fn render(tokens: Vec<Token>, options: &Options, env: &mut Env) -> Result<String> {
    let tree = RenderTree::new(tokens)?;
    Ok(render_tree(&tree, options, env, true))
}

/// Render an already built tree.
///
/// Without `finalize` the reference epilogue and the trailing newline are
/// left out.
pub fn render_tree(tree: &RenderTree, options: &Options, env: &mut Env, finalize: bool) -> String {
    env.indent_width = 0;
    env.used_refs.clear();

    let (renderers, postprocessors) = renderer_tables(&options.extensions);
    debug!(
        nodes = tree.len(),
        renderers = renderers.len(),
        "Rendering document"
    );

    let mut ctx = RenderContext::new(&renderers, &postprocessors, options, env);
    let mut text = ctx.render(tree.root());

    if finalize {
        let references = write_references(env);
        if !references.is_empty() {
            text.push_str("\n\n");
            text.push_str(&references);
        }
        if !text.is_empty() {
            text.push('\n');
        }
    }
    text
}

/// Merge the renderers and postprocessors of the given extensions over the
/// defaults.
///
/// When two extensions render the same syntax the first one registered
/// wins. Postprocessors of all extensions run, in registration order.
pub fn renderer_tables(extensions: &[Arc<dyn ParserExtension>]) -> (Renderers, Postprocessors) {
    let mut renderers = Renderers::new();
    let mut postprocessors = Postprocessors::new();

    for extension in extensions {
        for (syntax, render) in extension.renderers() {
            if renderers.contains_key(&syntax) {
                warn!(
                    "Plugin conflict. More than one plugin defined a renderer for \"{syntax}\" syntax."
                );
                continue;
            }
            renderers.insert(syntax, render);
        }
        for (syntax, postprocess) in extension.postprocessors() {
            postprocessors.entry(syntax).or_default().push(postprocess);
        }
    }

    for (syntax, render) in default_renderers() {
        renderers
            .entry(syntax.clone())
            .or_insert_with(|| render.clone());
    }
    (renderers, postprocessors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{postprocessor, renderer, Postprocess, Render};
    use crate::options::WrapMode;
    use crate::plugin::CodeFormatError;
    use crate::references::ReferenceDefinition;
    use crate::RenderError;

    fn paragraph(children: Vec<Token>) -> Vec<Token> {
        vec![
            Token::open("paragraph_open"),
            Token::inline(children),
            Token::close("paragraph_close"),
        ]
    }

    fn tight_item(text: &str) -> Vec<Token> {
        vec![
            Token::open("list_item_open"),
            Token::open("paragraph_open").hidden(true),
            Token::inline(vec![Token::text(text)]),
            Token::close("paragraph_close").hidden(true),
            Token::close("list_item_close"),
        ]
    }

    fn render_default(tokens: Vec<Token>) -> String {
        render(tokens, &Options::default(), &mut Env::default()).unwrap()
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(render_default(Vec::new()), "");
    }

    #[test]
    fn test_paragraph_gets_trailing_newline() {
        assert_eq!(render_default(paragraph(vec![Token::text("Hello")])), "Hello\n");
    }

    #[test]
    fn test_setext_headings_become_atx() {
        let tokens = vec![
            Token::open("heading_open").with_markup("="),
            Token::inline(vec![Token::text("Top")]),
            Token::close("heading_close").with_markup("="),
            Token::open("heading_open").with_markup("-"),
            Token::inline(vec![Token::text("2nd")]),
            Token::close("heading_close").with_markup("-"),
        ];
        assert_eq!(render_default(tokens), "# Top\n\n## 2nd\n");
    }

    #[test]
    fn test_tight_and_loose_lists() {
        let mut tight = vec![Token::open("bullet_list_open").with_markup("-")];
        tight.extend(tight_item("item1"));
        tight.extend(tight_item("item2"));
        tight.push(Token::close("bullet_list_close"));
        assert_eq!(render_default(tight), "- item1\n- item2\n");

        let mut loose = vec![Token::open("bullet_list_open").with_markup("-")];
        for text in ["item1", "item2"] {
            loose.push(Token::open("list_item_open"));
            loose.extend(paragraph(vec![Token::text(text)]));
            loose.push(Token::close("list_item_close"));
        }
        loose.push(Token::close("bullet_list_close"));
        assert_eq!(render_default(loose), "- item1\n\n- item2\n");
    }

    #[test]
    fn test_consecutive_numbering() {
        let mut tokens = vec![Token::open("ordered_list_open").with_attr("start", "0")];
        for text in ["a", "b", "c"] {
            tokens.extend(tight_item(text));
        }
        tokens.push(Token::close("ordered_list_close"));

        let numbered = Options::default().with_number(true);
        let text = render(tokens.clone(), &numbered, &mut Env::default()).unwrap();
        assert_eq!(text, "0. a\n1. b\n2. c\n");

        assert_eq!(render_default(tokens), "0. a\n1. b\n1. c\n");
    }

    #[test]
    fn test_numbering_pads_to_widest_number() {
        let mut tokens = vec![Token::open("ordered_list_open").with_attr("start", "9")];
        tokens.extend(tight_item("a"));
        tokens.extend(tight_item("b"));
        tokens.push(Token::close("ordered_list_close"));

        let numbered = Options::default().with_number(true);
        let text = render(tokens, &numbered, &mut Env::default()).unwrap();
        assert_eq!(text, "09. a\n10. b\n");
    }

    #[test]
    fn test_consecutive_lists_alternate_markers() {
        let mut tokens = Vec::new();
        for text in ["a", "b"] {
            tokens.push(Token::open("bullet_list_open"));
            tokens.extend(tight_item(text));
            tokens.push(Token::close("bullet_list_close"));
        }
        assert_eq!(render_default(tokens), "- a\n\n* b\n");
    }

    #[test]
    fn test_reference_links_write_epilogue() {
        let link = |label: &str, text: &str| {
            vec![
                Token::open("link_open")
                    .with_attr("href", format!("/{label}"))
                    .with_meta("label", label),
                Token::text(text),
                Token::close("link_close"),
            ]
        };
        let mut inline = link("10", "ten");
        inline.push(Token::text(" and "));
        inline.extend(link("2", "2"));

        let mut env = Env::default();
        env.references
            .insert("10".into(), ReferenceDefinition::new("/ten", None));
        env.references.insert(
            "2".into(),
            ReferenceDefinition::new("/two", Some("Two".into())),
        );

        let text = render(paragraph(inline), &Options::default(), &mut env).unwrap();
        assert_eq!(text, "[ten][10] and [2]\n\n[2]: /two \"Two\"\n[10]: /ten\n");
    }

    #[test]
    fn test_undefined_label_falls_back_to_inline_link() {
        let inline = vec![
            Token::open("link_open")
                .with_attr("href", "/x")
                .with_meta("label", "X"),
            Token::text("x"),
            Token::close("link_close"),
        ];
        assert_eq!(render_default(paragraph(inline)), "[x](/x)\n");
    }

    #[test]
    fn test_used_refs_reset_between_passes() {
        let mut env = Env::default();
        env.used_refs.insert("stale".into());
        let text = render(paragraph(vec![Token::text("a")]), &Options::default(), &mut env).unwrap();
        assert_eq!(text, "a\n");
        assert!(env.used_refs.is_empty());
    }

    #[test]
    fn test_escaped_asterisk() {
        assert_eq!(render_default(paragraph(vec![Token::text("a*b")])), "a\\*b\n");
        assert_eq!(render_default(paragraph(vec![Token::text("a * b")])), "a * b\n");
    }

    #[test]
    fn test_wrapped_paragraph() {
        let options = Options::default().with_wrap(WrapMode::Width(10));
        let tokens = paragraph(vec![Token::text("aaa bbb ccc ddd")]);
        let text = render(tokens, &options, &mut Env::default()).unwrap();
        assert_eq!(text, "aaa bbb\nccc ddd\n");
    }

    #[test]
    fn test_unbalanced_tokens_fail() {
        let result = render(
            vec![Token::open("paragraph_open")],
            &Options::default(),
            &mut Env::default(),
        );
        assert!(matches!(result, Err(RenderError::UnclosedToken { .. })));
    }

    #[test]
    fn test_formatter_failure_is_isolated() {
        let fences = vec![
            Token::new("fence", 0).with_info("bad").with_content("keep   me\n"),
            Token::new("fence", 0).with_info("panics").with_content("also   kept\n"),
            Token::new("fence", 0).with_info("good").with_content("shout\n"),
        ];
        let options = Options::default()
            .with_filename("doc.md")
            .with_codeformatter("bad", |_: &str, _: &str| -> std::result::Result<String, CodeFormatError> {
                Err("syntax error".into())
            })
            .with_codeformatter("panics", |_: &str, _: &str| -> std::result::Result<String, CodeFormatError> {
                panic!("formatter bug")
            })
            .with_codeformatter("good", |code: &str, _: &str| -> std::result::Result<String, CodeFormatError> {
                Ok(code.to_uppercase())
            });

        let text = render(fences, &options, &mut Env::default()).unwrap();
        assert_eq!(
            text,
            "```bad\nkeep   me\n```\n\n```panics\nalso   kept\n```\n\n```good\nSHOUT\n```\n"
        );
    }

    struct Shout(&'static str);

    impl ParserExtension for Shout {
        fn name(&self) -> &str {
            self.0
        }

        fn renderers(&self) -> Vec<(String, Render)> {
            let tag = self.0;
            vec![(
                "text".into(),
                renderer(move |node, _ctx| format!("{tag}:{}", node.content())),
            )]
        }

        fn postprocessors(&self) -> Vec<(String, Postprocess)> {
            let tag = self.0;
            vec![(
                "paragraph".into(),
                postprocessor(move |text, _node, _ctx| format!("{text}+{tag}")),
            )]
        }
    }

    #[test]
    fn test_first_registered_renderer_wins() {
        let options = Options::default()
            .with_extension(Arc::new(Shout("one")))
            .with_extension(Arc::new(Shout("two")));
        let text = render(
            paragraph(vec![Token::text("hi")]),
            &options,
            &mut Env::default(),
        )
        .unwrap();
        assert_eq!(text, "one:hi+one+two\n");
    }

    #[test]
    fn test_plugin_tables_keep_defaults() {
        let extensions: Vec<Arc<dyn ParserExtension>> = vec![Arc::new(Shout("one"))];
        let (renderers, postprocessors) = renderer_tables(&extensions);
        assert!(renderers.contains_key("paragraph"));
        assert!(renderers.contains_key("text"));
        assert_eq!(postprocessors["paragraph"].len(), 1);
    }
}
