//! Plugin registry and bundled extensions.

use std::sync::Arc;

use indexmap::IndexMap;
use mdformat_core::{CodeFormatter, Options, ParserExtension};

use crate::{Error, Result};

#[cfg(feature = "strikethrough")]
pub use strikethrough::Strikethrough;

#[cfg(feature = "strikethrough")]
mod strikethrough {
    use mdformat_core::renderers::wrap_with_markup;
    use mdformat_core::{
        postprocessor, renderer, ParserExtension, ParserFeatures, Postprocess, Render,
        RenderTreeNode,
    };

    /// GFM `~~strikethrough~~`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Strikethrough;

    fn is_inside_autolink(node: RenderTreeNode<'_>) -> bool {
        node.parent()
            .is_some_and(|parent| parent.node_type() == "link" && parent.info() == "auto")
    }

    impl ParserExtension for Strikethrough {
        fn name(&self) -> &str {
            "strikethrough"
        }

        fn update_parser(&self, features: &mut ParserFeatures) {
            features.strikethrough = true;
        }

        fn renderers(&self) -> Vec<(String, Render)> {
            vec![(
                "s".to_string(),
                renderer(|node, ctx| wrap_with_markup(node, ctx, "~~")),
            )]
        }

        fn postprocessors(&self) -> Vec<(String, Postprocess)> {
            // Literal tildes could pair up into a strikethrough
            vec![(
                "text".to_string(),
                postprocessor(|text, node, _ctx| {
                    if is_inside_autolink(node) {
                        text
                    } else {
                        text.replace('~', "\\~")
                    }
                }),
            )]
        }
    }
}

/// Named parser extensions and code formatters available to the formatter
#[derive(Clone, Default)]
pub struct PluginRegistry {
    extensions: IndexMap<String, Arc<dyn ParserExtension>>,
    codeformatters: IndexMap<String, Arc<dyn CodeFormatter>>,
}

impl PluginRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the extensions bundled with this crate
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "strikethrough")]
        registry.register_extension(Arc::new(Strikethrough));
        registry
    }

    /// Register a parser extension under its name. A later registration of
    /// the same name replaces the earlier one.
    pub fn register_extension(&mut self, extension: Arc<dyn ParserExtension>) -> &mut Self {
        self.extensions
            .insert(extension.name().to_string(), extension);
        self
    }

    /// Register a code formatter for a fence language
    pub fn register_codeformatter<F>(&mut self, lang: impl Into<String>, formatter: F) -> &mut Self
    where
        F: CodeFormatter + 'static,
    {
        self.codeformatters.insert(lang.into(), Arc::new(formatter));
        self
    }

    pub fn extension(&self, name: &str) -> Option<Arc<dyn ParserExtension>> {
        self.extensions.get(name).cloned()
    }

    /// Names of the registered extensions, in registration order
    pub fn extension_names(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }

    /// Languages with a registered code formatter
    pub fn codeformatter_langs(&self) -> impl Iterator<Item = &str> {
        self.codeformatters.keys().map(String::as_str)
    }

    /// Enable the named extensions and every registered code formatter.
    ///
    /// # Errors
    ///
    /// Fails on a name no extension is registered under.
    pub fn configure<S: AsRef<str>>(&self, mut options: Options, names: &[S]) -> Result<Options> {
        for name in names {
            let name = name.as_ref();
            let extension = self
                .extension(name)
                .ok_or_else(|| Error::UnknownExtension(name.to_string()))?;
            options = options.with_extension(extension);
        }
        for (lang, formatter) in &self.codeformatters {
            options
                .codeformatters
                .insert(lang.clone(), Arc::clone(formatter));
        }
        Ok(options)
    }

    /// Enable every registered extension and code formatter
    pub fn configure_all(&self, options: Options) -> Options {
        let names: Vec<&str> = self.extension_names().collect();
        // Every name comes from the registry itself
        self.configure(options.clone(), &names).unwrap_or(options)
    }
}
