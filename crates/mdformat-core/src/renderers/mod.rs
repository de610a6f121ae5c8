//! Default renderer functions, one per syntax type.

mod block;
mod html;
mod inline;
mod list;
pub mod wrap;

pub use html::{is_open_close_tag_line, starts_interrupting_html_block, BLOCK_NAMES};
pub use inline::wrap_with_markup;
pub use list::{is_tight_list, list_marker_type};
pub use wrap::{wrap, WrapWidth, WRAP_POINT};

use once_cell::sync::Lazy;

use crate::context::{renderer, Renderers};

static DEFAULT_RENDERERS: Lazy<Renderers> = Lazy::new(|| {
    let mut renderers = Renderers::new();
    renderers.insert("inline".into(), renderer(inline::inline));
    renderers.insert("root".into(), renderer(block::root));
    renderers.insert("hr".into(), renderer(block::hr));
    renderers.insert("code_inline".into(), renderer(inline::code_inline));
    renderers.insert("html_block".into(), renderer(block::html_block));
    renderers.insert("html_inline".into(), renderer(inline::html_inline));
    renderers.insert("hardbreak".into(), renderer(inline::hardbreak));
    renderers.insert("softbreak".into(), renderer(inline::softbreak));
    renderers.insert("text".into(), renderer(inline::text));
    renderers.insert("fence".into(), renderer(block::fence));
    renderers.insert("code_block".into(), renderer(block::code_block));
    renderers.insert("link".into(), renderer(inline::link));
    renderers.insert("image".into(), renderer(inline::image));
    renderers.insert("em".into(), renderer(inline::em));
    renderers.insert("strong".into(), renderer(inline::strong));
    renderers.insert("heading".into(), renderer(block::heading));
    renderers.insert("blockquote".into(), renderer(block::blockquote));
    renderers.insert("paragraph".into(), renderer(block::paragraph));
    renderers.insert("bullet_list".into(), renderer(list::bullet_list));
    renderers.insert("ordered_list".into(), renderer(list::ordered_list));
    renderers.insert("list_item".into(), renderer(list::list_item));
    renderers
});

/// The built-in renderer table
pub fn default_renderers() -> &'static Renderers {
    &DEFAULT_RENDERERS
}
