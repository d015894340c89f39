//! In-memory DOM for templates: a forgiving markup reader, a node arena with
//! stable keys, and the small set of element helpers templates rely on.

pub mod dom;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod dom_snapshot;
pub mod form;
pub mod selector;
pub mod serialize;
pub mod style;

mod dom_builder;
mod entities;
mod tokenizer;
mod types;

pub use crate::dom::{Ancestors, Dom, DomError, NodeKind};
pub use crate::dom_builder::build_fragment;
pub use crate::entities::{escape_attribute, escape_text};
pub use crate::selector::{Selector, SelectorError};
pub use crate::serialize::{inner_html, outer_html};
pub use crate::tokenizer::{Tokenizer, tokenize};
pub use crate::types::{AtomId, AtomTable, NodeKey, Token, TokenStream};

/// Parse `markup` into a fresh `Dom` under a fragment root.
pub fn parse_fragment(markup: &str) -> (Dom, NodeKey) {
    let mut dom = Dom::new();
    let root = parse_fragment_into(&mut dom, markup);
    (dom, root)
}

/// Parse `markup` into `dom`, returning the detached fragment root.
pub fn parse_fragment_into(dom: &mut Dom, markup: &str) -> NodeKey {
    let stream = tokenize(markup);
    match build_fragment(dom, &stream) {
        Ok(root) => root,
        // The builder only appends freshly created nodes to open containers.
        Err(err) => {
            log::warn!(target: "html.dom", "fragment build failed: {err}");
            dom.create_fragment()
        }
    }
}
