//! Declarative DOM templating over the `html` crate.
//!
//! Markup is annotated with binding attributes (`bind-text`, `bind-each`,
//! ...). [`Template::render`] copies the source into a working tree and
//! applies every binding against a [`Value`] context; [`Template::update`]
//! re-applies them in place, keeping the nodes that still stand for the same
//! data.
pub mod config;
pub mod emitter;
mod engine;
pub mod error;
pub mod listeners;
pub mod path;
pub mod tags;
mod template;
pub mod value;

pub use crate::config::{RefreshPolicy, TemplateConfig};
pub use crate::emitter::{Emitter, EventArgs, Handler, SubscriptionId};
pub use crate::engine::TagCx;
pub use crate::error::TemplateError;
pub use crate::listeners::{DispatchCx, DomEvent, Listener, ListenerId, ListenerTracker};
pub use crate::path::{extend_scope, resolve, split_pairs};
pub use crate::tags::{Tag, TagDescriptor, TagOutcome, TagRegistry, from_fn};
pub use crate::template::{Rendered, Template};
pub use crate::value::Value;
