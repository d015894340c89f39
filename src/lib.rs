//! `stencil`: declarative DOM templates.
//!
//! [`html`] provides the in-memory DOM the templates render into;
//! [`template`] provides the binding engine.
pub use html;
pub use template;

pub use template::{Template, TemplateConfig, TemplateError, Value};
