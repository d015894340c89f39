use html::{DomError, SelectorError};
use std::fmt;

/// Integration mistakes surfaced to the caller. Missing data is never an
/// error; bindings degrade to empty or hidden output instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateError {
    NotRendered,
    DuplicateTag(String),
    UnknownTag(String),
    InvalidTagName(String),
    InvalidConfig(String),
    Selector(SelectorError),
    Dom(DomError),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::NotRendered => write!(f, "template has not been rendered yet"),
            TemplateError::DuplicateTag(name) => write!(f, "tag '{name}' is already registered"),
            TemplateError::UnknownTag(name) => write!(f, "tag '{name}' is not registered"),
            TemplateError::InvalidTagName(name) => write!(f, "invalid tag attribute name '{name}'"),
            TemplateError::InvalidConfig(reason) => write!(f, "invalid template config: {reason}"),
            TemplateError::Selector(err) => write!(f, "invalid exclusion selector: {err}"),
            TemplateError::Dom(err) => write!(f, "dom error: {err}"),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::Selector(err) => Some(err),
            TemplateError::Dom(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SelectorError> for TemplateError {
    fn from(err: SelectorError) -> Self {
        TemplateError::Selector(err)
    }
}

impl From<DomError> for TemplateError {
    fn from(err: DomError) -> Self {
        TemplateError::Dom(err)
    }
}
