//! Tags: binding attributes and the handlers that interpret them.
mod builtin;
mod each;

pub use builtin::{AttrTag, EventTag, IfTag, ScopeTag, TextTag, ValueTag};
pub use each::EachTag;

use crate::engine::TagCx;
use crate::error::TemplateError;
use crate::value::Value;
use html::{NodeKey, Selector};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub const ATTR_TAG: &str = "bind-attr";
pub const SCOPE_TAG: &str = "bind-scope";
pub const IF_TAG: &str = "bind-if";
pub const EACH_TAG: &str = "bind-each";
pub const EACH_INDEX_MARKER: &str = "bind-each-index";
pub const TEXT_TAG: &str = "bind-text";
pub const VALUE_TAG: &str = "bind-value";
pub const EVENT_TAG: &str = "bind-event";

/// What the engine does after a handler ran.
#[derive(Clone, Debug, PartialEq)]
pub enum TagOutcome {
    /// Keep the current scope and context.
    Continue,
    /// Later tags on the element and its children see this scope/context.
    Rescope { scope: String, context: Value },
    /// The handler took over the element: later tags and the children are
    /// skipped.
    Suppress,
}

pub trait Tag {
    /// Apply the binding whose raw attribute text is `raw` to `element`,
    /// rendered against `context` at `scope`.
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        scope: &str,
    ) -> Result<TagOutcome, TemplateError>;

    /// Attribute this tag stamps on the elements it clones. Discovery leaves
    /// such clones, and their subtrees, to the tag that made them.
    fn clone_marker(&self) -> Option<&str> {
        None
    }
}

impl<F> Tag for F
where
    F: Fn(&mut TagCx<'_>, NodeKey, &Value, &str, &str) -> Result<TagOutcome, TemplateError>,
{
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        self(cx, element, context, raw, scope)
    }
}

/// Pins a closure to the handler signature so its argument types are inferred.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&mut TagCx<'_>, NodeKey, &Value, &str, &str) -> Result<TagOutcome, TemplateError>,
{
    f
}

#[derive(Clone)]
pub struct TagDescriptor {
    attribute: Rc<str>,
    exclude: Option<Selector>,
    handler: Rc<dyn Tag>,
}

impl TagDescriptor {
    pub fn new(
        attribute: &str,
        handler: impl Tag + 'static,
        exclude: Option<&str>,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            attribute: validate_attribute(attribute)?.into(),
            exclude: exclude.map(Selector::parse).transpose()?,
            handler: Rc::new(handler),
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub(crate) fn attribute_rc(&self) -> Rc<str> {
        self.attribute.clone()
    }

    pub fn exclude(&self) -> Option<&Selector> {
        self.exclude.as_ref()
    }

    pub(crate) fn handler(&self) -> Rc<dyn Tag> {
        self.handler.clone()
    }

    pub fn clone_marker(&self) -> Option<&str> {
        self.handler.clone_marker()
    }

    /// Whether this tag's exclusion selector rules it out on `element`.
    pub fn excludes(&self, dom: &html::Dom, element: NodeKey) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|selector| selector.matches(dom, element))
    }
}

impl fmt::Debug for TagDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDescriptor")
            .field("attribute", &self.attribute)
            .field("exclude", &self.exclude.as_ref().map(Selector::as_str))
            .finish_non_exhaustive()
    }
}

fn validate_attribute(name: &str) -> Result<String, TemplateError> {
    let valid = !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(name.to_ascii_lowercase())
    } else {
        Err(TemplateError::InvalidTagName(name.to_string()))
    }
}

/// Ordered tag set. Enumeration order is application order.
#[derive(Clone, Debug, Default)]
pub struct TagRegistry {
    tags: Vec<TagDescriptor>,
}

impl TagRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in tags under their default attribute names.
    pub fn builtin() -> Self {
        let builtin: [(&str, Rc<dyn Tag>, Option<&str>); 7] = [
            (ATTR_TAG, Rc::new(AttrTag), None),
            (SCOPE_TAG, Rc::new(ScopeTag), None),
            (IF_TAG, Rc::new(IfTag), None),
            (EACH_TAG, Rc::new(EachTag::new(EACH_INDEX_MARKER)), Some(EACH_INDEX_MARKER)),
            (TEXT_TAG, Rc::new(TextTag), None),
            (VALUE_TAG, Rc::new(ValueTag), None),
            (EVENT_TAG, Rc::new(EventTag), None),
        ];
        let tags = builtin
            .into_iter()
            .map(|(attribute, handler, exclude)| TagDescriptor {
                attribute: attribute.into(),
                exclude: exclude.map(Selector::has_attribute),
                handler,
            })
            .collect();
        Self { tags }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TagDescriptor> {
        self.tags.iter()
    }

    pub fn get(&self, attribute: &str) -> Option<&TagDescriptor> {
        self.tags
            .iter()
            .find(|t| t.attribute.eq_ignore_ascii_case(attribute))
    }

    pub(crate) fn at(&self, index: usize) -> Option<&TagDescriptor> {
        self.tags.get(index)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(TagDescriptor::attribute)
    }

    /// Add a tag at the end; fails if the attribute is taken.
    pub fn register(&mut self, descriptor: TagDescriptor) -> Result<(), TemplateError> {
        if self.get(descriptor.attribute()).is_some() {
            return Err(TemplateError::DuplicateTag(descriptor.attribute().to_string()));
        }
        self.tags.push(descriptor);
        Ok(())
    }

    /// Replace a tag in place, or add it at the end when new.
    pub fn replace(&mut self, descriptor: TagDescriptor) -> Option<TagDescriptor> {
        match self
            .tags
            .iter_mut()
            .find(|t| t.attribute == descriptor.attribute)
        {
            Some(slot) => Some(std::mem::replace(slot, descriptor)),
            None => {
                self.tags.push(descriptor);
                None
            }
        }
    }

    pub fn remove(&mut self, attribute: &str) -> Result<TagDescriptor, TemplateError> {
        let index = self
            .tags
            .iter()
            .position(|t| t.attribute.eq_ignore_ascii_case(attribute))
            .ok_or_else(|| TemplateError::UnknownTag(attribute.to_string()))?;
        Ok(self.tags.remove(index))
    }
}

thread_local! {
    /// Tags copied into every template constructed afterwards on this thread.
    static DEFAULT_TAGS: RefCell<TagRegistry> = RefCell::new(TagRegistry::builtin());
}

pub fn default_registry() -> TagRegistry {
    DEFAULT_TAGS.with(|tags| tags.borrow().clone())
}

pub(crate) fn with_default_registry<T>(f: impl FnOnce(&mut TagRegistry) -> T) -> T {
    DEFAULT_TAGS.with(|tags| f(&mut tags.borrow_mut()))
}

/// Restore the built-in defaults for this thread.
pub fn reset_default_registry() {
    with_default_registry(|tags| *tags = TagRegistry::builtin());
}
