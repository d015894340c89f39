use crate::config::TemplateConfig;
use crate::emitter::{Emitter, EventArgs, SubscriptionId};
use crate::engine;
use crate::error::TemplateError;
use crate::listeners::{DomEvent, ListenerTracker};
use crate::tags::{self, Tag, TagDescriptor, TagRegistry};
use crate::value::Value;
use html::{Dom, NodeKey};
use std::rc::Rc;

/// A rendered working tree: `container` is a fragment holding the
/// rendered top-level nodes.
#[derive(Clone, Debug)]
pub struct Rendered {
    pub dom: Dom,
    pub container: NodeKey,
}

/// A parsed template plus the tree most recently rendered from it.
///
/// ```
/// use template::{Template, Value};
///
/// let mut tpl = Template::parse("<p bind-text=\"name\"></p>");
/// let container = tpl.render(&Value::map([("name", "Tobi")])).unwrap();
/// let dom = tpl.dom().unwrap();
/// assert_eq!(dom.text_content(container), "Tobi");
/// ```
#[derive(Debug)]
pub struct Template {
    config: TemplateConfig,
    tags: TagRegistry,
    source: Dom,
    source_root: NodeKey,
    rendered: Option<Rendered>,
    listeners: ListenerTracker,
    emitter: Rc<Emitter>,
}

impl Template {
    /// Parse `markup` as the template source. Malformed markup degrades
    /// rather than failing.
    pub fn parse(markup: &str) -> Self {
        let (source, source_root) = html::parse_fragment(markup);
        Self::from_parts(source, source_root)
    }

    /// Use a copy of `node` as the source; a fragment contributes its
    /// children.
    pub fn from_dom(dom: &Dom, node: NodeKey) -> Result<Self, TemplateError> {
        let mut source = Dom::new();
        let source_root = source.create_fragment();
        let tops = if dom.is_fragment(node) {
            dom.children(node).to_vec()
        } else {
            dom.kind(node).ok_or(html::DomError::UnknownKey(node))?;
            vec![node]
        };
        for top in tops {
            let copy = source.import(dom, top)?;
            source.append_child(source_root, copy)?;
        }
        Ok(Self::from_parts(source, source_root))
    }

    fn from_parts(source: Dom, source_root: NodeKey) -> Self {
        Self {
            config: TemplateConfig::default(),
            tags: tags::default_registry(),
            source,
            source_root,
            rendered: None,
            listeners: ListenerTracker::new(),
            emitter: Rc::new(Emitter::new()),
        }
    }

    pub fn with_config(mut self, config: TemplateConfig) -> Result<Self, TemplateError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Render a fresh copy of the source against `context`, discarding any
    /// earlier working tree. Returns the container.
    pub fn render(&mut self, context: &Value) -> Result<NodeKey, TemplateError> {
        let mut dom = Dom::new();
        let container = dom.create_fragment();
        for &top in self.source.children(self.source_root) {
            let copy = dom.import(&self.source, top)?;
            dom.append_child(container, copy)?;
        }
        self.listeners = ListenerTracker::new();
        self.rendered = None;
        log::debug!(target: "template.engine", "render into {container}");
        engine::run_pass(
            &mut dom,
            container,
            &self.tags,
            &self.config,
            &mut self.listeners,
            &self.emitter,
            context,
        )?;
        self.rendered = Some(Rendered { dom, container });
        Ok(container)
    }

    /// Re-render the working tree in place. Nodes that still represent the
    /// same binding keep their keys. Returns the container's element
    /// children.
    pub fn update(&mut self, context: &Value) -> Result<Vec<NodeKey>, TemplateError> {
        let rendered = self.rendered.as_mut().ok_or(TemplateError::NotRendered)?;
        let container = rendered.container;
        self.listeners.unbind_subtree(&rendered.dom, container);
        log::debug!(target: "template.engine", "update {container}");
        engine::run_pass(
            &mut rendered.dom,
            container,
            &self.tags,
            &self.config,
            &mut self.listeners,
            &self.emitter,
            context,
        )?;
        Ok(rendered.dom.element_children(container))
    }

    pub fn rendered(&self) -> Option<&Rendered> {
        self.rendered.as_ref()
    }

    pub fn dom(&self) -> Option<&Dom> {
        self.rendered.as_ref().map(|r| &r.dom)
    }

    /// Mutable access to the working tree, for simulating user edits.
    pub fn dom_mut(&mut self) -> Option<&mut Dom> {
        self.rendered.as_mut().map(|r| &mut r.dom)
    }

    pub fn container(&self) -> Option<NodeKey> {
        self.rendered.as_ref().map(|r| r.container)
    }

    /// Hand the working tree to the caller. Listeners stay with the
    /// template and are dropped with it.
    pub fn into_rendered(self) -> Option<Rendered> {
        self.rendered
    }

    /// Register a tag on this instance only.
    pub fn tag(
        &mut self,
        attribute: &str,
        handler: impl Tag + 'static,
        exclude: Option<&str>,
    ) -> Result<(), TemplateError> {
        self.tags.register(TagDescriptor::new(attribute, handler, exclude)?)
    }

    /// Register or replace a tag on this instance, keeping its position when
    /// it already exists.
    pub fn override_tag(
        &mut self,
        attribute: &str,
        handler: impl Tag + 'static,
        exclude: Option<&str>,
    ) -> Result<(), TemplateError> {
        let replaced = self
            .tags
            .replace(TagDescriptor::new(attribute, handler, exclude)?);
        if replaced.is_some() {
            log::debug!(target: "template.tags", "overrode tag {attribute}");
        }
        Ok(())
    }

    pub fn untag(&mut self, attribute: &str) -> Result<(), TemplateError> {
        self.tags.remove(attribute).map(|_| ())
    }

    /// Register a tag for templates created later on this thread.
    pub fn tag_default(
        attribute: &str,
        handler: impl Tag + 'static,
        exclude: Option<&str>,
    ) -> Result<(), TemplateError> {
        let descriptor = TagDescriptor::new(attribute, handler, exclude)?;
        tags::with_default_registry(|registry| registry.register(descriptor))
    }

    pub fn untag_default(attribute: &str) -> Result<(), TemplateError> {
        tags::with_default_registry(|registry| registry.remove(attribute).map(|_| ()))
    }

    pub fn on(&self, event: &str, handler: impl Fn(&EventArgs<'_>) + 'static) -> SubscriptionId {
        self.emitter.on(event, handler)
    }

    pub fn off(&self, event: &str, id: SubscriptionId) -> bool {
        self.emitter.off(event, id)
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        self.emitter.emit(event, &EventArgs::Custom(args))
    }

    pub fn change(&self, scope: &str, value: &Value) {
        self.emitter.change(scope, value);
    }

    pub fn emitter(&self) -> Rc<Emitter> {
        self.emitter.clone()
    }

    /// Deliver a DOM event inside the working tree. Returns how many
    /// listeners ran.
    pub fn dispatch(&self, event: &DomEvent) -> Result<usize, TemplateError> {
        let rendered = self.rendered.as_ref().ok_or(TemplateError::NotRendered)?;
        Ok(self
            .listeners
            .dispatch(&rendered.dom, &self.emitter, event, rendered.container))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Parse, render once and return the detached working tree.
    pub fn render_once(markup: &str, context: &Value) -> Result<Rendered, TemplateError> {
        let mut template = Self::parse(markup);
        template.render(context)?;
        template.into_rendered().ok_or(TemplateError::NotRendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_before_render_fails() {
        let mut template = Template::parse("<p></p>");
        assert_eq!(
            template.update(&Value::Null).unwrap_err(),
            TemplateError::NotRendered
        );
        assert_eq!(
            template.dispatch(&DomEvent::new("click", NodeKey::new(1, 0))).unwrap_err(),
            TemplateError::NotRendered
        );
    }

    #[test]
    fn render_restarts_from_the_source() {
        let mut template = Template::parse("<p bind-text=\"name\">stale</p>");
        let first = template.render(&Value::from(json!({"name": "a"}))).unwrap();
        let second = template.render(&Value::from(json!({"name": "b"}))).unwrap();
        let dom = template.dom().unwrap();
        assert_eq!(dom.text_content(second), "b");
        // A new tree; keys start over.
        assert_eq!(first, second);
        assert_eq!(dom.element_children(second).len(), 1);
    }

    #[test]
    fn from_dom_copies_fragment_children() {
        let (dom, root) = html::parse_fragment("<b bind-text=\"x\"></b><i></i>");
        let mut template = Template::from_dom(&dom, root).unwrap();
        let container = template.render(&Value::from(json!({"x": 1}))).unwrap();
        assert_eq!(html::inner_html(template.dom().unwrap(), container), "<b bind-text=\"x\">1</b><i></i>");

        let single = dom.element_children(root)[1];
        let template = Template::from_dom(&dom, single).unwrap();
        assert_eq!(template.source.children(template.source_root).len(), 1);
        assert!(Template::from_dom(&dom, NodeKey::new(999, 0)).is_err());
    }

    #[test]
    fn with_config_validates() {
        let bad = TemplateConfig::default().with_separator(':');
        assert!(matches!(
            Template::parse("").with_config(bad),
            Err(TemplateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn render_once_detaches_the_tree() {
        let rendered =
            Template::render_once("<p bind-text=\"@\"></p>", &Value::from("hi")).unwrap();
        assert_eq!(rendered.dom.text_content(rendered.container), "hi");
    }
}
