//! The render pass: discovery of tagged elements, handler dispatch and
//! recursion into children.
//!
//! A pass owns its cache; nothing survives between `render`/`update` calls
//! except the DOM itself and the listener tracker.
use crate::config::TemplateConfig;
use crate::emitter::Emitter;
use crate::error::TemplateError;
use crate::listeners::{Listener, ListenerId, ListenerTracker};
use crate::path;
use crate::tags::{TagOutcome, TagRegistry};
use crate::value::Value;
use html::{Dom, NodeKey};
use std::collections::HashSet;

#[derive(Clone, Debug)]
struct Frame {
    context: Value,
    scope: String,
}

/// Handle given to tag handlers while a pass is running.
pub struct TagCx<'a> {
    dom: &'a mut Dom,
    tags: &'a TagRegistry,
    config: &'a TemplateConfig,
    listeners: &'a mut ListenerTracker,
    emitter: &'a Emitter,
    cache: HashSet<NodeKey>,
    tag_index: usize,
}

/// Run one pass over the current children of `container`.
pub(crate) fn run_pass(
    dom: &mut Dom,
    container: NodeKey,
    tags: &TagRegistry,
    config: &TemplateConfig,
    listeners: &mut ListenerTracker,
    emitter: &Emitter,
    context: &Value,
) -> Result<(), TemplateError> {
    let top_level = dom.children(container).to_vec();
    let mut cx = TagCx {
        dom,
        tags,
        config,
        listeners,
        emitter,
        cache: HashSet::new(),
        tag_index: 0,
    };
    let frame = Frame {
        context: context.clone(),
        scope: String::new(),
    };
    for node in top_level {
        if cx.dom.contains(node) {
            cx.process(node, &frame, false)?;
        }
    }
    log::debug!(
        target: "template.engine",
        "pass over {container} visited {} nodes, {} listeners bound",
        cx.cache.len(),
        cx.listeners.len()
    );
    Ok(())
}

impl<'a> TagCx<'a> {
    fn process(&mut self, node: NodeKey, frame: &Frame, force: bool) -> Result<(), TemplateError> {
        if !force && self.cache.contains(&node) {
            log::trace!(target: "template.engine", "{node} already processed");
            return Ok(());
        }
        self.cache.insert(node);
        for root in self.discover(node) {
            // An earlier root may have removed this one.
            if self.dom.contains(root) {
                self.render_element(root, frame)?;
            }
        }
        Ok(())
    }

    /// Tagged elements under `node` (inclusive) with no tagged ancestor
    /// between them and `node`, in document order.
    fn discover(&self, node: NodeKey) -> Vec<NodeKey> {
        let mut roots = Vec::new();
        let mut stack = vec![node];
        while let Some(key) = stack.pop() {
            if !self.dom.is_element(key) {
                stack.extend(self.dom.children(key).iter().rev().copied());
                continue;
            }
            if self.is_tagged(key) {
                if self.is_stamped_clone(key) {
                    log::trace!(target: "template.engine", "skip stamped clone {key}");
                } else if self.has_applicable_tag(key) {
                    roots.push(key);
                } else {
                    log::trace!(target: "template.engine", "every tag on {key} is excluded");
                }
                continue;
            }
            stack.extend(self.dom.children(key).iter().rev().copied());
        }
        roots
    }

    fn is_tagged(&self, key: NodeKey) -> bool {
        self.tags.iter().any(|t| self.dom.has_attr(key, t.attribute()))
    }

    // A clone made by a tag present on it belongs to that tag's element.
    fn is_stamped_clone(&self, key: NodeKey) -> bool {
        self.tags.iter().any(|t| {
            self.dom.has_attr(key, t.attribute())
                && t.clone_marker().is_some_and(|marker| self.dom.has_attr(key, marker))
        })
    }

    fn has_applicable_tag(&self, key: NodeKey) -> bool {
        self.tags
            .iter()
            .any(|t| self.dom.has_attr(key, t.attribute()) && !t.excludes(self.dom, key))
    }

    fn render_element(&mut self, element: NodeKey, frame: &Frame) -> Result<(), TemplateError> {
        log::trace!(target: "template.engine", "render {element} at '{}'", frame.scope);
        let Some(inner) = self.apply_tags(element, frame.clone(), 0)? else {
            return Ok(());
        };
        let force = self.config.refresh.should_refresh(
            inner.scope != frame.scope,
            inner.context != frame.context,
        );
        self.descend(element, &inner, force)
    }

    /// Apply every registered tag present on `element`, starting at registry
    /// position `start`. `None` means the children must not be rendered.
    fn apply_tags(
        &mut self,
        element: NodeKey,
        mut frame: Frame,
        start: usize,
    ) -> Result<Option<Frame>, TemplateError> {
        let tags = self.tags;
        for (index, descriptor) in tags.iter().enumerate().skip(start) {
            let Some(raw) = self.dom.attr(element, descriptor.attribute()).map(str::to_string) else {
                continue;
            };
            if descriptor.excludes(self.dom, element) {
                continue;
            }
            log::trace!(
                target: "template.tags",
                "{}=\"{raw}\" on {element} at '{}'",
                descriptor.attribute(),
                frame.scope
            );
            self.tag_index = index;
            let handler = descriptor.handler();
            match handler.apply(self, element, &frame.context, &raw, &frame.scope)? {
                TagOutcome::Continue => {}
                TagOutcome::Rescope { scope, context } => frame = Frame { scope, context },
                TagOutcome::Suppress => return Ok(None),
            }
            if !self.dom.contains(element) {
                return Ok(None);
            }
        }
        Ok(Some(frame))
    }

    fn descend(&mut self, element: NodeKey, frame: &Frame, force: bool) -> Result<(), TemplateError> {
        for child in self.dom.children(element).to_vec() {
            if self.dom.contains(child) {
                self.process(child, frame, force)?;
            }
        }
        Ok(())
    }

    pub fn dom(&self) -> &Dom {
        self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        self.dom
    }

    pub fn config(&self) -> &TemplateConfig {
        self.config
    }

    pub fn emitter(&self) -> &Emitter {
        self.emitter
    }

    /// Attribute name of the tag currently being applied.
    pub fn attribute(&self) -> &str {
        self.tags.at(self.tag_index).map_or("", |t| t.attribute())
    }

    pub fn resolve(&self, context: &Value, path: &str) -> Option<Value> {
        path::resolve(context, path, &self.config.self_token)
    }

    pub fn extend_scope(&self, scope: &str, path: &str) -> String {
        path::extend_scope(scope, path, &self.config.self_token)
    }

    /// Split a multi-pair attribute with the configured separators.
    pub fn split_pairs(&self, raw: &str) -> Vec<(String, Option<String>)> {
        path::split_pairs(raw, self.config.separator, self.config.equals)
    }

    /// Bind a DOM listener owned by the current tag.
    pub fn bind(&mut self, element: NodeKey, event: &str, listener: Listener) -> ListenerId {
        let owner = self.tags.at(self.tag_index).map(|t| t.attribute_rc());
        self.listeners.bind_owned(element, event, owner, listener)
    }

    /// Drop the listeners the current tag bound on `element` earlier.
    pub fn unbind_own(&mut self, element: NodeKey) -> usize {
        match self.tags.at(self.tag_index) {
            Some(tag) => self.listeners.unbind_owner(element, tag.attribute()),
            None => 0,
        }
    }

    /// Render the children of `element` against `context` at `scope`,
    /// ignoring the pass cache.
    pub fn render_children(
        &mut self,
        element: NodeKey,
        context: Value,
        scope: String,
    ) -> Result<(), TemplateError> {
        let saved = self.tag_index;
        let result = self.descend(element, &Frame { context, scope }, true);
        self.tag_index = saved;
        result
    }

    /// Render an element stamped out by the current tag: the tags that come
    /// after the current one in registry order are applied to `clone`, then
    /// its children are rendered.
    pub fn render_clone(
        &mut self,
        clone: NodeKey,
        context: Value,
        scope: String,
    ) -> Result<(), TemplateError> {
        let saved = self.tag_index;
        self.cache.insert(clone);
        let result = match self.apply_tags(clone, Frame { context, scope }, saved + 1) {
            Ok(Some(frame)) => self.descend(clone, &frame, true),
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };
        self.tag_index = saved;
        result
    }

    /// Remove `node` and its subtree, unbinding their listeners.
    pub fn remove(&mut self, node: NodeKey) -> Result<(), TemplateError> {
        self.listeners.unbind_subtree(self.dom, node);
        self.dom.remove(node)?;
        Ok(())
    }

    /// Replace the text of `element`; returns whether anything changed.
    pub fn set_text(&mut self, element: NodeKey, text: &str) -> Result<bool, TemplateError> {
        if self.dom.text_content(element) == text {
            return Ok(false);
        }
        for child in self.dom.children(element).to_vec() {
            self.listeners.unbind_subtree(self.dom, child);
        }
        self.dom.set_text_content(element, text)?;
        Ok(true)
    }

    pub fn hide(&mut self, element: NodeKey) -> Result<(), TemplateError> {
        html::style::hide(self.dom, element)?;
        Ok(())
    }

    pub fn show(&mut self, element: NodeKey) -> Result<(), TemplateError> {
        html::style::show(self.dom, element)?;
        Ok(())
    }
}

impl std::fmt::Debug for TagCx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagCx")
            .field("attribute", &self.attribute())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
