//! Handlers for the scalar tags. The array tag lives in `each.rs`.
use super::{Tag, TagOutcome};
use crate::emitter::EventArgs;
use crate::engine::TagCx;
use crate::error::TemplateError;
use crate::listeners::{DispatchCx, DomEvent, Listener};
use crate::value::Value;
use html::form;
use html::{Dom, NodeKey};
use std::cell::RefCell;
use std::rc::Rc;

/// Events after which a bound form control is checked for edits.
const VALUE_EVENTS: [&str; 3] = ["click", "change", "keyup"];

/// `name:path` pairs written to element attributes.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttrTag;

impl Tag for AttrTag {
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        _scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        for (name, path) in cx.split_pairs(raw) {
            let Some(path) = path.filter(|p| !p.is_empty()) else {
                log::debug!(target: "template.tags", "attribute pair '{name}' has no path");
                continue;
            };
            match cx.resolve(context, &path) {
                None | Some(Value::Null) => {
                    cx.dom_mut().remove_attr(element, &name)?;
                }
                Some(value) => {
                    let text = value.display();
                    if cx.dom().attr(element, &name) != Some(text.as_str()) {
                        cx.dom_mut().set_attr(element, &name, &text)?;
                    }
                }
            }
        }
        Ok(TagOutcome::Continue)
    }
}

/// Re-roots the element's subtree at a nested context.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScopeTag;

impl Tag for ScopeTag {
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        let value = cx.resolve(context, raw).unwrap_or_default();
        cx.show(element)?;
        if !value.truthy() {
            cx.hide(element)?;
        }
        Ok(TagOutcome::Rescope {
            scope: cx.extend_scope(scope, raw),
            context: value,
        })
    }
}

/// Shows the element only for truthy, non-empty values.
#[derive(Clone, Copy, Debug, Default)]
pub struct IfTag;

impl Tag for IfTag {
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        _scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        let value = cx.resolve(context, raw).unwrap_or_default();
        cx.show(element)?;
        if !value.truthy() || value.is_empty_list() {
            cx.hide(element)?;
        }
        Ok(TagOutcome::Continue)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TextTag;

impl Tag for TextTag {
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        _scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        let text = cx
            .resolve(context, raw)
            .map(|v| v.display())
            .unwrap_or_default();
        cx.set_text(element, &text)?;
        Ok(TagOutcome::Continue)
    }
}

/// Two-way binding for form controls.
///
/// The control is set from the context; edits noticed on click, change or
/// keyup are announced through [`Emitter::change`](crate::Emitter::change)
/// at the control's scope.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueTag;

impl Tag for ValueTag {
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        let value = cx.resolve(context, raw).unwrap_or_default();
        if form::control_type(cx.dom(), element).is_checkable() {
            form::set_checked(cx.dom_mut(), element, value.truthy())?;
        } else if !form::set_form_value(cx.dom_mut(), element, &value.display())? {
            log::debug!(target: "template.tags", "{element} does not take a form value");
        }

        let last = Rc::new(RefCell::new(live_value(cx.dom(), element)));
        let change_scope: Rc<str> = cx.extend_scope(scope, raw).into();
        cx.unbind_own(element);
        for event in VALUE_EVENTS {
            let last = last.clone();
            let change_scope = change_scope.clone();
            let listener: Listener = Rc::new(move |dcx: &DispatchCx<'_>, _event: &DomEvent| {
                let current = live_value(dcx.dom, element);
                if *last.borrow() == current {
                    return;
                }
                last.replace(current.clone());
                dcx.emitter.change(&change_scope, &current);
            });
            cx.bind(element, event, listener);
        }
        Ok(TagOutcome::Continue)
    }
}

fn live_value(dom: &Dom, element: NodeKey) -> Value {
    if form::control_type(dom, element).is_checkable() {
        Value::Bool(form::is_checked(dom, element))
    } else {
        form::form_value(dom, element).map(Value::from).unwrap_or_default()
    }
}

/// `domEvent:emittedName` pairs re-emitted on the template's emitter.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventTag;

impl Tag for EventTag {
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        _scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        cx.unbind_own(element);
        for (dom_event, emitted) in cx.split_pairs(raw) {
            let Some(emitted) = emitted.filter(|e| !e.is_empty()) else {
                log::debug!(target: "template.tags", "event pair '{dom_event}' has no name");
                continue;
            };
            let context = context.clone();
            let listener: Listener = Rc::new(move |dcx: &DispatchCx<'_>, event: &DomEvent| {
                dcx.emitter.emit(
                    &emitted,
                    &EventArgs::Dom {
                        element,
                        event,
                        context: &context,
                    },
                );
            });
            cx.bind(element, &dom_event, listener);
        }
        Ok(TagOutcome::Continue)
    }
}
