//! Live form-control values.
//!
//! Values and checked flags live beside the attributes, the way DOM
//! properties do: the `value` and `checked` attributes only seed them.
use crate::dom::{Dom, DomError};
use crate::types::NodeKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlType {
    Text,
    Checkbox,
    Radio,
    TextArea,
    Select,
    Other,
}

impl ControlType {
    pub fn is_checkable(self) -> bool {
        matches!(self, ControlType::Checkbox | ControlType::Radio)
    }
}

pub fn control_type(dom: &Dom, key: NodeKey) -> ControlType {
    match dom.element_name(key) {
        Some("input") => {}
        Some("textarea") => return ControlType::TextArea,
        Some("select") => return ControlType::Select,
        _ => return ControlType::Other,
    }
    let ty = dom.attr(key, "type").map(str::trim).filter(|s| !s.is_empty());
    match ty {
        Some(t) if t.eq_ignore_ascii_case("checkbox") => ControlType::Checkbox,
        Some(t) if t.eq_ignore_ascii_case("radio") => ControlType::Radio,
        // missing and unknown types behave as text
        _ => ControlType::Text,
    }
}

fn normalize_textarea_newlines(s: &str) -> String {
    if !s.contains('\r') {
        return s.to_string();
    }
    s.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn is_checked(dom: &Dom, key: NodeKey) -> bool {
    dom.form_state(key)
        .and_then(|state| state.checked)
        .unwrap_or_else(|| dom.has_attr(key, "checked"))
}

fn option_value(dom: &Dom, option: NodeKey) -> String {
    match dom.attr(option, "value") {
        Some(value) => value.to_string(),
        None => dom.text_content(option).trim().to_string(),
    }
}

fn options(dom: &Dom, select: NodeKey) -> Vec<NodeKey> {
    dom.descendants_with_self(select)
        .into_iter()
        .filter(|k| dom.element_name(*k) == Some("option"))
        .collect()
}

fn is_selected(dom: &Dom, option: NodeKey) -> bool {
    dom.form_state(option)
        .and_then(|state| state.selected)
        .unwrap_or_else(|| dom.has_attr(option, "selected"))
}

/// Current value of a form control, `None` for non-controls and unchecked
/// checkboxes or radios.
pub fn form_value(dom: &Dom, key: NodeKey) -> Option<String> {
    match control_type(dom, key) {
        ControlType::Other => None,
        ControlType::Checkbox | ControlType::Radio => is_checked(dom, key)
            .then(|| dom.attr(key, "value").unwrap_or("on").to_string()),
        ControlType::Text => Some(
            dom.form_state(key)
                .and_then(|state| state.value.clone())
                .unwrap_or_else(|| dom.attr(key, "value").unwrap_or_default().to_string()),
        ),
        ControlType::TextArea => Some(
            dom.form_state(key)
                .and_then(|state| state.value.clone())
                .unwrap_or_else(|| normalize_textarea_newlines(&dom.text_content(key))),
        ),
        ControlType::Select => {
            let options = options(dom, key);
            let selected = options
                .iter()
                .copied()
                .find(|o| is_selected(dom, *o))
                .or_else(|| options.first().copied())?;
            Some(option_value(dom, selected))
        }
    }
}

/// Set the value of a text-like control or pick the matching `option` of a
/// `select`. Returns whether the control accepted a value.
pub fn set_form_value(dom: &mut Dom, key: NodeKey, value: &str) -> Result<bool, DomError> {
    match control_type(dom, key) {
        ControlType::Text | ControlType::TextArea => {
            dom.form_state_mut(key)?.value = Some(value.to_string());
            Ok(true)
        }
        ControlType::Select => {
            let options = options(dom, key);
            let mut matched = false;
            for option in options {
                let hit = !matched && option_value(dom, option) == value;
                matched |= hit;
                dom.form_state_mut(option)?.selected = Some(hit);
            }
            Ok(matched)
        }
        ControlType::Checkbox | ControlType::Radio | ControlType::Other => Ok(false),
    }
}

/// Check or uncheck a checkbox or radio. Returns whether `key` is checkable.
pub fn set_checked(dom: &mut Dom, key: NodeKey, checked: bool) -> Result<bool, DomError> {
    if !control_type(dom, key).is_checkable() {
        return Ok(false);
    }
    dom.form_state_mut(key)?.checked = Some(checked);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fragment;

    fn control(markup: &str) -> (Dom, NodeKey) {
        let (dom, root) = parse_fragment(markup);
        let el = dom.element_children(root)[0];
        (dom, el)
    }

    #[test]
    fn classifies_controls() {
        for (markup, expected) in [
            ("<input>", ControlType::Text),
            ("<input type=email>", ControlType::Text),
            ("<input type=CHECKBOX>", ControlType::Checkbox),
            ("<input type=radio>", ControlType::Radio),
            ("<textarea></textarea>", ControlType::TextArea),
            ("<select></select>", ControlType::Select),
            ("<div></div>", ControlType::Other),
        ] {
            let (dom, el) = control(markup);
            assert_eq!(control_type(&dom, el), expected, "{markup}");
        }
    }

    #[test]
    fn text_value_is_seeded_from_attribute_and_then_independent() {
        let (mut dom, el) = control(r#"<input value="Tobi">"#);
        assert_eq!(form_value(&dom, el).as_deref(), Some("Tobi"));
        assert!(set_form_value(&mut dom, el, "Brian").unwrap());
        assert_eq!(form_value(&dom, el).as_deref(), Some("Brian"));
        assert_eq!(dom.attr(el, "value"), Some("Tobi"));
    }

    #[test]
    fn textarea_reads_its_text() {
        let (dom, el) = control("<textarea>line\r\nnext</textarea>");
        assert_eq!(form_value(&dom, el).as_deref(), Some("line\nnext"));
    }

    #[test]
    fn checkbox_value_follows_checked_state() {
        let (mut dom, el) = control("<input type=checkbox checked>");
        assert_eq!(form_value(&dom, el).as_deref(), Some("on"));
        assert!(set_checked(&mut dom, el, false).unwrap());
        assert_eq!(form_value(&dom, el), None);
        assert!(!set_form_value(&mut dom, el, "x").unwrap());
    }

    #[test]
    fn select_reads_and_picks_options() {
        let (mut dom, el) =
            control("<select><option>a</option><option value=b2>b</option></select>");
        assert_eq!(form_value(&dom, el).as_deref(), Some("a"));
        assert!(set_form_value(&mut dom, el, "b2").unwrap());
        assert_eq!(form_value(&dom, el).as_deref(), Some("b2"));
        assert!(!set_form_value(&mut dom, el, "zzz").unwrap());
        assert_eq!(form_value(&dom, el).as_deref(), Some("a"));
    }

    #[test]
    fn cloning_keeps_live_state() {
        let (mut dom, el) = control("<input>");
        set_form_value(&mut dom, el, "typed").unwrap();
        let copy = dom.clone_node(el, true).unwrap();
        assert_eq!(form_value(&dom, copy).as_deref(), Some("typed"));
    }
}
