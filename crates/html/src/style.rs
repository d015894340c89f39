//! Inline `style` attribute access.
use crate::dom::{Dom, DomError};
use crate::types::NodeKey;

// Properties where a unitless number means pixels.
const PIXEL_PROPERTIES: &[&str] = &[
    "width",
    "height",
    "min-width",
    "min-height",
    "max-width",
    "max-height",
    "top",
    "left",
    "right",
    "bottom",
    "margin",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "font-size",
    "border-width",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

// "color: red; font-size: 12px;" -> [color=red, font-size=12px]
pub fn parse_declarations(input: &str) -> Vec<Declaration> {
    input
        .split(';')
        .filter_map(|pair| {
            let (n, v) = pair.split_once(':')?;
            let name = n.trim().to_ascii_lowercase();
            let value = v.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some(Declaration {
                name,
                value: value.to_string(),
            })
        })
        .collect()
}

fn serialize_declarations(decls: &[Declaration]) -> String {
    decls
        .iter()
        .map(|d| format!("{}: {};", d.name, d.value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append `px` to a bare number on a pixel-like property.
pub fn coerce_length(property: &str, value: &str) -> String {
    let v = value.trim();
    let is_number = v.parse::<f64>().is_ok_and(f64::is_finite);
    if is_number && PIXEL_PROPERTIES.contains(&property) {
        format!("{v}px")
    } else {
        v.to_string()
    }
}

pub fn get_css(dom: &Dom, key: NodeKey, property: &str) -> Option<String> {
    let property = property.trim().to_ascii_lowercase();
    parse_declarations(dom.attr(key, "style")?)
        .into_iter()
        .rev()
        .find(|d| d.name == property)
        .map(|d| d.value)
}

/// Set one declaration; an empty value removes it.
pub fn set_css(dom: &mut Dom, key: NodeKey, property: &str, value: &str) -> Result<(), DomError> {
    if !dom.is_element(key) {
        return Err(DomError::WrongNodeKind(key));
    }
    let property = property.trim().to_ascii_lowercase();
    let mut decls = dom.attr(key, "style").map(parse_declarations).unwrap_or_default();
    decls.retain(|d| d.name != property);
    let value = coerce_length(&property, value);
    if !value.is_empty() {
        decls.push(Declaration {
            name: property,
            value,
        });
    }
    if decls.is_empty() {
        dom.remove_attr(key, "style")?;
    } else {
        dom.set_attr(key, "style", &serialize_declarations(&decls))?;
    }
    Ok(())
}

pub fn hide(dom: &mut Dom, key: NodeKey) -> Result<(), DomError> {
    set_css(dom, key, "display", "none")
}

pub fn show(dom: &mut Dom, key: NodeKey) -> Result<(), DomError> {
    set_css(dom, key, "display", "")
}

pub fn is_hidden(dom: &Dom, key: NodeKey) -> bool {
    get_css(dom, key, "display").is_some_and(|d| d.eq_ignore_ascii_case("none"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element() -> (Dom, NodeKey) {
        let mut dom = Dom::new();
        let el = dom.create_element("div");
        (dom, el)
    }

    #[test]
    fn parses_declarations_leniently() {
        let decls = parse_declarations(" Color : red;;font-size:12px; bogus; empty: ;");
        assert_eq!(
            decls,
            vec![
                Declaration {
                    name: "color".into(),
                    value: "red".into()
                },
                Declaration {
                    name: "font-size".into(),
                    value: "12px".into()
                },
            ]
        );
    }

    #[test]
    fn set_and_get_roundtrip_through_the_attribute() {
        let (mut dom, el) = element();
        set_css(&mut dom, el, "color", "red").unwrap();
        set_css(&mut dom, el, "width", "10").unwrap();
        assert_eq!(dom.attr(el, "style"), Some("color: red; width: 10px;"));
        assert_eq!(get_css(&dom, el, "WIDTH").as_deref(), Some("10px"));
    }

    #[test]
    fn unitless_numbers_stay_bare_on_other_properties() {
        assert_eq!(coerce_length("opacity", "0.5"), "0.5");
        assert_eq!(coerce_length("line-height", "2"), "2");
        assert_eq!(coerce_length("margin-left", "4"), "4px");
        assert_eq!(coerce_length("width", "4em"), "4em");
    }

    #[test]
    fn hide_and_show_toggle_display() {
        let (mut dom, el) = element();
        dom.set_attr(el, "style", "color: blue").unwrap();
        hide(&mut dom, el).unwrap();
        assert!(is_hidden(&dom, el));
        show(&mut dom, el).unwrap();
        assert!(!is_hidden(&dom, el));
        assert_eq!(dom.attr(el, "style"), Some("color: blue;"));
    }

    #[test]
    fn removing_the_last_declaration_drops_the_attribute() {
        let (mut dom, el) = element();
        hide(&mut dom, el).unwrap();
        show(&mut dom, el).unwrap();
        assert!(!dom.has_attr(el, "style"));
    }

    #[test]
    fn text_nodes_have_no_style() {
        let mut dom = Dom::new();
        let text = dom.create_text("x");
        assert_eq!(hide(&mut dom, text), Err(DomError::WrongNodeKind(text)));
        assert_eq!(get_css(&dom, text, "display"), None);
    }
}
