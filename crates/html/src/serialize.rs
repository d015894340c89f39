use crate::dom::{Dom, NodeKind};
use crate::entities::{escape_attribute, escape_text};
use crate::tokenizer::is_void_element;
use crate::types::NodeKey;

/// Markup for `key` and its subtree. Fragments serialize as their children.
pub fn outer_html(dom: &Dom, key: NodeKey) -> String {
    let mut out = String::new();
    write_node(dom, key, &mut out);
    out
}

pub fn inner_html(dom: &Dom, key: NodeKey) -> String {
    let mut out = String::new();
    for &child in dom.children(key) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &Dom, key: NodeKey, out: &mut String) {
    let Some(kind) = dom.kind(key) else {
        return;
    };
    match kind {
        NodeKind::Fragment => {
            for &child in dom.children(key) {
                write_node(dom, child, out);
            }
        }
        NodeKind::Text { text } => {
            let raw_parent = dom
                .parent(key)
                .and_then(|p| dom.element_name(p))
                .is_some_and(|name| name == "script" || name == "style");
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeKind::Comment { text } => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for (attr, value) in attributes {
                out.push(' ');
                out.push_str(attr);
                if let Some(value) = value {
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            for &child in dom.children(key) {
                write_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fragment;

    #[test]
    fn serializes_what_it_parses() {
        let markup = r#"<ul class="names"><li bind-each="names" hidden>a &amp; b</li></ul><br><!-- c -->"#;
        let (dom, root) = parse_fragment(markup);
        assert_eq!(outer_html(&dom, root), markup);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut dom = Dom::new();
        let p = dom.create_element("p");
        dom.set_attr(p, "title", "say \"hi\"").unwrap();
        dom.set_text_content(p, "1 < 2").unwrap();
        assert_eq!(
            outer_html(&dom, p),
            r#"<p title="say &quot;hi&quot;">1 &lt; 2</p>"#
        );
        assert_eq!(inner_html(&dom, p), "1 &lt; 2");
    }

    #[test]
    fn script_text_is_raw() {
        let (dom, root) = parse_fragment("<script>a < b && c</script>");
        assert_eq!(outer_html(&dom, root), "<script>a < b && c</script>");
    }
}
