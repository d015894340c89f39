//! The array tag: one visible clone per list item, reconciled in place.
//!
//! The element carrying the tag is the stamp. Clones are inserted before it
//! as siblings and carry an index marker; the stamp itself stays hidden. On
//! later passes clones are matched to list positions by their marker, so a
//! row that still exists keeps its node (and its listeners).
use super::{Tag, TagOutcome};
use crate::engine::TagCx;
use crate::error::TemplateError;
use crate::value::Value;
use html::NodeKey;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct EachTag {
    marker: String,
}

impl EachTag {
    /// `marker` is the attribute holding each clone's list index.
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_ascii_lowercase(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Existing clones of `template`, keyed by index. A stamp's clones are
    /// the unbroken run of marked siblings right before it, so a second
    /// stamp over the same list keeps its own rows. Clones whose marker is
    /// unusable or points past `len` are removed.
    fn collect_clones(
        &self,
        cx: &mut TagCx<'_>,
        template: NodeKey,
        parent: NodeKey,
        raw: &str,
        len: usize,
    ) -> Result<BTreeMap<usize, NodeKey>, TemplateError> {
        let attribute = cx.attribute().to_string();
        let dom = cx.dom();
        let siblings = dom.children(parent);
        let position = siblings.iter().position(|&k| k == template).unwrap_or(0);
        let mut run = Vec::new();
        for &sibling in siblings[..position].iter().rev() {
            if !dom.is_element(sibling) {
                continue;
            }
            if dom.attr(sibling, &attribute) != Some(raw) {
                break;
            }
            let Some(marker) = dom.attr(sibling, &self.marker) else {
                break;
            };
            run.push((sibling, marker.parse::<usize>().ok()));
        }

        let mut existing = BTreeMap::new();
        let mut stale = Vec::new();
        for (sibling, index) in run.into_iter().rev() {
            match index {
                Some(index) if index < len && !existing.contains_key(&index) => {
                    existing.insert(index, sibling);
                }
                _ => stale.push(sibling),
            }
        }
        if !stale.is_empty() {
            log::debug!(target: "template.tags", "{template}: removing {} clones", stale.len());
        }
        for clone in stale {
            cx.remove(clone)?;
        }
        Ok(existing)
    }
}

impl Tag for EachTag {
    fn apply(
        &self,
        cx: &mut TagCx<'_>,
        element: NodeKey,
        context: &Value,
        raw: &str,
        scope: &str,
    ) -> Result<TagOutcome, TemplateError> {
        let items = match cx.resolve(context, raw) {
            Some(Value::List(items)) => items.to_vec(),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                log::debug!(target: "template.tags", "'{raw}' is not a list: {other:?}");
                Vec::new()
            }
        };

        cx.show(element)?;
        let Some(parent) = cx.dom().parent(element) else {
            log::warn!(target: "template.tags", "array template {element} has no parent");
            cx.hide(element)?;
            return Ok(TagOutcome::Suppress);
        };

        let existing = self.collect_clones(cx, element, parent, raw, items.len())?;
        let reused = existing.len();
        for (index, item) in items.into_iter().enumerate() {
            let clone = match existing.get(&index) {
                Some(&clone) => clone,
                None => cx.dom_mut().clone_node(element, true)?,
            };
            cx.dom_mut().set_attr(clone, &self.marker, &index.to_string())?;
            let before = existing
                .range(index + 1..)
                .next()
                .map_or(element, |(_, &next)| next);
            cx.dom_mut().insert_before(parent, clone, before)?;
            let row_scope = cx.extend_scope(scope, &format!("{raw}.{index}"));
            cx.render_clone(clone, item, row_scope)?;
        }
        log::trace!(target: "template.tags", "{element}: reused {reused} clones");

        cx.hide(element)?;
        Ok(TagOutcome::Suppress)
    }

    fn clone_marker(&self) -> Option<&str> {
        Some(&self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Template;
    use serde_json::json;

    fn names(markup: &str, list: serde_json::Value) -> Template {
        let mut template = Template::parse(markup);
        template.render(&Value::from(json!({ "names": list }))).unwrap();
        template
    }

    fn rows(template: &Template) -> Vec<(NodeKey, String)> {
        let dom = template.dom().unwrap();
        let container = template.container().unwrap();
        let list = dom.element_children(container)[0];
        dom.element_children(list)
            .into_iter()
            .filter(|&li| dom.has_attr(li, "bind-each-index"))
            .map(|li| (li, dom.text_content(li)))
            .collect()
    }

    #[test]
    fn clones_precede_the_hidden_stamp() {
        let template = names(
            "<ul><li bind-each=\"names\"><span bind-text=\"@\"></span></li></ul>",
            json!(["Tobi", "Paul"]),
        );
        let dom = template.dom().unwrap();
        let list = dom.element_children(template.container().unwrap())[0];
        let children = dom.element_children(list);
        assert_eq!(children.len(), 3);
        assert_eq!(dom.attr(children[0], "bind-each-index"), Some("0"));
        assert_eq!(dom.attr(children[1], "bind-each-index"), Some("1"));
        assert!(html::style::is_hidden(dom, children[2]));
        assert!(!html::style::is_hidden(dom, children[0]));
        assert_eq!(dom.text_content(children[2]), "");
    }

    #[test]
    fn markers_out_of_range_or_duplicated_are_dropped() {
        let mut template = Template::parse(
            "<ul>\
             <li bind-each=\"names\" bind-each-index=\"0\" bind-text=\"@\">x</li>\
             <li bind-each=\"names\" bind-each-index=\"0\" bind-text=\"@\">dup</li>\
             <li bind-each=\"names\" bind-each-index=\"nope\" bind-text=\"@\">bad</li>\
             <li bind-each=\"names\" bind-each-index=\"7\" bind-text=\"@\">far</li>\
             <li bind-each=\"names\" bind-text=\"@\"></li></ul>",
        );
        template
            .render(&Value::from(json!({ "names": ["a", "b"] })))
            .unwrap();
        let texts: Vec<String> = rows(&template).into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn non_list_values_clear_the_rows() {
        let mut template = names(
            "<ul><li bind-each=\"names\" bind-text=\"@\"></li></ul>",
            json!(["Tobi"]),
        );
        assert_eq!(rows(&template).len(), 1);
        template
            .update(&Value::from(json!({ "names": "Tobi" })))
            .unwrap();
        assert!(rows(&template).is_empty());
    }

    #[test]
    fn clones_of_a_different_list_are_left_alone() {
        let mut template = Template::parse(
            "<ul><li bind-each=\"a\" bind-text=\"@\"></li><li bind-each=\"b\" bind-text=\"@\"></li></ul>",
        );
        template
            .render(&Value::from(json!({ "a": [1, 2], "b": [3] })))
            .unwrap();
        let texts: Vec<String> = rows(&template).into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        template
            .update(&Value::from(json!({ "a": [1], "b": [3, 4] })))
            .unwrap();
        let texts: Vec<String> = rows(&template).into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["1", "3", "4"]);
    }
}
