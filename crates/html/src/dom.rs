//! Mutable in-memory node arena.
//!
//! Every node lives in one [`Dom`] and is addressed by a [`NodeKey`] that the
//! arena generates when the node is created, cloned or imported. Removed
//! slots are reused under a new generation, so a key held across mutations
//! either still names the same node or names nothing.
use crate::types::NodeKey;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomError {
    UnknownKey(NodeKey),
    WrongNodeKind(NodeKey),
    InvalidParent(NodeKey),
    InvalidSibling { parent: NodeKey, before: NodeKey },
    CycleDetected { parent: NodeKey, child: NodeKey },
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::UnknownKey(key) => write!(f, "unknown node {key}"),
            DomError::WrongNodeKind(key) => write!(f, "node {key} has the wrong kind"),
            DomError::InvalidParent(key) => write!(f, "node {key} cannot have children"),
            DomError::InvalidSibling { parent, before } => {
                write!(f, "node {before} is not a child of {parent}")
            }
            DomError::CycleDetected { parent, child } => {
                write!(f, "inserting {child} under {parent} would create a cycle")
            }
        }
    }
}

impl std::error::Error for DomError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Fragment,
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

/// Live form-control state, kept apart from attributes like DOM properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FormState {
    pub(crate) value: Option<String>,
    pub(crate) checked: Option<bool>,
    pub(crate) selected: Option<bool>,
}

#[derive(Clone, Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    form: FormState,
}

impl NodeRecord {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            form: FormState::default(),
        }
    }

    fn allows_children(&self) -> bool {
        matches!(self.kind, NodeKind::Fragment | NodeKind::Element { .. })
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<NodeRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct Dom {
    // Slot 0 is reserved for the invalid key.
    slots: Vec<Slot>,
    // Vacated slots, their generation already bumped.
    free: Vec<u32>,
}

impl Dom {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::default()],
            free: Vec::new(),
        }
    }

    /// # Panics
    ///
    /// Panics when more than `u32::MAX` nodes are alive at once.
    fn insert(&mut self, kind: NodeKind) -> NodeKey {
        if self.slots.is_empty() {
            self.slots.push(Slot::default());
        }
        let record = Some(NodeRecord::new(kind));
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = record;
            return NodeKey::new(index, slot.generation);
        }
        let Ok(index) = u32::try_from(self.slots.len()) else {
            panic!("node arena exhausted: {} slots in use", self.slots.len());
        };
        self.slots.push(Slot {
            generation: 0,
            record,
        });
        NodeKey::new(index, 0)
    }

    fn release(&mut self, key: NodeKey) {
        let Some(slot) = self.slots.get_mut(key.slot() as usize) else {
            return;
        };
        if slot.generation != key.generation() || slot.record.take().is_none() {
            return;
        }
        // A slot whose generation would wrap is retired for good.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(key.slot());
        }
    }

    fn record(&self, key: NodeKey) -> Result<&NodeRecord, DomError> {
        self.slots
            .get(key.slot() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.record.as_ref())
            .ok_or(DomError::UnknownKey(key))
    }

    fn record_mut(&mut self, key: NodeKey) -> Result<&mut NodeRecord, DomError> {
        self.slots
            .get_mut(key.slot() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.record.as_mut())
            .ok_or(DomError::UnknownKey(key))
    }

    /// Number of slots the arena holds, live or vacant.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn create_fragment(&mut self) -> NodeKey {
        self.insert(NodeKind::Fragment)
    }

    pub fn create_element(&mut self, name: &str) -> NodeKey {
        self.insert(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.insert(NodeKind::Text {
            text: text.to_string(),
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        self.insert(NodeKind::Comment {
            text: text.to_string(),
        })
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.record(key).is_ok()
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.record.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.record(key).ok().map(|r| &r.kind)
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        matches!(self.kind(key), Some(NodeKind::Element { .. }))
    }

    pub fn is_fragment(&self, key: NodeKey) -> bool {
        matches!(self.kind(key), Some(NodeKind::Fragment))
    }

    pub fn element_name(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key)? {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.record(key).ok()?.parent
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.record(key)
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.children(key)
            .iter()
            .copied()
            .filter(|k| self.is_element(*k))
            .collect()
    }

    /// Element siblings of `key`, in document order, excluding `key` itself.
    pub fn siblings(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(parent) = self.parent(key) else {
            return Vec::new();
        };
        self.element_children(parent)
            .into_iter()
            .filter(|k| *k != key)
            .collect()
    }

    /// Preorder walk of `key` and all of its descendants.
    pub fn descendants_with_self(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        if !self.contains(key) {
            return out;
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            dom: self,
            next: self.parent(key),
        }
    }

    pub fn is_descendant(&self, ancestor: NodeKey, maybe_descendant: NodeKey) -> bool {
        self.ancestors(maybe_descendant).any(|k| k == ancestor)
    }

    /// Nearest node satisfying `pred`, walking up from `key`.
    ///
    /// `include_self` tests `key` first. When `stop_at` is reached it is still
    /// tested, but the walk does not continue past it.
    pub fn closest(
        &self,
        key: NodeKey,
        include_self: bool,
        stop_at: Option<NodeKey>,
        mut pred: impl FnMut(NodeKey) -> bool,
    ) -> Option<NodeKey> {
        if include_self && pred(key) {
            return Some(key);
        }
        if Some(key) == stop_at {
            return None;
        }
        for ancestor in self.ancestors(key) {
            if pred(ancestor) {
                return Some(ancestor);
            }
            if Some(ancestor) == stop_at {
                return None;
            }
        }
        None
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child)?;
        self.record_mut(parent)?.children.push(child);
        self.record_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` before `before` under `parent`, moving it if attached.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        before: NodeKey,
    ) -> Result<(), DomError> {
        if child == before {
            return Ok(());
        }
        self.check_insert(parent, child)?;
        if self.record(before)?.parent != Some(parent) {
            return Err(DomError::InvalidSibling { parent, before });
        }
        self.detach(child)?;
        let siblings = &mut self.record_mut(parent)?.children;
        let pos = siblings
            .iter()
            .position(|k| *k == before)
            .ok_or(DomError::InvalidSibling { parent, before })?;
        siblings.insert(pos, child);
        self.record_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn check_insert(&self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        if parent == child || self.is_descendant(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        if !self.record(parent)?.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        self.record(child)?;
        Ok(())
    }

    /// Unlink `key` from its parent; the subtree stays alive.
    pub fn detach(&mut self, key: NodeKey) -> Result<(), DomError> {
        let Some(parent) = self.record_mut(key)?.parent.take() else {
            return Ok(());
        };
        self.record_mut(parent)?.children.retain(|k| *k != key);
        Ok(())
    }

    /// Unlink `key` and drop it together with its whole subtree.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), DomError> {
        self.detach(key)?;
        for dead in self.descendants_with_self(key) {
            self.release(dead);
        }
        log::trace!(target: "html.dom", "removed subtree {key}");
        Ok(())
    }

    pub fn remove_children(&mut self, key: NodeKey) -> Result<(), DomError> {
        for child in self.children(key).to_vec() {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Copy `key` (and its descendants when `deep`) as a detached subtree.
    pub fn clone_node(&mut self, key: NodeKey, deep: bool) -> Result<NodeKey, DomError> {
        let record = self.record(key)?;
        let (kind, form) = (record.kind.clone(), record.form.clone());
        let copy = self.insert(kind);
        self.record_mut(copy)?.form = form;
        if deep {
            for child in self.children(key).to_vec() {
                let child_copy = self.clone_node(child, true)?;
                self.append_child(copy, child_copy)?;
            }
        }
        Ok(copy)
    }

    /// Deep-copy a subtree of another `Dom` into this one as a detached node.
    pub fn import(&mut self, other: &Dom, key: NodeKey) -> Result<NodeKey, DomError> {
        let record = other.record(key)?;
        let copy = self.insert(record.kind.clone());
        self.record_mut(copy)?.form = record.form.clone();
        for &child in &record.children {
            let child_copy = self.import(other, child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    pub fn attributes(&self, key: NodeKey) -> &[(String, Option<String>)] {
        match self.kind(key) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn has_attr(&self, key: NodeKey, name: &str) -> bool {
        self.attributes(key)
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Attribute value; boolean attributes read as `""`.
    pub fn attr(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.attributes(key)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    fn attributes_mut(
        &mut self,
        key: NodeKey,
    ) -> Result<&mut Vec<(String, Option<String>)>, DomError> {
        match &mut self.record_mut(key)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::WrongNodeKind(key)),
        }
    }

    pub fn set_attr(&mut self, key: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        let attributes = self.attributes_mut(key)?;
        match attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = Some(value.to_string()),
            None => attributes.push((name.to_ascii_lowercase(), Some(value.to_string()))),
        }
        Ok(())
    }

    /// Set a valueless attribute such as `disabled`.
    pub fn set_boolean_attr(&mut self, key: NodeKey, name: &str) -> Result<(), DomError> {
        let attributes = self.attributes_mut(key)?;
        match attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = None,
            None => attributes.push((name.to_ascii_lowercase(), None)),
        }
        Ok(())
    }

    /// Returns whether an attribute was present.
    pub fn remove_attr(&mut self, key: NodeKey, name: &str) -> Result<bool, DomError> {
        let attributes = self.attributes_mut(key)?;
        let before = attributes.len();
        attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        Ok(attributes.len() != before)
    }

    /// Own text of a text or comment node.
    pub fn text(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key)? {
            NodeKind::Text { text } | NodeKind::Comment { text } => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        for node in self.descendants_with_self(key) {
            if let Some(NodeKind::Text { text }) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace the children of `key` with a single text node.
    ///
    /// A sole existing text child is rewritten in place so its key survives.
    pub fn set_text_content(&mut self, key: NodeKey, text: &str) -> Result<(), DomError> {
        match &mut self.record_mut(key)?.kind {
            NodeKind::Text { text: own } | NodeKind::Comment { text: own } => {
                own.clear();
                own.push_str(text);
                return Ok(());
            }
            NodeKind::Fragment | NodeKind::Element { .. } => {}
        }
        let sole_text = match self.children(key) {
            [only] if matches!(self.kind(*only), Some(NodeKind::Text { .. })) => Some(*only),
            _ => None,
        };
        if let Some(only) = sole_text {
            if text.is_empty() {
                return self.remove(only);
            }
            if let NodeKind::Text { text: own } = &mut self.record_mut(only)?.kind {
                own.clear();
                own.push_str(text);
            }
            return Ok(());
        }
        self.remove_children(key)?;
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(key, node)?;
        }
        Ok(())
    }

    pub(crate) fn form_state(&self, key: NodeKey) -> Option<&FormState> {
        self.record(key).ok().map(|r| &r.form)
    }

    pub(crate) fn form_state_mut(&mut self, key: NodeKey) -> Result<&mut FormState, DomError> {
        Ok(&mut self.record_mut(key)?.form)
    }
}

pub struct Ancestors<'a> {
    dom: &'a Dom,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let current = self.next?;
        self.next = self.dom.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Dom, NodeKey, NodeKey, NodeKey) {
        let mut dom = Dom::new();
        let root = dom.create_fragment();
        let div = dom.create_element("div");
        let p = dom.create_element("P");
        dom.append_child(root, div).unwrap();
        dom.append_child(div, p).unwrap();
        (dom, root, div, p)
    }

    #[test]
    fn reused_slots_never_revive_stale_keys() {
        let (mut dom, _, div, p) = tree();
        dom.remove(p).unwrap();
        let fresh = dom.create_element("span");
        assert_eq!(fresh.slot(), p.slot());
        assert_ne!(fresh, p);
        assert_ne!(fresh, div);
        assert!(!dom.contains(p));
        assert!(dom.contains(fresh));
        assert_eq!(dom.set_attr(p, "id", "x"), Err(DomError::UnknownKey(p)));
        assert_eq!(dom.element_name(fresh), Some("span"));
    }

    #[test]
    fn churn_keeps_the_arena_bounded() {
        let (mut dom, _, div, _) = tree();
        for _ in 0..1000 {
            let rows: Vec<NodeKey> = (0..10)
                .map(|i| {
                    let li = dom.create_element("li");
                    dom.append_child(div, li).unwrap();
                    dom.set_text_content(li, &i.to_string()).unwrap();
                    li
                })
                .collect();
            for row in rows {
                dom.remove(row).unwrap();
            }
        }
        assert_eq!(dom.len(), 3);
        assert!(dom.slot_count() <= 4 + 20, "{} slots", dom.slot_count());
    }

    #[test]
    fn element_names_are_lowercased() {
        let (dom, _, _, p) = tree();
        assert_eq!(dom.element_name(p), Some("p"));
    }

    #[test]
    fn insert_before_moves_attached_nodes() {
        let mut dom = Dom::new();
        let root = dom.create_fragment();
        let a = dom.create_element("a");
        let b = dom.create_element("b");
        let c = dom.create_element("c");
        for k in [a, b, c] {
            dom.append_child(root, k).unwrap();
        }
        dom.insert_before(root, c, a).unwrap();
        assert_eq!(dom.children(root), &[c, a, b]);
        assert_eq!(dom.parent(c), Some(root));
    }

    #[test]
    fn rejects_cycles_and_bad_parents() {
        let (mut dom, root, div, p) = tree();
        assert_eq!(
            dom.append_child(p, div),
            Err(DomError::CycleDetected {
                parent: p,
                child: div
            })
        );
        let text = dom.create_text("x");
        assert_eq!(
            dom.append_child(text, p),
            Err(DomError::InvalidParent(text))
        );
        let stray = dom.create_element("i");
        assert_eq!(
            dom.insert_before(root, stray, p),
            Err(DomError::InvalidSibling {
                parent: root,
                before: p
            })
        );
    }

    #[test]
    fn remove_drops_the_whole_subtree() {
        let (mut dom, root, div, p) = tree();
        dom.remove(div).unwrap();
        assert!(!dom.contains(div));
        assert!(!dom.contains(p));
        assert!(dom.children(root).is_empty());
    }

    #[test]
    fn deep_clone_copies_structure_with_fresh_keys() {
        let (mut dom, _, div, p) = tree();
        dom.set_attr(p, "class", "x").unwrap();
        let copy = dom.clone_node(div, true).unwrap();
        assert_ne!(copy, div);
        assert_eq!(dom.parent(copy), None);
        let copied_p = dom.children(copy)[0];
        assert_ne!(copied_p, p);
        assert_eq!(dom.attr(copied_p, "class"), Some("x"));

        let shallow = dom.clone_node(div, false).unwrap();
        assert!(dom.children(shallow).is_empty());
    }

    #[test]
    fn closest_tests_stop_node_before_stopping() {
        let (mut dom, root, div, p) = tree();
        dom.set_attr(div, "bind-scope", "person").unwrap();
        let found = dom.closest(p, false, Some(div), |k| dom.has_attr(k, "bind-scope"));
        assert_eq!(found, Some(div));
        let none = dom.closest(p, false, Some(div), |k| k == root);
        assert_eq!(none, None);
        assert_eq!(dom.closest(p, true, None, |k| k == p), Some(p));
    }

    #[test]
    fn attributes_are_case_insensitive() {
        let (mut dom, _, div, _) = tree();
        dom.set_attr(div, "Data-Active", "true").unwrap();
        assert_eq!(dom.attr(div, "data-active"), Some("true"));
        dom.set_attr(div, "data-active", "false").unwrap();
        assert_eq!(dom.attributes(div).len(), 1);
        assert!(dom.remove_attr(div, "DATA-ACTIVE").unwrap());
        assert!(!dom.has_attr(div, "data-active"));
    }

    #[test]
    fn set_text_content_reuses_a_sole_text_child() {
        let (mut dom, _, _, p) = tree();
        dom.set_text_content(p, "Tobi").unwrap();
        let text = dom.children(p)[0];
        dom.set_text_content(p, "Brian").unwrap();
        assert_eq!(dom.children(p), &[text]);
        assert_eq!(dom.text_content(p), "Brian");
        dom.set_text_content(p, "").unwrap();
        assert!(dom.children(p).is_empty());
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let (mut dom, _, div, p) = tree();
        let a = dom.create_text("a");
        let b = dom.create_text("b");
        dom.append_child(div, a).unwrap();
        dom.append_child(p, b).unwrap();
        assert_eq!(dom.text_content(div), "ba");
    }

    #[test]
    fn import_copies_from_another_dom() {
        let (source, _, div, _) = tree();
        let mut target = Dom::new();
        let copy = target.import(&source, div).unwrap();
        assert_eq!(target.element_name(copy), Some("div"));
        assert_eq!(target.element_children(copy).len(), 1);
    }
}
