//! Per-element DOM listener bookkeeping.
//!
//! Bindings are keyed by [`NodeKey`] and grouped by owner (the tag attribute
//! that created them), so a tag can drop its own bindings on an element
//! without touching listeners other tags or callers attached.
use crate::emitter::Emitter;
use html::{Dom, NodeKey};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomEvent {
    pub name: String,
    pub target: NodeKey,
    pub bubbles: bool,
}

impl DomEvent {
    pub fn new(name: &str, target: NodeKey) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            target,
            bubbles: true,
        }
    }

    pub fn non_bubbling(name: &str, target: NodeKey) -> Self {
        Self {
            bubbles: false,
            ..Self::new(name, target)
        }
    }
}

/// What a listener sees while an event is delivered.
pub struct DispatchCx<'a> {
    pub dom: &'a Dom,
    pub emitter: &'a Emitter,
    /// Element the running listener is bound to.
    pub current_target: NodeKey,
}

pub type Listener = Rc<dyn Fn(&DispatchCx<'_>, &DomEvent)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Binding {
    id: ListenerId,
    event: String,
    owner: Option<Rc<str>>,
    listener: Listener,
}

#[derive(Clone, Default)]
pub struct ListenerTracker {
    next_id: u64,
    by_element: HashMap<NodeKey, Vec<Binding>>,
}

impl ListenerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, element: NodeKey, event: &str, listener: Listener) -> ListenerId {
        self.bind_owned(element, event, None, listener)
    }

    pub(crate) fn bind_owned(
        &mut self,
        element: NodeKey,
        event: &str,
        owner: Option<Rc<str>>,
        listener: Listener,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.by_element.entry(element).or_default().push(Binding {
            id,
            event: event.to_ascii_lowercase(),
            owner,
            listener,
        });
        log::trace!(target: "template.events", "bind {event} on {element}");
        id
    }

    /// Drop bindings on `element`: all of them, all for `event`, or the one
    /// with `id`. Returns how many were removed.
    pub fn unbind(&mut self, element: NodeKey, event: Option<&str>, id: Option<ListenerId>) -> usize {
        self.remove_where(element, |b| {
            event.is_none_or(|e| b.event.eq_ignore_ascii_case(e)) && id.is_none_or(|id| b.id == id)
        })
    }

    pub(crate) fn unbind_owner(&mut self, element: NodeKey, owner: &str) -> usize {
        self.remove_where(element, |b| b.owner.as_deref() == Some(owner))
    }

    fn remove_where(&mut self, element: NodeKey, pred: impl Fn(&Binding) -> bool) -> usize {
        let Some(list) = self.by_element.get_mut(&element) else {
            return 0;
        };
        let before = list.len();
        list.retain(|b| !pred(b));
        let removed = before - list.len();
        if list.is_empty() {
            self.by_element.remove(&element);
        }
        removed
    }

    /// Unbind every listener on `root` and its descendants.
    pub fn unbind_subtree(&mut self, dom: &Dom, root: NodeKey) -> usize {
        let removed: usize = dom
            .descendants_with_self(root)
            .into_iter()
            .map(|k| self.unbind(k, None, None))
            .sum();
        if removed > 0 {
            log::trace!(target: "template.events", "unbound {removed} listeners under {root}");
        }
        removed
    }

    /// Listeners on `element` for `event`, in binding order.
    pub fn snapshot(&self, element: NodeKey, event: &str) -> Vec<Listener> {
        self.by_element
            .get(&element)
            .into_iter()
            .flatten()
            .filter(|b| b.event.eq_ignore_ascii_case(event))
            .map(|b| b.listener.clone())
            .collect()
    }

    pub fn count(&self, element: NodeKey) -> usize {
        self.by_element.get(&element).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.by_element.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_element.is_empty()
    }

    /// Deliver `event` to the target and, when it bubbles, to each ancestor
    /// below `boundary`. Listener lists are captured before any runs.
    pub fn dispatch(&self, dom: &Dom, emitter: &Emitter, event: &DomEvent, boundary: NodeKey) -> usize {
        let mut path = vec![event.target];
        if event.bubbles {
            path.extend(dom.ancestors(event.target).take_while(|k| *k != boundary));
        }
        let deliveries: Vec<(NodeKey, Listener)> = path
            .into_iter()
            .flat_map(|k| self.snapshot(k, &event.name).into_iter().map(move |l| (k, l)))
            .collect();
        log::trace!(
            target: "template.events",
            "dispatch {} on {} to {} listeners",
            event.name,
            event.target,
            deliveries.len()
        );
        for (current_target, listener) in &deliveries {
            let cx = DispatchCx {
                dom,
                emitter,
                current_target: *current_target,
            };
            listener(&cx, event);
        }
        deliveries.len()
    }
}

impl std::fmt::Debug for ListenerTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerTracker")
            .field("elements", &self.by_element.len())
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting(hits: &Rc<Cell<usize>>) -> Listener {
        let hits = hits.clone();
        Rc::new(move |_cx: &DispatchCx<'_>, _ev: &DomEvent| hits.set(hits.get() + 1))
    }

    fn nested() -> (Dom, NodeKey, NodeKey, NodeKey) {
        let mut dom = Dom::new();
        let root = dom.create_fragment();
        let outer = dom.create_element("div");
        let inner = dom.create_element("button");
        dom.append_child(root, outer).unwrap();
        dom.append_child(outer, inner).unwrap();
        (dom, root, outer, inner)
    }

    #[test]
    fn unbind_by_event_or_id() {
        let (_, _, el, _) = nested();
        let hits = Rc::new(Cell::new(0));
        let mut tracker = ListenerTracker::new();
        let a = tracker.bind(el, "click", counting(&hits));
        tracker.bind(el, "click", counting(&hits));
        tracker.bind(el, "keyup", counting(&hits));
        assert_eq!(tracker.unbind(el, Some("click"), Some(a)), 1);
        assert_eq!(tracker.unbind(el, Some("CLICK"), None), 1);
        assert_eq!(tracker.count(el), 1);
        assert_eq!(tracker.unbind(el, None, None), 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn owners_are_unbound_independently() {
        let (_, _, el, _) = nested();
        let hits = Rc::new(Cell::new(0));
        let mut tracker = ListenerTracker::new();
        tracker.bind_owned(el, "click", Some("bind-value".into()), counting(&hits));
        tracker.bind_owned(el, "click", Some("bind-event".into()), counting(&hits));
        assert_eq!(tracker.unbind_owner(el, "bind-value"), 1);
        assert_eq!(tracker.snapshot(el, "click").len(), 1);
    }

    #[test]
    fn dispatch_bubbles_up_to_the_boundary() {
        let (dom, root, outer, inner) = nested();
        let hits = Rc::new(Cell::new(0));
        let mut tracker = ListenerTracker::new();
        tracker.bind(inner, "click", counting(&hits));
        tracker.bind(outer, "click", counting(&hits));
        tracker.bind(root, "click", counting(&hits));
        let emitter = Emitter::new();

        assert_eq!(tracker.dispatch(&dom, &emitter, &DomEvent::new("click", inner), root), 2);
        assert_eq!(
            tracker.dispatch(&dom, &emitter, &DomEvent::non_bubbling("click", inner), root),
            1
        );
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn unbind_subtree_clears_descendants() {
        let (dom, _, outer, inner) = nested();
        let hits = Rc::new(Cell::new(0));
        let mut tracker = ListenerTracker::new();
        tracker.bind(inner, "click", counting(&hits));
        tracker.bind(outer, "keyup", counting(&hits));
        assert_eq!(tracker.unbind_subtree(&dom, outer), 2);
        assert_eq!(tracker.len(), 0);
    }
}
