//! Synchronous named-event emitter owned by a template.
//!
//! All methods take `&self`; handlers may subscribe or unsubscribe while an
//! emit is running because the handler list is snapshotted first.
use crate::listeners::DomEvent;
use crate::value::Value;
use html::NodeKey;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Arguments delivered with an event.
#[derive(Clone, Copy, Debug)]
pub enum EventArgs<'a> {
    /// The generic `change` event.
    Change { scope: &'a str, value: &'a Value },
    /// `change:<prefix>`; `rest` is the part of the scope below the prefix.
    ScopedChange { rest: &'a str, value: &'a Value },
    /// Raised by an event binding on `element`.
    Dom {
        element: NodeKey,
        event: &'a DomEvent,
        context: &'a Value,
    },
    Custom(&'a [Value]),
}

pub type Handler = Rc<dyn Fn(&EventArgs<'_>)>;

#[derive(Default)]
pub struct Emitter {
    next_id: Cell<u64>,
    handlers: RefCell<HashMap<String, Vec<(SubscriptionId, Handler)>>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: &str, handler: impl Fn(&EventArgs<'_>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn off(&self, event: &str, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    pub fn off_all(&self, event: &str) -> usize {
        self.handlers
            .borrow_mut()
            .remove(event)
            .map_or(0, |list| list.len())
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.borrow().get(event).map_or(0, Vec::len)
    }

    /// Call every handler subscribed to `event`; returns how many ran.
    pub fn emit(&self, event: &str, args: &EventArgs<'_>) -> usize {
        let snapshot: Vec<Handler> = match self.handlers.borrow().get(event) {
            Some(list) => list.iter().map(|(_, h)| h.clone()).collect(),
            None => return 0,
        };
        log::trace!(target: "template.events", "emit {event} to {} handlers", snapshot.len());
        for handler in &snapshot {
            handler(args);
        }
        snapshot.len()
    }

    /// Announce a value change at `scope`.
    ///
    /// Emits `change:<scope>`, then `change:<prefix>` for every shorter
    /// prefix with the remaining path, then the generic `change`.
    pub fn change(&self, scope: &str, value: &Value) {
        log::debug!(target: "template.events", "change at '{scope}'");
        self.emit(
            &format!("change:{scope}"),
            &EventArgs::ScopedChange { rest: "", value },
        );
        let segments: Vec<&str> = scope.split('.').collect();
        for n in (1..segments.len()).rev() {
            let prefix = segments[..n].join(".");
            let rest = segments[n..].join(".");
            self.emit(
                &format!("change:{prefix}"),
                &EventArgs::ScopedChange { rest: &rest, value },
            );
        }
        self.emit("change", &EventArgs::Change { scope, value });
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.borrow();
        let mut events: Vec<_> = handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        events.sort_unstable();
        f.debug_struct("Emitter").field("events", &events).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> impl Fn(&EventArgs<'_>) + 'static {
        let log = log.clone();
        move |args: &EventArgs<'_>| {
            let line = match args {
                EventArgs::Change { scope, value } => format!("{label} {scope}={value}"),
                EventArgs::ScopedChange { rest, value } => format!("{label} [{rest}] {value}"),
                EventArgs::Dom { element, .. } => format!("{label} dom {element}"),
                EventArgs::Custom(values) => format!("{label} custom {}", values.len()),
            };
            log.borrow_mut().push(line);
        }
    }

    #[test]
    fn change_fans_out_to_prefixes() {
        let emitter = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        emitter.on("change:person.name", recorder(&log, "full"));
        emitter.on("change:person", recorder(&log, "prefix"));
        emitter.on("change", recorder(&log, "any"));
        emitter.on("change:name", recorder(&log, "unrelated"));

        emitter.change("person.name", &Value::from("Brian"));
        assert_eq!(
            *log.borrow(),
            vec!["full [] Brian", "prefix [name] Brian", "any person.name=Brian"]
        );
    }

    #[test]
    fn off_removes_only_that_subscription() {
        let emitter = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = emitter.on("save", recorder(&log, "a"));
        emitter.on("save", recorder(&log, "b"));
        assert!(emitter.off("save", a));
        assert!(!emitter.off("save", a));
        assert_eq!(emitter.emit("save", &EventArgs::Custom(&[])), 1);
        assert_eq!(*log.borrow(), vec!["b custom 0"]);
        assert_eq!(emitter.off_all("save"), 1);
        assert_eq!(emitter.listener_count("save"), 0);
    }

    #[test]
    fn handlers_may_unsubscribe_during_emit() {
        let emitter = Rc::new(Emitter::new());
        let count = Rc::new(Cell::new(0));
        let slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let (e, c, s) = (Rc::downgrade(&emitter), count.clone(), slot.clone());
        let id = emitter.on("tick", move |_| {
            c.set(c.get() + 1);
            if let (Some(e), Some(id)) = (e.upgrade(), s.get()) {
                e.off("tick", id);
            }
        });
        slot.set(Some(id));
        let c2 = count.clone();
        emitter.on("tick", move |_| c2.set(c2.get() + 10));

        assert_eq!(emitter.emit("tick", &EventArgs::Custom(&[])), 2);
        assert_eq!(count.get(), 11);
        emitter.emit("tick", &EventArgs::Custom(&[]));
        assert_eq!(count.get(), 21);
    }
}
