//! Session event bus.
//!
//! Four channels carry the session's notifications:
//! - `editor_loaded` / `post_loaded`: [`LoadChannel`], completes at most once
//!   and replays completion to late subscribers
//! - `editor_changed` / `post_changed`: [`ChangeChannel`], broadcasts tokens
//!   and hands late subscribers the last token only
//!
//! Delivery is synchronous: `complete` and `next` return after every listener
//! has run. Channel state is an explicit `{last value, completed}` holder.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Tokens broadcast on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorEvent {
    EditorLoaded,
    EditorChanged,
    PostLoaded,
    PostSaved,
    PostPublished,
    PublishCancelled,
}

impl EditorEvent {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EditorLoaded => "editor-loaded",
            Self::EditorChanged => "editor-changed",
            Self::PostLoaded => "post-loaded",
            Self::PostSaved => "post-saved",
            Self::PostPublished => "post-published",
            Self::PublishCancelled => "publish-cancelled",
        }
    }
}

impl fmt::Display for EditorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// State of a load channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Not fired yet.
    Pending,
    Completed,
}

struct Listeners<F: ?Sized> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Rc<RefCell<F>>)>,
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> Listeners<F> {
    fn allocate(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, listener: Rc<RefCell<F>>) -> SubscriptionId {
        let id = self.allocate();
        self.entries.push((id, listener));
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    fn snapshot(&self) -> Vec<Rc<RefCell<F>>> {
        self.entries.iter().map(|(_, l)| l.clone()).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

type LoadListener = dyn FnMut();
type ChangeListener = dyn FnMut(EditorEvent);

#[derive(Default)]
struct LoadInner {
    completed: bool,
    listeners: Listeners<LoadListener>,
}

/// One-shot completion channel with replay.
#[derive(Clone)]
pub struct LoadChannel {
    event: EditorEvent,
    inner: Rc<RefCell<LoadInner>>,
}

impl LoadChannel {
    fn new(event: EditorEvent) -> Self {
        Self {
            event,
            inner: Rc::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.event.as_str()
    }

    pub fn state(&self) -> LoadState {
        if self.inner.borrow().completed {
            LoadState::Completed
        } else {
            LoadState::Pending
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state() == LoadState::Completed
    }

    /// Register a completion listener.
    ///
    /// If the channel already completed the listener runs immediately and is
    /// not retained.
    pub fn subscribe(&self, listener: impl FnMut() + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        if inner.completed {
            let id = inner.listeners.allocate();
            drop(inner);
            let mut listener = listener;
            listener();
            return id;
        }
        inner.listeners.insert(Rc::new(RefCell::new(listener)))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().listeners.remove(id)
    }

    /// Complete the channel. Returns false if it had already completed.
    pub fn complete(&self) -> bool {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            if inner.completed {
                return false;
            }
            inner.completed = true;
            std::mem::take(&mut inner.listeners.entries)
        };

        tracing::debug!(channel = self.name(), listeners = listeners.len(), "channel completed");
        for (_, listener) in listeners {
            match listener.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(),
                Err(_) => tracing::warn!(channel = self.name(), "skipping re-entrant listener"),
            }
        }
        true
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl fmt::Debug for LoadChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadChannel")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

#[derive(Default)]
struct ChangeInner {
    current: Option<EditorEvent>,
    emitted: u64,
    listeners: Listeners<ChangeListener>,
}

/// Unbounded token channel that never completes.
#[derive(Clone)]
pub struct ChangeChannel {
    name: &'static str,
    inner: Rc<RefCell<ChangeInner>>,
}

impl ChangeChannel {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Rc::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last token broadcast, or `None` if the channel has not fired.
    pub fn current(&self) -> Option<EditorEvent> {
        self.inner.borrow().current
    }

    /// Number of tokens broadcast so far.
    pub fn emitted(&self) -> u64 {
        self.inner.borrow().emitted
    }

    /// Register a token listener. It immediately receives the current token,
    /// if there is one.
    pub fn subscribe(&self, listener: impl FnMut(EditorEvent) + 'static) -> SubscriptionId {
        let listener: Rc<RefCell<ChangeListener>> = Rc::new(RefCell::new(listener));
        let (id, current) = {
            let mut inner = self.inner.borrow_mut();
            (inner.listeners.insert(listener.clone()), inner.current)
        };
        if let Some(token) = current {
            (&mut *listener.borrow_mut())(token);
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().listeners.remove(id)
    }

    pub fn next(&self, token: EditorEvent) {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            inner.current = Some(token);
            inner.emitted += 1;
            inner.listeners.snapshot()
        };

        tracing::trace!(channel = self.name, %token, "broadcast");
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(token),
                Err(_) => tracing::warn!(channel = self.name, %token, "skipping re-entrant listener"),
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl fmt::Debug for ChangeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeChannel")
            .field("name", &self.name)
            .field("current", &self.current())
            .finish()
    }
}

/// The four channels of one editor session.
///
/// Cloning shares the channels; a new session builds a new bus.
#[derive(Clone, Debug)]
pub struct EventBus {
    editor_loaded: LoadChannel,
    editor_changed: ChangeChannel,
    post_loaded: LoadChannel,
    post_changed: ChangeChannel,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            editor_loaded: LoadChannel::new(EditorEvent::EditorLoaded),
            editor_changed: ChangeChannel::new("editor-changed"),
            post_loaded: LoadChannel::new(EditorEvent::PostLoaded),
            post_changed: ChangeChannel::new("post-changed"),
        }
    }

    pub fn editor_loaded(&self) -> &LoadChannel {
        &self.editor_loaded
    }

    pub fn editor_changed(&self) -> &ChangeChannel {
        &self.editor_changed
    }

    pub fn post_loaded(&self) -> &LoadChannel {
        &self.post_loaded
    }

    pub fn post_changed(&self) -> &ChangeChannel {
        &self.post_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_load_channel_completes_once() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        bus.editor_loaded().subscribe(move || h.set(h.get() + 1));

        assert_eq!(bus.editor_loaded().state(), LoadState::Pending);
        assert!(bus.editor_loaded().complete());
        assert!(!bus.editor_loaded().complete());
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.editor_loaded().listener_count(), 0);
    }

    #[test]
    fn test_load_channel_replays_to_late_subscriber() {
        let bus = EventBus::new();
        bus.post_loaded().complete();

        let seen = Rc::new(Cell::new(false));
        let s = seen.clone();
        bus.post_loaded().subscribe(move || s.set(true));
        assert!(seen.get());
    }

    #[test]
    fn test_load_channels_are_independent() {
        let bus = EventBus::new();
        bus.editor_loaded().complete();
        assert!(bus.editor_loaded().is_completed());
        assert!(!bus.post_loaded().is_completed());
    }

    #[test]
    fn test_change_channel_late_subscriber_sees_current_only() {
        let bus = EventBus::new();
        bus.post_changed().next(EditorEvent::PostSaved);
        bus.post_changed().next(EditorEvent::PublishCancelled);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        bus.post_changed().subscribe(move |t| s.borrow_mut().push(t));
        bus.post_changed().next(EditorEvent::PostPublished);

        assert_eq!(
            *seen.borrow(),
            vec![EditorEvent::PublishCancelled, EditorEvent::PostPublished]
        );
        assert_eq!(bus.post_changed().emitted(), 3);
    }

    #[test]
    fn test_change_channel_unfired_has_no_current() {
        let bus = EventBus::new();
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        bus.editor_changed().subscribe(move |_| s.set(s.get() + 1));
        assert_eq!(bus.editor_changed().current(), None);
        assert_eq!(seen.get(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        let id = bus
            .editor_changed()
            .subscribe(move |_| s.set(s.get() + 1));

        bus.editor_changed().next(EditorEvent::EditorChanged);
        assert!(bus.editor_changed().unsubscribe(id));
        assert!(!bus.editor_changed().unsubscribe(id));
        bus.editor_changed().next(EditorEvent::EditorChanged);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_listener_may_read_channel_state() {
        let bus = EventBus::new();
        let observed = Rc::new(Cell::new(None));
        let o = observed.clone();
        let channel = bus.post_changed().clone();
        bus.post_changed()
            .subscribe(move |_| o.set(channel.current()));

        bus.post_changed().next(EditorEvent::PostSaved);
        assert_eq!(observed.get(), Some(EditorEvent::PostSaved));
    }

    #[test]
    fn test_token_names() {
        assert_eq!(EditorEvent::PublishCancelled.to_string(), "publish-cancelled");
        assert_eq!(EditorEvent::EditorChanged.as_str(), "editor-changed");
        assert_eq!(EventBus::new().post_loaded().name(), "post-loaded");
    }
}
