use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

use super::adapter::AlwaysCapable;
use super::traits::{SharedHandler, SharedUnconditional};

/// What re-adding an already registered handler does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Leave the handler at its current position
    #[default]
    KeepPosition,
    /// Move the handler to the requested position (end for `add`)
    MoveToEnd,
}

/// Reference identity of a registered handler.
///
/// The address of the shared allocation. A registered handler's allocation is
/// kept alive by the registry, so the address cannot be reused by another
/// handler while the key is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey(usize);

impl HandlerKey {
    pub fn of<T: ?Sized>(handler: &Arc<T>) -> Self {
        Self(Arc::as_ptr(handler) as *const () as usize)
    }
}

/// A handler together with the identity it was registered under
pub struct HandlerEntry<R, H> {
    key: HandlerKey,
    handler: SharedHandler<R, H>,
}

impl<R, H> HandlerEntry<R, H> {
    pub fn new(handler: SharedHandler<R, H>) -> Self {
        Self {
            key: HandlerKey::of(&handler),
            handler,
        }
    }

    /// Wrap a simple handler once; identity stays the wrapped handler's
    pub fn unconditional(handler: SharedUnconditional<R, H>) -> Self
    where
        R: 'static,
        H: 'static,
    {
        let key = HandlerKey::of(&handler);
        Self {
            key,
            handler: Arc::new(AlwaysCapable::new(handler)),
        }
    }

    pub fn key(&self) -> HandlerKey {
        self.key
    }

    pub fn handler(&self) -> &SharedHandler<R, H> {
        &self.handler
    }
}

impl<R, H> Clone for HandlerEntry<R, H> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            handler: self.handler.clone(),
        }
    }
}

impl<R, H> fmt::Debug for HandlerEntry<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("key", &self.key)
            .field("handler", &"<dyn FetchHandler>")
            .finish()
    }
}

/// Immutable, ordered view of the registry at one point in time
pub struct Snapshot<R, H> {
    entries: Arc<[HandlerEntry<R, H>]>,
}

impl<R, H> Snapshot<R, H> {
    fn empty() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
        }
    }

    pub fn keys(&self) -> Vec<HandlerKey> {
        self.entries.iter().map(HandlerEntry::key).collect()
    }

    pub fn position_of<T: ?Sized>(&self, handler: &Arc<T>) -> Option<usize> {
        let key = HandlerKey::of(handler);
        self.entries.iter().position(|entry| entry.key == key)
    }
}

impl<R, H> Clone for Snapshot<R, H> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<R, H> Deref for Snapshot<R, H> {
    type Target = [HandlerEntry<R, H>];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<R, H> fmt::Debug for Snapshot<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

struct RegistryState<R, H> {
    /// Entries keyed by ordinal; iteration order is priority order
    slots: BTreeMap<u64, HandlerEntry<R, H>>,
    /// Identity index into `slots`
    positions: HashMap<HandlerKey, u64>,
    next_ordinal: u64,
    /// Materialized view handed out by `snapshot()`
    view: Snapshot<R, H>,
}

impl<R, H> RegistryState<R, H> {
    fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            positions: HashMap::new(),
            next_ordinal: 0,
            view: Snapshot::empty(),
        }
    }

    fn append(&mut self, entry: HandlerEntry<R, H>) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.positions.insert(entry.key, ordinal);
        self.slots.insert(ordinal, entry);
    }

    /// Returns true if the registry changed
    fn add(&mut self, entry: HandlerEntry<R, H>, policy: DuplicatePolicy) -> bool {
        match (self.positions.get(&entry.key).copied(), policy) {
            (None, _) => {
                self.append(entry);
                true
            }
            (Some(_), DuplicatePolicy::KeepPosition) => false,
            (Some(ordinal), DuplicatePolicy::MoveToEnd) => {
                if ordinal + 1 == self.next_ordinal {
                    return false;
                }
                self.slots.remove(&ordinal);
                self.append(entry);
                true
            }
        }
    }

    fn insert(
        &mut self,
        position: usize,
        entry: HandlerEntry<R, H>,
        policy: DuplicatePolicy,
    ) -> bool {
        let mut ordered: Vec<HandlerEntry<R, H>> =
            std::mem::take(&mut self.slots).into_values().collect();

        let changed = match ordered.iter().position(|e| e.key == entry.key) {
            Some(_) if policy == DuplicatePolicy::KeepPosition => false,
            Some(current) => {
                ordered.remove(current);
                ordered.insert(position.min(ordered.len()), entry);
                current != position.min(ordered.len() - 1)
            }
            None => {
                ordered.insert(position.min(ordered.len()), entry);
                true
            }
        };

        self.renumber(ordered);
        changed
    }

    fn remove(&mut self, key: HandlerKey) -> bool {
        match self.positions.remove(&key) {
            Some(ordinal) => {
                self.slots.remove(&ordinal);
                true
            }
            None => false,
        }
    }

    fn renumber(&mut self, ordered: Vec<HandlerEntry<R, H>>) {
        self.slots.clear();
        self.positions.clear();
        self.next_ordinal = 0;
        for entry in ordered {
            self.append(entry);
        }
    }

    fn publish(&mut self) {
        let entries: Vec<HandlerEntry<R, H>> = self.slots.values().cloned().collect();
        self.view = Snapshot {
            entries: Arc::from(entries),
        };
    }
}

/// Ordered, thread-safe registry of candidate handlers.
///
/// Mutations run under a write lock and publish a fresh [`Snapshot`] before
/// releasing it; a batch (`add_all`, `remove_keys`) publishes once, so readers
/// never observe it half applied. Taking a snapshot clones an `Arc`.
pub struct HandlerRegistry<R, H> {
    state: RwLock<RegistryState<R, H>>,
    policy: DuplicatePolicy,
}

impl<R, H> HandlerRegistry<R, H> {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn add(&self, entry: HandlerEntry<R, H>) {
        self.add_all(std::iter::once(entry));
    }

    pub fn add_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = HandlerEntry<R, H>>,
    {
        let mut state = self.state.write();
        let mut added = 0usize;
        for entry in entries {
            let key = entry.key;
            if state.add(entry, self.policy) {
                added += 1;
            } else {
                debug!(?key, "Handler already registered");
            }
        }
        if added > 0 {
            state.publish();
            debug!(added, total = state.slots.len(), "Handlers registered");
        }
    }

    /// Insert at `position`, clamped to the current length
    pub fn insert(&self, position: usize, entry: HandlerEntry<R, H>) {
        let mut state = self.state.write();
        let key = entry.key;
        if state.insert(position, entry, self.policy) {
            state.publish();
            debug!(?key, position, "Handler inserted");
        }
    }

    pub fn remove<T: ?Sized>(&self, handler: &Arc<T>) {
        self.remove_keys(std::iter::once(HandlerKey::of(handler)));
    }

    pub fn remove_keys<I>(&self, keys: I)
    where
        I: IntoIterator<Item = HandlerKey>,
    {
        let mut state = self.state.write();
        let mut removed = 0usize;
        for key in keys {
            if state.remove(key) {
                removed += 1;
            }
        }
        if removed > 0 {
            state.publish();
            debug!(removed, total = state.slots.len(), "Handlers removed");
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        if !state.slots.is_empty() {
            state.renumber(Vec::new());
            state.publish();
            debug!("Registry cleared");
        }
    }

    pub fn contains<T: ?Sized>(&self, handler: &Arc<T>) -> bool {
        self.state.read().positions.contains_key(&HandlerKey::of(handler))
    }

    pub fn len(&self) -> usize {
        self.state.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Snapshot<R, H> {
        self.state.read().view.clone()
    }
}

impl<R, H> Default for HandlerRegistry<R, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, H> fmt::Debug for HandlerRegistry<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("policy", &self.policy)
            .field("entries", &self.snapshot())
            .finish()
    }
}
