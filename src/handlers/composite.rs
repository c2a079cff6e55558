use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use super::registry::{DuplicatePolicy, HandlerEntry, HandlerKey, HandlerRegistry, Snapshot};
use super::traits::{DispatchError, FetchHandler, SharedHandler, SharedUnconditional};
use crate::observability::DispatchMetrics;

const DEFAULT_NAME: &str = "composite";

/// Chain-of-responsibility dispatcher over an ordered set of handlers.
///
/// Each request is offered to the registered handlers in order; the first
/// whose probe accepts it executes it and its handle is returned unchanged.
/// When nobody accepts, the handle is built from
/// [`DispatchError::NoCapableHandler`]. The composite implements
/// [`FetchHandler`] itself, so composites nest.
///
/// Resolution works on a [`Snapshot`]: no lock is held while probing or
/// executing, and concurrent `add`/`remove` calls only affect later
/// resolutions.
pub struct CompositeHandler<R, H> {
    name: String,
    registry: HandlerRegistry<R, H>,
    metrics: DispatchMetrics,
}

impl<R, H> CompositeHandler<R, H> {
    /// Create a composite seeded with `handlers` in priority order
    pub fn new<I>(handlers: I) -> Self
    where
        I: IntoIterator<Item = SharedHandler<R, H>>,
    {
        Self::with_policy(handlers, DuplicatePolicy::default())
    }

    pub fn with_policy<I>(handlers: I, policy: DuplicatePolicy) -> Self
    where
        I: IntoIterator<Item = SharedHandler<R, H>>,
    {
        let registry = HandlerRegistry::with_policy(policy);
        registry.add_all(handlers.into_iter().map(HandlerEntry::new));

        Self {
            name: DEFAULT_NAME.to_string(),
            registry,
            metrics: DispatchMetrics::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Label used in log fields
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&self, handler: SharedHandler<R, H>) {
        self.registry.add(HandlerEntry::new(handler));
    }

    /// Add several handlers at once; other callers see all or none of them
    pub fn add_all<I>(&self, handlers: I)
    where
        I: IntoIterator<Item = SharedHandler<R, H>>,
    {
        self.registry
            .add_all(handlers.into_iter().map(HandlerEntry::new));
    }

    pub fn insert(&self, position: usize, handler: SharedHandler<R, H>) {
        self.registry.insert(position, HandlerEntry::new(handler));
    }

    /// Register a handler that accepts every request.
    ///
    /// Anything after it in this composite becomes unreachable, so it
    /// normally goes last.
    pub fn add_unconditional(&self, handler: SharedUnconditional<R, H>)
    where
        R: 'static,
        H: 'static,
    {
        self.registry.add(HandlerEntry::unconditional(handler));
    }

    pub fn add_all_unconditional<I>(&self, handlers: I)
    where
        I: IntoIterator<Item = SharedUnconditional<R, H>>,
        R: 'static,
        H: 'static,
    {
        self.registry
            .add_all(handlers.into_iter().map(HandlerEntry::unconditional));
    }

    /// Remove by reference identity; absent handlers are ignored
    pub fn remove<T: ?Sized>(&self, handler: &Arc<T>) {
        self.registry.remove(handler);
    }

    pub fn remove_all<'a, T, I>(&self, handlers: I)
    where
        T: ?Sized + 'a,
        I: IntoIterator<Item = &'a Arc<T>>,
    {
        self.registry
            .remove_keys(handlers.into_iter().map(HandlerKey::of));
    }

    pub fn contains<T: ?Sized>(&self, handler: &Arc<T>) -> bool {
        self.registry.contains(handler)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot<R, H> {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &HandlerRegistry<R, H> {
        &self.registry
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// First handler in the current order that accepts `request`
    pub fn resolve(&self, request: &R) -> Option<SharedHandler<R, H>> {
        self.select(request).0.map(|(_, handler)| handler)
    }

    /// Probe a snapshot in order; also returns how many probes ran
    fn select(&self, request: &R) -> (Option<(usize, SharedHandler<R, H>)>, u64) {
        let snapshot = self.registry.snapshot();

        let mut probes = 0u64;
        let selected = snapshot.iter().enumerate().find(|&(position, entry)| {
            probes += 1;
            let accepted = entry.handler().can_handle(request);
            trace!(composite = %self.name, position, accepted, "Probed handler");
            accepted
        });

        (
            selected.map(|(position, entry)| (position, entry.handler().clone())),
            probes,
        )
    }
}

impl<R, H> FetchHandler<R> for CompositeHandler<R, H>
where
    H: From<DispatchError>,
{
    type Handle = H;

    fn can_handle(&self, request: &R) -> bool {
        self.select(request).0.is_some()
    }

    fn execute(&self, request: R) -> H {
        let (selected, probes) = self.select(&request);
        self.metrics.resolution_started();
        self.metrics.probed(probes);

        match selected {
            Some((position, handler)) => {
                self.metrics.dispatched();
                debug!(composite = %self.name, position, "Dispatching request");
                handler.execute(request)
            }
            None => {
                self.metrics.unmatched();
                debug!(composite = %self.name, "No capable handler");
                H::from(DispatchError::NoCapableHandler)
            }
        }
    }
}

impl<R, H> Default for CompositeHandler<R, H> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R, H> fmt::Debug for CompositeHandler<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeHandler")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .finish()
    }
}
