//! Handler dispatch for fetchchain
//!
//! Requests are routed to one of several registered handlers following
//! chain-of-responsibility semantics: the first handler, in registration
//! order, whose probe accepts a request executes it.
//!
//! ## Key Components
//!
//! - [`FetchHandler`] - Capability contract (probe + execute)
//! - [`UnconditionalHandler`] - Execute-only contract, adapted by [`AlwaysCapable`]
//! - [`HandlerRegistry`] - Ordered, thread-safe handler set with snapshots
//! - [`CompositeHandler`] - Dispatcher that is itself a [`FetchHandler`]
//! - [`FetchTask`] - Cancellable execution handle
//!
//! ## Example
//!
//! ```rust,ignore
//! use fetchchain::handlers::{CompositeHandler, FetchHandler};
//!
//! let composite = CompositeHandler::new([memory_cache, disk_cache, network]);
//! composite.add_unconditional(placeholder);
//!
//! let task = composite.execute(request);
//! let outcome = task.wait().await;
//! ```

mod adapter;
mod composite;
mod registry;
mod traits;
pub(crate) mod types;

pub use adapter::AlwaysCapable;
pub use composite::CompositeHandler;
pub use registry::{DuplicatePolicy, HandlerEntry, HandlerKey, HandlerRegistry, Snapshot};
pub use traits::{
    DispatchError, FetchHandler, SharedHandler, SharedUnconditional, UnconditionalHandler,
};
pub use types::{FetchError, FetchResult, FetchTask, TaskCompleter};
