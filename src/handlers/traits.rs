use std::sync::Arc;
use thiserror::Error;

/// Dispatch errors raised by a composite before any handler accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no capable handler for request")]
    NoCapableHandler,
}

/// Capability contract shared by leaf handlers and composites.
///
/// `can_handle` must be side-effect free and cheap: a composite calls it on
/// every resolution for every handler up to the first match. Once it returned
/// true for a request, `execute` is expected to accept that request; failures
/// after that point travel through the returned handle.
pub trait FetchHandler<R>: Send + Sync {
    /// Handle returned to the caller (tracking, cancellation, result)
    type Handle;

    fn can_handle(&self, request: &R) -> bool;

    fn execute(&self, request: R) -> Self::Handle;
}

/// Simpler contract for handlers that accept every request.
///
/// Register these through `CompositeHandler::add_unconditional`, which wraps
/// them in [`AlwaysCapable`](super::AlwaysCapable).
pub trait UnconditionalHandler<R>: Send + Sync {
    type Handle;

    fn execute(&self, request: R) -> Self::Handle;
}

/// Shared handler reference as stored by the registry
pub type SharedHandler<R, H> = Arc<dyn FetchHandler<R, Handle = H>>;

/// Shared reference to a handler implementing only the simple contract
pub type SharedUnconditional<R, H> = Arc<dyn UnconditionalHandler<R, Handle = H>>;
