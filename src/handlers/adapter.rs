use super::traits::{FetchHandler, SharedUnconditional};

/// Adapts an [`UnconditionalHandler`](super::UnconditionalHandler) to the
/// probe-based contract. The probe always answers true, so anything
/// registered after it in the same composite is never reached.
pub struct AlwaysCapable<R, H> {
    inner: SharedUnconditional<R, H>,
}

impl<R, H> AlwaysCapable<R, H> {
    pub fn new(inner: SharedUnconditional<R, H>) -> Self {
        Self { inner }
    }
}

impl<R, H> FetchHandler<R> for AlwaysCapable<R, H> {
    type Handle = H;

    fn can_handle(&self, _request: &R) -> bool {
        true
    }

    fn execute(&self, request: R) -> H {
        self.inner.execute(request)
    }
}
