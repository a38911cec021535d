//! Exactly-once release of an open stream handle

use crate::http::StreamHandle;
use tracing::trace;

/// Owns a stream handle and closes it exactly once.
///
/// Closing happens on the first call to [`HandleGuard::release`] or on drop,
/// whichever comes first.
pub struct HandleGuard {
    handle: Option<Box<dyn StreamHandle>>,
}

impl HandleGuard {
    pub fn new(handle: Box<dyn StreamHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// The handle, unless already released
    pub fn handle_mut(&mut self) -> Option<&mut Box<dyn StreamHandle>> {
        self.handle.as_mut()
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Close the handle. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            trace!("closing stream handle");
            handle.close();
        }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RawStreamUnit;
    use crate::providers::ProviderResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl StreamHandle for Counting {
        async fn next_unit(&mut self) -> Option<ProviderResult<RawStreamUnit>> {
            None
        }

        fn close(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_then_drop_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut guard = HandleGuard::new(Box::new(Counting(closes.clone())));

        guard.release();
        guard.release();
        assert!(guard.is_released());
        assert!(guard.handle_mut().is_none());
        drop(guard);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes() {
        let closes = Arc::new(AtomicUsize::new(0));
        drop(HandleGuard::new(Box::new(Counting(closes.clone()))));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
