//! Process-wide request context save and restore.
//!
//! A rebuild runs outside any request, but collaborators that price or
//! date-check items may consult the ambient context. The orchestrator
//! captures it on entry and restores it on every exit path.

use std::sync::RwLock;

use tracing::{debug, warn};

use catalog_types::RequestContext;

/// Holder of the ambient request context.
pub trait AmbientContext: Send + Sync {
    fn capture(&self) -> RequestContext;

    fn restore(&self, context: RequestContext);
}

/// Ambient context kept behind a lock.
#[derive(Debug, Default)]
pub struct SharedRequestContext {
    inner: RwLock<RequestContext>,
}

impl SharedRequestContext {
    pub fn new(context: RequestContext) -> Self {
        Self {
            inner: RwLock::new(context),
        }
    }

    /// Replace the current context.
    pub fn set(&self, context: RequestContext) {
        self.restore(context);
    }
}

impl AmbientContext for SharedRequestContext {
    fn capture(&self) -> RequestContext {
        match self.inner.read() {
            Ok(context) => context.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn restore(&self, context: RequestContext) {
        match self.inner.write() {
            Ok(mut current) => *current = context,
            Err(poisoned) => {
                warn!("Request context lock poisoned, restoring anyway");
                *poisoned.into_inner() = context;
            }
        }
    }
}

/// Restores the captured context when dropped.
pub struct ContextGuard<'a> {
    context: &'a dyn AmbientContext,
    saved: RequestContext,
}

impl<'a> ContextGuard<'a> {
    pub fn capture(context: &'a dyn AmbientContext) -> Self {
        Self {
            saved: context.capture(),
            context,
        }
    }

    /// The context as it was on capture.
    pub fn saved(&self) -> &RequestContext {
        &self.saved
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.context.restore(std::mem::take(&mut self.saved));
        debug!("Restored request context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_on_drop() {
        let shared = SharedRequestContext::new(RequestContext::new().with_currency("USD"));

        {
            let guard = ContextGuard::capture(&shared);
            assert_eq!(guard.saved().currency.as_deref(), Some("USD"));
            shared.set(RequestContext::new().with_currency("EUR"));
            assert_eq!(shared.capture().currency.as_deref(), Some("EUR"));
        }

        assert_eq!(shared.capture().currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let shared = SharedRequestContext::new(RequestContext::new().with_currency("USD"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ContextGuard::capture(&shared);
            shared.set(RequestContext::new().with_currency("GBP"));
            panic!("page failed");
        }));

        assert!(result.is_err());
        assert_eq!(shared.capture().currency.as_deref(), Some("USD"));
    }
}
