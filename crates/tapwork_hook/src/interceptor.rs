//! Cross-cutting observers of hook registration and invocation.
//!
//! An [`Interceptor`] bundles up to four optional callbacks. Interceptors run
//! in the order they were added, see the same taps and arguments the hook
//! sees, and cannot change a call's result. A failing callback aborts the
//! operation with [`HookError::Interceptor`](crate::HookError::Interceptor),
//! which callers can tell apart from tap failures.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tapwork_hook::{Hook, Interceptor, SyncHook, Tap};
//!
//! let hook = SyncHook::<u32>::new("compile");
//! let taps_seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&taps_seen);
//!
//! hook.intercept(Interceptor::new("counter").on_tap(move |_tap| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! }))
//! .unwrap();
//!
//! hook.register(Tap::sync("a", |_: &u32| Ok(()))).unwrap();
//! hook.register(Tap::sync("b", |_: &u32| Ok(()))).unwrap();
//! hook.call(&1).unwrap();
//!
//! assert_eq!(taps_seen.load(Ordering::SeqCst), 2);
//! ```

use core::fmt;
use std::sync::Arc;

use crate::error::InterceptorError;
use crate::tap::TapInfo;

type InterceptFn<T> = Arc<dyn Fn(&T) -> Result<(), InterceptorError> + Send + Sync>;

/// A set of optional observer callbacks attached to a hook.
///
/// `A` is the hook's argument type.
pub struct Interceptor<A> {
    name: String,
    pub(crate) register: Option<InterceptFn<TapInfo>>,
    pub(crate) call: Option<InterceptFn<A>>,
    pub(crate) tap: Option<InterceptFn<TapInfo>>,
    pub(crate) loop_: Option<InterceptFn<A>>,
}

impl<A> Interceptor<A> {
    /// Creates an interceptor with no callbacks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            register: None,
            call: None,
            tap: None,
            loop_: None,
        }
    }

    /// Returns the interceptor's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fires when a tap is registered, and for taps already present when the
    /// interceptor is added.
    #[must_use]
    pub fn on_register(
        mut self,
        callback: impl Fn(&TapInfo) -> Result<(), InterceptorError> + Send + Sync + 'static,
    ) -> Self {
        self.register = Some(Arc::new(callback));
        self
    }

    /// Fires once per call, before any tap runs.
    #[must_use]
    pub fn on_call(
        mut self,
        callback: impl Fn(&A) -> Result<(), InterceptorError> + Send + Sync + 'static,
    ) -> Self {
        self.call = Some(Arc::new(callback));
        self
    }

    /// Fires immediately before each tap runs.
    #[must_use]
    pub fn on_tap(
        mut self,
        callback: impl Fn(&TapInfo) -> Result<(), InterceptorError> + Send + Sync + 'static,
    ) -> Self {
        self.tap = Some(Arc::new(callback));
        self
    }

    /// Fires at the start of every iteration of a looping hook.
    #[must_use]
    pub fn on_loop(
        mut self,
        callback: impl Fn(&A) -> Result<(), InterceptorError> + Send + Sync + 'static,
    ) -> Self {
        self.loop_ = Some(Arc::new(callback));
        self
    }
}

impl<A> Clone for Interceptor<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            register: self.register.clone(),
            call: self.call.clone(),
            tap: self.tap.clone(),
            loop_: self.loop_.clone(),
        }
    }
}

impl<A> fmt::Debug for Interceptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name)
            .field("register", &self.register.is_some())
            .field("call", &self.call.is_some())
            .field("tap", &self.tap.is_some())
            .field("loop", &self.loop_.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_callbacks() {
        let interceptor: Interceptor<u8> = Interceptor::new("tracer")
            .on_call(|_| Ok(()))
            .on_loop(|_| Ok(()));
        assert_eq!(interceptor.name(), "tracer");
        assert!(interceptor.call.is_some());
        assert!(interceptor.loop_.is_some());
        assert!(interceptor.register.is_none());
        assert!(interceptor.tap.is_none());
    }

    #[test]
    fn clone_shares_callbacks() {
        let interceptor: Interceptor<u8> =
            Interceptor::new("tracer").on_tap(|_| Err(InterceptorError::new("nope")));
        let copy = interceptor.clone();
        let info = TapInfo {
            name: "t".into(),
            stage: 0,
            before: Vec::new(),
            mode: crate::tap::TapMode::Sync,
        };
        let callback = copy.tap.expect("tap callback should be cloned");
        assert!(callback(&info).is_err());
    }
}
