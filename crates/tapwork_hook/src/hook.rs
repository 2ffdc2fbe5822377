//! Shared registration model behind every hook kind.
//!
//! Each concrete hook type ([`SyncHook`](crate::SyncHook),
//! [`AsyncParallelHook`](crate::AsyncParallelHook), ...) wraps a [`HookCore`]
//! and fixes the call-kind at construction. Registration, removal,
//! interception, and order resolution live here once; only `call` differs
//! between kinds.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{HookError, InterceptPhase, RegistrationError, TapError, TapFailure};
use crate::interceptor::Interceptor;
use crate::registry::{ResolvedOrder, TapRegistry};
use crate::tap::{Tap, TapEntry, TapHandle, TapInfo, TapMode};

/// Source of unique hook ids, so handles cannot be used across hooks.
static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(0);

// ─────────────────────────────────────────────────────────────────────────────
// HookKind
// ─────────────────────────────────────────────────────────────────────────────

/// How a hook composes its taps into one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Every tap runs in order; the last tap's value is the result.
    Sync,
    /// Taps run in order until one returns a value.
    SyncBail,
    /// Each tap's value replaces the argument passed to the next tap.
    SyncWaterfall,
    /// Taps run in order; any returned value restarts from the first tap.
    SyncLoop,
    /// Taps run one at a time, each awaited before the next starts.
    AsyncSeries,
    /// Like `AsyncSeries`, stopping at the first returned value.
    AsyncSeriesBail,
    /// All taps start together; the call settles when all have completed.
    AsyncParallel,
}

impl HookKind {
    /// Returns true if the kind never suspends mid-call.
    #[must_use]
    pub fn is_sync(self) -> bool {
        matches!(
            self,
            HookKind::Sync | HookKind::SyncBail | HookKind::SyncWaterfall | HookKind::SyncLoop
        )
    }

    /// Returns true if taps of the given mode may be registered.
    #[must_use]
    pub fn accepts(self, mode: TapMode) -> bool {
        mode == TapMode::Sync || !self.is_sync()
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::Sync => "Sync",
            HookKind::SyncBail => "SyncBail",
            HookKind::SyncWaterfall => "SyncWaterfall",
            HookKind::SyncLoop => "SyncLoop",
            HookKind::AsyncSeries => "AsyncSeries",
            HookKind::AsyncSeriesBail => "AsyncSeriesBail",
            HookKind::AsyncParallel => "AsyncParallel",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookCore
// ─────────────────────────────────────────────────────────────────────────────

/// Name, call-kind, taps, and interceptors of one hook.
pub struct HookCore<A, R> {
    id: u64,
    name: String,
    kind: HookKind,
    registry: TapRegistry<A, R>,
    interceptors: RwLock<Vec<Interceptor<A>>>,
}

impl<A, R> HookCore<A, R> {
    pub(crate) fn new(name: impl Into<String>, kind: HookKind) -> Self {
        Self {
            id: NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            kind,
            registry: TapRegistry::new(),
            interceptors: RwLock::new(Vec::new()),
        }
    }

    /// Returns the hook's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hook's call-kind.
    #[must_use]
    pub fn kind(&self) -> HookKind {
        self.kind
    }

    /// Registers a tap.
    ///
    /// Fails with [`RegistrationError::IncompatibleMode`] if the tap's mode
    /// does not fit the call-kind, or with an interceptor error if a
    /// `register` interceptor rejects it. Cyclic `before` constraints are
    /// reported by the next call or [`resolved_order`](Self::resolved_order).
    pub fn register(&self, tap: Tap<A, R>) -> Result<TapHandle, HookError> {
        let mode = tap.mode();
        if !self.kind.accepts(mode) {
            return Err(RegistrationError::IncompatibleMode {
                hook: self.name.clone(),
                tap: tap.name,
                mode,
                kind: self.kind,
            }
            .into());
        }

        let info = tap.info();
        let interceptors = self.interceptors.read().clone();
        for interceptor in &interceptors {
            if let Some(callback) = &interceptor.register {
                callback(&info).map_err(|source| self.interceptor_error(InterceptPhase::Register, source))?;
            }
        }

        let Tap { func, .. } = tap;
        let tap_id = self.registry.insert(|id| TapEntry { id, info, func });
        tracing::debug!(hook = %self.name, tap_id, "tap registered");

        Ok(TapHandle {
            hook_id: self.id,
            tap_id,
        })
    }

    /// Removes a tap. Returns false if the handle belongs to another hook or
    /// the tap was already removed.
    ///
    /// Calls already in flight keep the order they started with.
    pub fn unregister(&self, handle: TapHandle) -> bool {
        handle.hook_id == self.id && self.registry.remove(handle.tap_id)
    }

    /// Adds an interceptor.
    ///
    /// Its `register` callback is replayed for every tap already registered;
    /// if that fails the interceptor is not added.
    pub fn intercept(&self, interceptor: Interceptor<A>) -> Result<(), HookError> {
        if let Some(callback) = &interceptor.register {
            for info in self.registry.infos() {
                callback(&info).map_err(|source| self.interceptor_error(InterceptPhase::Register, source))?;
            }
        }
        self.interceptors.write().push(interceptor);
        Ok(())
    }

    /// Returns true if any tap is registered.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.registry.len() > 0
    }

    /// Returns the number of registered taps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if no tap is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.is_used()
    }

    /// Returns tap names in registration order.
    #[must_use]
    pub fn tap_names(&self) -> Vec<String> {
        self.registry.infos().into_iter().map(|info| info.name).collect()
    }

    /// Returns the taps in the order a call would run them.
    ///
    /// The order is cached; repeated calls without registry changes return
    /// the same sequence.
    pub fn resolved_order(&self) -> Result<Vec<TapInfo>, RegistrationError> {
        let order = self.registry.resolve(&self.name)?;
        Ok(order.iter().map(|entry| entry.info.clone()).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves the order for a call and fires `call` interceptors.
    pub(crate) fn begin_call(&self, args: &A) -> Result<ResolvedOrder<A, R>, HookError> {
        let order = self.registry.resolve(&self.name)?;
        let interceptors = self.interceptors.read().clone();
        for interceptor in &interceptors {
            if let Some(callback) = &interceptor.call {
                callback(args).map_err(|source| self.interceptor_error(InterceptPhase::Call, source))?;
            }
        }
        tracing::debug!(hook = %self.name, kind = %self.kind, taps = order.len(), "calling hook");
        Ok(order)
    }

    /// Fires `tap` interceptors for the tap about to run.
    pub(crate) fn before_tap(&self, info: &TapInfo) -> Result<(), HookError> {
        let interceptors = self.interceptors.read().clone();
        for interceptor in &interceptors {
            if let Some(callback) = &interceptor.tap {
                callback(info).map_err(|source| self.interceptor_error(InterceptPhase::Tap, source))?;
            }
        }
        tracing::trace!(hook = %self.name, tap = %info.name, stage = info.stage, "running tap");
        Ok(())
    }

    /// Fires `loop` interceptors at the start of an iteration.
    pub(crate) fn begin_iteration(&self, args: &A) -> Result<(), HookError> {
        let interceptors = self.interceptors.read().clone();
        for interceptor in &interceptors {
            if let Some(callback) = &interceptor.loop_ {
                callback(args).map_err(|source| self.interceptor_error(InterceptPhase::Loop, source))?;
            }
        }
        Ok(())
    }

    /// Builds the error for a tap failure in a sequential call.
    ///
    /// `remaining` are the taps that will not run because of it.
    pub(crate) fn abort(
        &self,
        tap: &TapEntry<A, R>,
        error: TapError,
        remaining: &[Arc<TapEntry<A, R>>],
    ) -> HookError {
        let failure = self.failure(&tap.info.name, error);
        tracing::debug!(hook = %self.name, tap = %tap.info.name, skipped = remaining.len(), "tap failed");
        if remaining.is_empty() {
            HookError::TapExecution(failure)
        } else {
            HookError::DispatchAborted {
                failure,
                skipped: remaining.iter().map(|entry| entry.info.name.clone()).collect(),
            }
        }
    }

    pub(crate) fn failure(&self, tap: &str, error: TapError) -> TapFailure {
        TapFailure {
            hook: self.name.clone(),
            tap: tap.to_owned(),
            error,
        }
    }

    fn interceptor_error(
        &self,
        phase: InterceptPhase,
        source: crate::error::InterceptorError,
    ) -> HookError {
        tracing::warn!(hook = %self.name, phase = %phase, error = %source, "interceptor failed");
        HookError::Interceptor {
            hook: self.name.clone(),
            phase,
            source,
        }
    }
}

impl<A, R> fmt::Debug for HookCore<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCore")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("taps", &self.registry.len())
            .field("interceptors", &self.interceptors.read().len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hook Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Registration surface shared by every hook kind.
///
/// Implemented by each concrete hook type, which adds its own `call`.
/// Generic code (such as instrumentation plugins) can register taps and
/// interceptors through this trait without knowing the call-kind.
pub trait Hook {
    /// The argument type passed to taps.
    type Args;
    /// The value a tap may produce.
    type Output;

    /// Returns the shared registration state.
    fn core(&self) -> &HookCore<Self::Args, Self::Output>;

    /// Returns the hook's name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Returns the hook's call-kind.
    fn kind(&self) -> HookKind {
        self.core().kind()
    }

    /// Registers a tap. See [`HookCore::register`].
    fn register(&self, tap: Tap<Self::Args, Self::Output>) -> Result<TapHandle, HookError> {
        self.core().register(tap)
    }

    /// Removes a tap. See [`HookCore::unregister`].
    fn unregister(&self, handle: TapHandle) -> bool {
        self.core().unregister(handle)
    }

    /// Adds an interceptor. See [`HookCore::intercept`].
    fn intercept(&self, interceptor: Interceptor<Self::Args>) -> Result<(), HookError> {
        self.core().intercept(interceptor)
    }

    /// Returns true if any tap is registered.
    fn is_used(&self) -> bool {
        self.core().is_used()
    }

    /// Returns the number of registered taps.
    fn len(&self) -> usize {
        self.core().len()
    }

    /// Returns true if no tap is registered.
    fn is_empty(&self) -> bool {
        self.core().is_empty()
    }

    /// Returns tap names in registration order.
    fn tap_names(&self) -> Vec<String> {
        self.core().tap_names()
    }

    /// Returns the taps in the order a call would run them.
    fn resolved_order(&self) -> Result<Vec<TapInfo>, RegistrationError> {
        self.core().resolved_order()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_kinds_reject_async_modes() {
        for kind in [HookKind::Sync, HookKind::SyncBail, HookKind::SyncWaterfall, HookKind::SyncLoop] {
            assert!(kind.accepts(TapMode::Sync));
            assert!(!kind.accepts(TapMode::Callback));
            assert!(!kind.accepts(TapMode::Promise));
        }
    }

    #[test]
    fn async_kinds_accept_every_mode() {
        for kind in [HookKind::AsyncSeries, HookKind::AsyncSeriesBail, HookKind::AsyncParallel] {
            assert!(kind.accepts(TapMode::Sync));
            assert!(kind.accepts(TapMode::Callback));
            assert!(kind.accepts(TapMode::Promise));
        }
    }

    #[test]
    fn handles_do_not_cross_hooks() {
        let first: HookCore<u8, ()> = HookCore::new("first", HookKind::Sync);
        let second: HookCore<u8, ()> = HookCore::new("second", HookKind::Sync);
        let handle = first.register(Tap::sync("t", |_: &u8| Ok(()))).unwrap();

        assert!(!second.unregister(handle));
        assert!(first.unregister(handle));
        assert!(!first.unregister(handle), "second removal is a no-op");
        assert!(first.is_empty());
    }

    #[test]
    fn incompatible_mode_is_rejected_at_registration() {
        let core: HookCore<u8, ()> = HookCore::new("sync", HookKind::Sync);
        let err = core
            .register(Tap::promise("later", |_: u8| async { Ok(()) }))
            .unwrap_err();
        assert!(matches!(
            err,
            HookError::Registration(RegistrationError::IncompatibleMode {
                mode: TapMode::Promise,
                kind: HookKind::Sync,
                ..
            })
        ));
        assert_eq!(core.len(), 0);
    }

    #[test]
    fn tap_names_in_registration_order() {
        let core: HookCore<u8, ()> = HookCore::new("h", HookKind::Sync);
        core.register(Tap::sync("b", |_: &u8| Ok(())).with_stage(5)).unwrap();
        core.register(Tap::sync("a", |_: &u8| Ok(()))).unwrap();
        assert_eq!(core.tap_names(), vec!["b".to_string(), "a".to_string()]);
    }
}
