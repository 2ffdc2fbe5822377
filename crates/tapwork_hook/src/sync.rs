//! Synchronous call-kinds.
//!
//! These hooks run every selected tap to completion on the caller's stack and
//! never yield. A failing tap stops the call; the error reports which taps
//! were skipped.

use core::ops::RangeBounds;
use std::sync::Arc;

use crate::error::HookError;
use crate::hook::{Hook, HookCore, HookKind};
use crate::registry::ResolvedOrder;
use crate::tap::TapEntry;

/// Selects the taps of `order` whose stage lies in `range`.
pub(crate) fn in_stage_range<A, R>(
    order: &ResolvedOrder<A, R>,
    range: &impl RangeBounds<i32>,
) -> Vec<Arc<TapEntry<A, R>>> {
    order
        .iter()
        .filter(|entry| range.contains(&entry.info.stage))
        .cloned()
        .collect()
}

macro_rules! impl_hook {
    ($hook:ident < $($param:ident),* >, $args:ty, $output:ty) => {
        impl<$($param),*> Hook for $hook<$($param),*> {
            type Args = $args;
            type Output = $output;

            fn core(&self) -> &HookCore<$args, $output> {
                &self.core
            }
        }

        impl<$($param),*> core::fmt::Debug for $hook<$($param),*> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_tuple(stringify!($hook)).field(&self.core).finish()
            }
        }
    };
}

pub(crate) use impl_hook;

// ─────────────────────────────────────────────────────────────────────────────
// SyncHook
// ─────────────────────────────────────────────────────────────────────────────

/// Runs every tap in order.
///
/// The result is the last tap's value, or `None` when no tap ran.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use tapwork_hook::{Hook, SyncHook, Tap};
///
/// let hook = SyncHook::<&'static str>::new("environment");
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// for (name, stage) in [("three", 3), ("one", 1), ("two", 2)] {
///     let seen = Arc::clone(&seen);
///     hook.register(
///         Tap::sync(name, move |_: &&'static str| {
///             seen.lock().unwrap().push(name);
///             Ok(())
///         })
///         .with_stage(stage),
///     )
///     .unwrap();
/// }
///
/// hook.call(&"production").unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec!["one", "two", "three"]);
/// ```
pub struct SyncHook<A, R = ()> {
    core: HookCore<A, R>,
}

impl_hook!(SyncHook<A, R>, A, R);

impl<A, R> SyncHook<A, R> {
    /// Creates a hook with no taps.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: HookCore::new(name, HookKind::Sync),
        }
    }

    /// Runs all taps.
    pub fn call(&self, args: &A) -> Result<Option<R>, HookError> {
        self.call_stage_range(.., args)
    }

    /// Runs the taps whose stage lies in `range`, in resolved order.
    pub fn call_stage_range(
        &self,
        range: impl RangeBounds<i32>,
        args: &A,
    ) -> Result<Option<R>, HookError> {
        let order = self.core.begin_call(args)?;
        let taps = in_stage_range(&order, &range);

        let mut result = None;
        for (index, entry) in taps.iter().enumerate() {
            self.core.before_tap(&entry.info)?;
            result = entry
                .call_sync(args)
                .map_err(|error| self.core.abort(entry, error, &taps[index + 1..]))?;
        }
        Ok(result)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SyncBailHook
// ─────────────────────────────────────────────────────────────────────────────

/// Runs taps in order until one returns a value.
///
/// The first present value is the result and later taps are skipped.
pub struct SyncBailHook<A, R> {
    core: HookCore<A, R>,
}

impl_hook!(SyncBailHook<A, R>, A, R);

impl<A, R> SyncBailHook<A, R> {
    /// Creates a hook with no taps.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: HookCore::new(name, HookKind::SyncBail),
        }
    }

    /// Runs taps until one bails with a value.
    pub fn call(&self, args: &A) -> Result<Option<R>, HookError> {
        let order = self.core.begin_call(args)?;

        for (index, entry) in order.iter().enumerate() {
            self.core.before_tap(&entry.info)?;
            let value = entry
                .call_sync(args)
                .map_err(|error| self.core.abort(entry, error, &order[index + 1..]))?;
            if value.is_some() {
                tracing::debug!(hook = %self.core.name(), tap = %entry.info.name, "hook bailed");
                return Ok(value);
            }
        }
        Ok(None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SyncWaterfallHook
// ─────────────────────────────────────────────────────────────────────────────

/// Threads a carried value through the taps.
///
/// Each tap receives the current value; a present return replaces it, an
/// absent return leaves it unchanged. The result is the final value, which is
/// the initial argument when no tap is registered.
pub struct SyncWaterfallHook<T> {
    core: HookCore<T, T>,
}

impl_hook!(SyncWaterfallHook<T>, T, T);

impl<T> SyncWaterfallHook<T> {
    /// Creates a hook with no taps.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: HookCore::new(name, HookKind::SyncWaterfall),
        }
    }

    /// Runs all taps, threading `initial` through them.
    pub fn call(&self, initial: T) -> Result<T, HookError> {
        let order = self.core.begin_call(&initial)?;

        let mut carried = initial;
        for (index, entry) in order.iter().enumerate() {
            self.core.before_tap(&entry.info)?;
            if let Some(next) = entry
                .call_sync(&carried)
                .map_err(|error| self.core.abort(entry, error, &order[index + 1..]))?
            {
                carried = next;
            }
        }
        Ok(carried)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SyncLoopHook
// ─────────────────────────────────────────────────────────────────────────────

/// Runs taps in order, restarting from the first tap whenever one returns a
/// value. Completes once a full pass returns nothing.
///
/// `loop` interceptors fire at the start of every pass. The hook places no
/// bound on the number of passes.
pub struct SyncLoopHook<A> {
    core: HookCore<A, ()>,
}

impl_hook!(SyncLoopHook<A>, A, ());

impl<A> SyncLoopHook<A> {
    /// Creates a hook with no taps.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: HookCore::new(name, HookKind::SyncLoop),
        }
    }

    /// Runs passes until every tap returns nothing.
    pub fn call(&self, args: &A) -> Result<(), HookError> {
        let order = self.core.begin_call(args)?;

        'pass: loop {
            self.core.begin_iteration(args)?;
            for (index, entry) in order.iter().enumerate() {
                self.core.before_tap(&entry.info)?;
                let again = entry
                    .call_sync(args)
                    .map_err(|error| self.core.abort(entry, error, &order[index + 1..]))?;
                if again.is_some() {
                    continue 'pass;
                }
            }
            return Ok(());
        }
    }
}
