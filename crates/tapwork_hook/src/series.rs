//! Asynchronous series call-kinds.
//!
//! Taps run strictly one at a time on the caller's task. Each tap's
//! completion signal is awaited before the next tap starts, and a failure
//! stops the call.
//!
//! If the call future is dropped while a tap is running, that tap is moved to
//! the current Tokio runtime and runs to completion; a failure it reports is
//! logged at `warn`. Taps after it never start.

use core::ops::RangeBounds;

use crate::error::{HookError, TapResult};
use crate::hook::{Hook, HookCore, HookKind};
use crate::sync::{impl_hook, in_stage_range};
use crate::tap::BoxFuture;

// ─────────────────────────────────────────────────────────────────────────────
// InFlight
// ─────────────────────────────────────────────────────────────────────────────

/// A started tap whose completion the call is awaiting.
///
/// Dropped before completion, it hands the tap to the runtime.
struct InFlight<'a, R: Send + 'static> {
    hook: &'a str,
    tap: &'a str,
    future: Option<BoxFuture<'static, TapResult<Option<R>>>>,
}

impl<'a, R: Send + 'static> InFlight<'a, R> {
    fn new(hook: &'a str, tap: &'a str, future: BoxFuture<'static, TapResult<Option<R>>>) -> Self {
        Self {
            hook,
            tap,
            future: Some(future),
        }
    }

    async fn finish(mut self) -> TapResult<Option<R>> {
        let Some(future) = self.future.as_mut() else {
            return Ok(None);
        };
        let outcome = future.await;
        self.future = None;
        outcome
    }
}

impl<R: Send + 'static> Drop for InFlight<'_, R> {
    fn drop(&mut self) {
        let Some(future) = self.future.take() else {
            return;
        };
        let hook = self.hook.to_owned();
        let tap = self.tap.to_owned();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!(hook = %hook, tap = %tap, "series call dropped; detaching running tap");
                runtime.spawn(async move {
                    if let Err(error) = future.await {
                        tracing::warn!(
                            hook = %hook,
                            tap = %tap,
                            error = %error,
                            "tap failed after the series call was dropped"
                        );
                    }
                });
            }
            Err(_) => tracing::warn!(
                hook = %hook,
                tap = %tap,
                "series call dropped outside a runtime; running tap abandoned"
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AsyncSeriesHook
// ─────────────────────────────────────────────────────────────────────────────

/// Runs taps one after another, awaiting each.
///
/// # Example
///
/// ```
/// use tapwork_hook::{AsyncSeriesHook, Hook, Tap};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let hook = AsyncSeriesHook::<u32>::new("before_run");
/// hook.register(Tap::promise("warm", |n: u32| async move {
///     assert_eq!(n, 7);
///     Ok(())
/// }))
/// .unwrap();
///
/// hook.call(7).await.unwrap();
/// # }
/// ```
pub struct AsyncSeriesHook<A> {
    core: HookCore<A, ()>,
}

impl_hook!(AsyncSeriesHook<A>, A, ());

impl<A> AsyncSeriesHook<A> {
    /// Creates a hook with no taps.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: HookCore::new(name, HookKind::AsyncSeries),
        }
    }
}

impl<A: Clone + Send + 'static> AsyncSeriesHook<A> {
    /// Runs all taps in order.
    pub async fn call(&self, args: A) -> Result<(), HookError> {
        self.call_stage_range(.., args).await
    }

    /// Runs the taps whose stage lies in `range`, in resolved order.
    pub async fn call_stage_range(
        &self,
        range: impl RangeBounds<i32> + Send,
        args: A,
    ) -> Result<(), HookError> {
        let order = self.core.begin_call(&args)?;
        let taps = in_stage_range(&order, &range);

        for (index, entry) in taps.iter().enumerate() {
            self.core.before_tap(&entry.info)?;
            InFlight::new(self.core.name(), &entry.info.name, entry.start(args.clone()))
                .finish()
                .await
                .map_err(|error| self.core.abort(entry, error, &taps[index + 1..]))?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AsyncSeriesBailHook
// ─────────────────────────────────────────────────────────────────────────────

/// Runs taps one after another until one produces a value.
pub struct AsyncSeriesBailHook<A, R> {
    core: HookCore<A, R>,
}

impl_hook!(AsyncSeriesBailHook<A, R>, A, R);

impl<A, R> AsyncSeriesBailHook<A, R> {
    /// Creates a hook with no taps.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: HookCore::new(name, HookKind::AsyncSeriesBail),
        }
    }
}

impl<A: Clone + Send + 'static, R: Send + 'static> AsyncSeriesBailHook<A, R> {
    /// Runs taps until one bails with a value.
    pub async fn call(&self, args: A) -> Result<Option<R>, HookError> {
        let order = self.core.begin_call(&args)?;

        for (index, entry) in order.iter().enumerate() {
            self.core.before_tap(&entry.info)?;
            let value = InFlight::new(self.core.name(), &entry.info.name, entry.start(args.clone()))
                .finish()
                .await
                .map_err(|error| self.core.abort(entry, error, &order[index + 1..]))?;
            if value.is_some() {
                tracing::debug!(hook = %self.core.name(), tap = %entry.info.name, "hook bailed");
                return Ok(value);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TapError;
    use crate::tap::{Completion, Tap};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn mixed_modes_run_strictly_in_order() {
        let hook = AsyncSeriesHook::<()>::new("series");
        let seen = recorder();
        let log = Arc::clone(&seen);

        let slow = Arc::clone(&log);
        hook.register(Tap::promise("slow", move |()| {
            let slow = Arc::clone(&slow);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                slow.lock().unwrap().push("slow");
                Ok(())
            }
        }))
        .unwrap();

        let cb = Arc::clone(&log);
        hook.register(Tap::callback("callback", move |(), done: Completion<()>| {
            let cb = Arc::clone(&cb);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                cb.lock().unwrap().push("callback");
                done.ok();
            });
        }))
        .unwrap();

        let sync = Arc::clone(&log);
        hook.register(Tap::sync("sync", move |_: &()| {
            sync.lock().unwrap().push("sync");
            Ok(())
        }))
        .unwrap();

        hook.call(()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["slow", "callback", "sync"]);
    }

    #[tokio::test]
    async fn timed_out_call_finishes_the_running_tap_only() {
        let hook = AsyncSeriesHook::<()>::new("before_run");
        let seen = recorder();

        let first = Arc::clone(&seen);
        hook.register(Tap::promise("first", move |()| {
            let first = Arc::clone(&first);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                first.lock().unwrap().push("first");
                Ok(())
            }
        }))
        .unwrap();
        let second = Arc::clone(&seen);
        hook.register(Tap::sync("second", move |_: &()| {
            second.lock().unwrap().push("second");
            Ok(())
        }))
        .unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(5), hook.call(())).await;
        assert!(outcome.is_err());
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn callback_failure_aborts_remaining() {
        let hook = AsyncSeriesHook::<()>::new("series");
        let seen = recorder();
        let log = Arc::clone(&seen);

        hook.register(Tap::callback("bad", |(), done: Completion<()>| {
            done.fail("callback failed");
        }))
        .unwrap();
        hook.register(Tap::sync("never", move |_: &()| {
            log.lock().unwrap().push("never");
            Ok(())
        }))
        .unwrap();

        let err = hook.call(()).await.unwrap_err();
        let failure = err.tap_failure().expect("tap failure");
        assert_eq!(failure.tap, "bad");
        assert_eq!(failure.error.message(), "callback failed");
        assert!(matches!(err, HookError::DispatchAborted { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stage_range_is_half_open() {
        let hook = AsyncSeriesHook::<()>::new("process_assets");
        let seen = recorder();
        let log = Arc::clone(&seen);
        for (name, stage) in [("additional", -2000), ("optimize", 100), ("summarize", 1000)] {
            let log = Arc::clone(&log);
            hook.register(
                Tap::sync(name, move |_: &()| {
                    log.lock().unwrap().push(name);
                    Ok(())
                })
                .with_stage(stage),
            )
            .unwrap();
        }

        hook.call_stage_range(i32::MIN..1000, ()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["additional", "optimize"]);
    }

    #[tokio::test]
    async fn series_bail_returns_first_value() {
        let hook = AsyncSeriesBailHook::<u8, u8>::new("bail");
        hook.register(Tap::promise("none", |_: u8| async { Ok(None) })).unwrap();
        hook.register(Tap::callback("value", |n: u8, done: Completion<u8>| done.value(n * 2)))
            .unwrap();
        hook.register(Tap::sync("unreached", |_: &u8| Err::<Option<u8>, _>(TapError::msg("ran"))))
            .unwrap();

        assert_eq!(hook.call(21).await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn empty_series_bail_is_absent() {
        let hook = AsyncSeriesBailHook::<u8, u8>::new("bail");
        assert_eq!(hook.call(1).await.unwrap(), None);
    }
}
