//! The parallel call-kind.
//!
//! [`AsyncParallelHook::call`] starts every tap in resolved order without
//! waiting between them, then waits for all of them. The first failure by
//! completion order rejects the call immediately. Taps still running at that
//! point are not cancelled: they are moved to one background task that drives
//! them to completion and hands any further failures to the hook's
//! late-failure sink.
//!
//! Dropping the call future before it resolves detaches the running taps the
//! same way.
//!
//! The background task is spawned on the current Tokio runtime. Outside a
//! runtime the stragglers are parked instead and only make progress when
//! [`AsyncParallelHook::settle`] is awaited.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::error::{HookError, TapFailure, TapResult};
use crate::hook::{Hook, HookCore, HookKind};
use crate::sync::impl_hook;
use crate::tap::BoxFuture;

/// Receiver of tap failures observed after a parallel call already rejected.
pub type LateFailureSink = Arc<dyn Fn(TapFailure) + Send + Sync>;

type Pending = FuturesUnordered<BoxFuture<'static, (String, TapResult<Option<()>>)>>;

enum Straggler {
    Spawned(JoinHandle<()>),
    Parked(BoxFuture<'static, ()>),
}

fn log_late_failure(failure: TapFailure) {
    tracing::warn!(
        hook = %failure.hook,
        tap = %failure.tap,
        error = %failure.error,
        "tap failed after the parallel call had already rejected"
    );
}

/// Starts all taps together and waits for every one to complete.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use tapwork_hook::{AsyncParallelHook, Hook, Tap};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let make = AsyncParallelHook::<Arc<AtomicUsize>>::new("make");
/// for entry in ["main", "worker"] {
///     make.register(Tap::promise(entry, |built: Arc<AtomicUsize>| async move {
///         built.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }))
///     .unwrap();
/// }
///
/// let built = Arc::new(AtomicUsize::new(0));
/// make.call(Arc::clone(&built)).await.unwrap();
/// assert_eq!(built.load(Ordering::SeqCst), 2);
/// # }
/// ```
pub struct AsyncParallelHook<A> {
    core: HookCore<A, ()>,
    late_failures: RwLock<LateFailureSink>,
    stragglers: Mutex<Vec<Straggler>>,
}

impl_hook!(AsyncParallelHook<A>, A, ());

impl<A> AsyncParallelHook<A> {
    /// Creates a hook with no taps.
    ///
    /// Late failures are logged at `warn` until another sink is installed.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: HookCore::new(name, HookKind::AsyncParallel),
            late_failures: RwLock::new(Arc::new(log_late_failure) as LateFailureSink),
            stragglers: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the receiver of failures that happen after a call rejected.
    ///
    /// Stragglers of calls that already rejected keep the sink that was
    /// installed when they were detached.
    pub fn set_late_failure_sink(&self, sink: impl Fn(TapFailure) + Send + Sync + 'static) {
        *self.late_failures.write() = Arc::new(sink);
    }

    /// Returns the number of detached batches of taps not yet awaited by
    /// [`settle`](Self::settle).
    #[must_use]
    pub fn pending_stragglers(&self) -> usize {
        let mut stragglers = self.stragglers.lock();
        stragglers.retain(|straggler| match straggler {
            Straggler::Spawned(handle) => !handle.is_finished(),
            Straggler::Parked(_) => true,
        });
        stragglers.len()
    }

    /// Waits until every tap detached by earlier calls has completed.
    pub async fn settle(&self) {
        let stragglers = core::mem::take(&mut *self.stragglers.lock());
        for straggler in stragglers {
            match straggler {
                Straggler::Spawned(handle) => {
                    if let Err(err) = handle.await {
                        tracing::warn!(hook = %self.core.name(), error = %err, "straggler task did not complete");
                    }
                }
                Straggler::Parked(drain) => drain.await,
            }
        }
    }

    fn detach(&self, pending: Pending) {
        if pending.is_empty() {
            return;
        }

        let sink = Arc::clone(&*self.late_failures.read());
        let hook = self.core.name().to_owned();
        tracing::debug!(hook = %hook, running = pending.len(), "detaching running taps");

        let drain: BoxFuture<'static, ()> = Box::pin(async move {
            let mut pending = pending;
            while let Some((tap, outcome)) = pending.next().await {
                match outcome {
                    Ok(_) => tracing::trace!(hook = %hook, tap = %tap, "straggler completed"),
                    Err(error) => sink(TapFailure {
                        hook: hook.clone(),
                        tap,
                        error,
                    }),
                }
            }
        });

        let straggler = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Straggler::Spawned(runtime.spawn(drain)),
            Err(_) => Straggler::Parked(drain),
        };
        self.stragglers.lock().push(straggler);
    }
}

/// Owns the running taps of one call.
///
/// Whatever is still pending when the guard drops is detached, whether the
/// call rejected or its future was dropped by the caller (e.g. on timeout).
struct RunningTaps<'a, A> {
    hook: &'a AsyncParallelHook<A>,
    pending: Pending,
}

impl<A> Drop for RunningTaps<'_, A> {
    fn drop(&mut self) {
        self.hook.detach(core::mem::take(&mut self.pending));
    }
}

impl<A: Clone + Send + 'static> AsyncParallelHook<A> {
    /// Starts every tap and waits for all of them.
    ///
    /// Rejects with the first failure to complete. Taps still running at that
    /// point continue in the background; see [`settle`](Self::settle). The
    /// same holds when the returned future is dropped before it resolves.
    pub async fn call(&self, args: A) -> Result<(), HookError> {
        let order = self.core.begin_call(&args)?;

        let mut running = RunningTaps {
            hook: self,
            pending: FuturesUnordered::new(),
        };
        for entry in order.iter() {
            self.core.before_tap(&entry.info)?;
            let tap = entry.info.name.clone();
            let started = entry.start(args.clone());
            running.pending.push(Box::pin(async move { (tap, started.await) }));
        }

        while let Some((tap, outcome)) = running.pending.next().await {
            if let Err(error) = outcome {
                let failure = self.core.failure(&tap, error);
                tracing::debug!(
                    hook = %self.core.name(),
                    tap = %tap,
                    running = running.pending.len(),
                    "parallel call rejected"
                );
                return Err(HookError::TapExecution(failure));
            }
        }
        Ok(())
    }
}
