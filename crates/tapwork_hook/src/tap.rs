//! Taps: registered callbacks plus their ordering metadata.
//!
//! A [`Tap`] is built with one of three constructors, one per execution mode:
//!
//! - [`Tap::sync`]: returns its outcome directly. Accepted by every hook kind.
//! - [`Tap::callback`]: receives a [`Completion`] and signals through it,
//!   possibly from another task. Async hooks only.
//! - [`Tap::promise`]: returns a future. Async hooks only.
//!
//! # Example
//!
//! ```
//! use tapwork_hook::{Hook, SyncBailHook, Tap};
//!
//! let resolve = SyncBailHook::<String, String>::new("resolve");
//! resolve
//!     .register(
//!         Tap::sync("alias", |request: &String| {
//!             Ok(request.strip_prefix("@/").map(|rest| format!("src/{rest}")))
//!         })
//!         .with_stage(-10),
//!     )
//!     .unwrap();
//!
//! assert_eq!(resolve.call(&"@/main.js".to_owned()).unwrap().as_deref(), Some("src/main.js"));
//! ```

use core::fmt;
use core::future::Future;
use core::pin::Pin;

use futures::channel::oneshot;

use crate::error::{TapError, TapResult};

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ─────────────────────────────────────────────────────────────────────────────
// TapMode
// ─────────────────────────────────────────────────────────────────────────────

/// How a tap signals completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapMode {
    /// Returns its outcome synchronously.
    Sync,
    /// Signals its outcome by invoking a [`Completion`].
    Callback,
    /// Returns a future resolving to its outcome.
    Promise,
}

impl fmt::Display for TapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TapMode::Sync => "sync",
            TapMode::Callback => "callback",
            TapMode::Promise => "promise",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoTapOutput
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion from a handler's return value into the hook's optional output.
///
/// Handlers may return `Option<R>` (where `None` is the "absent" value that
/// bail hooks skip past and waterfall hooks ignore) or `()`, which is always
/// absent.
pub trait IntoTapOutput<R> {
    /// Converts into the optional tap output.
    fn into_tap_output(self) -> Option<R>;
}

impl<R> IntoTapOutput<R> for Option<R> {
    fn into_tap_output(self) -> Option<R> {
        self
    }
}

impl<R> IntoTapOutput<R> for () {
    fn into_tap_output(self) -> Option<R> {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Completion
// ─────────────────────────────────────────────────────────────────────────────

/// Completion signal handed to callback-style taps.
///
/// Consumed on use, so a tap can complete at most once. Dropping it without
/// completing fails the tap.
pub struct Completion<R> {
    tx: oneshot::Sender<TapResult<Option<R>>>,
}

impl<R> Completion<R> {
    /// Completes the tap with the given outcome.
    pub fn done(self, outcome: TapResult<Option<R>>) {
        // The receiver is gone only when the call itself was dropped.
        let _ = self.tx.send(outcome);
    }

    /// Completes the tap successfully with no value.
    pub fn ok(self) {
        self.done(Ok(None));
    }

    /// Completes the tap successfully with a value.
    pub fn value(self, value: R) {
        self.done(Ok(Some(value)));
    }

    /// Completes the tap with an error.
    pub fn fail(self, error: impl Into<TapError>) {
        self.done(Err(error.into()));
    }
}

impl<R> fmt::Debug for Completion<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TapFn
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased tap handler, one variant per [`TapMode`].
pub(crate) enum TapFn<A, R> {
    Sync(Box<dyn Fn(&A) -> TapResult<Option<R>> + Send + Sync>),
    Callback(Box<dyn Fn(A, Completion<R>) + Send + Sync>),
    Promise(Box<dyn Fn(A) -> BoxFuture<'static, TapResult<Option<R>>> + Send + Sync>),
}

impl<A, R> TapFn<A, R> {
    fn mode(&self) -> TapMode {
        match self {
            TapFn::Sync(_) => TapMode::Sync,
            TapFn::Callback(_) => TapMode::Callback,
            TapFn::Promise(_) => TapMode::Promise,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TapInfo / TapHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Ordering and identity metadata of a registered tap.
///
/// Passed to `register` and `tap` interceptors and returned by
/// [`HookCore::resolved_order`](crate::HookCore::resolved_order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapInfo {
    /// The tap's name. Not required to be unique.
    pub name: String,
    /// Ordering stage; lower runs earlier.
    pub stage: i32,
    /// Names of taps this tap must run before.
    pub before: Vec<String>,
    /// How the tap signals completion.
    pub mode: TapMode,
}

/// Handle returned by registration, used to unregister the tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapHandle {
    pub(crate) hook_id: u64,
    pub(crate) tap_id: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tap
// ─────────────────────────────────────────────────────────────────────────────

/// A callback to register on a hook, with its ordering metadata.
///
/// `A` is the hook's argument type and `R` the value a tap may produce.
pub struct Tap<A, R = ()> {
    pub(crate) name: String,
    pub(crate) stage: i32,
    pub(crate) before: Vec<String>,
    pub(crate) func: TapFn<A, R>,
}

impl<A: 'static, R: Send + 'static> Tap<A, R> {
    /// Creates a synchronous tap.
    pub fn sync<F, O>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&A) -> TapResult<O> + Send + Sync + 'static,
        O: IntoTapOutput<R>,
    {
        Self::from_fn(
            name,
            TapFn::Sync(Box::new(move |args| {
                handler(args).map(IntoTapOutput::into_tap_output)
            })),
        )
    }

    /// Creates a callback-style tap.
    ///
    /// The handler owns the [`Completion`] and must eventually consume it.
    pub fn callback<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(A, Completion<R>) + Send + Sync + 'static,
    {
        Self::from_fn(name, TapFn::Callback(Box::new(handler)))
    }

    /// Creates a promise-style tap from a handler returning a future.
    pub fn promise<F, Fut, O>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TapResult<O>> + Send + 'static,
        O: IntoTapOutput<R>,
    {
        Self::from_fn(
            name,
            TapFn::Promise(Box::new(move |args| {
                let fut = handler(args);
                Box::pin(async move { fut.await.map(IntoTapOutput::into_tap_output) })
            })),
        )
    }

    fn from_fn(name: impl Into<String>, func: TapFn<A, R>) -> Self {
        Self {
            name: name.into(),
            stage: 0,
            before: Vec::new(),
            func,
        }
    }
}

impl<A, R> Tap<A, R> {
    /// Sets the stage. Lower stages run earlier; the default is 0.
    #[must_use]
    pub fn with_stage(mut self, stage: i32) -> Self {
        self.stage = stage;
        self
    }

    /// Requires this tap to run before every tap named `name`.
    ///
    /// May be called repeatedly; the target need not be registered yet.
    #[must_use]
    pub fn with_before(mut self, name: impl Into<String>) -> Self {
        self.before.push(name.into());
        self
    }

    /// Returns the tap's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tap's execution mode.
    #[must_use]
    pub fn mode(&self) -> TapMode {
        self.func.mode()
    }

    pub(crate) fn info(&self) -> TapInfo {
        TapInfo {
            name: self.name.clone(),
            stage: self.stage,
            before: self.before.clone(),
            mode: self.mode(),
        }
    }
}

impl<A, R> fmt::Debug for Tap<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tap")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("before", &self.before)
            .field("mode", &self.mode())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TapEntry
// ─────────────────────────────────────────────────────────────────────────────

/// A tap stored in a hook's registry.
pub(crate) struct TapEntry<A, R> {
    pub(crate) id: u64,
    pub(crate) info: TapInfo,
    pub(crate) func: TapFn<A, R>,
}

impl<A, R> TapEntry<A, R> {
    /// Runs a synchronous tap.
    ///
    /// Registration rejects non-sync taps on sync hooks, so the other arms
    /// only guard against misuse from inside the crate.
    pub(crate) fn call_sync(&self, args: &A) -> TapResult<Option<R>> {
        match &self.func {
            TapFn::Sync(handler) => handler(args),
            TapFn::Callback(_) | TapFn::Promise(_) => Err(TapError::msg(format!(
                "{} tap '{}' cannot run synchronously",
                self.info.mode, self.info.name
            ))),
        }
    }
}

impl<A: 'static, R: Send + 'static> TapEntry<A, R> {
    /// Starts the tap and returns a future for its completion signal.
    ///
    /// Sync and callback taps run their body before this returns; promise
    /// taps run when the returned future is first polled.
    pub(crate) fn start(&self, args: A) -> BoxFuture<'static, TapResult<Option<R>>> {
        match &self.func {
            TapFn::Sync(handler) => Box::pin(futures::future::ready(handler(&args))),
            TapFn::Callback(handler) => {
                let (tx, rx) = oneshot::channel();
                handler(args, Completion { tx });
                let name = self.info.name.clone();
                Box::pin(async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(TapError::msg(format!(
                            "tap '{name}' dropped its completion callback without signalling"
                        )))
                    })
                })
            }
            TapFn::Promise(handler) => handler(args),
        }
    }
}
