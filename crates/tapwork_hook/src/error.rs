//! Error taxonomy for hook registration and dispatch.
//!
//! Errors fall into four families, kept apart so callers can tell a plugin bug
//! from an instrumentation bug:
//!
//! - [`RegistrationError`]: the tap set cannot be ordered, or a tap's mode does
//!   not fit the hook's call-kind.
//! - [`HookError::TapExecution`]: a tap returned an error, rejected, or reported
//!   failure through its completion callback.
//! - [`HookError::DispatchAborted`]: a sequential hook stopped early because of a
//!   tap failure, skipping the taps listed in the error.
//! - [`HookError::Interceptor`]: an interceptor callback itself failed.

use core::fmt;
use std::sync::Arc;

use crate::hook::HookKind;
use crate::tap::TapMode;

/// Result type returned by tap handlers.
pub type TapResult<T> = Result<T, TapError>;

// ─────────────────────────────────────────────────────────────────────────────
// TapError
// ─────────────────────────────────────────────────────────────────────────────

/// Error produced by a tap handler.
///
/// Cheap to clone, so a single failure can be forwarded to both the caller and
/// a late-failure sink.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TapError {
    message: String,
    #[source]
    source: Option<Arc<dyn core::error::Error + Send + Sync>>,
}

impl TapError {
    /// Creates an error from a message.
    #[must_use]
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
            source: None,
        }
    }

    /// Wraps an existing error, keeping it as the source.
    #[must_use]
    pub fn from_error<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for TapError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<String> for TapError {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TapFailure
// ─────────────────────────────────────────────────────────────────────────────

/// A tap error together with the hook and tap it came from.
#[derive(Debug, Clone, thiserror::Error)]
#[error("tap '{tap}' on hook '{hook}' failed: {error}")]
pub struct TapFailure {
    /// Name of the hook being called.
    pub hook: String,
    /// Name of the failing tap.
    pub tap: String,
    /// The error the tap produced.
    #[source]
    pub error: TapError,
}

// ─────────────────────────────────────────────────────────────────────────────
// InterceptorError
// ─────────────────────────────────────────────────────────────────────────────

/// Error produced by an interceptor callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InterceptorError {
    message: String,
}

impl InterceptorError {
    /// Creates an interceptor error from a message.
    #[must_use]
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// The interceptor callback that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptPhase {
    /// The `register` callback, fired when a tap is added.
    Register,
    /// The `call` callback, fired once before any tap runs.
    Call,
    /// The `tap` callback, fired before each tap.
    Tap,
    /// The `loop` callback, fired on each iteration of a looping hook.
    Loop,
}

impl fmt::Display for InterceptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterceptPhase::Register => "register",
            InterceptPhase::Call => "call",
            InterceptPhase::Tap => "tap",
            InterceptPhase::Loop => "loop",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RegistrationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors detected while registering taps or resolving their order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The `before` constraints form a cycle.
    ///
    /// `cycle` lists tap names such that each must run before the next; the
    /// first and last entries are the same tap.
    #[error("cyclic `before` constraints on hook '{hook}': {}", .cycle.join(" -> "))]
    Cycle {
        /// The hook whose taps cannot be ordered.
        hook: String,
        /// The tap names along the cycle.
        cycle: Vec<String>,
    },
    /// The tap's execution mode is not accepted by the hook's call-kind.
    #[error("tap '{tap}' uses {mode} mode, which {kind} hook '{hook}' does not accept")]
    IncompatibleMode {
        /// The hook the tap was registered on.
        hook: String,
        /// The rejected tap.
        tap: String,
        /// The tap's mode.
        mode: TapMode,
        /// The hook's call-kind.
        kind: HookKind,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// HookError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced by hook registration and calls.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Taps could not be registered or ordered.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A tap failed and no later taps were skipped because of it.
    #[error(transparent)]
    TapExecution(TapFailure),

    /// A tap failed and the remaining taps of a sequential call were skipped.
    #[error("{failure}; skipped {} remaining tap(s): {}", .skipped.len(), .skipped.join(", "))]
    DispatchAborted {
        /// The failure that stopped the call.
        #[source]
        failure: TapFailure,
        /// Names of the taps that never ran, in resolved order.
        skipped: Vec<String>,
    },

    /// An interceptor callback failed.
    #[error("{phase} interceptor on hook '{hook}' failed: {source}")]
    Interceptor {
        /// The hook being intercepted.
        hook: String,
        /// Which interceptor callback failed.
        phase: InterceptPhase,
        /// The interceptor's error.
        source: InterceptorError,
    },
}

impl HookError {
    /// Returns the tap failure behind this error, if a tap caused it.
    #[must_use]
    pub fn tap_failure(&self) -> Option<&TapFailure> {
        match self {
            HookError::TapExecution(failure) | HookError::DispatchAborted { failure, .. } => {
                Some(failure)
            }
            HookError::Registration(_) | HookError::Interceptor { .. } => None,
        }
    }

    /// Returns true if the error came from an interceptor rather than a tap.
    #[must_use]
    pub fn is_instrumentation(&self) -> bool {
        matches!(self, HookError::Interceptor { .. })
    }
}
