//! Hook registration, ordering, and dispatch for Tapwork (Layer 1).
//!
//! `tapwork_hook` is the substrate every Tapwork plugin builds on. A pipeline
//! owns one hook per lifecycle stage; plugins register taps on those hooks;
//! the pipeline later calls each hook, and the hook runs its taps under one
//! fixed call-kind:
//!
//! | Hook                    | Taps run                   | Result                        |
//! |-------------------------|----------------------------|-------------------------------|
//! | [`SyncHook`]            | all, in order              | last tap's value              |
//! | [`SyncBailHook`]        | until one returns a value  | that value                    |
//! | [`SyncWaterfallHook`]   | all, threading a value     | the final carried value       |
//! | [`SyncLoopHook`]        | repeatedly until quiet     | nothing                       |
//! | [`AsyncSeriesHook`]     | one at a time, awaited     | nothing                       |
//! | [`AsyncSeriesBailHook`] | one at a time until value  | that value                    |
//! | [`AsyncParallelHook`]   | all at once                | first failure, or success     |
//!
//! Taps are ordered by `stage` (lower first, ties by registration order) and
//! then by `before` constraints; see [`registry`] for the exact rules.
//! [`Interceptor`]s observe registration and calls without affecting
//! results. [`ObservableList`] is the shared sequence taps use to reshape
//! diagnostics during a call.
//!
//! # Architecture
//!
//! - **Layer 1** (`tapwork_hook`): the hook engine (this crate)
//! - **Layer 2** (`tapwork_compiler`): the lifecycle orchestrator
//! - **Layer 3** (`tapwork_core_plugins`): infrastructure plugins
//!
//! # Example
//!
//! ```
//! use tapwork_hook::{Hook, SyncWaterfallHook, Tap};
//!
//! let asset_path = SyncWaterfallHook::<String>::new("asset_path");
//! asset_path
//!     .register(Tap::sync("hash", |name: &String| Ok(Some(name.replace(".js", ".abc123.js")))))
//!     .unwrap();
//! asset_path
//!     .register(
//!         Tap::sync("prefix", |name: &String| Ok(Some(format!("dist/{name}"))))
//!             .with_before("hash"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(asset_path.call("main.js".into()).unwrap(), "dist/main.abc123.js");
//! ```

/// Observable ordered collections.
pub mod collection;

/// Error taxonomy.
pub mod error;

/// Hook core, call-kinds, and the [`Hook`] trait.
pub mod hook;

/// Interceptors.
pub mod interceptor;

/// The parallel call-kind.
pub mod parallel;

pub mod registry;

/// Asynchronous series call-kinds.
pub mod series;

/// Synchronous call-kinds.
pub mod sync;

/// Taps and their execution modes.
pub mod tap;

pub use collection::ObservableList;
pub use error::{
    HookError, InterceptPhase, InterceptorError, RegistrationError, TapError, TapFailure,
    TapResult,
};
pub use hook::{Hook, HookCore, HookKind};
pub use interceptor::Interceptor;
pub use parallel::{AsyncParallelHook, LateFailureSink};
pub use series::{AsyncSeriesBailHook, AsyncSeriesHook};
pub use sync::{SyncBailHook, SyncHook, SyncLoopHook, SyncWaterfallHook};
pub use tap::{BoxFuture, Completion, IntoTapOutput, Tap, TapHandle, TapInfo, TapMode};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::collection::*;
    pub use crate::error::*;
    pub use crate::hook::*;
    pub use crate::interceptor::*;
    pub use crate::parallel::*;
    pub use crate::series::*;
    pub use crate::sync::*;
    pub use crate::tap::*;
}
