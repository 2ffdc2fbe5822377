//! Core infrastructure plugins for Tapwork.
//!
//! This crate provides plugins most builds want regardless of what they
//! bundle:
//!
//! - [`TracingPlugin`] - Subscriber setup and build summaries via `tracing`
//! - [`HookProfilingPlugin`] - Interceptor-based tracing and counting of every hook call
//! - [`DefaultPlugins`] - Convenient bundle of both
//!
//! # Example
//!
//! ```
//! use tapwork_compiler::{Compiler, CompilerOptions, PluginGroup};
//! use tapwork_core_plugins::DefaultPlugins;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut compiler = Compiler::new(CompilerOptions::default().with_name("web"));
//! compiler.add_plugins(DefaultPlugins.build()).unwrap();
//! let stats = compiler.run().await.unwrap();
//! assert!(!stats.has_errors());
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`tapwork_hook`): Hook engine
//! - **Layer 2** (`tapwork_compiler`): Lifecycle orchestrator
//! - **Layer 3** (`tapwork_core_plugins`): Infrastructure plugins (this crate)

mod profiling;
mod tracing_plugin;

pub use profiling::{HookCounts, HookProfile, HookProfilingPlugin};
pub use tracing_plugin::{TracingFormat, TracingPlugin};

use tapwork_compiler::{PluginGroup, PluginGroupBuilder};

/// Default plugins for most builds.
///
/// Includes:
/// - [`TracingPlugin`] - Logging and build summaries
/// - [`HookProfilingPlugin`] - Hook call tracing
///
/// # Customization
///
/// ```ignore
/// compiler.add_plugins(
///     DefaultPlugins
///         .build()
///         .disable::<TracingPlugin>()
/// )?;
/// ```
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(TracingPlugin::default())
            .add(HookProfilingPlugin::default())
    }
}

/// Minimal plugins for tests and embedding.
///
/// Includes only [`HookProfilingPlugin`]. Does not install a subscriber, so
/// the host keeps control of log output.
pub struct MinimalPlugins;

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new().add(HookProfilingPlugin::default())
    }
}
