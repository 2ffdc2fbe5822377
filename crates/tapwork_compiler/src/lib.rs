//! Lifecycle orchestrator for Tapwork (Layer 2).
//!
//! `tapwork_compiler` drives a build through a fixed sequence of hooks from
//! [`tapwork_hook`]:
//!
//! - [`compiler`] - The [`Compiler`], its pipeline hooks, and plugin application
//! - [`compilation`] - Per-build diagnostics, assets, and compilation hooks
//! - [`plugin`] - Plugin trait and plugin groups
//! - [`builtin`] - Built-in plugin options mapped for the compiled core
//! - [`external`] - Wrapper exposing derived operations of external modules
//! - [`stats`] - The reported result of a build
//!
//! # Architecture
//!
//! - **Layer 1** (`tapwork_hook`): Hook engine
//! - **Layer 2** (`tapwork_compiler`): Lifecycle orchestrator (this crate)
//! - **Layer 3** (`tapwork_core_plugins`): Infrastructure plugins
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tapwork_compiler::prelude::*;
//! use tapwork_hook::{Hook, Tap};
//!
//! struct ReplaceFirstWarning;
//!
//! impl Plugin for ReplaceFirstWarning {
//!     fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError> {
//!         compiler.hooks().after_compile.register(Tap::sync(
//!             "replace-first-warning",
//!             |compilation: &Arc<Compilation>| {
//!                 compilation.warnings.pop_front();
//!                 compilation.warnings.push_front(Diagnostic::warning("W1"));
//!                 Ok(())
//!             },
//!         ))?;
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut compiler = Compiler::new(CompilerOptions::default());
//! compiler.add_plugins(ReplaceFirstWarning).unwrap();
//! compiler
//!     .hooks()
//!     .this_compilation
//!     .register(Tap::sync("seed", |compilation: &Arc<Compilation>| {
//!         compilation.warnings.push_back(Diagnostic::warning("W0"));
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let stats = compiler.run().await.unwrap();
//! assert_eq!(stats.warnings, vec![Diagnostic::warning("W1")]);
//! # }
//! ```

/// Built-in plugins implemented by the compiled core.
pub mod builtin;

/// Per-build diagnostics and assets.
pub mod compilation;

/// Pipeline hooks and the build driver.
pub mod compiler;

/// Compiler error types.
pub mod error;

/// External module wrapper.
pub mod external;

/// Compiler configuration.
pub mod options;

/// Plugin trait for extensible functionality.
pub mod plugin;

/// Build results.
pub mod stats;

pub use builtin::{
    BuiltinPlugin, BuiltinPluginOptions, BuiltinPluginRequest, MinChunkSizeOptions,
    OccurrenceModuleIdsOptions, RawMinChunkSizeOptions, RawOccurrenceModuleIdsOptions,
};
pub use compilation::{Asset, AssetInfo, Compilation, CompilationHooks, Diagnostic, Severity};
pub use compiler::{Compiler, CompilerHooks};
pub use error::CompilerError;
pub use external::{ExternalModule, ExternalModuleRecord};
pub use options::CompilerOptions;
pub use plugin::{Plugin, PluginGroup, PluginGroupBuilder, PluginId, Plugins};
pub use stats::{AssetStats, Stats};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::builtin::*;
    pub use crate::compilation::*;
    pub use crate::compiler::*;
    pub use crate::error::*;
    pub use crate::external::*;
    pub use crate::options::*;
    pub use crate::plugin::*;
    pub use crate::stats::*;
}
