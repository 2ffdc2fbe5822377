//! A staged build pipeline whose every lifecycle stage is a hook that
//! plugins tap into.
//!
//! Re-exports the Tapwork crates for convenience.

/// Layer 1: Hook engine.
pub use tapwork_hook;

/// Layer 2: Lifecycle orchestrator.
pub use tapwork_compiler;

/// Layer 3: Infrastructure plugins.
pub use tapwork_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tapwork_compiler::prelude::*;
    pub use tapwork_core_plugins::{DefaultPlugins, MinimalPlugins, TracingPlugin};
    pub use tapwork_hook::prelude::*;
}
