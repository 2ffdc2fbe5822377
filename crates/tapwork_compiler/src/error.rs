//! Compiler error types.

use tapwork_hook::HookError;

use crate::compilation::Diagnostic;

/// Errors surfaced while assembling plugins or running a build.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    /// A unique plugin was added twice.
    #[error(
        "plugin '{name}' is unique and was already added; \
         return false from `is_unique()` to allow several instances"
    )]
    DuplicatePlugin {
        /// The plugin's name.
        name: String,
    },

    /// A plugin depends on a plugin that was never added.
    #[error("plugin '{plugin}' requires '{dependency}' which was not added")]
    MissingDependency {
        /// The dependent plugin.
        plugin: String,
        /// The missing dependency.
        dependency: String,
    },

    /// Plugin dependencies form a cycle.
    #[error("circular dependency detected among plugins: {}", .plugins.join(", "))]
    CircularDependency {
        /// Plugins that could not be ordered.
        plugins: Vec<String>,
    },

    /// A pipeline hook failed.
    #[error("`{hook}` hook failed: {source}")]
    Stage {
        /// The pipeline hook that failed.
        hook: &'static str,
        /// The hook's error.
        #[source]
        source: HookError,
    },

    /// Registering on a hook failed while a plugin was being applied.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// `bail` is enabled and the compilation reported errors.
    #[error("build failed with {} error(s) and `bail` enabled", .errors.len())]
    Bail {
        /// The errors reported by the compilation.
        errors: Vec<Diagnostic>,
    },

    /// A plugin failed to apply earlier; the compiler is unusable.
    #[error("a plugin failed to apply; the compiler cannot build")]
    ApplyFailed,

    /// The compiler was already run; each pipeline hook fires once per build.
    #[error("compiler has already run")]
    AlreadyRun,

    /// Compiler options could not be parsed.
    #[error("invalid compiler options: {0}")]
    Options(#[from] serde_json::Error),
}

impl CompilerError {
    /// Returns the hook error behind this error, if any.
    #[must_use]
    pub fn hook_error(&self) -> Option<&HookError> {
        match self {
            CompilerError::Stage { source, .. } | CompilerError::Hook(source) => Some(source),
            _ => None,
        }
    }
}
