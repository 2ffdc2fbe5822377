//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::builtin::BuiltinPluginOptions;
use crate::error::CompilerError;

/// Options a [`Compiler`](crate::Compiler) is created with.
///
/// Usually built in code with the `with_*` methods, or parsed from JSON:
///
/// ```
/// use tapwork_compiler::CompilerOptions;
///
/// let options = CompilerOptions::from_json(
///     r#"{
///         "name": "web",
///         "bail": true,
///         "builtins": [{ "name": "MinChunkSizePlugin", "options": { "minChunkSize": 20000 } }]
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(options.name.as_deref(), Some("web"));
/// assert!(options.bail);
/// assert_eq!(options.builtins.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompilerOptions {
    /// Name of the build, reported in stats and logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fail the build when errors remain after `after_compile`.
    #[serde(default)]
    pub bail: bool,
    /// Built-in plugins to request from the core.
    #[serde(default)]
    pub builtins: Vec<BuiltinPluginOptions>,
}

impl CompilerOptions {
    /// Creates default options: unnamed, no bail, no built-in plugins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from JSON.
    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the build name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets whether errors fail the build.
    #[must_use]
    pub fn with_bail(mut self, bail: bool) -> Self {
        self.bail = bail;
        self
    }

    /// Requests a built-in plugin.
    #[must_use]
    pub fn with_builtin(mut self, builtin: BuiltinPluginOptions) -> Self {
        self.builtins.push(builtin);
        self
    }
}
