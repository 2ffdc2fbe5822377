//! Built-in plugins implemented by the compiled core.
//!
//! Built-in plugins never tap a hook themselves. Their loosely typed options
//! are mapped, per plugin kind, into a canonical [`BuiltinPluginRequest`] that
//! the compiler records for the core to consume.
//!
//! ```
//! use tapwork_compiler::{BuiltinPluginOptions, BuiltinPluginRequest};
//!
//! let options: BuiltinPluginOptions = serde_json::from_str(
//!     r#"{ "name": "OccurrenceModuleIdsPlugin", "options": {} }"#,
//! )
//! .unwrap();
//! let request = BuiltinPluginRequest::from(options);
//!
//! assert_eq!(request.name, "OccurrenceModuleIdsPlugin");
//! assert_eq!(request.options["prioritiseInitial"], false);
//! assert_eq!(request.affected_hooks, Some("compilation"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::compiler::Compiler;
use crate::error::CompilerError;
use crate::plugin::Plugin;

// ─────────────────────────────────────────────────────────────────────────────
// Raw Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options for merging chunks smaller than a minimum size, as written by users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMinChunkSizeOptions {
    /// Size added for every chunk.
    #[serde(default)]
    pub chunk_overhead: Option<f64>,
    /// Size multiplier applied to entry chunks.
    #[serde(default)]
    pub entry_chunk_multiplicator: Option<f64>,
    /// Chunks below this size are merged.
    pub min_chunk_size: f64,
}

/// Options for occurrence-based module ids, as written by users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOccurrenceModuleIdsOptions {
    /// Give modules of initial chunks the shortest ids.
    #[serde(default)]
    pub prioritise_initial: Option<bool>,
}

/// Options of a built-in plugin, tagged by plugin name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "options")]
pub enum BuiltinPluginOptions {
    /// `MinChunkSizePlugin`.
    #[serde(rename = "MinChunkSizePlugin")]
    MinChunkSize(RawMinChunkSizeOptions),
    /// `OccurrenceModuleIdsPlugin`.
    #[serde(rename = "OccurrenceModuleIdsPlugin")]
    OccurrenceModuleIds(RawOccurrenceModuleIdsOptions),
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical Options
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized `MinChunkSizePlugin` options.
///
/// Absent size factors stay absent; the core applies its own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct MinChunkSizeOptions {
    /// Size added for every chunk.
    pub chunk_overhead: Option<f64>,
    /// Size multiplier applied to entry chunks.
    pub entry_chunk_multiplicator: Option<f64>,
    /// Chunks below this size are merged.
    pub min_chunk_size: f64,
}

impl From<RawMinChunkSizeOptions> for MinChunkSizeOptions {
    fn from(raw: RawMinChunkSizeOptions) -> Self {
        Self {
            chunk_overhead: raw.chunk_overhead,
            entry_chunk_multiplicator: raw.entry_chunk_multiplicator,
            min_chunk_size: raw.min_chunk_size,
        }
    }
}

/// Normalized `OccurrenceModuleIdsPlugin` options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccurrenceModuleIdsOptions {
    /// Give modules of initial chunks the shortest ids.
    pub prioritise_initial: bool,
}

impl From<RawOccurrenceModuleIdsOptions> for OccurrenceModuleIdsOptions {
    fn from(raw: RawOccurrenceModuleIdsOptions) -> Self {
        Self {
            prioritise_initial: raw.prioritise_initial.unwrap_or_default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BuiltinPluginRequest
// ─────────────────────────────────────────────────────────────────────────────

/// A built-in plugin in the shape the compiled core consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltinPluginRequest {
    /// Plugin name, such as `"MinChunkSizePlugin"`.
    pub name: String,
    /// Normalized options.
    pub options: serde_json::Value,
    /// Which hook family the plugin touches, when it declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_hooks: Option<&'static str>,
}

impl From<BuiltinPluginOptions> for BuiltinPluginRequest {
    fn from(options: BuiltinPluginOptions) -> Self {
        match options {
            BuiltinPluginOptions::MinChunkSize(raw) => {
                let options = MinChunkSizeOptions::from(raw);
                Self {
                    name: "MinChunkSizePlugin".to_owned(),
                    options: json!({
                        "chunkOverhead": options.chunk_overhead,
                        "entryChunkMultiplicator": options.entry_chunk_multiplicator,
                        "minChunkSize": options.min_chunk_size,
                    }),
                    affected_hooks: None,
                }
            }
            BuiltinPluginOptions::OccurrenceModuleIds(raw) => {
                let options = OccurrenceModuleIdsOptions::from(raw);
                Self {
                    name: "OccurrenceModuleIdsPlugin".to_owned(),
                    options: json!({ "prioritiseInitial": options.prioritise_initial }),
                    affected_hooks: Some("compilation"),
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BuiltinPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Adds a built-in plugin request to the compiler.
///
/// Several built-in plugins of the same kind may be added with different
/// options.
#[derive(Debug, Clone)]
pub struct BuiltinPlugin {
    request: BuiltinPluginRequest,
}

impl BuiltinPlugin {
    /// Creates the plugin from tagged options.
    #[must_use]
    pub fn new(options: BuiltinPluginOptions) -> Self {
        Self {
            request: options.into(),
        }
    }

    /// Returns the request this plugin records.
    #[must_use]
    pub fn request(&self) -> &BuiltinPluginRequest {
        &self.request
    }
}

impl From<BuiltinPluginOptions> for BuiltinPlugin {
    fn from(options: BuiltinPluginOptions) -> Self {
        Self::new(options)
    }
}

impl Plugin for BuiltinPlugin {
    fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError> {
        tracing::debug!(plugin = %self.request.name, "builtin plugin requested");
        compiler.add_builtin(self.request.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.request.name
    }

    fn is_unique(&self) -> bool {
        false
    }
}
