//! The per-build context shared by every tap.
//!
//! A [`Compilation`] is created once per [`Compiler::run`](crate::Compiler::run)
//! and handed to each pipeline hook behind an `Arc`. Its diagnostics and
//! assets are [`ObservableList`]s: taps reshape them freely while a hook runs,
//! and whatever they leave behind is what [`Stats`](crate::Stats) reports.
//!
//! # Example
//!
//! ```
//! use tapwork_compiler::{AssetInfo, Compilation, Diagnostic};
//! use tapwork_hook::{Hook, Tap};
//!
//! let compilation = Compilation::new(Some("web".into()));
//! compilation.warnings.push_back(Diagnostic::warning("W0"));
//!
//! // A plugin replaces the first warning.
//! compilation.warnings.pop_front();
//! compilation.warnings.push_front(Diagnostic::warning("W1"));
//!
//! compilation
//!     .hooks
//!     .asset_path
//!     .register(Tap::sync("public-path", |name: &String| Ok(Some(format!("static/{name}")))))
//!     .unwrap();
//! let name = compilation.emit_asset("main.js", "console.log(1)", AssetInfo::default()).unwrap();
//!
//! assert_eq!(name, "static/main.js");
//! assert_eq!(compilation.warnings.snapshot(), vec![Diagnostic::warning("W1")]);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};
use tapwork_hook::{HookError, ObservableList, SyncWaterfallHook, TapFailure};

// ─────────────────────────────────────────────────────────────────────────────
// Diagnostic
// ─────────────────────────────────────────────────────────────────────────────

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails the build when `bail` is enabled.
    Error,
    /// Reported but never fails the build.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A warning or error reported during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable code, such as `"TapFailure"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Identifier of the module the diagnostic concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Creates a warning diagnostic.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            code: None,
            module: None,
        }
    }

    /// Sets the diagnostic code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attributes the diagnostic to a module.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Returns true for error diagnostics.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(module) = &self.module {
            write!(f, " (in {module})")?;
        }
        Ok(())
    }
}

impl From<&TapFailure> for Diagnostic {
    fn from(failure: &TapFailure) -> Self {
        Diagnostic::error(failure.to_string()).with_code("TapFailure")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Asset
// ─────────────────────────────────────────────────────────────────────────────

/// Metadata attached to an emitted asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    /// The file name contains a content hash and never changes.
    #[serde(default)]
    pub immutable: bool,
    /// The content has been minimized.
    #[serde(default)]
    pub minimized: bool,
    /// The asset exists only to support development tooling.
    #[serde(default)]
    pub development: bool,
    /// Original file name of the asset's source, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_filename: Option<String>,
}

/// An output file produced by the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Final file name, after `asset_path` rewriting.
    pub name: String,
    /// File contents.
    pub source: String,
    /// Metadata.
    pub info: AssetInfo,
}

impl Asset {
    /// Returns the size of the contents in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.source.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compilation
// ─────────────────────────────────────────────────────────────────────────────

/// Hooks owned by a single compilation.
pub struct CompilationHooks {
    /// Rewrites the file name of every emitted asset.
    pub asset_path: SyncWaterfallHook<String>,
}

impl CompilationHooks {
    fn new() -> Self {
        Self {
            asset_path: SyncWaterfallHook::new("asset_path"),
        }
    }
}

impl fmt::Debug for CompilationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationHooks")
            .field("asset_path", &self.asset_path)
            .finish()
    }
}

/// Diagnostics, assets, and hooks of one build.
#[derive(Debug)]
pub struct Compilation {
    name: Option<String>,
    /// Warnings reported so far.
    pub warnings: ObservableList<Diagnostic>,
    /// Errors reported so far.
    pub errors: ObservableList<Diagnostic>,
    /// Assets emitted so far, in emission order.
    pub assets: ObservableList<Asset>,
    /// Hooks scoped to this compilation.
    pub hooks: CompilationHooks,
}

impl Compilation {
    /// Adds assets from other sources, such as copied static files.
    pub const PROCESS_ASSETS_STAGE_ADDITIONAL: i32 = -2000;
    /// Basic preprocessing of assets.
    pub const PROCESS_ASSETS_STAGE_PRE_PROCESS: i32 = -1000;
    /// Derives new assets from existing ones.
    pub const PROCESS_ASSETS_STAGE_DERIVED: i32 = -200;
    /// Adds sections to existing assets, such as banners.
    pub const PROCESS_ASSETS_STAGE_ADDITIONS: i32 = -100;
    /// Optimizes existing assets in a general way.
    pub const PROCESS_ASSETS_STAGE_OPTIMIZE: i32 = 100;
    /// Optimizes the count of existing assets.
    pub const PROCESS_ASSETS_STAGE_OPTIMIZE_COUNT: i32 = 200;
    /// Optimizes compatibility of existing assets.
    pub const PROCESS_ASSETS_STAGE_OPTIMIZE_COMPATIBILITY: i32 = 300;
    /// Optimizes the size of existing assets.
    pub const PROCESS_ASSETS_STAGE_OPTIMIZE_SIZE: i32 = 400;
    /// Adds development tooling, such as source maps.
    pub const PROCESS_ASSETS_STAGE_DEV_TOOLING: i32 = 500;
    /// Inlines small assets into others.
    pub const PROCESS_ASSETS_STAGE_OPTIMIZE_INLINE: i32 = 700;
    /// Summarizes the list of existing assets.
    pub const PROCESS_ASSETS_STAGE_SUMMARIZE: i32 = 1000;
    /// Optimizes the hashes of assets.
    pub const PROCESS_ASSETS_STAGE_OPTIMIZE_HASH: i32 = 2500;
    /// Optimizes transfer of existing assets, such as compression.
    pub const PROCESS_ASSETS_STAGE_OPTIMIZE_TRANSFER: i32 = 3000;
    /// Analyses existing assets.
    pub const PROCESS_ASSETS_STAGE_ANALYSE: i32 = 4000;
    /// Creates assets for reporting purposes.
    pub const PROCESS_ASSETS_STAGE_REPORT: i32 = 5000;

    /// Creates an empty compilation.
    #[must_use]
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            warnings: ObservableList::new(),
            errors: ObservableList::new(),
            assets: ObservableList::new(),
            hooks: CompilationHooks::new(),
        }
    }

    /// Returns the name of the compiler that created this compilation.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Appends a diagnostic to `errors` or `warnings` by severity.
    pub fn push_diagnostic(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.errors.push_back(diagnostic),
            Severity::Warning => self.warnings.push_back(diagnostic),
        }
    }

    /// Emits an asset.
    ///
    /// The file name is threaded through the `asset_path` hook first; the
    /// rewritten name is returned.
    pub fn emit_asset(
        &self,
        filename: impl Into<String>,
        source: impl Into<String>,
        info: AssetInfo,
    ) -> Result<String, HookError> {
        let name = self.hooks.asset_path.call(filename.into())?;
        let source = source.into();
        tracing::debug!(asset = %name, size = source.len(), "asset emitted");
        self.assets.push_back(Asset {
            name: name.clone(),
            source,
            info,
        });
        Ok(name)
    }

    /// Returns a copy of the asset with the given final name.
    #[must_use]
    pub fn asset(&self, name: &str) -> Option<Asset> {
        self.assets
            .snapshot()
            .into_iter()
            .find(|asset| asset.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapwork_hook::{Hook, Tap, TapError};

    #[test]
    fn diagnostics_route_by_severity() {
        let compilation = Compilation::new(None);
        compilation.push_diagnostic(Diagnostic::warning("slow"));
        compilation.push_diagnostic(Diagnostic::error("broken"));
        assert_eq!(compilation.warnings.len(), 1);
        assert_eq!(compilation.errors.snapshot(), vec![Diagnostic::error("broken")]);
    }

    #[test]
    fn diagnostic_display() {
        let diagnostic = Diagnostic::error("unexpected token").with_module("./src/a.js");
        assert_eq!(diagnostic.to_string(), "error: unexpected token (in ./src/a.js)");
    }

    #[test]
    fn diagnostic_from_tap_failure() {
        let failure = TapFailure {
            hook: "make".into(),
            tap: "entry".into(),
            error: TapError::msg("not found"),
        };
        let diagnostic = Diagnostic::from(&failure);
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.code.as_deref(), Some("TapFailure"));
        assert_eq!(diagnostic.message, "tap 'entry' on hook 'make' failed: not found");
    }

    #[test]
    fn diagnostic_serializes_camel_case_without_empty_fields() {
        let json = serde_json::to_value(Diagnostic::warning("w").with_code("W001")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"severity": "warning", "message": "w", "code": "W001"})
        );
    }

    #[test]
    fn emit_asset_rewrites_name() {
        let compilation = Compilation::new(None);
        compilation
            .hooks
            .asset_path
            .register(Tap::sync("hash", |name: &String| {
                Ok(Some(name.replace(".js", ".0f3a.js")))
            }))
            .unwrap();

        let name = compilation
            .emit_asset("main.js", "let a;", AssetInfo::default())
            .unwrap();
        assert_eq!(name, "main.0f3a.js");
        assert_eq!(compilation.asset("main.0f3a.js").map(|a| a.size()), Some(6));
        assert!(compilation.asset("main.js").is_none());
    }

    #[test]
    fn failing_asset_path_emits_nothing() {
        let compilation = Compilation::new(None);
        compilation
            .hooks
            .asset_path
            .register(Tap::sync("reject", |_: &String| {
                Err::<Option<String>, _>(TapError::msg("bad name"))
            }))
            .unwrap();

        assert!(compilation.emit_asset("x.js", "", AssetInfo::default()).is_err());
        assert!(compilation.assets.is_empty());
    }
}
