//! Modules provided by the runtime environment instead of the bundle.
//!
//! The core hands out [`ExternalModuleRecord`]s as plain data. An
//! [`ExternalModule`] wraps one record together with the compilation it
//! belongs to and exposes the derived operations plugins need.

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tapwork_hook::HookError;

use crate::compilation::{AssetInfo, Compilation};

/// Raw data of an external module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalModuleRecord {
    /// What the runtime resolves, such as `"jQuery"`.
    pub request: String,
    /// How it is resolved, such as `"var"` or `"commonjs"`.
    pub external_type: String,
    /// The request as written in user code.
    pub user_request: String,
    /// Generated source, once the core has produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_source: Option<String>,
}

/// An external module bound to its compilation.
///
/// ```
/// use std::sync::Arc;
///
/// use tapwork_compiler::{AssetInfo, Compilation, ExternalModule, ExternalModuleRecord};
///
/// let compilation = Arc::new(Compilation::new(None));
/// let module = ExternalModule::new(
///     ExternalModuleRecord {
///         request: "jQuery".into(),
///         external_type: "var".into(),
///         user_request: "jquery".into(),
///         original_source: None,
///     },
///     Arc::clone(&compilation),
/// );
///
/// assert_eq!(module.identifier(), r#"external var "jQuery""#);
/// module.emit_file("jquery.LICENSE.txt", "MIT", AssetInfo::default()).unwrap();
/// assert_eq!(compilation.assets.len(), 1);
/// ```
#[derive(Clone)]
pub struct ExternalModule {
    record: ExternalModuleRecord,
    identifier: String,
    compilation: Arc<Compilation>,
}

impl ExternalModule {
    /// Wraps a record.
    #[must_use]
    pub fn new(record: ExternalModuleRecord, compilation: Arc<Compilation>) -> Self {
        let request = serde_json::Value::String(record.request.clone());
        let identifier = format!("external {} {request}", record.external_type);
        Self {
            record,
            identifier,
            compilation,
        }
    }

    /// Returns the unique identifier of the module.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the request as written in user code.
    #[must_use]
    pub fn user_request(&self) -> &str {
        &self.record.user_request
    }

    /// Returns the generated source, if any.
    #[must_use]
    pub fn original_source(&self) -> Option<&str> {
        self.record.original_source.as_deref()
    }

    /// Returns the underlying record.
    #[must_use]
    pub fn record(&self) -> &ExternalModuleRecord {
        &self.record
    }

    /// Emits an asset on behalf of this module.
    ///
    /// Goes through [`Compilation::emit_asset`], so the file name is rewritten
    /// by the `asset_path` hook. Returns the final name.
    pub fn emit_file(
        &self,
        filename: impl Into<String>,
        source: impl Into<String>,
        info: AssetInfo,
    ) -> Result<String, HookError> {
        let filename = filename.into();
        tracing::debug!(module = %self.identifier, file = %filename, "external module emits file");
        self.compilation.emit_asset(filename, source, info)
    }
}

impl fmt::Debug for ExternalModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalModule")
            .field("identifier", &self.identifier)
            .field("user_request", &self.record.user_request)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapwork_hook::{Hook, Tap};

    fn record(request: &str) -> ExternalModuleRecord {
        ExternalModuleRecord {
            request: request.into(),
            external_type: "commonjs".into(),
            user_request: "lodash".into(),
            original_source: Some("module.exports = require(\"lodash\");".into()),
        }
    }

    #[test]
    fn identifier_quotes_request() {
        let module = ExternalModule::new(record("lo\"dash"), Arc::new(Compilation::new(None)));
        assert_eq!(module.identifier(), r#"external commonjs "lo\"dash""#);
        assert_eq!(module.user_request(), "lodash");
        assert!(module.original_source().is_some_and(|s| s.contains("require")));
    }

    #[test]
    fn emit_file_goes_through_asset_path() {
        let compilation = Arc::new(Compilation::new(None));
        compilation
            .hooks
            .asset_path
            .register(Tap::sync("vendor-dir", |name: &String| Ok(Some(format!("vendor/{name}")))))
            .unwrap();

        let module = ExternalModule::new(record("lodash"), Arc::clone(&compilation));
        let name = module
            .emit_file("lodash.txt", "license", AssetInfo::default())
            .unwrap();

        assert_eq!(name, "vendor/lodash.txt");
        assert_eq!(compilation.asset("vendor/lodash.txt").map(|a| a.source), Some("license".to_owned()));
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(record("lodash")).unwrap();
        assert_eq!(json["externalType"], "commonjs");
        assert_eq!(json["userRequest"], "lodash");
    }
}
