//! The reported result of a build.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compilation::{Compilation, Diagnostic};

/// Name and size of an emitted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStats {
    /// Final file name.
    pub name: String,
    /// Size in bytes.
    pub size: usize,
}

/// Snapshot of a compilation taken once the pipeline has run.
///
/// The diagnostics are exactly what the taps left in the compilation's
/// collections; nothing is added or filtered on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Name of the build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Errors, in collection order.
    pub errors: Vec<Diagnostic>,
    /// Warnings, in collection order.
    pub warnings: Vec<Diagnostic>,
    /// Emitted assets, in emission order.
    pub assets: Vec<AssetStats>,
    /// Whether the `emit` hook ran.
    pub emitted: bool,
    /// Wall time of the build in milliseconds.
    pub time: u64,
}

impl Stats {
    /// Snapshots a compilation.
    #[must_use]
    pub fn from_compilation(compilation: &Compilation, emitted: bool, elapsed: Duration) -> Self {
        Self {
            name: compilation.name().map(ToOwned::to_owned),
            errors: compilation.errors.snapshot(),
            warnings: compilation.warnings.snapshot(),
            assets: compilation
                .assets
                .snapshot()
                .into_iter()
                .map(|asset| AssetStats {
                    size: asset.size(),
                    name: asset.name,
                })
                .collect(),
            emitted,
            time: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns true if any error was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if any warning was reported.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Serializes the stats to a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::AssetInfo;

    #[test]
    fn snapshot_reflects_collections() {
        let compilation = Compilation::new(Some("web".into()));
        compilation.warnings.push_back(Diagnostic::warning("W0"));
        compilation
            .emit_asset("main.js", "abc", AssetInfo::default())
            .unwrap();

        let stats = Stats::from_compilation(&compilation, true, Duration::from_millis(12));
        assert!(!stats.has_errors());
        assert!(stats.has_warnings());
        assert_eq!(
            stats.assets,
            vec![AssetStats {
                name: "main.js".into(),
                size: 3
            }]
        );

        // Later mutation does not reach an existing snapshot.
        compilation.warnings.take();
        assert_eq!(stats.warnings.len(), 1);
    }

    #[test]
    fn json_shape() {
        let compilation = Compilation::new(None);
        compilation.errors.push_back(Diagnostic::error("E0"));
        let json = Stats::from_compilation(&compilation, false, Duration::from_millis(3))
            .to_json()
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "errors": [{ "severity": "error", "message": "E0" }],
                "warnings": [],
                "assets": [],
                "emitted": false,
                "time": 3
            })
        );
    }
}
