//! Tracing and build-logging plugin.
//!
//! Provides [`TracingPlugin`], which installs a `tracing` subscriber when it
//! is applied and logs a one-line summary of every finished build.
//!
//! # Example
//!
//! ```
//! use tapwork_compiler::{Compiler, CompilerOptions};
//! use tapwork_core_plugins::{TracingFormat, TracingPlugin};
//! use tracing::Level;
//!
//! let mut compiler = Compiler::new(CompilerOptions::default());
//! compiler
//!     .add_plugins(
//!         TracingPlugin::default()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Compact),
//!     )
//!     .unwrap();
//! compiler.apply_plugins().unwrap();
//! ```

use std::sync::Arc;

use tapwork_compiler::{Compiler, CompilerError, Plugin, Stats};
use tapwork_hook::{Hook, Tap};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and logging plugin.
///
/// Configures the `tracing` subscriber. Uses the [`tracing`] and
/// [`tracing_subscriber`] crates under the hood. Installing is skipped when
/// a global subscriber already exists, so several compilers in one process
/// may each carry the plugin.
///
/// # Hooks Tapped
///
/// | Hook   | Tap       | Effect                                   |
/// |--------|-----------|------------------------------------------|
/// | `done` | `tracing` | Logs error, warning, and asset counts    |
///
/// # Configuration Options
///
/// ```
/// use tapwork_core_plugins::{TracingPlugin, TracingFormat};
/// use tracing::Level;
///
/// // Development: Pretty colored output with debug level
/// let dev_plugin = TracingPlugin::default()
///     .with_level(Level::DEBUG)
///     .with_format(TracingFormat::Pretty)
///     .with_span_events(true);
///
/// // CI: JSON output, quiet hook engine
/// let ci_plugin = TracingPlugin::default()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("tapwork_compiler=info,tapwork_hook=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "`tapwork_hook=debug`").
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An invalid filter falls back
    /// to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    fn install_subscriber(&self) {
        let env_filter = self.env_filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // try_init().ok() ignores errors if already initialized
        match self.format {
            TracingFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
        }
    }
}

impl Plugin for TracingPlugin {
    fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError> {
        self.install_subscriber();
        tracing::info!(
            level = %self.level,
            format = ?self.format,
            "TracingPlugin initialized"
        );

        compiler
            .hooks()
            .done
            .register(Tap::sync("tracing", |stats: &Arc<Stats>| {
                log_summary(stats);
                Ok(())
            }))?;
        Ok(())
    }
}

fn log_summary(stats: &Stats) {
    let name = stats.name.as_deref().unwrap_or("<unnamed>");
    if stats.has_errors() {
        tracing::warn!(
            build = name,
            errors = stats.errors.len(),
            warnings = stats.warnings.len(),
            time_ms = stats.time,
            "build completed with errors"
        );
    } else {
        tracing::info!(
            build = name,
            warnings = stats.warnings.len(),
            assets = stats.assets.len(),
            emitted = stats.emitted,
            time_ms = stats.time,
            "build completed"
        );
    }
    for diagnostic in &stats.errors {
        tracing::error!(build = name, code = ?diagnostic.code, "{diagnostic}");
    }
}
