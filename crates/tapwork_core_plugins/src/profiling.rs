//! Interceptor-based hook instrumentation.
//!
//! [`HookProfilingPlugin`] attaches an interceptor to every compiler hook and
//! to the `asset_path` hook of each compilation. The interceptors emit
//! `tracing` events and count calls and tap invocations per hook into a
//! shared [`HookProfile`]. Being interceptors, they never change what a hook
//! returns.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tapwork_compiler::{Compilation, Compiler, CompilerError, Plugin};
use tapwork_hook::{Hook, HookError, Interceptor, Tap, TapError};

// ─────────────────────────────────────────────────────────────────────────────
// HookProfile
// ─────────────────────────────────────────────────────────────────────────────

/// Call and tap counts of one hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookCounts {
    /// Number of calls.
    pub calls: usize,
    /// Number of taps started, summed over all calls.
    pub taps: usize,
}

/// Shared counters filled by [`HookProfilingPlugin`].
///
/// Cloning returns a handle to the same counters.
#[derive(Debug, Clone, Default)]
pub struct HookProfile {
    counts: Arc<Mutex<HashMap<String, HookCounts>>>,
}

impl HookProfile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counts for one hook.
    #[must_use]
    pub fn get(&self, hook: &str) -> HookCounts {
        self.counts.lock().get(hook).copied().unwrap_or_default()
    }

    /// Returns the counts of every hook that was called, sorted by hook name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, HookCounts)> {
        let mut entries: Vec<_> = self
            .counts
            .lock()
            .iter()
            .map(|(hook, counts)| (hook.clone(), *counts))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn record_call(&self, hook: &str) {
        self.counts.lock().entry_ref(hook).or_default().calls += 1;
    }

    fn record_tap(&self, hook: &str) {
        self.counts.lock().entry_ref(hook).or_default().taps += 1;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookProfilingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Traces and counts every hook call and tap invocation.
///
/// # Example
///
/// ```
/// use tapwork_compiler::{Compiler, CompilerOptions};
/// use tapwork_core_plugins::HookProfilingPlugin;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let profiling = HookProfilingPlugin::new();
/// let profile = profiling.profile();
///
/// let mut compiler = Compiler::new(CompilerOptions::default());
/// compiler.add_plugins(profiling).unwrap();
/// compiler.run().await.unwrap();
///
/// assert_eq!(profile.get("make").calls, 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HookProfilingPlugin {
    profile: HookProfile,
}

impl HookProfilingPlugin {
    /// Creates the plugin with a fresh profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the counters this plugin fills.
    #[must_use]
    pub fn profile(&self) -> HookProfile {
        self.profile.clone()
    }
}

/// Attaches the profiling interceptor to one hook.
fn instrument<H>(hook: &H, profile: &HookProfile) -> Result<(), HookError>
where
    H: Hook,
    H::Args: 'static,
{
    let name = hook.name().to_owned();
    let on_call = (profile.clone(), name.clone());
    let on_tap = (profile.clone(), name);

    hook.intercept(
        Interceptor::new("hook-profiling")
            .on_call(move |_| {
                let (profile, hook) = &on_call;
                profile.record_call(hook);
                tracing::debug!(hook = %hook, "hook called");
                Ok(())
            })
            .on_tap(move |info| {
                let (profile, hook) = &on_tap;
                profile.record_tap(hook);
                tracing::debug!(
                    hook = %hook,
                    tap = %info.name,
                    stage = info.stage,
                    mode = %info.mode,
                    "tap started"
                );
                Ok(())
            }),
    )
}

impl Plugin for HookProfilingPlugin {
    fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError> {
        let hooks = compiler.hooks();
        let profile = &self.profile;

        instrument(&hooks.environment, profile)?;
        instrument(&hooks.before_run, profile)?;
        instrument(&hooks.this_compilation, profile)?;
        instrument(&hooks.make, profile)?;
        instrument(&hooks.finish_make, profile)?;
        instrument(&hooks.process_assets, profile)?;
        instrument(&hooks.after_compile, profile)?;
        instrument(&hooks.should_emit, profile)?;
        instrument(&hooks.emit, profile)?;
        instrument(&hooks.done, profile)?;

        let profile = profile.clone();
        hooks.this_compilation.register(
            Tap::sync("hook-profiling", move |compilation: &Arc<Compilation>| {
                instrument(&compilation.hooks.asset_path, &profile).map_err(TapError::from_error)
            })
            .with_stage(i32::MIN),
        )?;
        Ok(())
    }
}
