//! The build orchestrator.
//!
//! A [`Compiler`] owns one hook per lifecycle stage, applies plugins, and
//! drives a single build through the hooks in a fixed order:
//!
//! | Hook               | Kind            | Argument           |
//! |--------------------|-----------------|--------------------|
//! | `environment`      | Sync            | `CompilerOptions`  |
//! | `before_run`       | AsyncSeries     | `CompilerOptions`  |
//! | `this_compilation` | Sync            | `Compilation`      |
//! | `make`             | AsyncParallel   | `Compilation`      |
//! | `finish_make`      | AsyncSeries     | `Compilation`      |
//! | `process_assets`   | AsyncSeries     | `Compilation`      |
//! | `after_compile`    | AsyncSeries     | `Compilation`      |
//! | `should_emit`      | SyncBail → bool | `Compilation`      |
//! | `emit`             | AsyncSeries     | `Compilation`      |
//! | `done`             | AsyncSeries     | `Stats`            |
//!
//! Each hook fires at most once per compiler. `emit` is skipped when a
//! `should_emit` tap returns `false`.

use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use hashbrown::{HashMap, HashSet};
use tapwork_hook::{AsyncParallelHook, AsyncSeriesHook, HookError, SyncBailHook, SyncHook};

use crate::builtin::{BuiltinPlugin, BuiltinPluginRequest};
use crate::compilation::{Compilation, Diagnostic};
use crate::error::CompilerError;
use crate::options::CompilerOptions;
use crate::plugin::{BoxedPlugin, Plugin, PluginId, Plugins};
use crate::stats::Stats;

// ─────────────────────────────────────────────────────────────────────────────
// CompilerHooks
// ─────────────────────────────────────────────────────────────────────────────

/// The pipeline hooks of a compiler.
///
/// All hooks are created by [`Compiler::new`], before any plugin is applied.
pub struct CompilerHooks {
    /// Options are final; plugins may inspect them.
    pub environment: SyncHook<Arc<CompilerOptions>>,
    /// About to start the build.
    pub before_run: AsyncSeriesHook<Arc<CompilerOptions>>,
    /// The compilation was created. Plugins tap its own hooks here.
    pub this_compilation: SyncHook<Arc<Compilation>>,
    /// Builds the module graph. Taps run concurrently.
    pub make: AsyncParallelHook<Arc<Compilation>>,
    /// Every `make` tap has completed.
    pub finish_make: AsyncSeriesHook<Arc<Compilation>>,
    /// Processes assets in stages; see the `PROCESS_ASSETS_STAGE_*`
    /// constants on [`Compilation`].
    pub process_assets: AsyncSeriesHook<Arc<Compilation>>,
    /// The compilation is sealed. Last chance to reshape diagnostics.
    pub after_compile: AsyncSeriesHook<Arc<Compilation>>,
    /// Returning `false` skips `emit`.
    pub should_emit: SyncBailHook<Arc<Compilation>, bool>,
    /// Writes assets.
    pub emit: AsyncSeriesHook<Arc<Compilation>>,
    /// The build has finished.
    pub done: AsyncSeriesHook<Arc<Stats>>,
}

impl CompilerHooks {
    fn new() -> Self {
        Self {
            environment: SyncHook::new("environment"),
            before_run: AsyncSeriesHook::new("before_run"),
            this_compilation: SyncHook::new("this_compilation"),
            make: AsyncParallelHook::new("make"),
            finish_make: AsyncSeriesHook::new("finish_make"),
            process_assets: AsyncSeriesHook::new("process_assets"),
            after_compile: AsyncSeriesHook::new("after_compile"),
            should_emit: SyncBailHook::new("should_emit"),
            emit: AsyncSeriesHook::new("emit"),
            done: AsyncSeriesHook::new("done"),
        }
    }
}

impl fmt::Debug for CompilerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerHooks")
            .field("environment", &self.environment)
            .field("before_run", &self.before_run)
            .field("this_compilation", &self.this_compilation)
            .field("make", &self.make)
            .field("finish_make", &self.finish_make)
            .field("process_assets", &self.process_assets)
            .field("after_compile", &self.after_compile)
            .field("should_emit", &self.should_emit)
            .field("emit", &self.emit)
            .field("done", &self.done)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compiler
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state. Progresses linearly; `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompilerState {
    NotStarted,
    Applying,
    Applied,
    Finished,
    Failed,
}

/// A registered plugin.
struct PluginEntry {
    id: PluginId,
    plugin: Box<dyn Plugin>,
    name: String,
}

/// Owns the pipeline hooks and the plugins tapping them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use tapwork_compiler::{Compilation, Compiler, CompilerOptions, Diagnostic};
/// use tapwork_hook::{Hook, Tap};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut compiler = Compiler::new(CompilerOptions::default().with_name("web"));
/// compiler
///     .hooks()
///     .after_compile
///     .register(Tap::sync("lint", |compilation: &Arc<Compilation>| {
///         compilation.warnings.push_back(Diagnostic::warning("unused import"));
///         Ok(())
///     }))
///     .unwrap();
///
/// let stats = compiler.run().await.unwrap();
/// assert_eq!(stats.warnings, vec![Diagnostic::warning("unused import")]);
/// assert!(stats.emitted);
/// # }
/// ```
pub struct Compiler {
    options: Arc<CompilerOptions>,
    hooks: CompilerHooks,
    pending_plugins: Vec<PluginEntry>,
    applied_plugins: Vec<PluginEntry>,
    plugin_ids: HashSet<PluginId>,
    builtins: Vec<BuiltinPluginRequest>,
    state: CompilerState,
    compilation: Option<Arc<Compilation>>,
}

impl Compiler {
    /// Creates a compiler with every pipeline hook and no taps.
    ///
    /// A [`BuiltinPlugin`] is queued for each entry of
    /// [`CompilerOptions::builtins`].
    #[must_use]
    pub fn new(options: CompilerOptions) -> Self {
        let pending_plugins: Vec<PluginEntry> = options
            .builtins
            .iter()
            .cloned()
            .map(|builtin| {
                let plugin = BuiltinPlugin::new(builtin);
                PluginEntry {
                    id: PluginId::of::<BuiltinPlugin>(),
                    name: plugin.name().to_owned(),
                    plugin: Box::new(plugin),
                }
            })
            .collect();

        let mut plugin_ids = HashSet::new();
        if !pending_plugins.is_empty() {
            plugin_ids.insert(PluginId::of::<BuiltinPlugin>());
        }

        Self {
            options: Arc::new(options),
            hooks: CompilerHooks::new(),
            pending_plugins,
            applied_plugins: Vec::new(),
            plugin_ids,
            builtins: Vec::new(),
            state: CompilerState::NotStarted,
            compilation: None,
        }
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Returns the pipeline hooks.
    #[must_use]
    pub fn hooks(&self) -> &CompilerHooks {
        &self.hooks
    }

    /// Returns the compilation of the current or last build.
    #[must_use]
    pub fn compilation(&self) -> Option<&Arc<Compilation>> {
        self.compilation.as_ref()
    }

    /// Returns the built-in plugin requests recorded so far.
    #[must_use]
    pub fn builtin_plugins(&self) -> &[BuiltinPluginRequest] {
        &self.builtins
    }

    /// Records a built-in plugin request for the compiled core.
    pub fn add_builtin(&mut self, request: BuiltinPluginRequest) {
        self.builtins.push(request);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds one or more plugins.
    ///
    /// Accepts a single [`Plugin`] or a
    /// [`PluginGroupBuilder`](crate::PluginGroupBuilder). Plugins added while
    /// plugins are being applied are applied immediately.
    pub fn add_plugins<P: Plugins>(&mut self, plugins: P) -> Result<&mut Self, CompilerError> {
        plugins.add_to_compiler(self)?;
        Ok(self)
    }

    pub(crate) fn add_plugin_boxed(&mut self, boxed: BoxedPlugin) -> Result<(), CompilerError> {
        let BoxedPlugin { id, plugin } = boxed;
        let name = plugin.name().to_owned();

        if plugin.is_unique() && self.plugin_ids.contains(&id) {
            return Err(CompilerError::DuplicatePlugin { name });
        }
        self.plugin_ids.insert(id);

        let entry = PluginEntry { id, plugin, name };
        match self.state {
            CompilerState::NotStarted => self.pending_plugins.push(entry),
            CompilerState::Applying | CompilerState::Applied | CompilerState::Finished => {
                self.check_applied_dependencies(&entry)?;
                self.apply_entry(entry)?;
            }
            CompilerState::Failed => return Err(CompilerError::ApplyFailed),
        }
        Ok(())
    }

    /// Returns true if a plugin of the given type has been added.
    #[must_use]
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugin_ids.contains(&PluginId::of::<P>())
    }

    /// Applies every queued plugin in dependency order.
    ///
    /// Called by [`run`](Self::run) if it has not been called yet. If a
    /// plugin fails to apply, the remaining plugins are discarded and every
    /// later call (and [`run`](Self::run)) fails with
    /// [`CompilerError::ApplyFailed`].
    pub fn apply_plugins(&mut self) -> Result<(), CompilerError> {
        match self.state {
            CompilerState::NotStarted => {}
            CompilerState::Failed => return Err(CompilerError::ApplyFailed),
            CompilerState::Applying | CompilerState::Applied | CompilerState::Finished => {
                return Ok(());
            }
        }

        let sorted = self.sort_plugins_by_dependencies()?;
        self.state = CompilerState::Applying;
        for entry in sorted {
            let name = entry.name.clone();
            if let Err(err) = self.apply_entry(entry) {
                tracing::warn!(plugin = %name, error = %err, "plugin failed to apply");
                self.state = CompilerState::Failed;
                return Err(err);
            }
        }
        self.state = CompilerState::Applied;
        tracing::debug!(plugins = self.applied_plugins.len(), "plugins applied");
        Ok(())
    }

    /// Returns the names of applied plugins, in application order.
    #[must_use]
    pub fn applied_plugins(&self) -> Vec<&str> {
        self.applied_plugins
            .iter()
            .map(|entry| entry.name.as_str())
            .collect()
    }

    fn apply_entry(&mut self, entry: PluginEntry) -> Result<(), CompilerError> {
        tracing::debug!(plugin = %entry.name, "applying plugin");
        entry.plugin.apply(self)?;
        self.applied_plugins.push(entry);
        Ok(())
    }

    fn check_applied_dependencies(&self, entry: &PluginEntry) -> Result<(), CompilerError> {
        for dependency in entry.plugin.dependencies() {
            if !self.applied_plugins.iter().any(|p| p.id == dependency) {
                return Err(CompilerError::MissingDependency {
                    plugin: entry.name.clone(),
                    dependency: dependency.type_name().to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Sorts pending plugins by dependencies (Kahn's algorithm).
    ///
    /// Plugins without an ordering relation keep the order they were added
    /// in, so taps they register keep a predictable registration order.
    fn sort_plugins_by_dependencies(&mut self) -> Result<Vec<PluginEntry>, CompilerError> {
        let n = self.pending_plugins.len();

        // Several instances of a non-unique plugin share one id.
        let mut indices_by_id: HashMap<PluginId, Vec<usize>> = HashMap::new();
        for (i, entry) in self.pending_plugins.iter().enumerate() {
            indices_by_id.entry(entry.id).or_default().push(i);
        }

        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, entry) in self.pending_plugins.iter().enumerate() {
            for dependency in entry.plugin.dependencies() {
                let Some(providers) = indices_by_id.get(&dependency) else {
                    return Err(CompilerError::MissingDependency {
                        plugin: entry.name.clone(),
                        dependency: dependency.type_name().to_owned(),
                    });
                };
                for &provider in providers {
                    dependents[provider].push(i);
                    in_degree[i] += 1;
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted_indices: Vec<usize> = Vec::with_capacity(n);

        while let Some(idx) = queue.pop_front() {
            sorted_indices.push(idx);
            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if sorted_indices.len() != n {
            let plugins = in_degree
                .iter()
                .enumerate()
                .filter(|(_, degree)| **degree > 0)
                .map(|(i, _)| self.pending_plugins[i].name.clone())
                .collect();
            return Err(CompilerError::CircularDependency { plugins });
        }

        let mut slots: Vec<Option<PluginEntry>> = core::mem::take(&mut self.pending_plugins)
            .into_iter()
            .map(Some)
            .collect();
        Ok(sorted_indices
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Build
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs the build once.
    ///
    /// Applies plugins if needed, then calls the pipeline hooks in order.
    /// Returns the post-build [`Stats`]. A second call fails with
    /// [`CompilerError::AlreadyRun`].
    ///
    /// When a `make` tap fails, the call waits for the remaining `make` taps,
    /// records every failure in the compilation's `errors`, and fails with
    /// [`CompilerError::Stage`]. The compilation stays available through
    /// [`compilation`](Self::compilation).
    pub async fn run(&mut self) -> Result<Stats, CompilerError> {
        self.apply_plugins()?;
        if self.state == CompilerState::Finished {
            return Err(CompilerError::AlreadyRun);
        }
        self.state = CompilerState::Finished;

        let started = Instant::now();
        let name = self.options.name.as_deref().unwrap_or("<unnamed>");
        tracing::info!(build = name, plugins = self.applied_plugins.len(), "build started");

        let hooks = &self.hooks;
        hooks
            .environment
            .call(&self.options)
            .map_err(stage("environment"))?;
        hooks
            .before_run
            .call(Arc::clone(&self.options))
            .await
            .map_err(stage("before_run"))?;

        let compilation = Arc::new(Compilation::new(self.options.name.clone()));
        self.compilation = Some(Arc::clone(&compilation));
        hooks
            .this_compilation
            .call(&compilation)
            .map_err(stage("this_compilation"))?;

        let errors = compilation.errors.clone();
        hooks
            .make
            .set_late_failure_sink(move |failure| errors.push_back(Diagnostic::from(&failure)));
        if let Err(err) = hooks.make.call(Arc::clone(&compilation)).await {
            if let Some(failure) = err.tap_failure() {
                compilation.errors.push_back(Diagnostic::from(failure));
            }
            hooks.make.settle().await;
            tracing::info!(build = name, errors = compilation.errors.len(), "build failed in make");
            return Err(stage("make")(err));
        }

        hooks
            .finish_make
            .call(Arc::clone(&compilation))
            .await
            .map_err(stage("finish_make"))?;
        hooks
            .process_assets
            .call(Arc::clone(&compilation))
            .await
            .map_err(stage("process_assets"))?;
        hooks
            .after_compile
            .call(Arc::clone(&compilation))
            .await
            .map_err(stage("after_compile"))?;

        if self.options.bail && !compilation.errors.is_empty() {
            let errors = compilation.errors.snapshot();
            tracing::info!(build = name, errors = errors.len(), "build bailed");
            return Err(CompilerError::Bail { errors });
        }

        let emit = hooks
            .should_emit
            .call(&compilation)
            .map_err(stage("should_emit"))?
            .unwrap_or(true);
        if emit {
            hooks
                .emit
                .call(Arc::clone(&compilation))
                .await
                .map_err(stage("emit"))?;
        } else {
            tracing::debug!(build = name, "emit skipped");
        }

        let stats = Arc::new(Stats::from_compilation(&compilation, emit, started.elapsed()));
        hooks
            .done
            .call(Arc::clone(&stats))
            .await
            .map_err(stage("done"))?;

        tracing::info!(
            build = name,
            errors = stats.errors.len(),
            warnings = stats.warnings.len(),
            assets = stats.assets.len(),
            elapsed_ms = stats.time,
            "build finished"
        );
        Ok(Arc::unwrap_or_clone(stats))
    }
}

fn stage(hook: &'static str) -> impl FnOnce(HookError) -> CompilerError {
    move |source| CompilerError::Stage { hook, source }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("pending_plugins", &self.pending_plugins.len())
            .field("applied_plugins", &self.applied_plugins())
            .field("builtins", &self.builtins)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginGroupBuilder;
    use std::sync::Mutex;
    use tapwork_hook::{Hook, Tap};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        label: &'static str,
        log: Log,
    }

    impl Plugin for Recorder {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            self.log.lock().unwrap().push(self.label.to_owned());
            Ok(())
        }

        fn name(&self) -> &str {
            self.label
        }

        fn is_unique(&self) -> bool {
            false
        }
    }

    struct Base(Log);
    impl Plugin for Base {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            self.0.lock().unwrap().push("base".into());
            Ok(())
        }
    }

    struct Dependent(Log);
    impl Plugin for Dependent {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            self.0.lock().unwrap().push("dependent".into());
            Ok(())
        }
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<Base>()]
        }
    }

    struct CycleA;
    impl Plugin for CycleA {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            Ok(())
        }
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<CycleB>()]
        }
    }

    struct CycleB;
    impl Plugin for CycleB {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            Ok(())
        }
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<CycleA>()]
        }
    }

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Registers a promise tap on a sync hook, which is rejected.
    struct MisregisteredTap;
    impl Plugin for MisregisteredTap {
        fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError> {
            compiler.hooks().environment.register(Tap::promise(
                "async-environment",
                |_: Arc<CompilerOptions>| async { Ok(()) },
            ))?;
            Ok(())
        }
    }

    #[test]
    fn dependencies_apply_first() {
        let log = log();
        let mut compiler = Compiler::new(CompilerOptions::default());
        compiler
            .add_plugins(Dependent(Arc::clone(&log)))
            .unwrap()
            .add_plugins(Base(Arc::clone(&log)))
            .unwrap();
        compiler.apply_plugins().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["base", "dependent"]);
    }

    #[test]
    fn independent_plugins_keep_insertion_order() {
        let log = log();
        let mut compiler = Compiler::new(CompilerOptions::default());
        let group = ["one", "two", "three"]
            .into_iter()
            .fold(PluginGroupBuilder::new(), |group, label| {
                group.add(Recorder {
                    label,
                    log: Arc::clone(&log),
                })
            });
        compiler.add_plugins(group).unwrap();
        compiler.apply_plugins().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["one", "two", "three"]);
        assert_eq!(compiler.applied_plugins(), vec!["one", "two", "three"]);
    }

    #[test]
    fn duplicate_unique_plugin_is_rejected() {
        let mut compiler = Compiler::new(CompilerOptions::default());
        compiler.add_plugins(Base(log())).unwrap();
        let err = compiler.add_plugins(Base(log())).unwrap_err();
        assert!(matches!(err, CompilerError::DuplicatePlugin { .. }));
    }

    #[test]
    fn missing_dependency_is_reported() {
        let mut compiler = Compiler::new(CompilerOptions::default());
        compiler.add_plugins(Dependent(log())).unwrap();
        let err = compiler.apply_plugins().unwrap_err();
        let CompilerError::MissingDependency { plugin, dependency } = err else {
            panic!("expected a missing dependency");
        };
        assert!(plugin.ends_with("Dependent"));
        assert!(dependency.ends_with("Base"));
    }

    #[test]
    fn circular_dependency_is_reported() {
        let mut compiler = Compiler::new(CompilerOptions::default());
        compiler.add_plugins(CycleA).unwrap().add_plugins(CycleB).unwrap();
        let err = compiler.apply_plugins().unwrap_err();
        let CompilerError::CircularDependency { plugins } = err else {
            panic!("expected a cycle");
        };
        assert_eq!(plugins.len(), 2);
    }

    #[test]
    fn builtin_options_become_requests() {
        let options = CompilerOptions::from_json(
            r#"{ "builtins": [
                { "name": "OccurrenceModuleIdsPlugin", "options": { "prioritiseInitial": true } },
                { "name": "MinChunkSizePlugin", "options": { "minChunkSize": 100 } }
            ] }"#,
        )
        .unwrap();
        let mut compiler = Compiler::new(options);
        assert!(compiler.builtin_plugins().is_empty());

        compiler.apply_plugins().unwrap();
        let names: Vec<_> = compiler
            .builtin_plugins()
            .iter()
            .map(|request| request.name.as_str())
            .collect();
        assert_eq!(names, vec!["OccurrenceModuleIdsPlugin", "MinChunkSizePlugin"]);
    }

    struct Spawner(Log);
    impl Plugin for Spawner {
        fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError> {
            compiler.add_plugins(Base(Arc::clone(&self.0)))?;
            self.0.lock().unwrap().push("spawner".into());
            Ok(())
        }
    }

    #[test]
    fn plugins_added_during_apply_are_applied_immediately() {
        let log = log();
        let mut compiler = Compiler::new(CompilerOptions::default());
        compiler.add_plugins(Spawner(Arc::clone(&log))).unwrap();
        compiler.apply_plugins().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["base", "spawner"]);
        assert!(compiler.has_plugin::<Base>());
    }

    #[tokio::test]
    async fn failed_apply_blocks_the_build() {
        let log = log();
        let mut compiler = Compiler::new(CompilerOptions::default());
        compiler
            .add_plugins(
                PluginGroupBuilder::new()
                    .add(MisregisteredTap)
                    .add(Base(Arc::clone(&log))),
            )
            .unwrap();

        let err = compiler.apply_plugins().unwrap_err();
        assert!(matches!(err, CompilerError::Hook(_)));

        assert!(matches!(compiler.apply_plugins(), Err(CompilerError::ApplyFailed)));
        assert!(matches!(compiler.run().await, Err(CompilerError::ApplyFailed)));
        assert!(matches!(
            compiler.add_plugins(Recorder { label: "late", log: Arc::clone(&log) }),
            Err(CompilerError::ApplyFailed)
        ));
        assert!(log.lock().unwrap().is_empty());
        assert!(compiler.applied_plugins().is_empty());
        assert!(compiler.compilation().is_none());
    }

    #[tokio::test]
    async fn second_run_fails() {
        let mut compiler = Compiler::new(CompilerOptions::default());
        compiler.run().await.unwrap();
        assert!(matches!(compiler.run().await, Err(CompilerError::AlreadyRun)));
    }

    fn marker_tap<A: 'static, R: Send + 'static>(log: &Log, name: &'static str) -> Tap<A, R> {
        let log = Arc::clone(log);
        Tap::sync(name, move |_: &A| {
            log.lock().unwrap().push(name.to_owned());
            Ok(())
        })
    }

    #[tokio::test]
    async fn hooks_fire_in_pipeline_order() {
        let mut compiler = Compiler::new(CompilerOptions::default());
        let order = log();

        let hooks = compiler.hooks();
        hooks.done.register(marker_tap(&order, "done")).unwrap();
        hooks.emit.register(marker_tap(&order, "emit")).unwrap();
        hooks.should_emit.register(marker_tap(&order, "should_emit")).unwrap();
        hooks.after_compile.register(marker_tap(&order, "after_compile")).unwrap();
        hooks.process_assets.register(marker_tap(&order, "process_assets")).unwrap();
        hooks.finish_make.register(marker_tap(&order, "finish_make")).unwrap();
        hooks.make.register(marker_tap(&order, "make")).unwrap();
        hooks.this_compilation.register(marker_tap(&order, "this_compilation")).unwrap();
        hooks.before_run.register(marker_tap(&order, "before_run")).unwrap();
        hooks.environment.register(marker_tap(&order, "environment")).unwrap();

        compiler.run().await.unwrap();
        assert_eq!(
            *order.lock().unwrap(),
            vec![
                "environment",
                "before_run",
                "this_compilation",
                "make",
                "finish_make",
                "process_assets",
                "after_compile",
                "should_emit",
                "emit",
                "done",
            ]
        );
    }
}
