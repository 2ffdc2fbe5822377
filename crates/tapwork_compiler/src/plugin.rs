//! Plugin system for compiler extensions.
//!
//! Every behavior of a build is contributed by plugins. A plugin's
//! [`apply`](Plugin::apply) runs once, before the pipeline starts, and taps
//! whichever [`CompilerHooks`](crate::CompilerHooks) it cares about.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tapwork_compiler::{
//!     Compilation, Compiler, CompilerError, CompilerOptions, Diagnostic, Plugin, PluginId,
//! };
//! use tapwork_hook::{Hook, Tap};
//!
//! struct LintPlugin;
//!
//! impl Plugin for LintPlugin {
//!     fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError> {
//!         compiler.hooks().after_compile.register(Tap::sync("lint", |compilation: &Arc<Compilation>| {
//!             compilation.warnings.push_back(Diagnostic::warning("unused variable"));
//!             Ok(())
//!         }))?;
//!         Ok(())
//!     }
//! }
//!
//! struct StrictLintPlugin;
//!
//! impl Plugin for StrictLintPlugin {
//!     fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
//!         Ok(())
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<LintPlugin>()]
//!     }
//! }
//!
//! let mut compiler = Compiler::new(CompilerOptions::default());
//! compiler.add_plugins(StrictLintPlugin).unwrap();
//! compiler.add_plugins(LintPlugin).unwrap();
//! compiler.apply_plugins().unwrap();
//! assert!(compiler.has_plugin::<LintPlugin>());
//! ```

use core::any::TypeId;

use crate::compiler::Compiler;
use crate::error::CompilerError;

// ─────────────────────────────────────────────────────────────────────────────
// PluginId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a plugin type.
///
/// Used for dependency resolution and duplicate detection. Based on [`TypeId`],
/// so each plugin type has exactly one `PluginId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PluginId {
    /// Creates a `PluginId` for the given plugin type.
    #[must_use]
    pub fn of<P: Plugin>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: core::any::type_name::<P>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of build behavior.
///
/// Plugins are applied in dependency order by
/// [`Compiler::apply_plugins`](crate::Compiler::apply_plugins), which
/// [`Compiler::run`](crate::Compiler::run) calls if it has not happened yet.
/// Every hook exists before the first `apply`, so a plugin may tap any hook
/// regardless of order.
pub trait Plugin: Send + Sync + 'static {
    /// Registers taps and interceptors on the compiler's hooks.
    ///
    /// May also add further plugins through
    /// [`Compiler::add_plugins`](crate::Compiler::add_plugins); those are
    /// applied immediately.
    fn apply(&self, compiler: &mut Compiler) -> Result<(), CompilerError>;

    /// Returns the plugin's name for logs and error messages.
    ///
    /// Default implementation returns the type name.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Declares plugins that must be applied before this one.
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Returns true if this plugin can only be added once.
    ///
    /// Default is `true`; adding the same plugin type twice fails with
    /// [`CompilerError::DuplicatePlugin`].
    fn is_unique(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins Trait (for add_plugins polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for types that can be added to a compiler as plugins.
///
/// This trait enables `compiler.add_plugins()` to accept both:
/// - Single plugins implementing [`Plugin`]
/// - Plugin groups via [`PluginGroupBuilder`]
///
/// Users typically don't implement this trait directly.
pub trait Plugins {
    /// Adds these plugins to the compiler.
    fn add_to_compiler(self, compiler: &mut Compiler) -> Result<(), CompilerError>;
}

impl<P: Plugin> Plugins for P {
    fn add_to_compiler(self, compiler: &mut Compiler) -> Result<(), CompilerError> {
        compiler.add_plugin_boxed(BoxedPlugin::new(self))
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to_compiler(self, compiler: &mut Compiler) -> Result<(), CompilerError> {
        for boxed in self.plugins {
            compiler.add_plugin_boxed(boxed)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A collection of plugins that can be added together.
///
/// # Example
///
/// ```ignore
/// compiler.add_plugins(
///     DefaultPlugins
///         .build()
///         .disable::<HookProfilingPlugin>()
///         .add(MyAnalyzerPlugin),
/// )?;
/// ```
pub trait PluginGroup {
    /// Returns the plugins in this group.
    fn build(self) -> PluginGroupBuilder;
}

// ─────────────────────────────────────────────────────────────────────────────
// BoxedPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// A boxed plugin with its captured [`PluginId`].
pub(crate) struct BoxedPlugin {
    pub(crate) id: PluginId,
    pub(crate) plugin: Box<dyn Plugin>,
}

impl BoxedPlugin {
    fn new<P: Plugin>(plugin: P) -> Self {
        Self {
            id: PluginId::of::<P>(),
            plugin: Box::new(plugin),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.plugin.name()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroupBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for customizing plugin groups.
///
/// Allows adding, removing, and reordering plugins within a group.
#[derive(Default)]
pub struct PluginGroupBuilder {
    pub(crate) plugins: Vec<BoxedPlugin>,
}

impl PluginGroupBuilder {
    /// Creates a new empty plugin group builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Adds a plugin to the end of the group.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add<P: Plugin>(mut self, plugin: P) -> Self {
        self.plugins.push(BoxedPlugin::new(plugin));
        self
    }

    /// Adds a plugin before another plugin in the group.
    ///
    /// If `Target` is not found, the plugin is added at the beginning.
    #[must_use]
    pub fn add_before<P: Plugin, Target: Plugin>(mut self, plugin: P) -> Self {
        let position = self.position_of::<Target>().unwrap_or(0);
        self.plugins.insert(position, BoxedPlugin::new(plugin));
        self
    }

    /// Adds a plugin after another plugin in the group.
    ///
    /// If `Target` is not found, the plugin is added at the end.
    #[must_use]
    pub fn add_after<P: Plugin, Target: Plugin>(mut self, plugin: P) -> Self {
        let position = self
            .position_of::<Target>()
            .map_or(self.plugins.len(), |i| i + 1);
        self.plugins.insert(position, BoxedPlugin::new(plugin));
        self
    }

    /// Removes every plugin of type `P` from the group.
    ///
    /// If the plugin is not found, this is a no-op.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let target = PluginId::of::<P>();
        self.plugins.retain(|p| p.id != target);
        self
    }

    /// Returns the number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the group contains no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Returns the plugin names in group order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(BoxedPlugin::name).collect()
    }

    fn position_of<Target: Plugin>(&self) -> Option<usize> {
        let target = PluginId::of::<Target>();
        self.plugins.iter().position(|p| p.id == target)
    }
}

impl core::fmt::Debug for PluginGroupBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PluginA;
    impl Plugin for PluginA {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            Ok(())
        }
    }

    struct PluginB;
    impl Plugin for PluginB {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            Ok(())
        }
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<PluginA>()]
        }
    }

    struct PluginC;
    impl Plugin for PluginC {
        fn apply(&self, _compiler: &mut Compiler) -> Result<(), CompilerError> {
            Ok(())
        }
    }

    fn short_names(builder: &PluginGroupBuilder) -> Vec<&str> {
        builder
            .names()
            .into_iter()
            .map(|name| name.rsplit("::").next().unwrap_or(name))
            .collect()
    }

    #[test]
    fn plugin_id_equality() {
        assert_eq!(PluginId::of::<PluginA>(), PluginId::of::<PluginA>());
        assert_ne!(PluginId::of::<PluginA>(), PluginId::of::<PluginB>());
        assert_eq!(PluginId::of::<PluginA>().type_id(), TypeId::of::<PluginA>());
    }

    #[test]
    fn plugin_defaults() {
        let plugin = PluginA;
        assert!(plugin.name().contains("PluginA"));
        assert!(plugin.is_unique());
        assert!(plugin.dependencies().is_empty());
        assert!(PluginId::of::<PluginA>().type_name().contains("PluginA"));
    }

    #[test]
    fn plugin_with_dependencies() {
        assert_eq!(PluginB.dependencies(), vec![PluginId::of::<PluginA>()]);
    }

    #[test]
    fn group_builder_add_and_disable() {
        let builder = PluginGroupBuilder::new()
            .add(PluginA)
            .add(PluginB)
            .disable::<PluginA>();
        assert_eq!(short_names(&builder), vec!["PluginB"]);
    }

    #[test]
    fn group_builder_add_before() {
        let builder = PluginGroupBuilder::new()
            .add(PluginA)
            .add(PluginB)
            .add_before::<_, PluginB>(PluginC);
        assert_eq!(short_names(&builder), vec!["PluginA", "PluginC", "PluginB"]);
    }

    #[test]
    fn group_builder_add_after() {
        let builder = PluginGroupBuilder::new()
            .add(PluginA)
            .add(PluginB)
            .add_after::<_, PluginA>(PluginC);
        assert_eq!(short_names(&builder), vec!["PluginA", "PluginC", "PluginB"]);
    }

    #[test]
    fn group_builder_missing_targets() {
        let before = PluginGroupBuilder::new()
            .add(PluginA)
            .add_before::<_, PluginB>(PluginC);
        assert_eq!(short_names(&before), vec!["PluginC", "PluginA"]);

        let after = PluginGroupBuilder::new()
            .add(PluginA)
            .add_after::<_, PluginB>(PluginC);
        assert_eq!(short_names(&after), vec!["PluginA", "PluginC"]);
    }

    #[test]
    fn group_builder_len_and_is_empty() {
        let empty = PluginGroupBuilder::new();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);

        let with_two = PluginGroupBuilder::new().add(PluginA).add(PluginB);
        assert!(!with_two.is_empty());
        assert_eq!(with_two.len(), 2);

        let none_left = with_two.disable::<PluginA>().disable::<PluginB>();
        assert!(none_left.is_empty());
    }

    struct TestPluginGroup;

    impl PluginGroup for TestPluginGroup {
        fn build(self) -> PluginGroupBuilder {
            PluginGroupBuilder::new().add(PluginA).add(PluginB)
        }
    }

    #[test]
    fn plugin_group_build() {
        assert_eq!(TestPluginGroup.build().len(), 2);
    }
}
