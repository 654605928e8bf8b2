//! Loaded plugins and their entry points

use crate::descriptor::PluginDescriptor;
use dynaplug_api::{EntryFn, ExecuteError, ExecutionContext};
use libloading::Library;
use std::sync::Arc;
use std::time::Instant;

/// Callable entry point resolved from a plugin module
///
/// A native entry point shares ownership of the module it came from, so the
/// module stays mapped while any clone of the entry point is alive.
#[derive(Clone)]
pub struct EntryPoint {
    execute: EntryFn,
    module: Option<Arc<Library>>,
}

impl std::fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoint")
            .field("native", &self.is_native())
            .finish()
    }
}

impl EntryPoint {
    /// Wrap an in-process function
    pub fn from_fn(execute: EntryFn) -> Self {
        Self {
            execute,
            module: None,
        }
    }

    /// Wrap a function resolved from `module`
    pub(crate) fn from_module(execute: EntryFn, module: Arc<Library>) -> Self {
        Self {
            execute,
            module: Some(module),
        }
    }

    /// Run the plugin
    pub fn call(&self, ctx: &mut ExecutionContext) -> Result<(), ExecuteError> {
        (self.execute)(ctx)
    }

    /// Whether the entry point lives in a native module
    pub fn is_native(&self) -> bool {
        self.module.is_some()
    }
}

/// A validated descriptor paired with its entry point
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    /// Plugin descriptor
    pub descriptor: Arc<PluginDescriptor>,

    /// Plugin entry point
    pub entry_point: EntryPoint,

    /// When the plugin was loaded
    pub loaded_at: Instant,
}

impl LoadedPlugin {
    /// Pair a descriptor with its entry point
    pub fn new(descriptor: PluginDescriptor, entry_point: EntryPoint) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            entry_point,
            loaded_at: Instant::now(),
        }
    }

    /// Plugin name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Plugin version
    pub fn version(&self) -> &str {
        &self.descriptor.version
    }

    /// Run the plugin
    pub fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecuteError> {
        self.entry_point.call(ctx)
    }
}
