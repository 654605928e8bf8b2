//! Plugin manager orchestrating scan, validation, loading and the registry

use crate::config::RuntimeConfig;
use crate::descriptor::PluginDescriptor;
use crate::error::{PluginRuntimeError, Result, ValidationError};
use crate::loader::{Loader, NativeLoader};
use crate::plugin::LoadedPlugin;
use crate::store::{MemoryStore, PluginStore};
use crate::validator::{
    LocalSourceValidator, MetadataFileValidator, RemoteSourceValidator, SchemaValidator,
    Validator, ValidatorChain,
};
use parking_lot::RwLock;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Operations callers use to manage plugins
pub trait Manager: Send + Sync {
    /// Set the directory plugins are loaded from
    fn set_plugin_base_dir(&self, dir: &Path) -> Result<()>;

    /// Load every plugin under the base directory
    ///
    /// Individual plugin failures are logged and collected in the report;
    /// only a failed scan is returned as an error.
    fn load_plugins(&self) -> Result<LoadReport>;

    /// Load one plugin by directory name, returning the first error
    ///
    /// `name` must be a single directory name; paths are rejected.
    fn load_plugin(&self, name: &str) -> Result<()>;

    /// Remove a plugin from the registry
    fn unload_plugin(&self, name: &str) -> Result<()>;

    /// Get a loaded plugin
    fn get_plugin(&self, name: &str) -> Result<LoadedPlugin>;
}

/// Outcome of a bulk load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Candidate directories found by the scan
    pub found: usize,

    /// Candidates loaded into the registry
    pub loaded: usize,

    /// Candidates that failed, in scan order
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    /// Whether every candidate loaded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A candidate that failed to load
#[derive(Debug)]
pub struct LoadFailure {
    /// Candidate directory
    pub path: PathBuf,

    /// Why it failed
    pub error: PluginRuntimeError,
}

/// Outcome of validating one candidate without loading it
pub type ValidationOutcome = (PathBuf, std::result::Result<PluginDescriptor, ValidationError>);

/// Default [`Manager`] implementation
///
/// The manager is shareable across threads: registry reads may run while a
/// bulk load is in progress on another thread. Candidates are always
/// validated and loaded one at a time.
pub struct PluginManager {
    base_dir: RwLock<Option<PathBuf>>,
    loader: Arc<dyn Loader>,
    validator: Arc<dyn Validator>,
    store: Arc<dyn PluginStore>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("base_dir", &*self.base_dir.read())
            .field("plugins", &self.store.names())
            .finish()
    }
}

impl PluginManager {
    /// Create a manager with the native loader, the default validator chain
    /// and an in-memory store
    pub fn new() -> Self {
        Self {
            base_dir: RwLock::new(None),
            loader: Arc::new(NativeLoader::new()),
            validator: Arc::new(ValidatorChain::default_chain()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Start building a manager with custom components
    pub fn builder() -> PluginManagerBuilder {
        PluginManagerBuilder::default()
    }

    /// Create a manager from runtime configuration
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let chain = ValidatorChain::new()
            .with(MetadataFileValidator::with_file_name(&config.metadata_file))
            .with(SchemaValidator)
            .with(LocalSourceValidator)
            .with(RemoteSourceValidator);

        Self::builder()
            .validator(chain)
            .base_dir(config.resolved_plugin_dir()?)
            .build()
    }

    /// Current base directory
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.base_dir.read().clone()
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn PluginStore> {
        &self.store
    }

    /// Names of loaded plugins
    pub fn plugin_names(&self) -> Vec<String> {
        self.store.names()
    }

    /// Number of loaded plugins
    pub fn plugin_count(&self) -> usize {
        self.store.size()
    }

    /// Validate every candidate under the base directory without loading
    pub fn validate_plugins(&self) -> Result<Vec<ValidationOutcome>> {
        let base_dir = self.base_dir().unwrap_or_default();
        let candidates = self.loader.scan(&base_dir)?;

        Ok(candidates
            .into_iter()
            .map(|path| {
                let outcome = self.validator.validate(None, &path);
                (path, outcome)
            })
            .collect())
    }

    fn require_base_dir(&self) -> Result<PathBuf> {
        self.base_dir()
            .ok_or_else(|| PluginRuntimeError::config("plugin base dir is not set"))
    }

    fn load_path(&self, path: &Path) -> Result<String> {
        let descriptor = match self.validator.validate(None, path) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(path = %path.display(), "Validate plugin [FAILED]");
                return Err(e.into());
            }
        };
        info!(path = %path.display(), "Validate plugin [SUCCESS]");

        let entry_point = match self.loader.load(&descriptor) {
            Ok(entry_point) => entry_point,
            Err(e) => {
                warn!(
                    plugin = %descriptor.name,
                    version = %descriptor.version,
                    "Load plugin [FAILED]"
                );
                return Err(e);
            }
        };
        info!(
            plugin = %descriptor.name,
            version = %descriptor.version,
            "Load plugin [SUCCESS]"
        );

        let name = descriptor.name.clone();
        self.store.put(LoadedPlugin::new(descriptor, entry_point), true);

        Ok(name)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager for PluginManager {
    fn set_plugin_base_dir(&self, dir: &Path) -> Result<()> {
        if dir.as_os_str().is_empty() || !dir.is_dir() {
            return Err(PluginRuntimeError::config(format!(
                "{} is not a valid plugin base dir path",
                dir.display()
            )));
        }

        info!(base_dir = %dir.display(), "Plugin base dir set");
        *self.base_dir.write() = Some(dir.to_path_buf());
        Ok(())
    }

    fn load_plugins(&self) -> Result<LoadReport> {
        let base_dir = self.base_dir().unwrap_or_default();
        let candidates = self.loader.scan(&base_dir)?;

        let mut report = LoadReport {
            found: candidates.len(),
            ..LoadReport::default()
        };

        for path in candidates {
            info!(path = %path.display(), "Found plugin");
            match self.load_path(&path) {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Plugin loading error");
                    report.failures.push(LoadFailure { path, error: e });
                }
            }
        }

        info!(
            found = report.found,
            loaded = report.loaded,
            failed = report.failures.len(),
            registered = self.store.size(),
            "Plugins loaded"
        );

        Ok(report)
    }

    fn load_plugin(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(PluginRuntimeError::EmptyName);
        }

        let mut components = Path::new(name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(PluginRuntimeError::InvalidName(name.to_string()));
        }

        let path = self.require_base_dir()?.join(name);
        self.load_path(&path).map(|_| ())
    }

    fn unload_plugin(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(PluginRuntimeError::EmptyName);
        }

        if self.store.get(name).is_none() {
            return Err(PluginRuntimeError::not_found(name));
        }

        if self.store.remove(name).is_none() {
            return Err(PluginRuntimeError::unload_failed(name));
        }

        info!(plugin = %name, "Plugin unloaded");
        Ok(())
    }

    fn get_plugin(&self, name: &str) -> Result<LoadedPlugin> {
        if name.is_empty() {
            return Err(PluginRuntimeError::EmptyName);
        }

        self.store
            .get(name)
            .ok_or_else(|| PluginRuntimeError::not_found(name))
    }
}

/// Builder for [`PluginManager`]
#[derive(Default)]
pub struct PluginManagerBuilder {
    loader: Option<Arc<dyn Loader>>,
    validator: Option<Arc<dyn Validator>>,
    store: Option<Arc<dyn PluginStore>>,
    base_dir: Option<PathBuf>,
}

impl std::fmt::Debug for PluginManagerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManagerBuilder")
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

impl PluginManagerBuilder {
    /// Use a custom loader
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Use a custom validator or chain
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Use a shared store
    pub fn store(mut self, store: Arc<dyn PluginStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the base directory
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Build the manager, checking the base directory if one was given
    pub fn build(self) -> Result<PluginManager> {
        let manager = PluginManager {
            base_dir: RwLock::new(None),
            loader: self
                .loader
                .unwrap_or_else(|| Arc::new(NativeLoader::new())),
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(ValidatorChain::default_chain())),
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
        };

        if let Some(dir) = self.base_dir {
            manager.set_plugin_base_dir(&dir)?;
        }

        Ok(manager)
    }
}
