//! Validator chain turning a plugin directory into a trusted descriptor
//!
//! Each stage receives the descriptor produced by the stage before it
//! (`None` for the first stage) together with the chain's original
//! argument, the candidate plugin directory. The first failing stage aborts
//! the chain and its error is returned as-is.

use crate::descriptor::{PluginDescriptor, SourceMode, METADATA_FILE_NAME};
use crate::error::ValidationError;
use std::env::consts::DLL_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result type for validator stages
pub type ValidationResult = std::result::Result<PluginDescriptor, ValidationError>;

/// One validation stage
pub trait Validator: Send + Sync {
    /// Stage name used in logs and errors
    fn name(&self) -> &'static str;

    /// Validate and possibly enrich the descriptor
    ///
    /// `prior` is the previous stage's result; `plugin_dir` is the directory
    /// the chain was started with.
    fn validate(&self, prior: Option<PluginDescriptor>, plugin_dir: &Path) -> ValidationResult;
}

/// Ordered list of validators run with result threading
#[derive(Default)]
pub struct ValidatorChain {
    validators: Vec<Box<dyn Validator>>,
}

impl std::fmt::Debug for ValidatorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.validators.iter().map(|v| v.name()).collect();
        f.debug_struct("ValidatorChain")
            .field("validators", &names)
            .finish()
    }
}

impl ValidatorChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata file, schema, local source and remote source checks
    pub fn default_chain() -> Self {
        Self::new()
            .with(MetadataFileValidator::default())
            .with(SchemaValidator)
            .with(LocalSourceValidator)
            .with(RemoteSourceValidator)
    }

    /// Append a stage
    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Append a boxed stage
    pub fn push(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run the chain on a plugin directory
    pub fn run(&self, plugin_dir: &Path) -> ValidationResult {
        self.validate(None, plugin_dir)
    }
}

impl Validator for ValidatorChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn validate(&self, prior: Option<PluginDescriptor>, plugin_dir: &Path) -> ValidationResult {
        if self.validators.is_empty() {
            return Err(ValidationError::EmptyChain);
        }

        let mut result = prior;
        for validator in &self.validators {
            let descriptor = validator.validate(result.take(), plugin_dir)?;
            debug!(
                validator = validator.name(),
                path = %plugin_dir.display(),
                "Validator passed"
            );
            result = Some(descriptor);
        }

        result.ok_or(ValidationError::EmptyChain)
    }
}

/// Checks the plugin directory, parses its metadata file and matches the
/// directory name against the declared name
#[derive(Debug, Clone)]
pub struct MetadataFileValidator {
    file_name: String,
}

impl MetadataFileValidator {
    /// Use a metadata file name other than `plugin.json`
    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Metadata file name
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Default for MetadataFileValidator {
    fn default() -> Self {
        Self::with_file_name(METADATA_FILE_NAME)
    }
}

impl Validator for MetadataFileValidator {
    fn name(&self) -> &'static str {
        "metadata-file"
    }

    fn validate(&self, _prior: Option<PluginDescriptor>, plugin_dir: &Path) -> ValidationResult {
        if !plugin_dir.exists() {
            return Err(ValidationError::DirectoryNotFound(plugin_dir.to_path_buf()));
        }
        if !plugin_dir.is_dir() {
            return Err(ValidationError::NotADirectory(plugin_dir.to_path_buf()));
        }

        let metadata_path = plugin_dir.join(&self.file_name);
        if !metadata_path.is_file() {
            return Err(ValidationError::MetadataNotFound {
                file: self.file_name.clone(),
                dir: plugin_dir.to_path_buf(),
            });
        }

        let content =
            fs::read_to_string(&metadata_path).map_err(|source| ValidationError::MetadataRead {
                path: metadata_path.clone(),
                source,
            })?;

        let descriptor: PluginDescriptor =
            serde_json::from_str(&content).map_err(|source| ValidationError::MalformedMetadata {
                path: metadata_path,
                source,
            })?;

        let dir_name = dir_basename(plugin_dir)?;
        if dir_name != descriptor.name {
            return Err(ValidationError::NameConflict {
                expected: dir_name,
                found: descriptor.name,
            });
        }

        Ok(descriptor)
    }
}

/// Checks required fields, the version and the source mode
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(&self, prior: Option<PluginDescriptor>, _plugin_dir: &Path) -> ValidationResult {
        let descriptor = prior.ok_or(ValidationError::MissingDescriptor(self.name()))?;

        if descriptor.name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        if let Err(source) = descriptor.parsed_version() {
            return Err(ValidationError::InvalidVersion {
                version: descriptor.version,
                source,
            });
        }

        match descriptor.source_mode() {
            None => return Err(ValidationError::MissingSource),
            Some(SourceMode::Unsupported(mode)) => {
                return Err(ValidationError::UnsupportedMode(mode.clone()))
            }
            Some(_) => {}
        }

        Ok(descriptor)
    }
}

/// Resolves a local module path to an absolute path and checks the file
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSourceValidator;

impl Validator for LocalSourceValidator {
    fn name(&self) -> &'static str {
        "local-source"
    }

    fn validate(&self, prior: Option<PluginDescriptor>, plugin_dir: &Path) -> ValidationResult {
        let mut descriptor = prior.ok_or(ValidationError::MissingDescriptor(self.name()))?;

        let source = descriptor
            .source
            .as_mut()
            .ok_or(ValidationError::MissingSource)?;

        if source.mode != SourceMode::LocalModule {
            return Ok(descriptor);
        }

        let module_path = resolve_module_path(plugin_dir, &source.path_buf())?;

        if !module_path.is_file() {
            return Err(ValidationError::ModuleNotFound(module_path));
        }

        let extension = module_path.extension().and_then(|ext| ext.to_str());
        if extension != Some(DLL_EXTENSION) {
            return Err(ValidationError::InvalidModuleExtension {
                path: module_path,
                expected: DLL_EXTENSION,
            });
        }

        source.path = module_path.to_string_lossy().into_owned();

        Ok(descriptor)
    }
}

/// Rejects remote sources until remote retrieval exists
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteSourceValidator;

impl Validator for RemoteSourceValidator {
    fn name(&self) -> &'static str {
        "remote-source"
    }

    fn validate(&self, prior: Option<PluginDescriptor>, _plugin_dir: &Path) -> ValidationResult {
        let descriptor = prior.ok_or(ValidationError::MissingDescriptor(self.name()))?;

        match &descriptor.source {
            Some(source) if source.mode == SourceMode::RemoteSource => Err(
                ValidationError::RemoteSourceUnsupported(source.path.clone()),
            ),
            _ => Ok(descriptor),
        }
    }
}

/// Join a module path onto the plugin directory and make it absolute
fn resolve_module_path(plugin_dir: &Path, path: &Path) -> Result<PathBuf, ValidationError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let joined = plugin_dir.join(path);
    if joined.is_absolute() {
        Ok(joined)
    } else {
        Ok(std::env::current_dir()?.join(joined))
    }
}

/// Final path component, resolving `.` and `..` through the filesystem
fn dir_basename(dir: &Path) -> Result<String, ValidationError> {
    if let Some(name) = dir.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }

    let canonical = fs::canonicalize(dir)?;
    Ok(canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default())
}
