//! Plugin runtime error types

use std::fmt;
use std::path::PathBuf;

/// Error raised by a validator stage
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The chain has no stages
    #[error("No validators in chain")]
    EmptyChain,

    /// A stage that needs a prior descriptor ran first
    #[error("Validator '{0}' requires a descriptor from a previous stage")]
    MissingDescriptor(&'static str),

    /// Candidate path does not exist
    #[error("Plugin directory {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Candidate path is not a directory
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The metadata file is missing
    #[error("{file} is not found under plugin dir {}", .dir.display())]
    MetadataNotFound {
        /// Metadata file name
        file: String,
        /// Plugin directory
        dir: PathBuf,
    },

    /// The metadata file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    MetadataRead {
        /// Metadata file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The metadata file is not valid JSON for a descriptor
    #[error("Malformed metadata {}: {source}", .path.display())]
    MalformedMetadata {
        /// Metadata file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Directory name and descriptor name differ
    #[error("Name conflicts: expect {expected} but got {found} in the metadata json file")]
    NameConflict {
        /// Directory basename
        expected: String,
        /// Name in the metadata file
        found: String,
    },

    /// Descriptor name is empty
    #[error("Missing plugin name")]
    MissingName,

    /// Version is not a semantic version
    #[error("Invalid plugin version '{version}': {source}")]
    InvalidVersion {
        /// The rejected version string
        version: String,
        /// Parse error
        #[source]
        source: semver::Error,
    },

    /// Descriptor has no source
    #[error("Plugin source missing")]
    MissingSource,

    /// Source mode is not supported
    #[error("Unsupported source mode '{0}', only support [local-module, remote-source]")]
    UnsupportedMode(String),

    /// Local module file does not exist
    #[error("Plugin module file {} is not existing", .0.display())]
    ModuleNotFound(PathBuf),

    /// Local module file has the wrong extension
    #[error("Plugin module file {} must have the '.{expected}' extension", .path.display())]
    InvalidModuleExtension {
        /// Module path
        path: PathBuf,
        /// Expected extension
        expected: &'static str,
    },

    /// Remote sources cannot be validated
    #[error("Remote plugin sources are not implemented: {0}")]
    RemoteSourceUnsupported(String),

    /// Filesystem error outside of metadata reading
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Error raised while opening a module or resolving its entry point
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Descriptor source is not a local module
    #[error("Plugin {name} has a {mode} source, only local modules can be loaded")]
    UnsupportedSource {
        /// Plugin name
        name: String,
        /// Source mode
        mode: String,
    },

    /// Module file does not exist
    #[error("Plugin module file {} is not existing", .0.display())]
    ModuleNotFound(PathBuf),

    /// The dynamic loader refused the module
    #[error("Failed to open plugin module {}: {source}", .path.display())]
    Open {
        /// Module path
        path: PathBuf,
        /// Loader error
        #[source]
        source: libloading::Error,
    },

    /// The entry symbol is not exported
    #[error("Failed to lookup entry symbol '{symbol}' in plugin module {}: {source}", .path.display())]
    MissingSymbol {
        /// Module path
        path: PathBuf,
        /// Symbol name
        symbol: &'static str,
        /// Loader error
        #[source]
        source: libloading::Error,
    },

    /// The entry symbol resolved to a null address
    #[error("Entry symbol '{symbol}' in plugin module {} is null", .path.display())]
    NullSymbol {
        /// Module path
        path: PathBuf,
        /// Symbol name
        symbol: &'static str,
    },

    /// The entry declaration has a different layout version
    #[error("Plugin module {} declares ABI version {found}, expected {expected}", .path.display())]
    AbiMismatch {
        /// Module path
        path: PathBuf,
        /// Host ABI version
        expected: u32,
        /// Module ABI version
        found: u32,
    },

    /// The entry function has a different type
    #[error("Entry function in plugin module {} has signature '{found}', expected '{expected}'", .path.display())]
    SignatureMismatch {
        /// Module path
        path: PathBuf,
        /// Host signature
        expected: String,
        /// Module signature
        found: String,
    },

    /// The module was built against another SDK version
    #[error("Plugin module {} was built against dynaplug-api {found}, host uses {expected}", .path.display())]
    ApiVersionMismatch {
        /// Module path
        path: PathBuf,
        /// Host API version
        expected: String,
        /// Module API version
        found: String,
    },
}

/// Plugin runtime error type
#[derive(Debug, thiserror::Error)]
pub enum PluginRuntimeError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Load error
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Plugin execution error
    #[error("Execution error: {0}")]
    Execute(#[from] dynaplug_api::ExecuteError),

    /// Empty plugin name argument
    #[error("Plugin name cannot be empty")]
    EmptyName,

    /// Plugin name that is not a single directory name
    #[error("Invalid plugin name '{0}': expected a directory name under the base dir")]
    InvalidName(String),

    /// Plugin not found
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// Removal from the store failed
    #[error("Failed to unload plugin: {0}")]
    UnloadFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for plugin runtime operations
pub type Result<T> = std::result::Result<T, PluginRuntimeError>;

impl PluginRuntimeError {
    /// Create a new plugin not found error
    pub fn not_found(name: impl fmt::Display) -> Self {
        Self::PluginNotFound(name.to_string())
    }

    /// Create a new unload failed error
    pub fn unload_failed(name: impl fmt::Display) -> Self {
        Self::UnloadFailed(name.to_string())
    }

    /// Create a new config error
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::ConfigError(msg.to_string())
    }

    /// Whether the error is a not-found registry error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PluginNotFound(_))
    }
}
