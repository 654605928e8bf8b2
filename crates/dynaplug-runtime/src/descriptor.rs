//! Plugin descriptor parsed from `plugin.json`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default name of the metadata file inside each plugin directory
pub const METADATA_FILE_NAME: &str = "plugin.json";

/// Plugin metadata as declared in `plugin.json`
///
/// Every field is optional when parsing; the validator chain decides what is
/// required so each problem is reported by the stage that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PluginDescriptor {
    /// Plugin name, equal to the plugin directory name
    pub name: String,

    /// Semantic version
    pub version: String,

    /// One-line description
    pub description: String,

    /// Home page or source repository URL
    pub home: String,

    /// Maintainers, `Name <email>` by convention
    pub maintainers: Vec<String>,

    /// Where to load the plugin from
    pub source: Option<Source>,

    /// HTTP routes served by the plugin, carried through untouched
    #[serde(rename = "HTTPServices")]
    pub http_services: Option<HttpServices>,
}

impl PluginDescriptor {
    /// Create a descriptor with a name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Set the source
    pub fn with_source(mut self, mode: SourceMode, path: impl Into<String>) -> Self {
        self.source = Some(Source {
            mode,
            path: path.into(),
        });
        self
    }

    /// Parse the version
    pub fn parsed_version(&self) -> Result<semver::Version, semver::Error> {
        semver::Version::parse(&self.version)
    }

    /// Path of the module file, if the source is set
    pub fn module_path(&self) -> Option<&Path> {
        self.source.as_ref().map(|source| Path::new(&source.path))
    }

    /// Source mode, if the source is set
    pub fn source_mode(&self) -> Option<&SourceMode> {
        self.source.as_ref().map(|source| &source.mode)
    }
}

/// Where a plugin is loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    /// Loading mode
    #[serde(default)]
    pub mode: SourceMode,

    /// Module file path or remote location
    #[serde(default)]
    pub path: String,
}

impl Source {
    /// Module path as a filesystem path
    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Source loading mode
///
/// Unknown spellings parse into [`SourceMode::Unsupported`] so the schema
/// stage can reject them by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceMode {
    /// Native shared library on the local filesystem
    LocalModule,
    /// Remote source, not loadable yet
    RemoteSource,
    /// Anything else
    Unsupported(String),
}

impl SourceMode {
    /// Canonical spelling
    pub fn as_str(&self) -> &str {
        match self {
            Self::LocalModule => "local-module",
            Self::RemoteSource => "remote-source",
            Self::Unsupported(mode) => mode,
        }
    }

    /// Whether the mode is one of the supported modes
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl Default for SourceMode {
    fn default() -> Self {
        Self::Unsupported(String::new())
    }
}

impl From<String> for SourceMode {
    fn from(mode: String) -> Self {
        match mode.as_str() {
            "local-module" | "local_so" => Self::LocalModule,
            "remote-source" | "remote_git" => Self::RemoteSource,
            _ => Self::Unsupported(mode),
        }
    }
}

impl From<SourceMode> for String {
    fn from(mode: SourceMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP services declared by a plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HttpServices {
    /// HTTP service provider
    pub driver: String,

    /// Routes to enable on the driver
    pub routes: Vec<HttpServiceRoute>,
}

/// One HTTP route served by a plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HttpServiceRoute {
    /// Service endpoint
    pub route: String,

    /// HTTP method
    pub method: String,

    /// Label set on the context so the plugin knows which route is served
    pub label: String,
}
