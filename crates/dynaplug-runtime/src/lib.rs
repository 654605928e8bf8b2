//! # Dynaplug Runtime
//!
//! Discovery, validation, loading and registration of plugin modules.
//!
//! ## Features
//!
//! - **Discovery**: One plugin per subdirectory of a base directory
//! - **Validation**: Ordered validator chain with result threading
//! - **Loading**: Native modules resolved through the `Execute` entry symbol
//! - **Registry**: Thread-safe store of loaded plugins keyed by name
//!
//! ## Example
//!
//! ```rust,no_run
//! use dynaplug_runtime::prelude::*;
//! use std::path::Path;
//!
//! # fn example() -> Result<()> {
//! let manager = PluginManager::new();
//! manager.set_plugin_base_dir(Path::new("./plugins"))?;
//!
//! let report = manager.load_plugins()?;
//! println!("loaded {} of {} plugins", report.loaded, report.found);
//!
//! let plugin = manager.get_plugin("sample")?;
//! let mut ctx = ExecutionContext::background();
//! ctx.set_value("sample", "Hello");
//! plugin.execute(&mut ctx)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod manager;
pub mod plugin;
pub mod store;
pub mod validator;

pub use config::{load_config, load_from_str, ConfigFormat, RuntimeConfig, PLUGIN_DIR_ENV};
pub use descriptor::{
    HttpServiceRoute, HttpServices, PluginDescriptor, Source, SourceMode, METADATA_FILE_NAME,
};
pub use error::{LoadError, PluginRuntimeError, Result, ValidationError};
pub use loader::{Loader, NativeLoader};
pub use manager::{
    LoadFailure, LoadReport, Manager, PluginManager, PluginManagerBuilder, ValidationOutcome,
};
pub use plugin::{EntryPoint, LoadedPlugin};
pub use store::{MemoryStore, PluginStore};
pub use validator::{
    LocalSourceValidator, MetadataFileValidator, RemoteSourceValidator, SchemaValidator,
    ValidationResult, Validator, ValidatorChain,
};

// Re-export plugin API types for convenience
pub use dynaplug_api::{ExecuteError, ExecutionContext};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::descriptor::{PluginDescriptor, SourceMode};
    pub use crate::error::{PluginRuntimeError, Result};
    pub use crate::loader::Loader;
    pub use crate::manager::{LoadReport, Manager, PluginManager};
    pub use crate::plugin::LoadedPlugin;
    pub use crate::store::PluginStore;
    pub use crate::validator::{Validator, ValidatorChain};
    pub use dynaplug_api::{ExecuteError, ExecutionContext};
}
