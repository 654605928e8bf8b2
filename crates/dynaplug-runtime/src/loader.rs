//! Plugin discovery and native module loading
//!
//! # Safety
//!
//! Opening a native module runs its static initializers inside this process
//! and cannot be undone. The entry declaration check catches modules built
//! against another SDK, but host and module must also be compiled with the
//! same Rust toolchain; a mismatch there is undefined behaviour that no
//! runtime check can detect.

use crate::descriptor::{PluginDescriptor, SourceMode};
use crate::error::{LoadError, PluginRuntimeError, Result, ValidationError};
use crate::plugin::EntryPoint;
use dynaplug_api::{EntryDeclaration, API_VERSION, ENTRY_ABI_VERSION, ENTRY_SIGNATURE, ENTRY_SYMBOL};
use libloading::Library;
use parking_lot::Mutex;
use std::ffi::CStr;
use std::fs;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Finds plugin candidates and resolves their entry points
pub trait Loader: Send + Sync {
    /// List the plugin directories directly under `base_dir`
    fn scan(&self, base_dir: &Path) -> Result<Vec<PathBuf>>;

    /// Open the module a validated descriptor points at
    fn load(&self, descriptor: &PluginDescriptor) -> Result<EntryPoint>;
}

/// Loader for native shared libraries
///
/// Every module opened by this loader stays open for the loader's lifetime,
/// and for as long as any entry point resolved from it is alive.
#[derive(Default)]
pub struct NativeLoader {
    modules: Mutex<Vec<Arc<Library>>>,
}

impl std::fmt::Debug for NativeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLoader")
            .field("modules", &self.modules.lock().len())
            .finish()
    }
}

impl NativeLoader {
    /// Create a new native loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of modules opened so far
    pub fn module_count(&self) -> usize {
        self.modules.lock().len()
    }

    #[allow(unsafe_code)]
    fn open(&self, path: &Path) -> std::result::Result<EntryPoint, LoadError> {
        // SAFETY: running the module's initializers is the point of loading it;
        // see the module docs for the toolchain requirement.
        let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let library = Arc::new(library);

        // SAFETY: the symbol is read as a data address only; nothing is
        // dereferenced until it is checked for null.
        let declaration: *const EntryDeclaration = unsafe {
            let symbol = library
                .get::<*const EntryDeclaration>(ENTRY_SYMBOL.as_bytes())
                .map_err(|source| LoadError::MissingSymbol {
                    path: path.to_path_buf(),
                    symbol: ENTRY_SYMBOL,
                    source,
                })?;
            *symbol
        };

        if declaration.is_null() {
            return Err(LoadError::NullSymbol {
                path: path.to_path_buf(),
                symbol: ENTRY_SYMBOL,
            });
        }

        // SAFETY: non-null and backed by `library`, which outlives this borrow.
        let declaration = unsafe { &*declaration };

        if declaration.abi_version != ENTRY_ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                path: path.to_path_buf(),
                expected: ENTRY_ABI_VERSION,
                found: declaration.abi_version,
            });
        }

        // SAFETY: ABI version matched, so both fields are NUL-terminated
        // strings or null.
        let signature = unsafe { read_c_str(declaration.signature) };
        if signature != ENTRY_SIGNATURE {
            return Err(LoadError::SignatureMismatch {
                path: path.to_path_buf(),
                expected: ENTRY_SIGNATURE.to_string(),
                found: signature,
            });
        }

        let api_version = unsafe { read_c_str(declaration.api_version) };
        if api_version != API_VERSION {
            return Err(LoadError::ApiVersionMismatch {
                path: path.to_path_buf(),
                expected: API_VERSION.to_string(),
                found: api_version,
            });
        }

        let execute = declaration.execute;
        self.modules.lock().push(Arc::clone(&library));

        Ok(EntryPoint::from_module(execute, library))
    }
}

impl Loader for NativeLoader {
    fn scan(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        if base_dir.as_os_str().is_empty() {
            return Err(PluginRuntimeError::config("plugin base dir path is empty"));
        }

        if !base_dir.exists() {
            return Err(PluginRuntimeError::config(format!(
                "plugin base dir '{}' is not existing",
                base_dir.display()
            )));
        }

        let mut candidates = Vec::new();
        for entry in fs::read_dir(base_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                candidates.push(path);
            }
        }
        candidates.sort();

        debug!(
            base_dir = %base_dir.display(),
            candidates = candidates.len(),
            "Scanned plugin base dir"
        );

        Ok(candidates)
    }

    fn load(&self, descriptor: &PluginDescriptor) -> Result<EntryPoint> {
        let source = descriptor
            .source
            .as_ref()
            .ok_or(ValidationError::MissingSource)?;

        if source.mode != SourceMode::LocalModule {
            return Err(LoadError::UnsupportedSource {
                name: descriptor.name.clone(),
                mode: source.mode.to_string(),
            }
            .into());
        }

        let path = source.path_buf();
        if !path.is_file() {
            return Err(LoadError::ModuleNotFound(path).into());
        }

        info!(
            plugin = %descriptor.name,
            path = %path.display(),
            "Opening plugin module"
        );

        Ok(self.open(&path)?)
    }
}

/// Copy a C string, treating null as empty
#[allow(unsafe_code)]
unsafe fn read_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::consts::DLL_EXTENSION;
    use tempfile::TempDir;

    #[test]
    fn test_scan_lists_directories_only() {
        let base = TempDir::new().unwrap();
        fs::create_dir(base.path().join("beta")).unwrap();
        fs::create_dir(base.path().join("alpha")).unwrap();
        fs::write(base.path().join("README.md"), "not a plugin").unwrap();

        let candidates = NativeLoader::new().scan(base.path()).unwrap();
        assert_eq!(
            candidates,
            vec![base.path().join("alpha"), base.path().join("beta")]
        );
    }

    #[test]
    fn test_scan_empty_dir() {
        let base = TempDir::new().unwrap();
        assert!(NativeLoader::new().scan(base.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_rejects_empty_path() {
        let err = NativeLoader::new().scan(Path::new("")).unwrap_err();
        assert!(matches!(err, PluginRuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_scan_rejects_missing_dir() {
        let base = TempDir::new().unwrap();
        let err = NativeLoader::new()
            .scan(&base.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, PluginRuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_load_rejects_remote_source() {
        let descriptor = PluginDescriptor::new("remote", "1.0.0")
            .with_source(SourceMode::RemoteSource, "https://example.com/remote.git");
        let err = NativeLoader::new().load(&descriptor).unwrap_err();
        assert!(matches!(
            err,
            PluginRuntimeError::Load(LoadError::UnsupportedSource { .. })
        ));
    }

    #[test]
    fn test_load_missing_module() {
        let base = TempDir::new().unwrap();
        let path = base.path().join(format!("missing.{DLL_EXTENSION}"));
        let descriptor = PluginDescriptor::new("missing", "1.0.0")
            .with_source(SourceMode::LocalModule, path.to_string_lossy());

        let err = NativeLoader::new().load(&descriptor).unwrap_err();
        assert!(matches!(
            err,
            PluginRuntimeError::Load(LoadError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_load_rejects_non_library_file() {
        let base = TempDir::new().unwrap();
        let path = base.path().join(format!("garbage.{DLL_EXTENSION}"));
        fs::write(&path, b"definitely not a shared library").unwrap();
        let descriptor = PluginDescriptor::new("garbage", "1.0.0")
            .with_source(SourceMode::LocalModule, path.to_string_lossy());

        let loader = NativeLoader::new();
        let err = loader.load(&descriptor).unwrap_err();
        assert!(matches!(err, PluginRuntimeError::Load(LoadError::Open { .. })));
        assert_eq!(loader.module_count(), 0);
    }

    #[test]
    fn test_load_requires_source() {
        let descriptor = PluginDescriptor::new("nosource", "1.0.0");
        let err = NativeLoader::new().load(&descriptor).unwrap_err();
        assert!(matches!(
            err,
            PluginRuntimeError::Validation(ValidationError::MissingSource)
        ));
    }
}
