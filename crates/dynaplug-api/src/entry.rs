//! Entry-point declaration exported by plugin modules
//!
//! A plugin module exports one static symbol named [`ENTRY_SYMBOL`] whose
//! value is an [`EntryDeclaration`]. The host reads the fixed-layout header
//! (ABI version, signature string, API version) before it touches the entry
//! function, so a module built against a different SDK is rejected instead
//! of being called through a mismatched function type.
//!
//! Host and module must still be compiled with the same Rust toolchain: the
//! entry function uses the Rust ABI and passes Rust types by reference.

use crate::context::ExecutionContext;
use crate::error::ExecuteError;
use std::os::raw::c_char;

/// Name of the exported entry symbol
pub const ENTRY_SYMBOL: &str = "Execute";

/// Layout version of [`EntryDeclaration`]
pub const ENTRY_ABI_VERSION: u32 = 1;

/// Canonical spelling of the entry function type
pub const ENTRY_SIGNATURE: &str =
    "fn(&mut dynaplug_api::ExecutionContext) -> Result<(), dynaplug_api::ExecuteError>";

/// Version of this crate the module was built against
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

const ENTRY_SIGNATURE_C: &str =
    "fn(&mut dynaplug_api::ExecutionContext) -> Result<(), dynaplug_api::ExecuteError>\0";

const API_VERSION_C: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Entry function type
pub type EntryFn = fn(&mut ExecutionContext) -> Result<(), ExecuteError>;

/// Static declaration exported under [`ENTRY_SYMBOL`]
///
/// Build it with [`EntryDeclaration::new`] or the
/// [`export_entry_point!`](crate::export_entry_point) macro.
#[repr(C)]
pub struct EntryDeclaration {
    /// Must equal [`ENTRY_ABI_VERSION`]
    pub abi_version: u32,

    /// NUL-terminated copy of [`ENTRY_SIGNATURE`]
    pub signature: *const c_char,

    /// NUL-terminated copy of [`API_VERSION`]
    pub api_version: *const c_char,

    /// The entry function
    pub execute: EntryFn,
}

impl std::fmt::Debug for EntryDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryDeclaration")
            .field("abi_version", &self.abi_version)
            .field("execute", &(self.execute as *const ()))
            .finish()
    }
}

// The string pointers reference `'static` literals and are never written.
#[allow(unsafe_code)]
unsafe impl Sync for EntryDeclaration {}

impl EntryDeclaration {
    /// Declare `execute` as the module entry point
    pub const fn new(execute: EntryFn) -> Self {
        Self {
            abi_version: ENTRY_ABI_VERSION,
            signature: ENTRY_SIGNATURE_C.as_ptr() as *const c_char,
            api_version: API_VERSION_C.as_ptr() as *const c_char,
            execute,
        }
    }
}

/// Export a function as the module's `Execute` entry point
///
/// ```rust,ignore
/// use dynaplug_api::prelude::*;
///
/// fn execute(ctx: &mut ExecutionContext) -> Result<(), ExecuteError> {
///     ctx.check()?;
///     Ok(())
/// }
///
/// dynaplug_api::export_entry_point!(execute);
/// ```
#[macro_export]
macro_rules! export_entry_point {
    ($execute:path) => {
        /// Plugin entry declaration read by the dynaplug host
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static Execute: $crate::EntryDeclaration = $crate::EntryDeclaration::new($execute);
    };
}
