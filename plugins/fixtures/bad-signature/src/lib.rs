//! Module whose `Execute` declaration advertises a signature the host does
//! not accept. Used by the runtime's native loader tests.

use dynaplug_api::{EntryDeclaration, ExecuteError, ExecutionContext, ENTRY_ABI_VERSION};
use std::os::raw::c_char;

fn execute(_ctx: &mut ExecutionContext) -> Result<(), ExecuteError> {
    Err(ExecuteError::failed("entry with a foreign signature was called"))
}

/// Entry declaration with a foreign signature string
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static Execute: EntryDeclaration = EntryDeclaration {
    abi_version: ENTRY_ABI_VERSION,
    signature: "fn(u32) -> u32\0".as_ptr() as *const c_char,
    api_version: concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char,
    execute,
};
