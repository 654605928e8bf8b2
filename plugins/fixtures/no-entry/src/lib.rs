//! Module that exports a symbol but no `Execute` entry declaration. Used by
//! the runtime's native loader tests.

/// Unrelated export
#[no_mangle]
pub extern "C" fn dynaplug_fixture_answer() -> u32 {
    42
}
