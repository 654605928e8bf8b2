//! # Dynaplug Plugin API
//!
//! The SDK shared by dynaplug hosts and plugin modules.
//!
//! A plugin is a `cdylib` crate that depends on this crate and exports one
//! entry point:
//!
//! ```rust,ignore
//! use dynaplug_api::prelude::*;
//!
//! fn execute(ctx: &mut ExecutionContext) -> Result<(), ExecuteError> {
//!     let greeting = ctx
//!         .get_value("sample")
//!         .ok_or_else(|| ExecuteError::missing_value("sample"))?
//!         .clone();
//!     ctx.set_value("sample.echo", greeting);
//!     Ok(())
//! }
//!
//! export_entry_point!(execute);
//! ```
//!
//! The module must be built with the same Rust toolchain and the same
//! version of this crate as the host that loads it.

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod context;
pub mod entry;
pub mod error;

pub use context::ExecutionContext;
pub use entry::{
    EntryDeclaration, EntryFn, API_VERSION, ENTRY_ABI_VERSION, ENTRY_SIGNATURE, ENTRY_SYMBOL,
};
pub use error::ExecuteError;

pub use tokio_util::sync::CancellationToken;

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::context::ExecutionContext;
    pub use crate::entry::{EntryDeclaration, EntryFn};
    pub use crate::error::ExecuteError;
    pub use crate::export_entry_point;
}
