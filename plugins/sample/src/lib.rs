//! # Sample Plugin
//!
//! Reads the string stored under `sample`, writes a greeting to
//! `sample.greeting`, and exports itself through the `Execute` symbol.
//!
//! Optional `sample.options` tune the greeting:
//!
//! ```json
//! {"uppercase": true, "suffix": "!"}
//! ```
//!
//! Build with `cargo build -p dynaplug-sample`, copy the module next to
//! `plugin.json` in a `sample/` plugin directory, and point `Source.Path` at
//! it.

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

use dynaplug_api::prelude::*;
use serde::{Deserialize, Serialize};

/// Key the plugin reads its input from
pub const INPUT_KEY: &str = "sample";

/// Key the plugin writes its greeting to
pub const OUTPUT_KEY: &str = "sample.greeting";

/// Key holding optional [`GreetingOptions`]
pub const OPTIONS_KEY: &str = "sample.options";

/// Greeting options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreetingOptions {
    /// Uppercase the greeting
    pub uppercase: bool,

    /// Appended to the greeting
    pub suffix: Option<String>,
}

/// Plugin entry point
pub fn execute(ctx: &mut ExecutionContext) -> Result<(), ExecuteError> {
    ctx.check()?;

    let input: String = ctx
        .get_as(INPUT_KEY)?
        .ok_or_else(|| ExecuteError::missing_value(INPUT_KEY))?;
    if input.trim().is_empty() {
        return Err(ExecuteError::failed("input cannot be empty"));
    }

    let options: GreetingOptions = ctx.get_as(OPTIONS_KEY)?.unwrap_or_default();

    let mut greeting = format!("{input} from sample plugin");
    if let Some(suffix) = &options.suffix {
        greeting.push_str(suffix);
    }
    if options.uppercase {
        greeting = greeting.to_uppercase();
    }

    ctx.set_value(OUTPUT_KEY, greeting);
    Ok(())
}

export_entry_point!(execute);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_greets() {
        let mut ctx = ExecutionContext::background();
        ctx.set_value(INPUT_KEY, "Hello");

        execute(&mut ctx).unwrap();
        assert_eq!(
            ctx.get_as::<String>(OUTPUT_KEY).unwrap().as_deref(),
            Some("Hello from sample plugin")
        );
    }

    #[test]
    fn test_execute_with_options() {
        let mut ctx = ExecutionContext::background();
        ctx.set_value(INPUT_KEY, "Hello");
        ctx.set_as(
            OPTIONS_KEY,
            &GreetingOptions {
                uppercase: true,
                suffix: Some("!".to_string()),
            },
        )
        .unwrap();

        execute(&mut ctx).unwrap();
        assert_eq!(
            ctx.get_as::<String>(OUTPUT_KEY).unwrap().as_deref(),
            Some("HELLO FROM SAMPLE PLUGIN!")
        );
    }

    #[test]
    fn test_execute_missing_input() {
        let mut ctx = ExecutionContext::background();
        let err = execute(&mut ctx).unwrap_err();
        assert!(matches!(err, ExecuteError::MissingValue(_)));
        assert!(ctx.get_value(OUTPUT_KEY).is_none());
    }

    #[test]
    fn test_execute_rejects_wrong_type() {
        let mut ctx = ExecutionContext::background();
        ctx.set_value(INPUT_KEY, 42);
        assert!(matches!(
            execute(&mut ctx).unwrap_err(),
            ExecuteError::SerdeError(_)
        ));
    }

    #[test]
    fn test_execute_respects_cancellation() {
        let mut ctx = ExecutionContext::background();
        ctx.set_value(INPUT_KEY, "Hello");
        ctx.cancel();
        assert!(matches!(
            execute(&mut ctx).unwrap_err(),
            ExecuteError::Cancelled
        ));
    }

    #[test]
    fn test_entry_declaration() {
        assert_eq!(Execute.abi_version, dynaplug_api::ENTRY_ABI_VERSION);
    }
}
