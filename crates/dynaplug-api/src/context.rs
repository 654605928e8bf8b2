//! Execution context handed to plugin entry points

use crate::error::{ExecuteError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Execution context provided to a plugin's `Execute` entry point
///
/// Carries string-keyed values from the host to the plugin (and back), a
/// cancellation signal, an optional deadline, and a typed extension map for
/// host-specific data that does not fit a JSON value.
pub struct ExecutionContext {
    values: HashMap<String, serde_json::Value>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    created_at: Instant,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("values", &self.values)
            .field("extensions", &self.extensions.len())
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl ExecutionContext {
    /// Create an empty context with no deadline that is never cancelled
    /// unless [`cancel`](Self::cancel) is called
    pub fn background() -> Self {
        Self {
            values: HashMap::new(),
            extensions: HashMap::new(),
            cancellation: CancellationToken::new(),
            deadline: None,
            created_at: Instant::now(),
        }
    }

    /// Use an existing cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Get a value by key
    pub fn get_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Set a value
    ///
    /// Keys that are empty or only whitespace are ignored. `null` values are
    /// stored as-is.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        let key = key.into();
        if key.trim().is_empty() {
            return;
        }
        self.values.insert(key, value.into());
    }

    /// Decode a value into a concrete type
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Encode a value and store it under `key`
    pub fn set_as<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value);
        Ok(())
    }

    /// Remove a value
    pub fn remove_value(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    /// Iterate over the value keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Insert a typed extension, returning the previous one of the same type
    pub fn insert_extension<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|prev| *prev)
    }

    /// Look up a typed extension
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Get a clone of the cancellation token
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancel the context
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether the context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Wait until the context is cancelled
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Get the deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if any
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Time since the context was created
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Why the context is done, or `None` while it is still live
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<ExecuteError> {
        if self.is_cancelled() {
            return Some(ExecuteError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ExecuteError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Return early from an entry point once the context is done
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Hello {
        name: String,
    }

    #[test]
    fn test_set_and_get_value() {
        let mut ctx = ExecutionContext::background();
        ctx.set_value("key", "value");

        assert_eq!(ctx.get_value("key"), Some(&serde_json::json!("value")));
        assert_eq!(ctx.get_value("other"), None);
    }

    #[test]
    fn test_blank_key_ignored() {
        let mut ctx = ExecutionContext::background();
        ctx.set_value("", 1);
        ctx.set_value("   ", 2);

        assert_eq!(ctx.keys().count(), 0);
    }

    #[test]
    fn test_null_value_allowed() {
        let mut ctx = ExecutionContext::background();
        ctx.set_value("nothing", serde_json::Value::Null);

        assert_eq!(ctx.get_value("nothing"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_typed_values() {
        let mut ctx = ExecutionContext::background();
        ctx.set_as("sample", &Hello { name: "hello".to_string() })
            .unwrap();

        let hello: Option<Hello> = ctx.get_as("sample").unwrap();
        assert_eq!(hello, Some(Hello { name: "hello".to_string() }));

        let missing: Option<Hello> = ctx.get_as("missing").unwrap();
        assert!(missing.is_none());

        ctx.set_value("bad", 42);
        assert!(ctx.get_as::<Hello>("bad").is_err());
    }

    #[test]
    fn test_extensions() {
        let mut ctx = ExecutionContext::background();
        assert!(ctx.insert_extension(7u32).is_none());
        assert_eq!(ctx.insert_extension(9u32), Some(7));
        assert_eq!(ctx.extension::<u32>(), Some(&9));
        assert!(ctx.extension::<String>().is_none());
    }

    #[test]
    fn test_cancellation() {
        let ctx = ExecutionContext::background();
        assert!(ctx.err().is_none());
        assert!(ctx.check().is_ok());

        ctx.cancellation_token().cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.err(), Some(ExecuteError::Cancelled)));
    }

    #[test]
    fn test_deadline() {
        let ctx = ExecutionContext::background().with_timeout(Duration::from_secs(60));
        assert!(ctx.deadline().is_some());
        assert!(ctx.remaining().unwrap() <= Duration::from_secs(60));
        assert!(ctx.err().is_none());

        let expired = ExecutionContext::background().with_deadline(Instant::now());
        assert!(matches!(expired.check(), Err(ExecuteError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_cancelled_future() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::background().with_cancellation(token.clone());

        let waiter = async { ctx.cancelled().await };
        token.cancel();
        waiter.await;
        assert!(ctx.is_cancelled());
    }
}
