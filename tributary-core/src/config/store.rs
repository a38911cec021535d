//! Configuration store collaborator
//!
//! The adapter reads settings and the API key through [`ConfigStore`]. The
//! interactive prompt used when no key is configured is a capability of the
//! store, so tests can stub it deterministically.

use super::schema::AdapterConfig;
use super::secrets::SecretString;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io::IsTerminal;
use tracing::{debug, warn};

/// Key under which stores expose the API key
pub const API_KEY: &str = "api_key";

/// Read access to configuration values plus an optional key prompt
pub trait ConfigStore: Send + Sync {
    /// Look up a value. Dotted keys address nested values (`stream.sentinel`).
    fn get(&self, key: &str) -> Option<Value>;

    /// Look up a value, falling back to `default`
    fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Ask the user for an API key. `None` means the store has no prompt
    /// capability or the user supplied nothing.
    fn prompt_for_api_key(&self) -> Option<SecretString> {
        None
    }
}

type PromptFn = Box<dyn Fn() -> Option<SecretString> + Send + Sync>;

/// In-memory store, mostly for embedding and tests
#[derive(Default)]
pub struct MemoryConfigStore {
    values: HashMap<String, Value>,
    prompt: Option<PromptFn>,
}

impl MemoryConfigStore {
    /// Create an empty store without a prompt
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with the top-level fields of a loaded config
    pub fn from_config(config: &AdapterConfig) -> Self {
        let values = match serde_json::to_value(config) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        Self {
            values,
            prompt: None,
        }
    }

    /// Set a value
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Install the key prompt capability
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn() -> Option<SecretString> + Send + Sync + 'static,
    {
        self.prompt = Some(Box::new(prompt));
        self
    }
}

impl fmt::Debug for MemoryConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("MemoryConfigStore")
            .field("keys", &keys)
            .field("has_prompt", &self.prompt.is_some())
            .finish()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.values.get(first)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current.clone())
    }

    fn prompt_for_api_key(&self) -> Option<SecretString> {
        self.prompt.as_ref().and_then(|prompt| prompt())
    }
}

impl ConfigStore for AdapterConfig {
    fn get(&self, key: &str) -> Option<Value> {
        let root = serde_json::to_value(self).ok()?;
        let pointer = format!("/{}", key.replace('.', "/"));
        root.pointer(&pointer).cloned()
    }
}

/// Store wrapper that adds an interactive terminal prompt to another store
#[derive(Debug)]
pub struct TerminalPrompt<S> {
    inner: S,
}

impl<S: ConfigStore> TerminalPrompt<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ConfigStore> ConfigStore for TerminalPrompt<S> {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key)
    }

    fn prompt_for_api_key(&self) -> Option<SecretString> {
        self.inner.prompt_for_api_key().or_else(terminal_prompt)
    }
}

/// Prompt for an API key on the controlling terminal.
///
/// Returns `None` without prompting when stdin is not a terminal.
pub fn terminal_prompt() -> Option<SecretString> {
    if !std::io::stdin().is_terminal() {
        debug!("stdin is not a terminal, skipping API key prompt");
        return None;
    }

    match rpassword::prompt_password("API key: ") {
        Ok(key) if !key.trim().is_empty() => Some(SecretString::new(key.trim())),
        Ok(_) => None,
        Err(e) => {
            warn!(code = "PROMPT_FAILED", "failed to read API key: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_lookup() {
        let store = MemoryConfigStore::new()
            .with_value("api_key", "sk-test")
            .with_value("stream", json!({"sentinel": "[END]"}));

        assert_eq!(store.get("api_key"), Some(json!("sk-test")));
        assert_eq!(store.get("stream.sentinel"), Some(json!("[END]")));
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.get_or("missing", json!(3)), json!(3));
    }

    #[test]
    fn test_memory_store_without_prompt() {
        let store = MemoryConfigStore::new();
        assert!(store.prompt_for_api_key().is_none());
    }

    #[test]
    fn test_memory_store_prompt() {
        let store = MemoryConfigStore::new().with_prompt(|| Some(SecretString::new("typed")));
        assert_eq!(
            store.prompt_for_api_key().map(|k| k.expose_secret().to_string()),
            Some("typed".to_string())
        );
    }

    #[test]
    fn test_adapter_config_as_store() {
        let config = AdapterConfig::default().with_api_key("sk-abc");
        assert_eq!(config.get("api_key"), Some(json!("sk-abc")));
        assert_eq!(config.get("stream.sentinel"), Some(json!("[DONE]")));
        assert!(config.prompt_for_api_key().is_none());
    }

    #[test]
    fn test_terminal_prompt_delegates_lookups() {
        let store = TerminalPrompt::new(MemoryConfigStore::new().with_value("api_key", "sk-x"));
        assert_eq!(store.get("api_key"), Some(json!("sk-x")));
        assert_eq!(store.into_inner().get("api_key"), Some(json!("sk-x")));
    }

    #[test]
    fn test_from_config_omits_absent_key() {
        let store = MemoryConfigStore::from_config(&AdapterConfig::default());
        assert_eq!(store.get("api_key"), None);
        assert_eq!(store.get("default_model"), Some(json!("gpt-4o-mini")));
    }
}
