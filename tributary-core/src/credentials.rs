//! API key resolution
//!
//! Precedence: an explicit key, then the store's `api_key` value, then the
//! store's interactive prompt (asked at most once). Environment variables
//! are never consulted here; files reference them explicitly with `${VAR}`.

use crate::config::{ConfigStore, SecretString, API_KEY};
use crate::providers::{ProviderError, ProviderResult};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

/// Where the active key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Store,
    Prompt,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialSource::Explicit => "explicit",
            CredentialSource::Store => "store",
            CredentialSource::Prompt => "prompt",
        };
        f.write_str(name)
    }
}

/// Holds the API key used for dispatch
#[derive(Clone, Default)]
pub struct CredentialResolver {
    api_key: Option<SecretString>,
    source: Option<CredentialSource>,
}

impl CredentialResolver {
    /// Resolve a key from the explicit value, the store, or the store's prompt
    pub fn resolve(explicit: Option<SecretString>, store: &dyn ConfigStore) -> Self {
        if let Some(key) = explicit.filter(|k| !k.is_empty()) {
            return Self::with_source(key, CredentialSource::Explicit);
        }

        if let Some(key) = store_key(store) {
            return Self::with_source(key, CredentialSource::Store);
        }

        debug!("no API key configured, asking the store's prompt");
        match store.prompt_for_api_key().filter(|k| !k.is_empty()) {
            Some(key) => Self::with_source(key, CredentialSource::Prompt),
            None => {
                info!("no API key available; calls will fail with an authentication error");
                Self::default()
            }
        }
    }

    /// Resolver holding the given key
    pub fn from_key(key: impl Into<SecretString>) -> Self {
        let key = key.into();
        if key.is_empty() {
            return Self::default();
        }
        Self::with_source(key, CredentialSource::Explicit)
    }

    fn with_source(key: SecretString, source: CredentialSource) -> Self {
        debug!(%source, key = %key.partial_redact(), "API key resolved");
        Self {
            api_key: Some(key),
            source: Some(source),
        }
    }

    /// Whether a non-empty key is present. No network call is made.
    pub fn validate_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref().filter(|k| !k.is_empty())
    }

    pub fn source(&self) -> Option<CredentialSource> {
        self.source
    }

    /// Supply or replace the key after construction. An empty key clears it.
    pub fn set_api_key(&mut self, key: impl Into<SecretString>) {
        let key = key.into();
        if key.is_empty() {
            self.api_key = None;
            self.source = None;
        } else {
            self.api_key = Some(key);
            self.source = Some(CredentialSource::Explicit);
        }
    }

    /// The key, or an authentication error when there is none
    pub fn require(&self) -> ProviderResult<&SecretString> {
        self.api_key().ok_or_else(|| {
            ProviderError::Authentication(
                "no API key configured; supply one explicitly or through the config store"
                    .to_string(),
            )
        })
    }
}

fn store_key(store: &dyn ConfigStore) -> Option<SecretString> {
    match store.get(API_KEY)? {
        Value::String(key) if !key.trim().is_empty() => Some(SecretString::new(key)),
        _ => None,
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("api_key", &self.api_key)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_prompt(
        answer: Option<&'static str>,
    ) -> (MemoryConfigStore, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let store = MemoryConfigStore::new().with_prompt(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            answer.map(SecretString::new)
        });
        (store, calls)
    }

    #[test]
    fn test_no_key_anywhere() {
        let resolver = CredentialResolver::resolve(None, &MemoryConfigStore::new());
        assert!(!resolver.validate_api_key());
        assert!(resolver.api_key().is_none());
        assert!(matches!(
            resolver.require(),
            Err(ProviderError::Authentication(_))
        ));
    }

    #[test]
    fn test_explicit_wins_without_prompt() {
        let (store, calls) = counting_prompt(Some("sk-prompt"));
        let store = store.with_value("api_key", "sk-store");

        let resolver = CredentialResolver::resolve(Some("sk-explicit".into()), &store);

        assert_eq!(resolver.require().unwrap().expose_secret(), "sk-explicit");
        assert_eq!(resolver.source(), Some(CredentialSource::Explicit));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_store_key_used() {
        let (store, calls) = counting_prompt(Some("sk-prompt"));
        let store = store.with_value("api_key", "sk-store");

        let resolver = CredentialResolver::resolve(Some("  ".into()), &store);

        assert_eq!(resolver.require().unwrap().expose_secret(), "sk-store");
        assert_eq!(resolver.source(), Some(CredentialSource::Store));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prompt_called_once() {
        let (store, calls) = counting_prompt(Some("sk-typed"));
        let resolver = CredentialResolver::resolve(None, &store);

        assert!(resolver.validate_api_key());
        assert!(resolver.validate_api_key());
        assert_eq!(resolver.source(), Some(CredentialSource::Prompt));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_prompt_answer_ignored() {
        let (store, calls) = counting_prompt(Some(""));
        let resolver = CredentialResolver::resolve(None, &store);

        assert!(!resolver.validate_api_key());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_string_store_value_ignored() {
        let store = MemoryConfigStore::new().with_value("api_key", json!(42));
        assert!(!CredentialResolver::resolve(None, &store).validate_api_key());
    }

    #[test]
    fn test_set_api_key_late() {
        let mut resolver = CredentialResolver::default();
        assert!(!resolver.validate_api_key());

        resolver.set_api_key("sk-late");
        assert!(resolver.validate_api_key());

        resolver.set_api_key("");
        assert!(!resolver.validate_api_key());
    }

    #[test]
    fn test_debug_redacts_key() {
        let resolver = CredentialResolver::from_key("sk-verysecretvalue");
        let debug = format!("{:?}", resolver);
        assert!(!debug.contains("verysecret"));
    }
}
