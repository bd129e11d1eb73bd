//! Local credential store for provider API keys.
//!
//! Credentials live under fixed key names. A missing credential is a normal
//! state that callers turn into a configuration prompt.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ClimateError, Result};

/// Key for the image provider credential.
pub const GEMINI_API_KEY: &str = "gemini_api_key";

/// Key for the video provider credential.
pub const FAL_API_KEY: &str = "fal_api_key";

/// Key-value storage for provider credentials.
pub trait CredentialStore: Send + Sync {
    /// Reads a credential. `Ok(None)` when unset.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores a credential, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a credential. Returns false if it was not set.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// Looks up an environment variable by name.
pub type EnvLookup = fn(&str) -> Option<String>;

/// Reads the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Ignores the environment entirely.
pub fn no_env(_name: &str) -> Option<String> {
    None
}

/// Resolves a credential: the upper-cased environment variable wins,
/// then the store. Blank values count as unset.
pub fn resolve(store: &dyn CredentialStore, key: &str) -> Result<Option<String>> {
    resolve_with(store, key, process_env)
}

/// Like [`resolve`], with the environment read through `env`.
pub fn resolve_with(
    store: &dyn CredentialStore,
    key: &str,
    env: EnvLookup,
) -> Result<Option<String>> {
    if let Some(value) = env(&key.to_ascii_uppercase()) {
        let value = value.trim();
        if !value.is_empty() {
            return Ok(Some(value.to_string()));
        }
    }

    Ok(store
        .get(key)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// Validates and stores a credential entered by the user.
pub fn save(store: &dyn CredentialStore, key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClimateError::Validation(
            "Please enter a valid API key".to_string(),
        ));
    }
    store.set(key, value)
}

/// Masks a credential for display, keeping the last four characters.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one credential.
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.values.write().unwrap().remove(key).is_some())
    }
}
