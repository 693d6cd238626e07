//! Where the speech provider's API key comes from.
//!
//! Keys live behind a [`CredentialProvider`] so nothing else in the crate
//! holds one.  [`StaticCredentials`] is the session-scoped store a front end
//! sets when the user saves a key and clears when they remove it.

use std::sync::RwLock;

pub trait CredentialProvider: Send + Sync {
    /// The current key, if one is available.
    fn api_key(&self) -> Option<String>;
}

/// In-memory key with an explicit set/clear lifecycle.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    key: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        let store = Self::default();
        store.set(key);
        store
    }

    /// Store `key`.  A blank key clears the store.
    pub fn set(&self, key: impl Into<String>) {
        let key = key.into();
        let key = key.trim();
        let mut slot = self.key.write().unwrap_or_else(|e| e.into_inner());
        *slot = (!key.is_empty()).then(|| key.to_string());
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_set(&self) -> bool {
        self.key.read().map(|k| k.is_some()).unwrap_or(false)
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.key.read().ok().and_then(|k| k.clone())
    }
}

/// Reads the key from an environment variable on every request.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    pub var: String,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self { var: "OPENAI_API_KEY".to_string() }
    }
}

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lifecycle() {
        let creds = StaticCredentials::default();
        assert_eq!(creds.api_key(), None);
        creds.set("  sk-test  ");
        assert_eq!(creds.api_key().as_deref(), Some("sk-test"));
        assert!(creds.is_set());
        creds.clear();
        assert!(!creds.is_set());
        creds.set("   ");
        assert_eq!(creds.api_key(), None);
    }

    #[test]
    fn test_env_missing_var() {
        let creds = EnvCredentials { var: "STORYVOICE_TEST_SURELY_UNSET_KEY".into() };
        assert_eq!(creds.api_key(), None);
    }
}
