use parking_lot::RwLock;

/// Holds the bearer token handed back by the sign-in flow. Implementations
/// only store and return it; nothing here inspects the token.
pub trait TokenStore: Send + Sync {
    fn store(&self, token: &str);
    fn token(&self) -> Option<String>;
    fn clear(&self);

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.store(token);
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn store(&self, token: &str) {
        let token = token.trim();
        if token.is_empty() {
            tracing::warn!("ignoring empty access token");
            return;
        }
        *self.token.write() = Some(token.to_string());
        tracing::debug!("access token stored");
    }

    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}
