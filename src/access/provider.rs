use std::collections::HashMap;

use axum_extra::extract::cookie::CookieJar;

use crate::models::CurrentUser;

/// Keys a client persists its user record under, in lookup order.
pub const USER_STORAGE_KEYS: [&str; 2] = ["user", "currentUser"];

/// UserProvider
///
/// One place the current user may come from. Providers never fail: a source that has nothing
/// usable answers `None` and the chain moves on.
pub trait UserProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn current_user(&self) -> Option<CurrentUser>;
}

/// ContextProvider
///
/// The injected auth context: whatever the request authenticated as, if anything.
#[derive(Debug, Clone, Default)]
pub struct ContextProvider {
    user: Option<CurrentUser>,
}

impl ContextProvider {
    pub fn new(user: Option<CurrentUser>) -> Self {
        Self { user }
    }
}

impl UserProvider for ContextProvider {
    fn name(&self) -> &'static str {
        "context"
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }
}

/// KeyValueStore
///
/// Read access to client-side persisted strings.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl KeyValueStore for CookieJar {
    fn get(&self, key: &str) -> Option<String> {
        CookieJar::get(self, key).map(|cookie| cookie.value().to_string())
    }
}

/// MemoryStore
///
/// A plain map, for tests and for callers that already hold the persisted values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(HashMap<String, String>);

impl MemoryStore {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// StorageProvider
///
/// Reads the user record a client persisted. Each key is parsed on its own: a malformed value is
/// logged and skipped, and the first key that parses wins. A stored JSON `null` counts as absent.
pub struct StorageProvider<S> {
    store: S,
    keys: &'static [&'static str],
}

impl<S: KeyValueStore> StorageProvider<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            keys: &USER_STORAGE_KEYS,
        }
    }
}

impl<S: KeyValueStore> UserProvider for StorageProvider<S> {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.keys.iter().find_map(|key| {
            let raw = self.store.get(key)?;
            match serde_json::from_str::<Option<CurrentUser>>(&raw) {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "ignoring unparseable stored user");
                    None
                }
            }
        })
    }
}

/// ProviderChain
///
/// Providers tried in order; the first to produce a user wins.
#[derive(Default)]
pub struct ProviderChain {
    providers: Vec<Box<dyn UserProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl UserProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn resolve(&self) -> Option<CurrentUser> {
        self.providers.iter().find_map(|provider| {
            let user = provider.current_user()?;
            tracing::trace!(provider = provider.name(), "resolved current user");
            Some(user)
        })
    }
}
