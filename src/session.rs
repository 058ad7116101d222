use rustc_hash::FxHashMap;

/// Session data attached to a request. Storage backends live outside the crate.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Option<&str>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str) -> Option<String>;
}

/// Authenticated-user capability. The core only asks whether the user is authenticated.
pub trait UserManager: Send + Sync {
    fn authenticated(&self) -> bool;
}

/// Session kept in memory for the lifetime of one request.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    values: FxHashMap<String, String>,
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}
