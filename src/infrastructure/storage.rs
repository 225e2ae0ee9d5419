use anyhow::Result;
use serde_json::{Map, Value};
use std::fmt;

/// Keys used in the two storage scopes.
pub mod keys {
    pub const VERSION: &str = "version";
    pub const THEMES: &str = "themes";
    pub const SELECTED_ID: &str = "selected_id";
    pub const NEXT_ID: &str = "next_id";

    pub const ACTIVE_THEME: &str = "active_theme";
    pub const UPLOADED_ICONS: &str = "uploaded_icons";
    pub const UPLOADED_POSTERS: &str = "uploaded_posters";
    pub const DELETED_DEFAULT_ASSETS: &str = "deleted_default_assets";

    /// Local keys that hold user data rather than transient render state.
    pub const LOCAL_ASSET_KEYS: [&str; 3] =
        [UPLOADED_ICONS, UPLOADED_POSTERS, DELETED_DEFAULT_ASSETS];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Synced across browsers; holds the theme registry.
    Durable,
    /// Per machine; holds the active theme and uploaded assets.
    Local,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Durable => "sync",
            Scope::Local => "local",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String keyed JSON storage with a durable and a local scope
pub trait KeyValueStore {
    /// Read a single key
    fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>>;

    /// Write several keys in one operation
    fn set_many(&self, scope: Scope, entries: Map<String, Value>) -> Result<()>;

    /// Delete a key; missing keys are not an error
    fn remove(&self, scope: Scope, key: &str) -> Result<()>;

    /// Read every key of a scope
    fn snapshot(&self, scope: Scope) -> Result<Map<String, Value>>;

    /// Delete every key of a scope
    fn clear(&self, scope: Scope) -> Result<()>;

    /// Get storage backend information
    fn backend_info(&self) -> &str;

    /// Write a single key
    fn set(&self, scope: Scope, key: &str, value: Value) -> Result<()> {
        let mut entries = Map::new();
        entries.insert(key.to_string(), value);
        self.set_many(scope, entries)
    }
}
