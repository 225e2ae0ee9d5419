/// Test utilities shared by the storage, migration and registry tests
///
/// `TestStorage` gives every test its own DuckDB file in a temporary directory,
/// removed when the fixture goes out of scope. The legacy state builders
/// reproduce what older releases left in storage.
///
/// ## Usage Examples
///
/// ```rust
/// use crate::infrastructure::test_utils::test_harness::TestStorage;
///
/// #[test]
/// fn my_test() {
///     let test_storage = TestStorage::new();
///     let storage = test_storage.storage();
///
///     // Use storage for testing...
/// }
///
/// // Or using the functional approach:
/// #[test]
/// fn my_test() {
///     test_harness::with_test_storage(|test_storage| {
///         // Use test_storage here...
///     });
/// }
/// ```
#[cfg(test)]
pub mod test_harness {
    use crate::domain::ThemeId;
    use crate::infrastructure::hooks::{RenderContext, RenderHook};
    use crate::infrastructure::migration::PersistedState;
    use crate::infrastructure::storage::{KeyValueStore, Scope};
    use crate::infrastructure::{DuckDbStore, MemoryStore};
    use anyhow::{anyhow, Result};
    use serde_json::{json, Map, Value};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Fresh DuckDB store in its own temporary directory
    pub struct TestStorage {
        pub storage: DuckDbStore,
        _temp_dir: TempDir, // Keep temp dir alive
    }

    impl TestStorage {
        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp directory");
            let db_path = temp_dir.path().join("test.db");

            let storage =
                DuckDbStore::new(&db_path).expect("Failed to initialize test DuckDB store");

            Self {
                storage,
                _temp_dir: temp_dir,
            }
        }

        pub fn storage(&self) -> &DuckDbStore {
            &self.storage
        }

        /// Get database path (useful for reopening)
        pub fn db_path(&self) -> PathBuf {
            self._temp_dir.path().join("test.db")
        }
    }

    /// Run a test with fresh test storage
    pub fn with_test_storage<F, R>(test_fn: F) -> R
    where
        F: FnOnce(&TestStorage) -> R,
    {
        let test_storage = TestStorage::new();
        test_fn(&test_storage)
    }

    #[derive(Debug, Default)]
    struct Recorded {
        applied: Vec<ThemeId>,
        cleared: usize,
    }

    /// Render hook that remembers what it was told. Clones share the log.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingHook {
        log: Arc<Mutex<Recorded>>,
    }

    impl RecordingHook {
        pub fn applied(&self) -> Vec<ThemeId> {
            self.log.lock().unwrap().applied.clone()
        }

        pub fn cleared(&self) -> usize {
            self.log.lock().unwrap().cleared
        }
    }

    impl RenderHook for RecordingHook {
        fn on_theme_applied(&self, context: &RenderContext) -> Result<()> {
            self.log.lock().unwrap().applied.push(context.theme_id);
            Ok(())
        }

        fn on_theme_cleared(&self) -> Result<()> {
            self.log.lock().unwrap().cleared += 1;
            Ok(())
        }

        fn name(&self) -> &str {
            "Recorder"
        }
    }

    /// Memory store whose `set_many` starts failing once a write budget is
    /// spent. Reads, removals and clears always go through.
    #[derive(Debug, Clone, Default)]
    pub struct FailingStore {
        inner: MemoryStore,
        budget: Arc<Mutex<Option<usize>>>,
    }

    impl FailingStore {
        pub fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                budget: Arc::default(),
            }
        }

        /// Let `writes` more writes succeed, then refuse every one after.
        pub fn fail_after(&self, writes: usize) {
            *self.budget.lock().unwrap() = Some(writes);
        }

        pub fn heal(&self) {
            *self.budget.lock().unwrap() = None;
        }

        fn spend(&self) -> Result<()> {
            match self.budget.lock().unwrap().as_mut() {
                None => Ok(()),
                Some(0) => Err(anyhow!("disk full")),
                Some(left) => {
                    *left -= 1;
                    Ok(())
                }
            }
        }
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>> {
            self.inner.get(scope, key)
        }

        fn set_many(&self, scope: Scope, entries: Map<String, Value>) -> Result<()> {
            self.spend()?;
            self.inner.set_many(scope, entries)
        }

        fn remove(&self, scope: Scope, key: &str) -> Result<()> {
            self.inner.remove(scope, key)
        }

        fn snapshot(&self, scope: Scope) -> Result<Map<String, Value>> {
            self.inner.snapshot(scope)
        }

        fn clear(&self, scope: Scope) -> Result<()> {
            self.inner.clear(scope)
        }

        fn backend_info(&self) -> &str {
            "Failing in-memory storage"
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {}", other),
        }
    }

    /// Storage as left by a `0.1.x` release.
    pub fn dropdown_era_state() -> PersistedState {
        PersistedState {
            durable: object(json!({
                "version": "0.1.1",
                "colorful-github-all": [
                    { "name": "grey", "colors": ["#111", "#555", "#888", "#bbb", "#eee"] },
                    { "name": "Solemn", "colors": ["#111", "#555", "#888", "#bbb", "#eee"] },
                    { "name": "Mine", "colors": ["#a00", "#b00", "#c00", "#d00", "#eee"] }
                ],
                "colorful-github-selected": "Mine"
            })),
            local: object(json!({ "colorful-github": { "name": "Mine" } })),
        }
    }

    /// Storage as left by a `0.2.x` release, including a deprecated built-in
    /// and a user theme whose name merely resembles it.
    pub fn named_era_state() -> PersistedState {
        PersistedState {
            durable: object(json!({
                "version": "0.2.0",
                "CGC_all": [
                    {
                        "name": "Primal",
                        "colors": ["#196127", "#239a3b", "#7bc96f", "#c6e48b", "#eee"],
                        "thresholds": [10, 8, 5, 3, 0]
                    },
                    {
                        "name": "Olympic",
                        "colors": ["#0000ff", "#fff000", "#000000", "#096600", "#ff0000"]
                    },
                    {
                        "name": "Flower",
                        "colors": ["icons/flower.png", "#239a3b", "#7bc96f", "#c6e48b", "#eee"]
                    },
                    {
                        "name": "MyCustomOlympic",
                        "colors": ["#0000ff", "#fff000", "#000000", "#096600", "#00ff00"]
                    }
                ],
                "CGC_selected": "Flower",
                "CGC_user_icons": [[1520000000000i64, "data:image/png;base64,AAAA"]]
            })),
            local: object(json!({ "CGC": { "name": "Flower" } })),
        }
    }

    /// Storage as left by a `0.3.x` release.
    pub fn typed_era_state() -> PersistedState {
        PersistedState {
            durable: object(json!({
                "version": "0.3.1",
                "themes": [
                    {
                        "id": 5,
                        "name": "Primal",
                        "thresholds": null,
                        "patterns": ["#eee", "#c6e48b", "#7bc96f", "#239a3b", "icons/flower.png"]
                    },
                    {
                        "name": "Night",
                        "thresholds": null,
                        "poster": "posters/starry-night.jpg"
                    }
                ],
                "selected": "Night"
            })),
            local: Map::new(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_harness_isolation() {
            let first = TestStorage::new();
            let second = TestStorage::new();

            first
                .storage()
                .set(Scope::Durable, "version", json!("0.4.0"))
                .unwrap();

            assert_eq!(second.storage().get(Scope::Durable, "version").unwrap(), None);
            assert_ne!(first.db_path(), second.db_path());
        }

        #[test]
        fn test_harness_with_function() {
            let info = with_test_storage(|test_storage| {
                test_storage.storage().backend_info().to_string()
            });
            assert!(info.contains("DuckDB"));
        }

        #[test]
        fn test_failing_store_spends_its_budget() {
            let store = FailingStore::new(MemoryStore::new());
            store.fail_after(1);

            store.set(Scope::Local, "a", json!(1)).unwrap();
            assert!(store.set(Scope::Local, "b", json!(2)).is_err());
            assert_eq!(store.get(Scope::Local, "b").unwrap(), None);

            store.heal();
            store.set(Scope::Local, "b", json!(2)).unwrap();
            assert_eq!(store.snapshot(Scope::Local).unwrap().len(), 2);
        }
    }
}
