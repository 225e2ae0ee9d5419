use crate::domain::{bundled_icon_paths, bundled_poster_paths, STORAGE_MARKER};
use crate::infrastructure::storage::{keys, KeyValueStore, Scope};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Icon,
    Poster,
}

impl AssetKind {
    fn key(&self) -> &'static str {
        match self {
            AssetKind::Icon => keys::UPLOADED_ICONS,
            AssetKind::Poster => keys::UPLOADED_POSTERS,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AssetKind::Icon => "icon",
            AssetKind::Poster => "poster",
        }
    }

    /// Identifier of an upload, e.g. `@storage/icon/1541400000000`.
    pub fn identifier(&self, stamp: i64) -> String {
        format!("{}{}/{}", STORAGE_MARKER, self.label(), stamp)
    }

    /// Kind of upload an identifier refers to.
    pub fn of_identifier(id: &str) -> Option<Self> {
        let rest = id.strip_prefix(STORAGE_MARKER)?;
        [AssetKind::Icon, AssetKind::Poster]
            .into_iter()
            .find(|kind| rest.starts_with(&format!("{}/", kind.label())))
    }
}

/// A user uploaded image, stored as `[id, data]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct UploadedAsset {
    pub id: String,
    pub data: String,
}

impl From<(String, String)> for UploadedAsset {
    fn from((id, data): (String, String)) -> Self {
        Self { id, data }
    }
}

impl From<UploadedAsset> for (String, String) {
    fn from(asset: UploadedAsset) -> Self {
        (asset.id, asset.data)
    }
}

/// Uploaded icons and posters, plus the list of bundled assets the user hid.
/// Lives in the local scope, independent of any theme.
pub struct AssetLibrary<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> AssetLibrary<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn list(&self, kind: AssetKind) -> Result<Vec<UploadedAsset>> {
        self.read_list(kind.key())
    }

    /// Store a new upload and return its identifier.
    pub fn upload(&self, kind: AssetKind, data: impl Into<String>) -> Result<String> {
        let mut assets = self.list(kind)?;

        let mut stamp = chrono::Utc::now().timestamp_millis();
        let taken = |stamp: i64| assets.iter().any(|a| a.id == kind.identifier(stamp));
        while taken(stamp) {
            stamp += 1;
        }

        let id = kind.identifier(stamp);
        assets.push(UploadedAsset {
            id: id.clone(),
            data: data.into(),
        });
        self.write_list(kind.key(), &assets)?;

        log::debug!("stored uploaded {} {}", kind.label(), id);
        Ok(id)
    }

    /// Remove an upload. Returns whether it existed.
    pub fn remove(&self, kind: AssetKind, id: &str) -> Result<bool> {
        let mut assets = self.list(kind)?;
        let before = assets.len();
        assets.retain(|a| a.id != id);

        if assets.len() == before {
            return Ok(false);
        }

        self.write_list(kind.key(), &assets)?;
        Ok(true)
    }

    pub fn find(&self, kind: AssetKind, id: &str) -> Result<Option<String>> {
        Ok(self
            .list(kind)?
            .into_iter()
            .find(|a| a.id == id)
            .map(|a| a.data))
    }

    pub fn hidden_defaults(&self) -> Result<Vec<String>> {
        self.read_list(keys::DELETED_DEFAULT_ASSETS)
    }

    /// Hide a bundled asset from the galleries. The file itself stays.
    pub fn hide_default(&self, path: &str) -> Result<()> {
        let mut hidden = self.hidden_defaults()?;
        if !hidden.iter().any(|p| p == path) {
            hidden.push(path.to_string());
            self.write_list(keys::DELETED_DEFAULT_ASSETS, &hidden)?;
        }
        Ok(())
    }

    pub fn restore_default(&self, path: &str) -> Result<bool> {
        let mut hidden = self.hidden_defaults()?;
        let before = hidden.len();
        hidden.retain(|p| p != path);

        if hidden.len() == before {
            return Ok(false);
        }

        self.write_list(keys::DELETED_DEFAULT_ASSETS, &hidden)?;
        Ok(true)
    }

    /// Bundled assets of a kind that are not hidden.
    pub fn visible_defaults(&self, kind: AssetKind) -> Result<Vec<String>> {
        let hidden = self.hidden_defaults()?;
        let all = match kind {
            AssetKind::Icon => bundled_icon_paths(),
            AssetKind::Poster => bundled_poster_paths(),
        };
        Ok(all.into_iter().filter(|p| !hidden.contains(p)).collect())
    }

    fn read_list<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Vec<T>> {
        match self.store.get(Scope::Local, key)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_json::from_value(value).with_context(|| format!("Malformed {} list", key))
            }
        }
    }

    fn write_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let value =
            serde_json::to_value(items).with_context(|| format!("Failed to encode {}", key))?;
        self.store.set(Scope::Local, key, value)
    }
}
