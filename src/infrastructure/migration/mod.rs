//! Upgrades data written by older releases to the current storage layout.
//!
//! Releases fall into four layout eras:
//!
//! - dropdown (`0.1.x`): `colorful-github-all` / `colorful-github-selected`
//! - named (`0.2.x`): `CGC_all` with `{name, colors}` themes listed highest
//!   intensity first, `CGC_selected` by name, uploaded icons in the synced
//!   `CGC_user_icons` list
//! - typed (`0.3.x`): `themes` records without ids, `selected` by name,
//!   asset paths relative to the extension root (`icons/`, `posters/`)
//! - current: see [`crate::infrastructure::storage::keys`]
//!
//! Each step rewrites the snapshot in place and hands it to the next one.

mod version;

pub use version::SchemaVersion;

use crate::domain::{normalize_color, Thresholds, DETECT_SENTINEL};
use crate::infrastructure::assets::AssetKind;
use crate::infrastructure::storage::keys;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Storage layout written by this release.
pub const CURRENT_VERSION: &str = "0.4.0";

mod legacy {
    pub const DROPDOWN_ALL: &str = "colorful-github-all";
    pub const DROPDOWN_SELECTED: &str = "colorful-github-selected";
    pub const NAMED_ALL: &str = "CGC_all";
    pub const NAMED_SELECTED: &str = "CGC_selected";
    pub const USER_ICONS: &str = "CGC_user_icons";
    pub const TYPED_SELECTED: &str = "selected";

    pub const ICON_PREFIX: &str = "icons/";
    pub const POSTER_PREFIX: &str = "posters/";
    pub const ASSET_ROOT: &str = "images/";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Era {
    Dropdown,
    Named,
    Typed,
    Current,
}

/// Every version ever released, with the layout it wrote.
const SHIPPED: [(&str, Era); 7] = [
    ("0.1.0", Era::Dropdown),
    ("0.1.1", Era::Dropdown),
    ("0.2.0", Era::Named),
    ("0.2.1", Era::Named),
    ("0.3.0", Era::Typed),
    ("0.3.1", Era::Typed),
    (CURRENT_VERSION, Era::Current),
];

/// Built-ins that were removed from the defaults. A stored theme is only
/// dropped when both its name and its colors still match, so user edits and
/// look-alikes survive.
const DEPRECATED_BUILTINS: [(&str, [&str; 5]); 4] = [
    ("Olympic", ["#0000ff", "#fff000", "#000000", "#096600", "#ff0000"]),
    ("Oreo", ["#222", "#fff", "#222", "#fff", "#222"]),
    ("grey", ["#111", "#555", "#888", "#bbb", "#eee"]),
    ("cherry", ["#311", "#755", "#a88", "#dbb", "#fee"]),
];

const DURABLE_KEYS: [&str; 4] = [keys::VERSION, keys::THEMES, keys::SELECTED_ID, keys::NEXT_ID];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("stored data has version {0}, which this release can not upgrade")]
    UnsupportedVersion(String),

    #[error("stored data is already at version {0}")]
    AlreadyCurrent(String),

    #[error("invalid version string {0:?}")]
    InvalidVersion(String),

    #[error("stored `{key}` is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

impl MigrationError {
    fn malformed(key: &str, reason: impl Into<String>) -> Self {
        MigrationError::Malformed {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Raw contents of both storage scopes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistedState {
    pub durable: Map<String, Value>,
    pub local: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Migrator;

impl Migrator {
    pub fn new() -> Self {
        Self
    }

    /// Whether data stamped with `version` has to go through [`Migrator::migrate`].
    pub fn needs_migration(&self, version: &str) -> Result<bool, MigrationError> {
        let current: SchemaVersion = CURRENT_VERSION.parse()?;
        let stored: SchemaVersion = version.parse()?;
        Ok(stored != current)
    }

    /// Upgrade a snapshot written by `old_version`.
    ///
    /// The result holds only current keys: the durable scope is stamped with
    /// [`CURRENT_VERSION`] and the local scope keeps uploaded assets only.
    pub fn migrate(
        &self,
        old_version: &str,
        mut state: PersistedState,
    ) -> Result<PersistedState, MigrationError> {
        let current: SchemaVersion = CURRENT_VERSION.parse()?;
        let old: SchemaVersion = old_version.parse()?;

        if old > current {
            return Err(MigrationError::UnsupportedVersion(old.to_string()));
        }
        if old == current || is_stamped(&state.durable, &current) {
            return Err(MigrationError::AlreadyCurrent(current.to_string()));
        }

        let era = SHIPPED
            .iter()
            .find(|(v, _)| v.parse::<SchemaVersion>().is_ok_and(|v| v == old))
            .map(|(_, era)| *era)
            .ok_or_else(|| MigrationError::UnsupportedVersion(old.to_string()))?;

        log::info!("migrating stored data from {} to {}", old, current);

        if era <= Era::Dropdown {
            dropdown_to_named(&mut state.durable);
        }
        if era <= Era::Named {
            named_to_typed(&mut state.durable)?;
        }
        if era <= Era::Typed {
            typed_to_current(&mut state)?;
        }

        state.durable.retain(|k, _| DURABLE_KEYS.contains(&k.as_str()));
        state.local.retain(|k, _| keys::LOCAL_ASSET_KEYS.contains(&k.as_str()));
        state
            .durable
            .insert(keys::VERSION.to_string(), Value::from(current.to_string()));

        Ok(state)
    }
}

fn is_stamped(durable: &Map<String, Value>, version: &SchemaVersion) -> bool {
    durable
        .get(keys::VERSION)
        .and_then(Value::as_str)
        .and_then(|v| v.parse::<SchemaVersion>().ok())
        .is_some_and(|v| v == *version)
}

fn rename(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.insert(to.to_string(), value);
    }
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>, MigrationError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(MigrationError::malformed(
            key,
            format!("expected a list, found {}", other),
        )),
    }
}

fn dropdown_to_named(durable: &mut Map<String, Value>) {
    rename(durable, legacy::DROPDOWN_ALL, legacy::NAMED_ALL);
    rename(durable, legacy::DROPDOWN_SELECTED, legacy::NAMED_SELECTED);
}

fn named_to_typed(durable: &mut Map<String, Value>) -> Result<(), MigrationError> {
    let themes = take_array(durable, legacy::NAMED_ALL)?;
    let mut typed = Vec::with_capacity(themes.len());

    for theme in themes {
        let Value::Object(theme) = theme else {
            return Err(MigrationError::malformed(legacy::NAMED_ALL, "theme is not an object"));
        };

        let name = theme.get("name").and_then(Value::as_str);
        let colors = match theme.get("colors") {
            Some(Value::Array(colors)) => colors
                .iter()
                .map(|c| c.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    MigrationError::malformed(legacy::NAMED_ALL, "colors must be strings")
                })?,
            _ => Vec::new(),
        };

        if is_deprecated(name, &colors) {
            log::info!("dropping deprecated built-in theme {:?}", name.unwrap_or_default());
            continue;
        }

        // stored highest intensity first
        let patterns: Vec<String> = colors.into_iter().rev().collect();
        let thresholds = upgrade_thresholds(theme.get("thresholds"), Some(patterns.len()));

        typed.push(json!({
            "name": name,
            "type": "chroma",
            "thresholds": thresholds,
            "patterns": patterns,
        }));
    }

    durable.insert(keys::THEMES.to_string(), Value::Array(typed));
    rename(durable, legacy::NAMED_SELECTED, legacy::TYPED_SELECTED);
    Ok(())
}

fn is_deprecated(name: Option<&str>, colors: &[String]) -> bool {
    DEPRECATED_BUILTINS.iter().any(|(builtin, builtin_colors)| {
        name == Some(*builtin)
            && colors.len() == builtin_colors.len()
            && colors
                .iter()
                .zip(builtin_colors)
                .all(|(a, b)| normalize_color(a) == normalize_color(b))
    })
}

/// Thresholds in the current wire form. Old lower-bound lists become ranges.
/// Anything that does not fit the palette size falls back to detection;
/// `buckets` is `None` for posters, which take any valid ranges.
fn upgrade_thresholds(raw: Option<&Value>, buckets: Option<usize>) -> Value {
    let detect = || Value::from(DETECT_SENTINEL);

    let Some(Value::Array(items)) = raw else {
        return detect();
    };

    let parsed = if !items.is_empty() && items.iter().all(Value::is_array) {
        serde_json::from_value::<Thresholds>(Value::Array(items.clone())).ok()
    } else {
        items
            .iter()
            .map(|b| b.as_u64().and_then(|b| u32::try_from(b).ok()))
            .collect::<Option<Vec<_>>>()
            .and_then(|b| Thresholds::from_lower_bounds(&b).ok())
    };

    let converted = parsed
        .filter(|t| buckets.is_none_or(|n| t.bucket_count() == Some(n)))
        .and_then(|t| serde_json::to_value(t).ok());

    converted.unwrap_or_else(|| {
        log::warn!(
            "dropping unusable legacy thresholds {}; they will be detected",
            Value::Array(items.clone())
        );
        detect()
    })
}

fn upgrade_asset_path(path: &str) -> String {
    if path.starts_with(legacy::ICON_PREFIX) || path.starts_with(legacy::POSTER_PREFIX) {
        format!("{}{}", legacy::ASSET_ROOT, path)
    } else {
        path.to_string()
    }
}

fn typed_to_current(state: &mut PersistedState) -> Result<(), MigrationError> {
    let durable = &mut state.durable;
    let mut themes = take_array(durable, keys::THEMES)?;

    let mut next_id = themes
        .iter()
        .filter_map(|t| t.get("id").and_then(Value::as_u64))
        .max()
        .unwrap_or(0)
        + 1;

    for theme in themes.iter_mut() {
        let Value::Object(theme) = theme else {
            return Err(MigrationError::malformed(keys::THEMES, "theme is not an object"));
        };

        if theme.get("id").and_then(Value::as_u64).is_none() {
            theme.insert("id".to_string(), Value::from(next_id));
            next_id += 1;
        }

        if !theme.contains_key("type") {
            let kind = if theme.contains_key("poster") { "poster" } else { "chroma" };
            theme.insert("type".to_string(), Value::from(kind));
        }

        let buckets = theme
            .get("patterns")
            .and_then(Value::as_array)
            .map(Vec::len);
        let thresholds = upgrade_thresholds(theme.get("thresholds"), buckets);
        theme.insert("thresholds".to_string(), thresholds);

        if let Some(Value::Array(patterns)) = theme.get_mut("patterns") {
            for pattern in patterns.iter_mut() {
                if let Value::String(path) = pattern {
                    *path = upgrade_asset_path(path);
                }
            }
        }
        if let Some(Value::String(poster)) = theme.get_mut("poster") {
            *poster = upgrade_asset_path(poster);
        }
    }

    let selected_id = match durable.remove(legacy::TYPED_SELECTED) {
        Some(Value::String(name)) if !name.is_empty() => themes
            .iter()
            .find(|t| t.get("name").and_then(Value::as_str) == Some(name.as_str()))
            .and_then(|t| t.get("id").cloned())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    };

    if let Some(icons) = durable.remove(legacy::USER_ICONS) {
        move_user_icons(icons, &mut state.local)?;
    }

    durable.insert(keys::THEMES.to_string(), Value::Array(themes));
    durable.insert(keys::SELECTED_ID.to_string(), selected_id);
    durable.insert(keys::NEXT_ID.to_string(), Value::from(next_id));
    Ok(())
}

/// Move `[[timestamp, dataURL], ...]` from synced storage into the local
/// uploaded icon list.
fn move_user_icons(icons: Value, local: &mut Map<String, Value>) -> Result<(), MigrationError> {
    let icons = match icons {
        Value::Null => return Ok(()),
        Value::Array(icons) => icons,
        _ => return Err(MigrationError::malformed(legacy::USER_ICONS, "expected a list")),
    };

    let uploaded = local
        .entry(keys::UPLOADED_ICONS)
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(uploaded) = uploaded else {
        return Err(MigrationError::malformed(keys::UPLOADED_ICONS, "expected a list"));
    };

    for icon in icons {
        let (stamp, data) = match icon.as_array().map(Vec::as_slice) {
            Some([stamp, Value::String(data)]) => (stamp.clone(), data.clone()),
            _ => {
                return Err(MigrationError::malformed(
                    legacy::USER_ICONS,
                    "entries must be [timestamp, dataURL] pairs",
                ));
            }
        };

        let stamp = stamp
            .as_i64()
            .or_else(|| stamp.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| MigrationError::malformed(legacy::USER_ICONS, "bad timestamp"))?;

        let id = AssetKind::Icon.identifier(stamp);
        // a retried upgrade may find the icon already moved
        if uploaded.iter().any(|e| e.get(0).and_then(Value::as_str) == Some(id.as_str())) {
            continue;
        }
        uploaded.push(json!([id, data]));
    }

    Ok(())
}
