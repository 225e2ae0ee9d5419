use crate::domain::{builtin_themes, template_theme, IdAllocator, Theme, ThemeError, ThemeId};
use crate::infrastructure::{
    keys, AssetLibrary, HookRegistry, KeyValueStore, MigrationError, Migrator, PersistedState,
    RenderContext, Scope, CURRENT_VERSION,
};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("can not upgrade stored themes: {0}")]
    Migration(#[from] MigrationError),

    #[error("no theme with id {0}")]
    UnknownTheme(ThemeId),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// The user's themes, in display order, plus the selection.
///
/// Every mutation rewrites the whole envelope in the durable scope.
pub struct ThemeRegistry {
    store: Box<dyn KeyValueStore>,
    themes: Vec<Theme>,
    selected_id: Option<ThemeId>,
    ids: IdAllocator,
    hooks: HookRegistry,
}

impl ThemeRegistry {
    pub fn load(store: Box<dyn KeyValueStore>) -> Result<Self, RegistryError> {
        Self::load_with_hooks(store, HookRegistry::new())
    }

    /// Read the stored registry, seeding built-ins on first run and upgrading
    /// data written by older releases. Any invalid theme record fails the
    /// whole load.
    pub fn load_with_hooks(
        store: Box<dyn KeyValueStore>,
        hooks: HookRegistry,
    ) -> Result<Self, RegistryError> {
        let version = store.get(Scope::Durable, keys::VERSION)?;

        let mut registry = Self {
            store,
            themes: Vec::new(),
            selected_id: None,
            ids: IdAllocator::new(1),
            hooks,
        };

        match version {
            None => registry.seed()?,
            Some(Value::String(version)) => {
                let migrator = Migrator::new();
                if migrator.needs_migration(&version)? {
                    registry.migrate(&migrator, &version)?;
                }
                registry.read_envelope()?;
            }
            Some(other) => {
                return Err(ThemeError::Validation {
                    field: "version",
                    reason: format!("expected a string, found {}", other),
                }
                .into());
            }
        }

        log::debug!(
            "loaded {} themes from {}",
            registry.themes.len(),
            registry.store.backend_info()
        );
        Ok(registry)
    }

    fn seed(&mut self) -> Result<(), RegistryError> {
        let mut themes = builtin_themes()?;
        for (id, theme) in (1..).zip(themes.iter_mut()) {
            theme.set_id(id);
        }

        self.ids = IdAllocator::new(themes.len() as ThemeId + 1);
        self.themes = themes;
        self.selected_id = None;

        log::info!("first run, seeding {} built-in themes", self.themes.len());
        self.save()
    }

    /// Upgrade both scopes in place. New keys are written before stale ones
    /// are removed, so a failed write leaves the old data loadable.
    fn migrate(&self, migrator: &Migrator, version: &str) -> Result<(), RegistryError> {
        let state = PersistedState {
            durable: self.store.snapshot(Scope::Durable)?,
            local: self.store.snapshot(Scope::Local)?,
        };
        let old_durable: Vec<String> = state.durable.keys().cloned().collect();
        let old_local: Vec<String> = state.local.keys().cloned().collect();

        let migrated = migrator.migrate(version, state)?;
        let stale_durable = stale_keys(old_durable, &migrated.durable);
        let stale_local = stale_keys(old_local, &migrated.local);

        // local first: the durable write carries the version stamp
        self.store.set_many(Scope::Local, migrated.local)?;
        self.store.set_many(Scope::Durable, migrated.durable)?;

        for key in &stale_durable {
            self.store.remove(Scope::Durable, key)?;
        }
        for key in &stale_local {
            self.store.remove(Scope::Local, key)?;
        }
        Ok(())
    }

    fn read_envelope(&mut self) -> Result<(), RegistryError> {
        let durable = self.store.snapshot(Scope::Durable)?;

        let records = match durable.get(keys::THEMES) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(records)) => records.clone(),
            Some(other) => {
                return Err(ThemeError::Validation {
                    field: "themes",
                    reason: format!("expected a list, found {}", other),
                }
                .into());
            }
        };

        let themes = records
            .into_iter()
            .map(Theme::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for theme in &themes {
            let id = theme.id().ok_or_else(|| ThemeError::missing("id"))?;
            if !seen.insert(id) {
                return Err(ThemeError::Validation {
                    field: "id",
                    reason: format!("{} is used by more than one theme", id),
                }
                .into());
            }
        }

        let stored_next = durable
            .get(keys::NEXT_ID)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mut ids = IdAllocator::new(stored_next);
        if let Some(&max_id) = seen.iter().max() {
            if stored_next <= max_id {
                log::warn!(
                    "stored next_id {} is not above existing id {}; continuing from {}",
                    stored_next,
                    max_id,
                    max_id + 1
                );
                ids.reserve_past(max_id);
            }
        }

        let selected_id = match durable.get(keys::SELECTED_ID).and_then(Value::as_u64) {
            Some(id) if !seen.contains(&id) => {
                log::warn!("selected theme {} does not exist, clearing selection", id);
                None
            }
            selected => selected,
        };

        self.themes = themes;
        self.selected_id = selected_id;
        self.ids = ids;
        Ok(())
    }

    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    pub fn get(&self, id: ThemeId) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id() == Some(id))
    }

    pub fn selected_id(&self) -> Option<ThemeId> {
        self.selected_id
    }

    pub fn selected(&self) -> Option<&Theme> {
        self.selected_id.and_then(|id| self.get(id))
    }

    /// Id the next added theme will get.
    pub fn next_id(&self) -> ThemeId {
        self.ids.peek()
    }

    pub fn assets(&self) -> AssetLibrary<'_> {
        AssetLibrary::new(self.store.as_ref())
    }

    fn position(&self, id: ThemeId) -> Result<usize, RegistryError> {
        self.themes
            .iter()
            .position(|t| t.id() == Some(id))
            .ok_or(RegistryError::UnknownTheme(id))
    }

    /// Append a copy of `base` under a fresh id.
    pub fn add(&mut self, base: &Theme) -> Result<&Theme, RegistryError> {
        let mut theme = base.duplicate();
        if !theme.is_complete() {
            return Err(ThemeError::missing("poster").into());
        }

        let id = self.ids.next(self.store.as_ref())?;
        theme.set_id(id);

        let index = self.themes.len();
        self.themes.push(theme);
        if let Err(e) = self.save() {
            // the allocated id is not handed out again
            self.themes.pop();
            return Err(e);
        }

        log::info!("added theme {} ({:?})", id, self.themes[index].name());
        Ok(&self.themes[index])
    }

    /// Append a copy of the built-in template.
    pub fn add_default(&mut self) -> Result<&Theme, RegistryError> {
        let template = template_theme()?;
        self.add(&template)
    }

    pub fn delete(&mut self, id: ThemeId) -> Result<Theme, RegistryError> {
        let index = self.position(id)?;
        let removed = self.themes.remove(index);

        let was_selected = self.selected_id == Some(id);
        if was_selected {
            self.selected_id = None;
        }
        if let Err(e) = self.save() {
            self.themes.insert(index, removed);
            if was_selected {
                self.selected_id = Some(id);
            }
            return Err(e);
        }

        if was_selected {
            self.store.remove(Scope::Local, keys::ACTIVE_THEME)?;
            self.hooks.execute_clear_hooks();
        }

        log::info!("deleted theme {} ({:?})", id, removed.name());
        Ok(removed)
    }

    /// Make a theme the active one and hand it to the renderers.
    pub fn select(&mut self, id: ThemeId) -> Result<(), RegistryError> {
        let index = self.position(id)?;
        let previous = self.selected_id.replace(id);
        if let Err(e) = self.save() {
            self.selected_id = previous;
            return Err(e);
        }
        self.apply(index)
    }

    /// Edit a theme in place. The edit is discarded if the closure fails.
    /// The selected theme is re-applied afterwards.
    pub fn update<F>(&mut self, id: ThemeId, edit: F) -> Result<&Theme, RegistryError>
    where
        F: FnOnce(&mut Theme) -> Result<(), ThemeError>,
    {
        let index = self.position(id)?;

        let mut theme = self.themes[index].clone();
        edit(&mut theme)?;
        if !theme.is_complete() {
            return Err(ThemeError::missing("poster").into());
        }

        let previous = std::mem::replace(&mut self.themes[index], theme);
        if let Err(e) = self.save() {
            self.themes[index] = previous;
            return Err(e);
        }

        if self.selected_id == Some(id) {
            self.apply(index)?;
        }
        Ok(&self.themes[index])
    }

    fn apply(&self, index: usize) -> Result<(), RegistryError> {
        let theme = &self.themes[index];
        let record = theme.to_record();

        self.store
            .set(Scope::Local, keys::ACTIVE_THEME, theme.to_value()?)?;

        if let Some(theme_id) = theme.id() {
            self.hooks.execute_render_hooks(&RenderContext {
                theme_id,
                record,
                applied_at: Utc::now(),
            });
        }
        Ok(())
    }

    /// Rewrite the whole envelope.
    pub fn save(&self) -> Result<(), RegistryError> {
        if let Some(theme) = self.themes.iter().find(|t| !t.is_complete()) {
            return Err(ThemeError::Validation {
                field: "poster",
                reason: format!("is missing on theme {:?}", theme.name()),
            }
            .into());
        }

        let records = self
            .themes
            .iter()
            .map(Theme::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let mut envelope = Map::new();
        envelope.insert(keys::VERSION.to_string(), Value::from(CURRENT_VERSION));
        envelope.insert(keys::THEMES.to_string(), Value::Array(records));
        envelope.insert(
            keys::SELECTED_ID.to_string(),
            self.selected_id.map_or(Value::Null, Value::from),
        );
        envelope.insert(keys::NEXT_ID.to_string(), Value::from(self.ids.peek()));

        self.store.set_many(Scope::Durable, envelope)?;
        log::debug!("saved {} themes", self.themes.len());
        Ok(())
    }

    /// Forget everything: both storage scopes and the in-memory state.
    pub fn clear(&mut self) -> Result<(), RegistryError> {
        self.store.clear(Scope::Durable)?;
        self.store.clear(Scope::Local)?;

        self.themes.clear();
        self.selected_id = None;
        self.ids = IdAllocator::new(1);
        self.hooks.execute_clear_hooks();

        log::info!("cleared all stored data");
        Ok(())
    }
}

fn stale_keys(old: Vec<String>, current: &Map<String, Value>) -> Vec<String> {
    old.into_iter()
        .filter(|key| !current.contains_key(key))
        .collect()
}
