use crate::application::Config;
use crate::domain::{
    CalendarPage, Pattern, RegistryError, Session, Theme, ThemeId, ThemeRegistry, Thresholds,
};
use crate::infrastructure::{
    ActivityLogHook, DuckDbStore, HookRegistry, KeyValueStore, RenderHook,
};
use anyhow::{Context, Result, anyhow};

/// Outcome of classifying one contribution count.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub theme_id: ThemeId,
    pub bucket: usize,
    pub pattern: Option<Pattern>,
}

pub struct ThemeApp {
    registry: ThemeRegistry,
    session: Session,
    config: Config,
}

impl ThemeApp {
    pub fn new() -> Result<Self> {
        Self::with_default_plugins(Config::from_env())
    }

    pub fn with_default_plugins(config: Config) -> Result<Self> {
        // Set up hook registry with default plugins
        let mut hooks = HookRegistry::new();
        hooks.register_defaults([
            Box::new(ActivityLogHook::new(config.activity_log.clone())) as Box<dyn RenderHook>,
        ]);
        log::debug!("render hooks: {:?}", hooks.list_hooks());

        let store = Self::open_store(&config)?;
        Self::with_store(config, Box::new(store), hooks)
    }

    pub fn without_plugins(config: Config) -> Result<Self> {
        let store = Self::open_store(&config)?;
        Self::with_store(config, Box::new(store), HookRegistry::new())
    }

    pub fn with_store(
        config: Config,
        store: Box<dyn KeyValueStore>,
        hooks: HookRegistry,
    ) -> Result<Self> {
        let registry = ThemeRegistry::load_with_hooks(store, hooks)?;
        let session = Session::new(config.asset_base_url.clone());

        Ok(Self {
            registry,
            session,
            config,
        })
    }

    fn open_store(config: &Config) -> Result<DuckDbStore> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory {}", config.data_dir.display())
        })?;
        DuckDbStore::new(&config.db_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ThemeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ThemeRegistry {
        &mut self.registry
    }

    fn theme(&self, id: ThemeId) -> Result<&Theme> {
        self.registry
            .get(id)
            .ok_or_else(|| RegistryError::UnknownTheme(id).into())
    }

    pub fn detect(&mut self, page: &dyn CalendarPage) -> Result<Thresholds> {
        Ok(self.session.detect_thresholds(page)?.clone())
    }

    /// Classify `count` with the given theme, or the selected one. When a page
    /// is given its thresholds are detected first.
    pub fn classify(
        &mut self,
        count: u32,
        theme_id: Option<ThemeId>,
        page: Option<&dyn CalendarPage>,
    ) -> Result<Classification> {
        if let Some(page) = page {
            self.session.detect_thresholds(page)?;
        }

        let theme_id = theme_id
            .or(self.registry.selected_id())
            .ok_or_else(|| anyhow!("No theme given and none selected"))?;
        let theme = self.theme(theme_id)?;

        let bucket = self.session.classify(theme, count)?;
        let pattern = self.session.bucket_pattern(theme, count)?.cloned();

        Ok(Classification {
            theme_id,
            bucket,
            pattern,
        })
    }

    pub fn poster_url(&mut self, id: ThemeId) -> Result<Option<String>> {
        let theme = self
            .registry
            .get(id)
            .ok_or(RegistryError::UnknownTheme(id))?;
        self.session.resolve_poster(theme, &self.registry.assets())
    }

    /// Wipe all stored data and session caches.
    pub fn reset(&mut self) -> Result<()> {
        self.registry.clear()?;
        self.session.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::tests::FakePage;
    use crate::domain::{ClassifyError, ThemeKind};
    use crate::infrastructure::MemoryStore;
    use tempfile::TempDir;

    fn memory_app() -> ThemeApp {
        let config = Config::with_data_dir("/unused", "https://assets.example");
        ThemeApp::with_store(config, Box::new(MemoryStore::new()), HookRegistry::new()).unwrap()
    }

    #[test]
    fn test_classify_needs_a_theme() {
        let mut app = memory_app();
        assert!(app.classify(3, None, None).is_err());
    }

    #[test]
    fn test_classify_detects_from_page() {
        let mut app = memory_app();
        app.registry_mut().select(1).unwrap();

        let err = app.classify(3, None, None).unwrap_err();
        assert_eq!(err.downcast_ref::<ClassifyError>(), Some(&ClassifyError::NotReady));

        let page = FakePage::github();
        let result = app.classify(5, None, Some(&page)).unwrap();
        assert_eq!(result.theme_id, 1);
        assert_eq!(result.bucket, 2);
        assert_eq!(result.pattern.unwrap().as_str(), "#7bc96f");

        // detection is cached for the rest of the session
        app.classify(0, Some(2), Some(&page)).unwrap();
        assert_eq!(page.scans.get(), 1);
    }

    #[test]
    fn test_poster_url_for_bundled_image() {
        let mut app = memory_app();
        let poster = app
            .registry()
            .themes()
            .iter()
            .find(|t| t.kind() == ThemeKind::Poster)
            .and_then(Theme::id)
            .unwrap();

        assert_eq!(
            app.poster_url(poster).unwrap().as_deref(),
            Some("https://assets.example/images/posters/starry-night.jpg")
        );
        assert_eq!(app.poster_url(1).unwrap(), None);
        assert!(app.poster_url(999).is_err());
    }

    #[test]
    fn test_default_plugins_log_selection() {
        let dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(dir.path().join("data"), "https://assets.example");
        let log_path = config.activity_log.clone();

        let mut app = ThemeApp::with_default_plugins(config).unwrap();
        app.registry_mut().select(4).unwrap();

        let log = std::fs::read_to_string(log_path).unwrap();
        assert!(log.contains("Theme applied: #4 \"Solemn\" (chroma)"));
    }

    #[test]
    fn test_reset_reseeds_on_next_open() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");

        {
            let mut app =
                ThemeApp::without_plugins(Config::with_data_dir(&data_dir, "x")).unwrap();
            app.registry_mut().add_default().unwrap();
            app.reset().unwrap();
            assert!(app.registry().themes().is_empty());
        }

        let app = ThemeApp::without_plugins(Config::with_data_dir(&data_dir, "x")).unwrap();
        assert_eq!(app.registry().themes().len(), 7);
        assert_eq!(app.registry().next_id(), 8);
    }
}
