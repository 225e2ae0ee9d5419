use crate::domain::{
    classify, detect_thresholds, CalendarPage, ClassifyError, DetectError, Pattern, PosterRef,
    Theme, ThemeId, Thresholds,
};
use crate::infrastructure::{AssetKind, AssetLibrary};
use anyhow::Result;
use std::collections::HashMap;

/// Per-session caches: thresholds detected from the page, and poster urls
/// that have already been resolved. Dropped or [`reset`](Session::reset)
/// whenever the registry is reloaded.
#[derive(Debug, Default)]
pub struct Session {
    asset_base_url: String,
    detected: Option<Thresholds>,
    posters: HashMap<(ThemeId, PosterRef), String>,
}

impl Session {
    pub fn new(asset_base_url: impl Into<String>) -> Self {
        Self {
            asset_base_url: asset_base_url.into(),
            detected: None,
            posters: HashMap::new(),
        }
    }

    /// Scan the page once; later calls return the cached result without
    /// touching the page. A failed scan caches nothing.
    pub fn detect_thresholds(
        &mut self,
        page: &dyn CalendarPage,
    ) -> Result<&Thresholds, DetectError> {
        let thresholds = match self.detected.take() {
            Some(cached) => {
                log::debug!("using cached thresholds {}", cached);
                cached
            }
            None => {
                let detected = detect_thresholds(page)?;
                log::info!("detected thresholds {}", detected);
                detected
            }
        };

        Ok(self.detected.insert(thresholds))
    }

    /// Bucket of `count` under the theme's own thresholds, or the detected
    /// ones when the theme defers to detection. A palette must have one
    /// pattern per detected legend color.
    pub fn classify(&self, theme: &Theme, count: u32) -> Result<usize, ClassifyError> {
        match theme.thresholds() {
            Thresholds::Detect => {
                let detected = self.detected.as_ref().ok_or(ClassifyError::NotReady)?;
                let patterns = theme.patterns().map(<[Pattern]>::len);
                if let (Some(legend), Some(patterns)) = (detected.bucket_count(), patterns) {
                    if legend != patterns {
                        log::warn!(
                            "there are {} legend colors but theme {:?} has {} patterns",
                            legend,
                            theme.name(),
                            patterns
                        );
                        return Err(ClassifyError::LegendMismatch { legend, patterns });
                    }
                }
                classify(count, detected)
            }
            resolved => classify(count, resolved),
        }
    }

    /// Pattern painted for `count`; `None` for poster themes.
    pub fn bucket_pattern<'t>(
        &self,
        theme: &'t Theme,
        count: u32,
    ) -> Result<Option<&'t Pattern>, ClassifyError> {
        let bucket = self.classify(theme, count)?;
        Ok(theme.patterns().and_then(|patterns| patterns.get(bucket)))
    }

    /// Url of a poster theme's image. Bundled images map to a static url;
    /// uploads are looked up in the asset library. An upload that has since
    /// been deleted resolves to `None`.
    pub fn resolve_poster(
        &mut self,
        theme: &Theme,
        assets: &AssetLibrary<'_>,
    ) -> Result<Option<String>> {
        let Some(poster) = theme.poster_ref() else {
            return Ok(None);
        };

        let key = theme.id().map(|id| (id, poster.clone()));
        if let Some(url) = key.as_ref().and_then(|k| self.posters.get(k)) {
            return Ok(Some(url.clone()));
        }

        let url = match poster {
            PosterRef::Bundled(path) => Some(format!(
                "{}/{}",
                self.asset_base_url.trim_end_matches('/'),
                path
            )),
            PosterRef::Stored(id) => {
                let found = assets.find(AssetKind::Poster, id)?;
                if found.is_none() {
                    log::warn!("poster {} of theme {:?} no longer exists", id, theme.name());
                }
                found
            }
        };

        if let (Some(key), Some(url)) = (key, &url) {
            self.posters.insert(key, url.clone());
        }

        Ok(url)
    }

    pub fn reset(&mut self) {
        self.detected = None;
        self.posters.clear();
    }
}
