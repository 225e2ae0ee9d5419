use crate::domain::{Pattern, PosterRef, ThemeError, Thresholds, POSTER_DIR};
use std::fmt;
use std::str::FromStr;

pub type ThemeId = u64;

/// Legend size of the calendars seen so far. Only used to size synthesized
/// pattern lists while thresholds are still undetected.
pub const DEFAULT_LEGEND_SLOTS: usize = 5;

/// Neutral color filling freshly created chroma themes.
pub const PLACEHOLDER_COLOR: &str = "#eeeeee";

pub fn default_poster() -> PosterRef {
    PosterRef::Bundled(format!("{}starry-night.jpg", POSTER_DIR))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeKind {
    Chroma,
    Poster,
}

impl ThemeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeKind::Chroma => "chroma",
            ThemeKind::Poster => "poster",
        }
    }

    /// The other kind, used by the flip action.
    pub fn flipped(&self) -> Self {
        match self {
            ThemeKind::Chroma => ThemeKind::Poster,
            ThemeKind::Poster => ThemeKind::Chroma,
        }
    }
}

impl fmt::Display for ThemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeKind {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chroma" => Ok(ThemeKind::Chroma),
            "poster" => Ok(ThemeKind::Poster),
            other => Err(ThemeError::Validation {
                field: "type",
                reason: format!("has unknown value {:?}", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromaData {
    pub patterns: Vec<Pattern>,
}

impl ChromaData {
    pub fn placeholder(slots: usize) -> Self {
        Self {
            patterns: vec![Pattern::Color(PLACEHOLDER_COLOR.to_string()); slots],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PosterData {
    pub poster: Option<PosterRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Chroma(ChromaData),
    Poster(PosterData),
}

impl Variant {
    pub fn kind(&self) -> ThemeKind {
        match self {
            Variant::Chroma(_) => ThemeKind::Chroma,
            Variant::Poster(_) => ThemeKind::Poster,
        }
    }
}

/// Payload of the inactive variant, kept so a flip back restores it.
#[derive(Debug, Clone, Default)]
struct Shelf {
    chroma: Option<ChromaData>,
    poster: Option<PosterData>,
}

#[derive(Debug, Clone)]
pub struct Theme {
    id: Option<ThemeId>,
    name: String,
    thresholds: Thresholds,
    variant: Variant,
    shelf: Shelf,
}

impl Theme {
    pub fn chroma(
        name: impl Into<String>,
        id: Option<ThemeId>,
        slots: usize,
    ) -> Result<Self, ThemeError> {
        Self::build(
            name.into(),
            id,
            Thresholds::Detect,
            Variant::Chroma(ChromaData::placeholder(slots)),
        )
    }

    pub fn poster(name: impl Into<String>, id: Option<ThemeId>) -> Result<Self, ThemeError> {
        Self::build(
            name.into(),
            id,
            Thresholds::Detect,
            Variant::Poster(PosterData::default()),
        )
    }

    /// Assemble a theme from already parsed parts, enforcing the cross-field
    /// invariants.
    pub fn from_parts(
        name: impl Into<String>,
        id: Option<ThemeId>,
        thresholds: Thresholds,
        variant: Variant,
    ) -> Result<Self, ThemeError> {
        if let Variant::Chroma(chroma) = &variant {
            if chroma.patterns.is_empty() {
                return Err(ThemeError::missing("patterns"));
            }
        }

        let theme = Self::build(name.into(), id, thresholds, variant)?;
        theme.check_bucket_count(&theme.thresholds)?;
        Ok(theme)
    }

    fn build(
        name: String,
        id: Option<ThemeId>,
        thresholds: Thresholds,
        variant: Variant,
    ) -> Result<Self, ThemeError> {
        if name.trim().is_empty() {
            return Err(ThemeError::missing("name"));
        }

        Ok(Self {
            id,
            name,
            thresholds,
            variant,
            shelf: Shelf::default(),
        })
    }

    pub fn id(&self) -> Option<ThemeId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ThemeId) {
        self.id = Some(id);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ThemeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ThemeError::missing("name"));
        }
        self.name = name;
        Ok(())
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<(), ThemeError> {
        self.check_bucket_count(&thresholds)?;
        self.thresholds = thresholds;
        Ok(())
    }

    pub fn kind(&self) -> ThemeKind {
        self.variant.kind()
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn patterns(&self) -> Option<&[Pattern]> {
        match &self.variant {
            Variant::Chroma(chroma) => Some(&chroma.patterns),
            Variant::Poster(_) => None,
        }
    }

    pub fn poster_ref(&self) -> Option<&PosterRef> {
        match &self.variant {
            Variant::Poster(poster) => poster.poster.as_ref(),
            Variant::Chroma(_) => None,
        }
    }

    /// Whether the theme carries everything needed to be persisted.
    pub fn is_complete(&self) -> bool {
        match &self.variant {
            Variant::Chroma(chroma) => !chroma.patterns.is_empty(),
            Variant::Poster(poster) => poster.poster.is_some(),
        }
    }

    /// Switch between chroma and poster in place. Id, name and thresholds are
    /// untouched; the target payload comes back from the shelf when the theme
    /// has been that kind before, and is synthesized otherwise.
    pub fn set_variant(&mut self, target: ThemeKind) {
        if self.kind() == target {
            return;
        }

        let buckets = self.thresholds.bucket_count();
        let next = match target {
            ThemeKind::Chroma => {
                let shelved = self
                    .shelf
                    .chroma
                    .take()
                    .filter(|c| buckets.is_none_or(|n| n == c.patterns.len()));
                Variant::Chroma(shelved.unwrap_or_else(|| {
                    log::info!("theme {:?} has no earlier palette, using placeholders", self.name);
                    ChromaData::placeholder(buckets.unwrap_or(DEFAULT_LEGEND_SLOTS))
                }))
            }
            ThemeKind::Poster => {
                let shelved = self.shelf.poster.take().filter(|p| p.poster.is_some());
                Variant::Poster(shelved.unwrap_or(PosterData {
                    poster: Some(default_poster()),
                }))
            }
        };

        match std::mem::replace(&mut self.variant, next) {
            Variant::Chroma(chroma) => self.shelf.chroma = Some(chroma),
            Variant::Poster(poster) => self.shelf.poster = Some(poster),
        }

        log::debug!("theme {:?} switched to {}", self.name, target);
    }

    /// Replace one bucket pattern.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the pattern count.
    pub fn set_pattern(&mut self, index: usize, pattern: Pattern) -> Result<(), ThemeError> {
        match &mut self.variant {
            Variant::Chroma(chroma) => {
                let len = chroma.patterns.len();
                assert!(
                    index < len,
                    "pattern index {} out of range for {} patterns",
                    index,
                    len
                );
                chroma.patterns[index] = pattern;
                Ok(())
            }
            Variant::Poster(_) => Err(ThemeError::WrongVariant {
                expected: ThemeKind::Chroma,
                actual: ThemeKind::Poster,
            }),
        }
    }

    pub fn set_poster(&mut self, poster: PosterRef) -> Result<(), ThemeError> {
        match &mut self.variant {
            Variant::Poster(data) => {
                data.poster = Some(poster);
                Ok(())
            }
            Variant::Chroma(_) => Err(ThemeError::WrongVariant {
                expected: ThemeKind::Poster,
                actual: ThemeKind::Chroma,
            }),
        }
    }

    /// Copy of the theme without identity, as a template for a new one.
    pub fn duplicate(&self) -> Self {
        Self {
            id: None,
            name: self.name.clone(),
            thresholds: self.thresholds.clone(),
            variant: self.variant.clone(),
            shelf: Shelf::default(),
        }
    }

    fn check_bucket_count(&self, thresholds: &Thresholds) -> Result<(), ThemeError> {
        if let (Some(buckets), Some(patterns)) = (thresholds.bucket_count(), self.patterns()) {
            if buckets != patterns.len() {
                return Err(ThemeError::InvalidThresholds(format!(
                    "{} ranges for {} patterns",
                    buckets,
                    patterns.len()
                )));
            }
        }
        Ok(())
    }
}
