use crate::domain::ThemeError;
use std::fmt;
use std::str::FromStr;

/// Prefix of identifiers that point into the uploaded asset lists.
pub const STORAGE_MARKER: &str = "@storage/";

/// Directory of bundled icon files.
pub const ICON_DIR: &str = "images/icons/";

/// Directory of bundled poster images.
pub const POSTER_DIR: &str = "images/posters/";

const DATA_URL_PREFIX: &str = "data:image/";
const CSS_COLOR_FUNCTIONS: [&str; 4] = ["rgb(", "rgba(", "hsl(", "hsla("];

/// What is painted into one calendar bucket of a chroma theme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Solid css color, e.g. `#196127` or `hsl(120, 50%, 40%)`.
    Color(String),
    /// Bundled icon file, e.g. `images/icons/flower.png`.
    Icon(String),
    /// Inline image, `data:image/...`.
    DataUrl(String),
    /// Uploaded icon, resolved through the asset library.
    Stored(String),
}

impl Pattern {
    pub fn color(css: impl Into<String>) -> Result<Self, ThemeError> {
        let css = css.into();
        if is_css_color(&css) {
            Ok(Pattern::Color(css))
        } else {
            Err(ThemeError::InvalidPattern(css))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Color(s) | Pattern::Icon(s) | Pattern::DataUrl(s) | Pattern::Stored(s) => s,
        }
    }

    /// Kind label used in listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Pattern::Color(_) => "color",
            Pattern::Icon(_) => "icon",
            Pattern::DataUrl(_) => "dataURL",
            Pattern::Stored(_) => "upload",
        }
    }
}

impl FromStr for Pattern {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_css_color(s) {
            Ok(Pattern::Color(s.to_string()))
        } else if s.starts_with(DATA_URL_PREFIX) {
            Ok(Pattern::DataUrl(s.to_string()))
        } else if s.starts_with(STORAGE_MARKER) && s.len() > STORAGE_MARKER.len() {
            Ok(Pattern::Stored(s.to_string()))
        } else if s.starts_with(ICON_DIR) && s.len() > ICON_DIR.len() {
            Ok(Pattern::Icon(s.to_string()))
        } else {
            Err(ThemeError::InvalidPattern(s.to_string()))
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image shown by a poster theme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PosterRef {
    /// Shipped with the extension, resolved to a static url.
    Bundled(String),
    /// Uploaded by the user; kept out of synced storage and looked up lazily.
    Stored(String),
}

impl PosterRef {
    pub fn as_str(&self) -> &str {
        match self {
            PosterRef::Bundled(s) | PosterRef::Stored(s) => s,
        }
    }
}

impl FromStr for PosterRef {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(STORAGE_MARKER) && s.len() > STORAGE_MARKER.len() {
            Ok(PosterRef::Stored(s.to_string()))
        } else if s.starts_with(POSTER_DIR) && s.len() > POSTER_DIR.len() {
            Ok(PosterRef::Bundled(s.to_string()))
        } else {
            Err(ThemeError::InvalidPoster(s.to_string()))
        }
    }
}

impl fmt::Display for PosterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_css_color(s: &str) -> bool {
    if let Some(hex) = s.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }

    let lower = s.to_ascii_lowercase();
    CSS_COLOR_FUNCTIONS
        .iter()
        .any(|func| lower.starts_with(func) && lower.ends_with(')'))
}
