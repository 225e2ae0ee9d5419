use crate::domain::{
    default_poster, ChromaData, Pattern, PosterData, Theme, ThemeError, Thresholds, Variant,
    ICON_DIR, POSTER_DIR,
};

/// Built-in chroma palettes, lowest intensity first.
const CHROMA_THEMES: [(&str, [&str; 5]); 6] = [
    ("Primal", ["#eeeeee", "#c6e48b", "#7bc96f", "#239a3b", "#196127"]),
    ("Cherry", ["#eeeeee", "#f8bbd0", "#f06292", "#e91e63", "#c2185b"]),
    ("Tide", ["#eeeeee", "#c5cae9", "#9fa8da", "#5c6bc0", "#3949ab"]),
    ("Solemn", ["#eeeeee", "#bbbbbb", "#888888", "#555555", "#111111"]),
    (
        "Flower",
        ["#eeeeee", "#c6e48b", "#7bc96f", "#239a3b", "images/icons/flower.png"],
    ),
    (
        "Mario",
        [
            "#eeeeee",
            "images/icons/mario-coin.png",
            "images/icons/mario-star.png",
            "images/icons/mario-fireflower.png",
            "images/icons/mario-1up.png",
        ],
    ),
];

const POSTER_THEMES: [&str; 1] = ["Starry Night"];

/// Palette new themes start from.
const TEMPLATE: (&str, [&str; 5]) = (
    "Newbie",
    ["#eeaaaa", "#ccccaa", "#aaeeaa", "#aacccc", "#aaaaee"],
);

/// Icon files shipped with the extension.
pub const BUNDLED_ICONS: [&str; 5] = [
    "flower.png",
    "mario-1up.png",
    "mario-coin.png",
    "mario-fireflower.png",
    "mario-star.png",
];

/// Poster images shipped with the extension.
pub const BUNDLED_POSTERS: [&str; 2] = ["starry-night.jpg", "great-wave.jpg"];

pub fn bundled_icon_paths() -> Vec<String> {
    BUNDLED_ICONS
        .iter()
        .map(|f| format!("{}{}", ICON_DIR, f))
        .collect()
}

pub fn bundled_poster_paths() -> Vec<String> {
    BUNDLED_POSTERS
        .iter()
        .map(|f| format!("{}{}", POSTER_DIR, f))
        .collect()
}

fn chroma_from(name: &str, patterns: &[&str]) -> Result<Theme, ThemeError> {
    let patterns = patterns
        .iter()
        .map(|p| p.parse::<Pattern>())
        .collect::<Result<Vec<_>, _>>()?;

    Theme::from_parts(
        name,
        None,
        Thresholds::Detect,
        Variant::Chroma(ChromaData { patterns }),
    )
}

/// Themes seeded into a fresh registry, without ids.
pub fn builtin_themes() -> Result<Vec<Theme>, ThemeError> {
    let mut themes = CHROMA_THEMES
        .iter()
        .map(|(name, patterns)| chroma_from(name, patterns))
        .collect::<Result<Vec<_>, _>>()?;

    for name in POSTER_THEMES {
        themes.push(Theme::from_parts(
            name,
            None,
            Thresholds::Detect,
            Variant::Poster(PosterData {
                poster: Some(default_poster()),
            }),
        )?);
    }

    Ok(themes)
}

/// The theme cloned by "add new theme".
pub fn template_theme() -> Result<Theme, ThemeError> {
    chroma_from(TEMPLATE.0, &TEMPLATE.1)
}
