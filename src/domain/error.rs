use crate::domain::ThemeKind;
use thiserror::Error;

/// Errors raised while building, mutating or decoding a theme.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThemeError {
    #[error("invalid theme record: `{field}` {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("operation requires a {expected} theme, but this one is {actual}")]
    WrongVariant {
        expected: ThemeKind,
        actual: ThemeKind,
    },

    #[error("can not parse pattern: {0:?}")]
    InvalidPattern(String),

    #[error("can not parse poster reference: {0:?}")]
    InvalidPoster(String),

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
}

impl ThemeError {
    pub fn missing(field: &'static str) -> Self {
        ThemeError::Validation {
            field,
            reason: "is missing or empty".to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// Thresholds are still the detect sentinel.
    #[error("thresholds have not been detected yet")]
    NotReady,

    #[error("there are {legend} legend colors but the theme has {patterns} patterns")]
    LegendMismatch { legend: usize, patterns: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("calendar legend has no colors")]
    NoLegend,

    #[error("calendar has no contribution days to learn from")]
    EmptyCalendar,

    #[error("legend colors do not map to increasing count ranges: {0}")]
    InconsistentLegend(String),

    #[error("day with {count} contributions is rendered as {color}, which is not a legend color")]
    ClassificationMismatch { color: String, count: u32 },
}
