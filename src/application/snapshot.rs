use crate::domain::{CalendarPage, DayCell};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A contribution calendar captured from the host page as JSON:
///
/// ```json
/// { "legend": ["#ebedf0", "#9be9a8"], "days": [{ "count": 3, "color": "#9be9a8" }] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    pub legend: Vec<String>,
    #[serde(default)]
    pub days: Vec<DayCell>,
}

impl CalendarSnapshot {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }
}

impl CalendarPage for CalendarSnapshot {
    fn legend_colors(&self) -> Vec<String> {
        self.legend.clone()
    }

    fn day_cells(&self) -> Vec<DayCell> {
        self.days.clone()
    }
}
