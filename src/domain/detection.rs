use crate::domain::{DetectError, ThresholdRange, Thresholds};
use serde::{Deserialize, Serialize};

/// One day of the rendered contribution calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCell {
    pub count: u32,
    pub color: String,
}

impl DayCell {
    pub fn new(count: u32, color: impl Into<String>) -> Self {
        Self {
            count,
            color: color.into(),
        }
    }
}

/// Read access to the host page's calendar as it is currently rendered.
pub trait CalendarPage {
    /// Legend swatch colors, lowest intensity first.
    fn legend_colors(&self) -> Vec<String>;

    fn day_cells(&self) -> Vec<DayCell>;

    /// Number of legend slots, i.e. classification buckets.
    fn legend_slots(&self) -> usize {
        self.legend_colors().len()
    }
}

/// Canonical form of a css color as reported by the page: lowercase six digit
/// hex where possible. Anything unrecognised is only trimmed and lowercased.
pub fn normalize_color(raw: &str) -> String {
    let color = raw.trim().to_ascii_lowercase();

    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() == 3 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let mut expanded = String::with_capacity(7);
            expanded.push('#');
            for c in hex.chars() {
                expanded.push(c);
                expanded.push(c);
            }
            return expanded;
        }
        return color;
    }

    if let Some(args) = color
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels: Vec<Option<u8>> = args.split(',').map(|c| c.trim().parse().ok()).collect();
        if let [Some(r), Some(g), Some(b)] = channels[..] {
            return format!("#{:02x}{:02x}{:02x}", r, g, b);
        }
    }

    color
}

/// Reverse-engineer the count ranges behind each legend color by scanning
/// every day on the page.
pub fn detect_thresholds(page: &dyn CalendarPage) -> Result<Thresholds, DetectError> {
    let legend: Vec<String> = page
        .legend_colors()
        .iter()
        .map(|c| normalize_color(c))
        .collect();

    if legend.is_empty() {
        return Err(DetectError::NoLegend);
    }

    let mut bounds: Vec<Option<(u32, u32)>> = vec![None; legend.len()];

    for cell in page.day_cells() {
        let color = normalize_color(&cell.color);
        let bucket = legend.iter().position(|c| *c == color).ok_or_else(|| {
            DetectError::ClassificationMismatch {
                color: cell.color.clone(),
                count: cell.count,
            }
        })?;

        bounds[bucket] = Some(match bounds[bucket] {
            Some((min, max)) => (min.min(cell.count), max.max(cell.count)),
            None => (cell.count, cell.count),
        });
    }

    let ranges: Vec<ThresholdRange> = bounds
        .into_iter()
        .map(|b| b.map_or_else(ThresholdRange::unobserved, ThresholdRange::from))
        .collect();

    log::debug!("detected thresholds from {} legend colors", legend.len());

    if ranges.iter().all(ThresholdRange::is_unobserved) {
        return Err(DetectError::EmptyCalendar);
    }

    Thresholds::ranges(ranges).map_err(|e| DetectError::InconsistentLegend(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    /// Static page that counts how often its cells are read.
    pub(crate) struct FakePage {
        pub legend: Vec<String>,
        pub days: Vec<DayCell>,
        pub scans: Cell<usize>,
    }

    impl FakePage {
        pub(crate) fn github() -> Self {
            Self {
                legend: ["#ebedf0", "#9be9a8", "#40c463", "#30a14e", "#216e39"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                days: vec![
                    DayCell::new(0, "#EBEDF0"),
                    DayCell::new(1, "#9be9a8"),
                    DayCell::new(3, "rgb(155, 233, 168)"),
                    DayCell::new(4, "#40c463"),
                    DayCell::new(6, "#40c463"),
                    DayCell::new(8, "#30a14e"),
                    DayCell::new(9, "#30a14e"),
                    DayCell::new(12, "#216e39"),
                    DayCell::new(25, "#216e39"),
                ],
                scans: Cell::new(0),
            }
        }
    }

    impl CalendarPage for FakePage {
        fn legend_colors(&self) -> Vec<String> {
            self.legend.clone()
        }

        fn day_cells(&self) -> Vec<DayCell> {
            self.scans.set(self.scans.get() + 1);
            self.days.clone()
        }
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("#EEE"), "#eeeeee");
        assert_eq!(normalize_color(" #196127 "), "#196127");
        assert_eq!(normalize_color("rgb(25, 97, 39)"), "#196127");
        assert_eq!(normalize_color("transparent"), "transparent");
    }

    #[test]
    fn test_detect_accumulates_min_max_per_color() {
        let page = FakePage::github();
        let thresholds = detect_thresholds(&page).unwrap();

        assert_eq!(
            thresholds.as_ranges().unwrap(),
            &[
                ThresholdRange::new(0, 0),
                ThresholdRange::new(1, 3),
                ThresholdRange::new(4, 6),
                ThresholdRange::new(8, 9),
                ThresholdRange::new(12, 25),
            ]
        );
    }

    #[test]
    fn test_detect_marks_unused_colors_unobserved() {
        let mut page = FakePage::github();
        page.days.retain(|d| d.count < 8);

        let thresholds = detect_thresholds(&page).unwrap();
        let ranges = thresholds.as_ranges().unwrap();

        assert_eq!(ranges.len(), 5);
        assert!(ranges[3].is_unobserved());
        assert!(ranges[4].is_unobserved());
    }

    #[test]
    fn test_detect_rejects_unknown_colors() {
        let mut page = FakePage::github();
        page.days.push(DayCell::new(2, "#ff0000"));

        assert_eq!(
            detect_thresholds(&page),
            Err(DetectError::ClassificationMismatch {
                color: "#ff0000".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_detect_needs_at_least_one_day() {
        let mut page = FakePage::github();
        page.days.clear();

        assert_eq!(detect_thresholds(&page), Err(DetectError::EmptyCalendar));
    }

    #[test]
    fn test_detect_rejects_overlapping_colors() {
        let mut page = FakePage::github();
        page.days.push(DayCell::new(2, "#216e39"));

        assert!(matches!(
            detect_thresholds(&page),
            Err(DetectError::InconsistentLegend(_))
        ));
    }

    #[test]
    fn test_detect_requires_legend() {
        let mut page = FakePage::github();
        page.legend.clear();

        assert_eq!(detect_thresholds(&page), Err(DetectError::NoLegend));
    }
}
