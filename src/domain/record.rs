use crate::domain::{
    ChromaData, Pattern, PosterData, PosterRef, Theme, ThemeError, ThemeId, ThemeKind, Thresholds,
    Variant,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plain persisted form of a theme.
///
/// Every field is optional on the way in so that a broken record is reported
/// as a [`ThemeError::Validation`] naming the field, instead of an opaque
/// decoding failure. Only the fields of the active variant are written out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThemeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ThemeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

impl Theme {
    pub fn to_record(&self) -> ThemeRecord {
        let (patterns, poster) = match self.variant() {
            Variant::Chroma(chroma) => (
                Some(chroma.patterns.iter().map(|p| p.as_str().to_string()).collect()),
                None,
            ),
            Variant::Poster(data) => (None, data.poster.as_ref().map(|p| p.as_str().to_string())),
        };

        ThemeRecord {
            id: self.id(),
            name: Some(self.name().to_string()),
            kind: Some(self.kind().as_str().to_string()),
            thresholds: Some(self.thresholds().clone()),
            patterns,
            poster,
        }
    }

    pub fn from_record(record: ThemeRecord) -> Result<Self, ThemeError> {
        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ThemeError::missing("name"))?;
        let id = record.id.ok_or_else(|| ThemeError::missing("id"))?;
        let kind: ThemeKind = record
            .kind
            .ok_or_else(|| ThemeError::missing("type"))?
            .parse()?;
        let thresholds = record
            .thresholds
            .ok_or_else(|| ThemeError::missing("thresholds"))?;

        let variant = match kind {
            ThemeKind::Chroma => {
                let patterns = record
                    .patterns
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| ThemeError::missing("patterns"))?
                    .iter()
                    .map(|p| p.parse::<Pattern>())
                    .collect::<Result<Vec<_>, _>>()?;
                Variant::Chroma(ChromaData { patterns })
            }
            ThemeKind::Poster => {
                let poster: PosterRef = record
                    .poster
                    .ok_or_else(|| ThemeError::missing("poster"))?
                    .parse()?;
                Variant::Poster(PosterData {
                    poster: Some(poster),
                })
            }
        };

        Theme::from_parts(name, Some(id), thresholds, variant)
    }

    pub fn to_value(&self) -> Result<Value, ThemeError> {
        serde_json::to_value(self.to_record()).map_err(|e| ThemeError::Validation {
            field: "record",
            reason: e.to_string(),
        })
    }

    pub fn from_value(value: Value) -> Result<Self, ThemeError> {
        let record: ThemeRecord =
            serde_json::from_value(value).map_err(|e| ThemeError::Validation {
                field: "record",
                reason: e.to_string(),
            })?;
        Self::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThresholdRange;
    use proptest::prelude::*;
    use serde_json::json;

    fn same_content(a: &Theme, b: &Theme) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.name(), b.name());
        assert_eq!(a.thresholds(), b.thresholds());
        assert_eq!(a.variant(), b.variant());
    }

    #[test]
    fn test_chroma_round_trip_with_every_pattern_kind() {
        let mut theme = Theme::chroma("Mixed", Some(4), 5).unwrap();
        for (i, p) in [
            "#eee",
            "rgb(1, 2, 3)",
            "images/icons/flower.png",
            "data:image/png;base64,AAAA",
            "@storage/icon/1541400000000",
        ]
        .iter()
        .enumerate()
        {
            theme.set_pattern(i, p.parse().unwrap()).unwrap();
        }

        let restored = Theme::from_value(theme.to_value().unwrap()).unwrap();
        same_content(&theme, &restored);
    }

    #[test]
    fn test_poster_record_has_no_patterns() {
        let mut theme = Theme::poster("Night", Some(2)).unwrap();
        theme
            .set_poster("@storage/poster/99".parse().unwrap())
            .unwrap();

        let value = theme.to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "id": 2,
                "name": "Night",
                "type": "poster",
                "thresholds": "<to_be_detected>",
                "poster": "@storage/poster/99"
            })
        );

        same_content(&theme, &Theme::from_value(value).unwrap());
    }

    #[test]
    fn test_flipped_theme_serializes_only_active_fields() {
        let mut theme = Theme::chroma("Flip", Some(1), 5).unwrap();
        theme.set_variant(ThemeKind::Poster);

        let record = theme.to_record();
        assert!(record.patterns.is_none());
        assert!(record.poster.is_some());
    }

    #[test]
    fn test_validation_errors_name_the_field() {
        let base = json!({
            "id": 1,
            "name": "Primal",
            "type": "chroma",
            "thresholds": [[0, 0], [1, 9]],
            "patterns": ["#eee", "#196127"]
        });
        assert!(Theme::from_value(base.clone()).is_ok());

        let cases = [
            ("name", json!("")),
            ("id", Value::Null),
            ("type", Value::Null),
            ("thresholds", Value::Null),
            ("patterns", json!([])),
        ];
        for (field, broken) in cases {
            let mut record = base.clone();
            record[field] = broken;
            assert_eq!(
                Theme::from_value(record).unwrap_err(),
                ThemeError::missing(field),
                "field {}",
                field
            );
        }
    }

    #[test]
    fn test_poster_without_image_is_rejected() {
        let record = json!({
            "id": 1,
            "name": "Night",
            "type": "poster",
            "thresholds": "<to_be_detected>"
        });
        assert_eq!(
            Theme::from_value(record).unwrap_err(),
            ThemeError::missing("poster")
        );
    }

    #[test]
    fn test_malformed_values_are_reported() {
        let bad_thresholds = json!({
            "id": 1, "name": "x", "type": "chroma",
            "thresholds": [], "patterns": ["#eee"]
        });
        assert!(matches!(
            Theme::from_value(bad_thresholds),
            Err(ThemeError::Validation { field: "record", .. })
        ));

        let bad_pattern = json!({
            "id": 1, "name": "x", "type": "chroma",
            "thresholds": "<to_be_detected>", "patterns": ["icons/old.png"]
        });
        assert!(matches!(
            Theme::from_value(bad_pattern),
            Err(ThemeError::InvalidPattern(_))
        ));

        let bad_type = json!({
            "id": 1, "name": "x", "type": "mosaic",
            "thresholds": "<to_be_detected>", "patterns": ["#eee"]
        });
        assert!(matches!(
            Theme::from_value(bad_type),
            Err(ThemeError::Validation { field: "type", .. })
        ));
    }

    fn pattern_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "#[0-9a-f]{6}",
            "#[0-9a-f]{3}",
            "images/icons/[a-z]{1,8}\\.png",
            "data:image/png;base64,[A-Za-z0-9]{4,16}",
            "@storage/icon/[0-9]{1,13}",
        ]
    }

    proptest! {
        #[test]
        fn prop_chroma_records_round_trip(
            id in 1u64..10_000,
            name in "[A-Za-z][A-Za-z ]{0,15}",
            patterns in prop::collection::vec(pattern_strategy(), 1..8),
            resolved in any::<bool>(),
        ) {
            let parsed: Vec<Pattern> = patterns.iter().map(|p| p.parse().unwrap()).collect();
            let thresholds = if resolved {
                let ranges = (0..parsed.len() as u32)
                    .map(|i| ThresholdRange::new(i * 10, i * 10 + 9))
                    .collect();
                Thresholds::ranges(ranges).unwrap()
            } else {
                Thresholds::Detect
            };

            let theme = Theme::from_parts(
                name,
                Some(id),
                thresholds,
                Variant::Chroma(ChromaData { patterns: parsed }),
            )
            .unwrap();

            let restored = Theme::from_value(theme.to_value().unwrap()).unwrap();
            prop_assert_eq!(restored.variant(), theme.variant());
            prop_assert_eq!(restored.thresholds(), theme.thresholds());
            prop_assert_eq!(restored.name(), theme.name());
            prop_assert_eq!(restored.id(), theme.id());
        }
    }
}
