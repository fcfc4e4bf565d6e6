//! Household settings: the typed view of the per-user settings record.
//!
//! The settings store hands back an untyped JSON mapping. It is validated
//! once, on read, by [`SettingsRecord::from_value`]; everything downstream
//! (prompt construction, calendar targeting) works with the typed record.

pub mod store;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use store::{FileSettingsStore, SettingsStore, load_settings, save_settings};

/// Calendar used when the settings record does not name one.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Appliance model assumed for fresh settings.
pub const DEFAULT_MODEL_NUMBER: &str = "KN-HW24G";

/// Errors from reading or storing a settings record.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("settings store I/O failed for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid user identity {0:?}")]
    InvalidIdentity(String),
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Meal stage of a child, which governs how their portion is prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildStage {
    /// Late weaning: soft, finely cut, barely seasoned.
    #[serde(alias = "離乳食完了期")]
    WeaningComplete,
    /// Toddler food: adult dishes with reduced seasoning.
    #[serde(alias = "幼児食")]
    Toddler,
    /// Eats the same food as the adults.
    #[serde(alias = "大人と同じ")]
    AdultFood,
}

impl ChildStage {
    /// Description used inside the generation prompt.
    pub fn describe(self) -> &'static str {
        match self {
            Self::WeaningComplete => "late weaning stage (soft, finely chopped, lightly seasoned)",
            Self::Toddler => "toddler food (reduced seasoning, bite-sized)",
            Self::AdultFood => "eats the same food as adults",
        }
    }
}

/// Whether recipes should follow the appliance's official menu catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookingMode {
    /// Use the appliance's built-in automatic menus.
    #[default]
    Official,
    /// Use manual cooking programs (temperature and time set by hand).
    Manual,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One child in the household. List order is display order only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// `None` when the stored birthday is empty.
    #[serde(
        default,
        deserialize_with = "deserialize_birthday",
        serialize_with = "serialize_birthday"
    )]
    pub birthday: Option<NaiveDate>,
    pub stage: ChildStage,
}

/// Typed household settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: Vec<Child>,
    #[serde(default)]
    pub dislikes: String,
    #[serde(default = "default_model_number")]
    pub model_number: String,
    #[serde(default)]
    pub cooking_mode: CookingMode,
    #[serde(default = "default_calendar_id", deserialize_with = "deserialize_calendar_id")]
    pub calendar_id: String,
}

fn default_adults() -> u32 {
    2
}

fn default_model_number() -> String {
    DEFAULT_MODEL_NUMBER.to_string()
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            adults: default_adults(),
            children: vec![Child {
                id: 0,
                name: String::new(),
                birthday: None,
                stage: ChildStage::WeaningComplete,
            }],
            dislikes: String::new(),
            model_number: default_model_number(),
            cooking_mode: CookingMode::Official,
            calendar_id: default_calendar_id(),
        }
    }
}

impl SettingsRecord {
    /// Validate an untyped mapping from the settings store.
    ///
    /// Missing fields take their defaults. Wrong types, negative counts, and
    /// unknown enum values are rejected.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SettingsError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize back to the mapping shape the store persists.
    pub fn to_value(&self) -> Result<serde_json::Value, SettingsError> {
        Ok(serde_json::to_value(self)?)
    }
}

fn deserialize_birthday<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn serialize_birthday<S>(birthday: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match birthday {
        Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        None => serializer.serialize_str(""),
    }
}

fn deserialize_calendar_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(id) if !id.trim().is_empty() => id,
        _ => default_calendar_id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_record() {
        let value = json!({
            "adults": 2,
            "children": [
                {"id": 1700000000000_i64, "name": "Hana", "birthday": "2023-04-02", "stage": "toddler"}
            ],
            "dislikes": "cilantro",
            "modelNumber": "KN-HW16G",
            "cookingMode": "manual",
            "calendarId": "family@example.com"
        });
        let s = SettingsRecord::from_value(value).unwrap();
        assert_eq!(s.adults, 2);
        assert_eq!(s.children.len(), 1);
        assert_eq!(s.children[0].birthday, NaiveDate::from_ymd_opt(2023, 4, 2));
        assert_eq!(s.children[0].stage, ChildStage::Toddler);
        assert_eq!(s.cooking_mode, CookingMode::Manual);
        assert_eq!(s.calendar_id, "family@example.com");
    }

    #[test]
    fn empty_mapping_takes_defaults() {
        let s = SettingsRecord::from_value(json!({})).unwrap();
        assert_eq!(s.adults, 2);
        assert!(s.children.is_empty());
        assert_eq!(s.model_number, DEFAULT_MODEL_NUMBER);
        assert_eq!(s.cooking_mode, CookingMode::Official);
        assert_eq!(s.calendar_id, DEFAULT_CALENDAR_ID);
    }

    #[test]
    fn empty_birthday_is_unknown() {
        let s = SettingsRecord::from_value(json!({
            "children": [{"name": "", "birthday": "", "stage": "adult_food"}]
        }))
        .unwrap();
        assert_eq!(s.children[0].birthday, None);
    }

    #[test]
    fn stored_stage_labels_are_accepted() {
        let s = SettingsRecord::from_value(json!({
            "children": [
                {"birthday": "", "stage": "離乳食完了期"},
                {"birthday": "", "stage": "幼児食"},
                {"birthday": "", "stage": "大人と同じ"}
            ]
        }))
        .unwrap();
        let stages: Vec<ChildStage> = s.children.iter().map(|c| c.stage).collect();
        assert_eq!(
            stages,
            vec![ChildStage::WeaningComplete, ChildStage::Toddler, ChildStage::AdultFood]
        );
    }

    #[test]
    fn blank_calendar_id_falls_back_to_primary() {
        let s = SettingsRecord::from_value(json!({"calendarId": "  "})).unwrap();
        assert_eq!(s.calendar_id, "primary");
        let s = SettingsRecord::from_value(json!({"calendarId": null})).unwrap();
        assert_eq!(s.calendar_id, "primary");
    }

    #[test]
    fn rejects_unknown_cooking_mode() {
        let err = SettingsRecord::from_value(json!({"cookingMode": "microwave"})).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_adults() {
        assert!(SettingsRecord::from_value(json!({"adults": -1})).is_err());
    }

    #[test]
    fn rejects_malformed_birthday() {
        let err = SettingsRecord::from_value(json!({
            "children": [{"birthday": "April 2nd", "stage": "toddler"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid settings"));
    }

    #[test]
    fn value_roundtrip_keeps_wire_names() {
        let value = SettingsRecord::default().to_value().unwrap();
        assert_eq!(value["modelNumber"], "KN-HW24G");
        assert_eq!(value["cookingMode"], "official");
        assert_eq!(value["children"][0]["birthday"], "");
        assert_eq!(value["children"][0]["stage"], "weaning_complete");
        let back = SettingsRecord::from_value(value).unwrap();
        assert_eq!(back, SettingsRecord::default());
    }
}
