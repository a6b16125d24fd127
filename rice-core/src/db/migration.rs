//! Upgrades stored documents to the current state shape
//!
//! Two shapes exist in the wild: the older bare array of profiles and the current
//! object wrapper. A future schema version adds a [`StoredShape`] variant and an arm in
//! [`StoredShape::upgrade`]; nothing else in the load path needs to change.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::{SortDirection, SortField, ViewMode};

/// Shape of a stored state document
#[derive(Debug, Clone, PartialEq)]
pub enum StoredShape {
    /// `[Profile, ...]` with no settings
    Legacy(Vec<Value>),
    /// `{ "profiles": [...], "activeProfileId": ..., ... }`
    V1(Map<String, Value>),
}

/// State fields pulled out of a stored document; profiles are still unnormalized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawState {
    pub profiles: Vec<Value>,
    pub active_profile_id: Option<String>,
    pub sort_field: Option<SortField>,
    pub sort_direction: Option<SortDirection>,
    pub view_mode: Option<ViewMode>,
    pub board_sort_by_score: Option<bool>,
}

/// A field that is present but malformed reads as absent
fn field<T: DeserializeOwned>(obj: &Map<String, Value>, name: &str) -> Option<T> {
    obj.get(name)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}

impl StoredShape {
    /// Returns None when the document is neither an array nor an object
    pub fn detect(value: Value) -> Option<Self> {
        match value {
            Value::Array(profiles) => Some(StoredShape::Legacy(profiles)),
            Value::Object(obj) => Some(StoredShape::V1(obj)),
            _ => None,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            StoredShape::Legacy(_) => 0,
            StoredShape::V1(_) => 1,
        }
    }

    pub fn upgrade(self) -> RawState {
        match self {
            StoredShape::Legacy(profiles) => {
                log::info!(
                    "Upgrading legacy stored state ({} profile(s))",
                    profiles.len()
                );
                RawState {
                    profiles,
                    ..Default::default()
                }
            }
            StoredShape::V1(obj) => {
                let profiles = match obj.get("profiles") {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                RawState {
                    profiles,
                    active_profile_id: field(&obj, "activeProfileId"),
                    sort_field: field(&obj, "sortField"),
                    sort_direction: field(&obj, "sortDirection"),
                    view_mode: field(&obj, "viewMode"),
                    board_sort_by_score: field(&obj, "boardSortByScore"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_shapes() {
        assert_eq!(
            StoredShape::detect(json!([{"name": "A"}])).map(|s| s.version()),
            Some(0)
        );
        assert_eq!(
            StoredShape::detect(json!({"profiles": []})).map(|s| s.version()),
            Some(1)
        );
        assert!(StoredShape::detect(json!("text")).is_none());
        assert!(StoredShape::detect(json!(42)).is_none());
    }

    #[test]
    fn test_upgrade_legacy_has_default_settings() {
        let raw = StoredShape::detect(json!([{"id": "p1"}, {"id": "p2"}]))
            .unwrap()
            .upgrade();
        assert_eq!(raw.profiles.len(), 2);
        assert_eq!(raw.active_profile_id, None);
        assert_eq!(raw.sort_field, None);
    }

    #[test]
    fn test_upgrade_v1_reads_settings() {
        let raw = StoredShape::detect(json!({
            "profiles": [{"id": "p1"}],
            "activeProfileId": "p1",
            "sortField": "riceScore",
            "sortDirection": "asc",
            "viewMode": "board",
            "boardSortByScore": true
        }))
        .unwrap()
        .upgrade();

        assert_eq!(raw.profiles.len(), 1);
        assert_eq!(raw.active_profile_id.as_deref(), Some("p1"));
        assert_eq!(raw.sort_field, Some(SortField::RiceScore));
        assert_eq!(raw.sort_direction, Some(SortDirection::Asc));
        assert_eq!(raw.view_mode, Some(ViewMode::Board));
        assert_eq!(raw.board_sort_by_score, Some(true));
    }

    #[test]
    fn test_upgrade_v1_tolerates_malformed_fields() {
        let raw = StoredShape::detect(json!({
            "profiles": "nope",
            "sortField": "colour",
            "sortDirection": 3
        }))
        .unwrap()
        .upgrade();
        assert!(raw.profiles.is_empty());
        assert_eq!(raw.sort_field, None);
        assert_eq!(raw.sort_direction, None);
    }
}
