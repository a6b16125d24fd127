//! Loads and saves the application state under a single storage key
//!
//! Neither direction is allowed to take the application down: a missing or corrupt
//! document loads as an empty state, and a failed write is logged while the in-memory
//! state carries on.

use serde_json::Value;
use thiserror::Error;

use crate::db::{KeyValueStore, StoredShape};
use crate::models::AppState;
use crate::normalize::{normalize_profiles, Origin};

/// Key the state document is stored under
pub const STORAGE_KEY: &str = "rice_prioritizer_v1";

/// Error type for storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    fn backend(err: anyhow::Error) -> Self {
        StorageError::Backend(format!("{:#}", err))
    }
}

/// Reads and writes [`AppState`] through a key-value backend
pub struct Persistence {
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl Persistence {
    pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Uses [`STORAGE_KEY`]
    pub fn with_default_key(backend: Box<dyn KeyValueStore>) -> Self {
        Self::new(backend, STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    /// Loads the stored state; never fails
    ///
    /// Every profile and project is normalized on the way in, and the active profile is
    /// re-pointed at the first profile when the stored id no longer exists.
    pub fn load_state(&self) -> AppState {
        let text = match self.backend.get(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                log::debug!("No stored state under {:?}", self.key);
                return AppState::new();
            }
            Err(e) => {
                log::error!("Failed to read stored state: {:#}", e);
                return AppState::new();
            }
        };

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Stored state under {:?} is not valid JSON: {}", self.key, e);
                return AppState::new();
            }
        };

        let Some(shape) = StoredShape::detect(value) else {
            log::error!("Stored state under {:?} has an unrecognised shape", self.key);
            return AppState::new();
        };

        let raw = shape.upgrade();
        let mut state = AppState {
            profiles: normalize_profiles(&raw.profiles, Origin::Loaded),
            active_profile_id: raw.active_profile_id,
            sort_field: raw.sort_field.unwrap_or_default(),
            sort_direction: raw.sort_direction.unwrap_or_default(),
            view_mode: raw.view_mode.unwrap_or_default(),
            board_sort_by_score: raw.board_sort_by_score.unwrap_or(false),
        };
        state.resolve_active_profile();
        state
    }

    /// Writes the state, returning any failure
    pub fn try_save_state(&self, state: &AppState) -> Result<(), StorageError> {
        let text = serde_json::to_string(state)?;
        self.backend
            .set(&self.key, &text)
            .map_err(StorageError::backend)
    }

    /// Writes the state; failures are logged and otherwise ignored
    pub fn save_state(&self, state: &AppState) {
        if let Err(e) = self.try_save_state(state) {
            log::error!("Failed to save state: {}", e);
        }
    }

    /// Removes the stored document
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove(&self.key).map_err(StorageError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FileBackend, MemoryBackend, SqliteBackend};
    use crate::models::{Profile, Project, SortDirection, SortField, ViewMode};
    use crate::store::ensure_default_profile;
    use anyhow::anyhow;
    use serde_json::json;
    use tempfile::TempDir;

    fn memory_with(text: &str) -> Persistence {
        let backend = MemoryBackend::new();
        backend.set(STORAGE_KEY, text).unwrap();
        Persistence::with_default_key(Box::new(backend))
    }

    fn sample_state() -> AppState {
        let mut profile = Profile::new("Growth".to_string(), "Core".to_string());
        let mut project = Project::new("Checkout".to_string());
        project.reach_value = 1000.0;
        project.impact_value = 3.0;
        project.confidence_value = 80.0;
        project.effort_value = 5.0;
        project.refresh_score();
        profile.projects.push(project);

        AppState {
            active_profile_id: Some(profile.id.clone()),
            profiles: vec![profile],
            sort_field: SortField::RiceScore,
            sort_direction: SortDirection::Asc,
            view_mode: ViewMode::Board,
            board_sort_by_score: true,
        }
    }

    #[test]
    fn test_missing_state_loads_empty() {
        let persistence = Persistence::with_default_key(Box::new(MemoryBackend::new()));
        assert_eq!(persistence.load_state(), AppState::new());
    }

    #[test]
    fn test_corrupt_state_loads_empty_then_default_profile() {
        let persistence = memory_with("{not json");
        let mut state = persistence.load_state();
        assert!(state.profiles.is_empty());

        assert!(ensure_default_profile(&mut state));
        assert_eq!(state.profiles.len(), 1);
        assert_eq!(state.profiles[0].name, "Default Profile");
    }

    #[test]
    fn test_scalar_document_loads_empty() {
        assert!(memory_with("17").load_state().profiles.is_empty());
    }

    #[test]
    fn test_legacy_array_shape() {
        let persistence = memory_with(
            &json!([
                {"id": "p1", "name": "Growth", "projects": [
                    {"id": "a", "title": "A", "reachValue": 10, "impactValue": 2,
                     "confidenceValue": 50, "effortValue": 1}
                ]},
                {"id": "p2", "name": "Core", "projects": "broken"}
            ])
            .to_string(),
        );

        let state = persistence.load_state();
        assert_eq!(state.profiles.len(), 2);
        assert_eq!(state.profiles[0].projects[0].rice_score, 10.0);
        assert!(state.profiles[1].projects.is_empty());
        assert_eq!(state.active_profile_id.as_deref(), Some("p1"));
        assert_eq!(state.sort_field, SortField::CreatedAt);
    }

    #[test]
    fn test_stale_active_profile_is_reset() {
        let persistence = memory_with(
            &json!({
                "profiles": [{"id": "p1", "name": "Growth"}, {"id": "p2", "name": "Core"}],
                "activeProfileId": "gone"
            })
            .to_string(),
        );
        let state = persistence.load_state();
        assert_eq!(state.active_profile_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_save_then_load_memory() {
        let persistence = Persistence::with_default_key(Box::new(MemoryBackend::new()));
        let state = sample_state();
        persistence.try_save_state(&state).unwrap();
        assert_eq!(persistence.load_state(), state);
    }

    #[test]
    fn test_save_then_load_file_and_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let state = sample_state();

        let file = Persistence::with_default_key(Box::new(FileBackend::new(temp_dir.path())));
        file.try_save_state(&state).unwrap();
        assert_eq!(file.load_state(), state);

        let sqlite = Persistence::with_default_key(Box::new(
            SqliteBackend::new(temp_dir.path().join("rice.db")).unwrap(),
        ));
        sqlite.try_save_state(&state).unwrap();
        assert_eq!(sqlite.load_state(), state);

        sqlite.clear().unwrap();
        assert!(sqlite.load_state().profiles.is_empty());
    }

    struct FailingBackend;

    impl KeyValueStore for FailingBackend {
        fn backend_type(&self) -> crate::db::BackendType {
            crate::db::BackendType::Memory
        }
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow!("disk on fire"))
        }
        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow!("quota exceeded"))
        }
        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_backend_failures_are_contained() {
        let persistence = Persistence::with_default_key(Box::new(FailingBackend));
        assert!(persistence.load_state().profiles.is_empty());

        let err = persistence.try_save_state(&sample_state()).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        // swallowed
        persistence.save_state(&sample_state());
    }
}
