pub mod config;
pub mod csv;
pub mod db;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod query;
pub mod rice;
pub mod stats;
pub mod storage;
pub mod store;
pub mod transfer;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use db::{create_backend, BackendType, KeyValueStore};
pub use merge::{merge_imported_profiles, MatchPolicy, MergeSummary};
pub use models::{
    AppState, Profile, Project, SortDirection, SortField, ViewMode, DEFAULT_PROFILE_NAME,
    DEFAULT_STATUS, PROJECT_STATUSES, TSHIRT_SIZES,
};
pub use query::{board_columns, sort_projects, BoardColumn, ProjectFilter};
pub use rice::{
    calculate_rice_score, format_rice, validate_project_input, ProjectInput, ValidationError,
};
pub use stats::{ProfileStats, RiceStats};
pub use storage::{Persistence, StorageError, STORAGE_KEY};
pub use store::{apply, ensure_default_profile, Action, App, ImportReport, Outcome, StoreError};
pub use transfer::{export_file_name, export_json, ImportError, ImportFormat};
