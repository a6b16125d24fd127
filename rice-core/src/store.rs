//! State container and the single update path for all mutations
//!
//! [`apply`] is a pure function over [`AppState`]; [`App`] wraps it with persistence so
//! every successful action is saved exactly once.

use chrono::Utc;
use std::path::Path;
use thiserror::Error;

use crate::config::Config;
use crate::db::create_backend;
use crate::merge::{merge_imported_profiles, MatchPolicy, MergeSummary};
use crate::models::{
    AppState, Profile, Project, SortDirection, SortField, ViewMode, DEFAULT_PROFILE_NAME,
    DEFAULT_STATUS,
};
use crate::normalize::{normalize_countries, normalize_currency, normalize_period};
use crate::query::{move_on_board, toggle_sort};
use crate::rice::{validate_project_input, ProjectInput, ValidationError};
use crate::storage::Persistence;
use crate::transfer::{parse_import, read_import_file, ImportError, ImportFormat};

/// Every state change the application can make
#[derive(Debug, Clone)]
pub enum Action {
    AddProfile {
        name: String,
        team: String,
    },
    UpdateProfile {
        id: String,
        name: String,
        team: String,
    },
    DeleteProfile {
        id: String,
    },
    SetActiveProfile {
        id: String,
    },
    /// Adds a project to the active profile
    CreateProject {
        input: ProjectInput,
    },
    UpdateProject {
        id: String,
        input: ProjectInput,
    },
    /// Deletes projects from the active profile; unknown ids are ignored
    DeleteProjects {
        ids: Vec<String>,
    },
    ToggleSort {
        field: SortField,
    },
    SetViewMode(ViewMode),
    SetBoardSortByScore(bool),
    MoveOnBoard {
        project_id: String,
        status: String,
        index: usize,
    },
    ImportProfiles(Vec<Profile>),
}

/// What an applied action did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    ProfileAdded(String),
    ProfileUpdated(String),
    /// Carries the id of the default profile when one had to be synthesized
    ProfileDeleted { synthesized: Option<String> },
    ActiveProfileChanged(String),
    ProjectCreated(String),
    ProjectUpdated(String),
    ProjectsDeleted(usize),
    SortChanged(SortField, SortDirection),
    ViewChanged,
    ProjectMoved,
    Imported(MergeSummary),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Profile name is required.")]
    ProfileNameRequired,

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("No active profile. Create or select a profile first.")]
    NoActiveProfile,
}

/// Synthesizes "Default Profile" when there are no profiles; returns true if it did
pub fn ensure_default_profile(state: &mut AppState) -> bool {
    if !state.profiles.is_empty() {
        return false;
    }
    let profile = Profile::new(DEFAULT_PROFILE_NAME.to_string(), String::new());
    state.active_profile_id = Some(profile.id.clone());
    state.profiles.push(profile);
    true
}

fn trimmed_or_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Copies validated form values onto `project`
fn fill_project(project: &mut Project, input: &ProjectInput) {
    project.title = input.title.trim().to_string();
    project.description = input.description.trim().to_string();
    project.reach_value = input.reach_value.unwrap_or(0.0);
    project.reach_description = input.reach_description.trim().to_string();
    project.impact_value = input.impact_value.unwrap_or(1.0);
    project.impact_description = input.impact_description.trim().to_string();
    project.confidence_value = input.confidence_value.unwrap_or(50.0);
    project.confidence_description = input.confidence_description.trim().to_string();
    project.effort_value = input.effort_value.unwrap_or(1.0);
    project.effort_description = input.effort_description.trim().to_string();
    project.financial_impact_value = input.financial_impact_value;
    project.financial_impact_currency =
        normalize_currency(input.financial_impact_currency.as_deref());
    project.project_type = trimmed_or_none(&input.project_type);
    project.project_status = trimmed_or_none(&input.project_status);
    project.tshirt_size = trimmed_or_none(&input.tshirt_size);
    project.project_period = normalize_period(input.project_period.as_deref());
    project.countries = normalize_countries(input.countries.iter());
    project.refresh_score();
}

fn active_profile_mut(state: &mut AppState) -> Result<&mut Profile, StoreError> {
    state.active_profile_mut().ok_or(StoreError::NoActiveProfile)
}

/// Applies `action` to `state`
///
/// On error the state is unchanged.
pub fn apply(
    state: &mut AppState,
    action: Action,
    policy: MatchPolicy,
) -> Result<Outcome, StoreError> {
    match action {
        Action::AddProfile { name, team } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::ProfileNameRequired);
            }
            let profile = Profile::new(name.to_string(), team);
            let id = profile.id.clone();
            state.profiles.push(profile);
            state.active_profile_id = Some(id.clone());
            Ok(Outcome::ProfileAdded(id))
        }

        Action::UpdateProfile { id, name, team } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::ProfileNameRequired);
            }
            let profile = state
                .profile_mut(&id)
                .ok_or_else(|| StoreError::ProfileNotFound(id.clone()))?;
            profile.name = name.to_string();
            profile.team = team.trim().to_string();
            Ok(Outcome::ProfileUpdated(id))
        }

        Action::DeleteProfile { id } => {
            let idx = state
                .profiles
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| StoreError::ProfileNotFound(id.clone()))?;
            state.profiles.remove(idx);

            let mut synthesized = None;
            if state.profiles.is_empty() {
                state.active_profile_id = None;
                ensure_default_profile(state);
                synthesized = state.active_profile_id.clone();
            } else if state.active_profile_id.as_deref() == Some(id.as_str()) {
                state.active_profile_id = state.profiles.first().map(|p| p.id.clone());
            }
            Ok(Outcome::ProfileDeleted { synthesized })
        }

        Action::SetActiveProfile { id } => {
            if state.profile(&id).is_none() {
                return Err(StoreError::ProfileNotFound(id));
            }
            state.active_profile_id = Some(id.clone());
            Ok(Outcome::ActiveProfileChanged(id))
        }

        Action::CreateProject { input } => {
            validate_project_input(&input)?;
            let profile = active_profile_mut(state)?;

            let mut project = Project::new(input.title.clone());
            fill_project(&mut project, &input);
            if project.project_status.is_none() {
                project.project_status = Some(DEFAULT_STATUS.to_string());
            }

            let id = project.id.clone();
            profile.projects.insert(0, project);
            Ok(Outcome::ProjectCreated(id))
        }

        Action::UpdateProject { id, input } => {
            validate_project_input(&input)?;
            let profile = active_profile_mut(state)?;
            let project = profile
                .project_mut(&id)
                .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))?;

            fill_project(project, &input);
            project.modified_at = Utc::now();
            Ok(Outcome::ProjectUpdated(id))
        }

        Action::DeleteProjects { ids } => {
            let profile = active_profile_mut(state)?;
            let before = profile.projects.len();
            profile.projects.retain(|p| !ids.contains(&p.id));
            profile.forget_board_ids(&ids);
            Ok(Outcome::ProjectsDeleted(before - profile.projects.len()))
        }

        Action::ToggleSort { field } => {
            let (field, direction) = toggle_sort((state.sort_field, state.sort_direction), field);
            state.sort_field = field;
            state.sort_direction = direction;
            Ok(Outcome::SortChanged(field, direction))
        }

        Action::SetViewMode(mode) => {
            state.view_mode = mode;
            Ok(Outcome::ViewChanged)
        }

        Action::SetBoardSortByScore(enabled) => {
            state.board_sort_by_score = enabled;
            Ok(Outcome::ViewChanged)
        }

        Action::MoveOnBoard {
            project_id,
            status,
            index,
        } => {
            let profile = active_profile_mut(state)?;
            if !move_on_board(profile, &project_id, &status, index) {
                return Err(StoreError::ProjectNotFound(project_id));
            }
            Ok(Outcome::ProjectMoved)
        }

        Action::ImportProfiles(profiles) => Ok(Outcome::Imported(merge_imported_profiles(
            state, profiles, policy,
        ))),
    }
}

/// Result of a successful file import
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub format: ImportFormat,
    pub summary: MergeSummary,
}

impl ImportReport {
    pub fn message(&self) -> String {
        match self.format {
            ImportFormat::Json => self.summary.message_for("Import"),
            ImportFormat::Csv => self.summary.message_for("CSV import"),
        }
    }
}

/// Application state bound to its persistence
pub struct App {
    state: AppState,
    persistence: Persistence,
    policy: MatchPolicy,
}

impl App {
    /// Loads the stored state and makes sure at least one profile exists
    pub fn new(persistence: Persistence, policy: MatchPolicy) -> Self {
        let mut state = persistence.load_state();
        if ensure_default_profile(&mut state) {
            persistence.save_state(&state);
        }
        Self {
            state,
            persistence,
            policy,
        }
    }

    /// Opens the backend named by `config`
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let backend = create_backend(&config.storage_path, config.backend)?;
        let persistence = Persistence::new(backend, config.storage_key.clone());
        Ok(Self::new(persistence, config.match_policy))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Applies an action and persists the result
    pub fn dispatch(&mut self, action: Action) -> Result<Outcome, StoreError> {
        let outcome = apply(&mut self.state, action, self.policy)?;
        self.persistence.save_state(&self.state);
        Ok(outcome)
    }

    /// Parses `text` and merges it into the state
    pub fn import_text(
        &mut self,
        text: &str,
        format: ImportFormat,
    ) -> Result<ImportReport, ImportError> {
        let profiles = parse_import(text, format)?;
        let summary = merge_imported_profiles(&mut self.state, profiles, self.policy);
        self.persistence.save_state(&self.state);
        Ok(ImportReport { format, summary })
    }

    /// Reads, parses, merges and persists an import file
    pub fn import_file(
        &mut self,
        path: &Path,
        format: Option<ImportFormat>,
    ) -> Result<ImportReport, ImportError> {
        let (text, format) = read_import_file(path, format)?;
        let report = self.import_text(&text, format)?;
        log::info!("Imported {:?}: {}", path, report.message());
        Ok(report)
    }
}
