use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Status assigned to projects created without an explicit status
pub const DEFAULT_STATUS: &str = "Not Started";

/// Name of the profile synthesized when the store holds none
pub const DEFAULT_PROFILE_NAME: &str = "Default Profile";

/// Built-in project statuses, in board column order
pub const PROJECT_STATUSES: &[&str] =
    &["Not Started", "In Progress", "On Hold", "Done", "Cancelled"];

/// Built-in t-shirt sizes, smallest first
pub const TSHIRT_SIZES: &[&str] = &["XS", "S", "M", "L", "XL"];

/// Generates an opaque identifier such as `project_3f2a...`
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Represents a single initiative being scored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier, fixed at creation
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Number of units (users, accounts, ...) affected
    pub reach_value: f64,
    #[serde(default)]
    pub reach_description: String,

    pub impact_value: f64,
    #[serde(default)]
    pub impact_description: String,

    /// Either a percentage (0-100) or a fraction (0-1)
    pub confidence_value: f64,
    #[serde(default)]
    pub confidence_description: String,

    pub effort_value: f64,
    #[serde(default)]
    pub effort_description: String,

    #[serde(default)]
    pub financial_impact_value: Option<f64>,
    #[serde(default)]
    pub financial_impact_currency: Option<String>,

    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub project_status: Option<String>,
    #[serde(default)]
    pub tshirt_size: Option<String>,

    /// Planning period such as `Q3-2025`, always uppercase
    #[serde(default)]
    pub project_period: Option<String>,

    #[serde(default)]
    pub countries: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    /// Cached score; recomputed whenever the project is normalized, merged or edited
    #[serde(default)]
    pub rice_score: f64,
}

impl Project {
    /// Creates a project with form defaults and the default status
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        let mut project = Self {
            id: generate_id("project"),
            title,
            description: String::new(),
            reach_value: 0.0,
            reach_description: String::new(),
            impact_value: 1.0,
            impact_description: String::new(),
            confidence_value: 50.0,
            confidence_description: String::new(),
            effort_value: 1.0,
            effort_description: String::new(),
            financial_impact_value: None,
            financial_impact_currency: None,
            project_type: None,
            project_status: Some(DEFAULT_STATUS.to_string()),
            tshirt_size: None,
            project_period: None,
            countries: Vec::new(),
            created_at: now,
            modified_at: now,
            rice_score: 0.0,
        };
        project.refresh_score();
        project
    }

    /// Recomputes the cached RICE score from the current field values
    pub fn refresh_score(&mut self) -> f64 {
        self.rice_score = crate::rice::calculate_rice_score(self);
        self.rice_score
    }

    /// Status used for board grouping; projects without one sit in the default column
    pub fn status_or_default(&self) -> &str {
        self.project_status.as_deref().unwrap_or(DEFAULT_STATUS)
    }
}

/// A named container of projects representing a team or planning context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub team: String,
    pub created_at: DateTime<Utc>,
    /// Newest first for manually created projects
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Manual board ordering: status label -> project ids
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub board_order: HashMap<String, Vec<String>>,
}

impl Profile {
    /// Creates an empty profile
    pub fn new(name: String, team: String) -> Self {
        Self {
            id: generate_id("profile"),
            name,
            team: team.trim().to_string(),
            created_at: Utc::now(),
            projects: Vec::new(),
            board_order: HashMap::new(),
        }
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Removes the given ids from every board column
    pub fn forget_board_ids(&mut self, ids: &[String]) {
        for column in self.board_order.values_mut() {
            column.retain(|id| !ids.contains(id));
        }
        self.board_order.retain(|_, column| !column.is_empty());
    }
}

/// Field the project table is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortField {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "modifiedAt")]
    ModifiedAt,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "projectType")]
    ProjectType,
    #[serde(rename = "projectStatus")]
    ProjectStatus,
    #[serde(rename = "tshirtSize")]
    TshirtSize,
    #[serde(rename = "financialImpactCurrency")]
    FinancialImpactCurrency,
    #[serde(rename = "riceScore")]
    RiceScore,
    #[serde(rename = "financialImpactValue")]
    FinancialImpactValue,
    #[serde(rename = "impactValue")]
    ImpactValue,
    #[serde(rename = "effortValue")]
    EffortValue,
}

impl SortField {
    pub fn all() -> &'static [SortField] {
        &[
            SortField::CreatedAt,
            SortField::ModifiedAt,
            SortField::Title,
            SortField::ProjectType,
            SortField::ProjectStatus,
            SortField::TshirtSize,
            SortField::FinancialImpactCurrency,
            SortField::RiceScore,
            SortField::FinancialImpactValue,
            SortField::ImpactValue,
            SortField::EffortValue,
        ]
    }

    /// Storage/wire name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::ModifiedAt => "modifiedAt",
            SortField::Title => "title",
            SortField::ProjectType => "projectType",
            SortField::ProjectStatus => "projectStatus",
            SortField::TshirtSize => "tshirtSize",
            SortField::FinancialImpactCurrency => "financialImpactCurrency",
            SortField::RiceScore => "riceScore",
            SortField::FinancialImpactValue => "financialImpactValue",
            SortField::ImpactValue => "impactValue",
            SortField::EffortValue => "effortValue",
        }
    }

    /// Parse a field name, accepting wire names case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        SortField::all()
            .iter()
            .copied()
            .find(|f| f.as_str().to_lowercase() == wanted)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// How the active profile's projects are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Table,
    Board,
}

impl ViewMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "table" => Some(ViewMode::Table),
            "board" => Some(ViewMode::Board),
            _ => None,
        }
    }
}

/// Root of everything that is persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub profiles: Vec<Profile>,
    pub active_profile_id: Option<String>,
    #[serde(default)]
    pub sort_field: SortField,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub board_sort_by_score: bool,
}

impl AppState {
    /// Creates an empty state with default sorting
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profile_mut(&mut self, id: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    /// Gets the currently selected profile
    pub fn active_profile(&self) -> Option<&Profile> {
        let id = self.active_profile_id.as_deref()?;
        self.profile(id)
    }

    pub fn active_profile_mut(&mut self) -> Option<&mut Profile> {
        let id = self.active_profile_id.clone()?;
        self.profile_mut(&id)
    }

    /// Points `active_profile_id` at an existing profile (or None when there are none)
    pub fn resolve_active_profile(&mut self) {
        let valid = self
            .active_profile_id
            .as_deref()
            .is_some_and(|id| self.profiles.iter().any(|p| p.id == id));
        if !valid {
            self.active_profile_id = self.profiles.first().map(|p| p.id.clone());
        }
    }

    /// Total number of projects across all profiles
    pub fn project_count(&self) -> usize {
        self.profiles.iter().map(|p| p.projects.len()).sum()
    }
}
