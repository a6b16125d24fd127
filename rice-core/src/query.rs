//! Filtering, sorting and board grouping of a profile's projects

use chrono::Utc;
use std::cmp::Ordering;

use crate::models::{Profile, Project, SortDirection, SortField, PROJECT_STATUSES};
use crate::rice::calculate_rice_score;

/// Project table filters; empty fields do not filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Any of these periods (compared uppercase)
    pub periods: Vec<String>,
    pub impact: Option<f64>,
    pub effort: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub tshirt_size: Option<String>,
    pub project_type: Option<String>,
    /// Any of these countries
    pub countries: Vec<String>,
}

fn blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ProjectFilter {
    pub fn is_empty(&self) -> bool {
        *self == ProjectFilter::default()
    }

    /// Does `project` pass every set filter?
    pub fn matches(&self, project: &Project) -> bool {
        if let Some(query) = blank(&self.title) {
            if !project.title.to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }

        if !self.periods.is_empty() {
            let Some(period) = project.project_period.as_deref() else {
                return false;
            };
            let period = period.trim().to_uppercase();
            if !self.periods.iter().any(|p| p.trim().to_uppercase() == period) {
                return false;
            }
        }

        if self.impact.is_some_and(|v| v != project.impact_value) {
            return false;
        }
        if self.effort.is_some_and(|v| v != project.effort_value) {
            return false;
        }

        if let Some(currency) = blank(&self.currency) {
            let matches = project
                .financial_impact_currency
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(currency));
            if !matches {
                return false;
            }
        }

        let exact = |wanted: &Option<String>, actual: &Option<String>| match blank(wanted) {
            Some(w) => actual.as_deref() == Some(w),
            None => true,
        };
        if !exact(&self.status, &project.project_status)
            || !exact(&self.tshirt_size, &project.tshirt_size)
            || !exact(&self.project_type, &project.project_type)
        {
            return false;
        }

        if !self.countries.is_empty()
            && !project.countries.iter().any(|c| self.countries.contains(c))
        {
            return false;
        }

        true
    }

    pub fn apply<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        projects.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Newest first
fn created_desc(a: &Project, b: &Project) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

fn text_key(project: &Project, field: SortField) -> String {
    let value = match field {
        SortField::Title => Some(project.title.as_str()),
        SortField::ProjectType => project.project_type.as_deref(),
        SortField::ProjectStatus => project.project_status.as_deref(),
        SortField::TshirtSize => project.tshirt_size.as_deref(),
        SortField::FinancialImpactCurrency => project.financial_impact_currency.as_deref(),
        _ => None,
    };
    value.unwrap_or_default().to_lowercase()
}

fn number_key(project: &Project, field: SortField) -> f64 {
    match field {
        SortField::RiceScore => calculate_rice_score(project),
        SortField::FinancialImpactValue => project.financial_impact_value.unwrap_or(0.0),
        SortField::ImpactValue => project.impact_value,
        SortField::EffortValue => project.effort_value,
        _ => 0.0,
    }
}

/// Returns the projects sorted for the table
///
/// Text and numeric columns break ties newest-first regardless of direction.
pub fn sort_projects<'a>(
    projects: &[&'a Project],
    field: SortField,
    direction: SortDirection,
) -> Vec<&'a Project> {
    let directed = |ord: Ordering| match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    };

    let mut sorted = projects.to_vec();
    sorted.sort_by(|a, b| match field {
        SortField::Title
        | SortField::ProjectType
        | SortField::ProjectStatus
        | SortField::TshirtSize
        | SortField::FinancialImpactCurrency => {
            match text_key(a, field).cmp(&text_key(b, field)) {
                Ordering::Equal => created_desc(a, b),
                ord => directed(ord),
            }
        }
        SortField::RiceScore
        | SortField::FinancialImpactValue
        | SortField::ImpactValue
        | SortField::EffortValue => {
            match number_key(a, field).total_cmp(&number_key(b, field)) {
                Ordering::Equal => created_desc(a, b),
                ord => directed(ord),
            }
        }
        SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
        SortField::ModifiedAt => directed(a.modified_at.cmp(&b.modified_at)),
    });
    sorted
}

/// Next sort configuration after clicking a column header
pub fn toggle_sort(
    current: (SortField, SortDirection),
    field: SortField,
) -> (SortField, SortDirection) {
    let (current_field, current_direction) = current;
    if current_field == field {
        (field, current_direction.flipped())
    } else if field == SortField::Title {
        (field, SortDirection::Asc)
    } else {
        (field, SortDirection::Desc)
    }
}

/// One kanban column
#[derive(Debug, Clone)]
pub struct BoardColumn<'a> {
    pub status: String,
    pub projects: Vec<&'a Project>,
}

fn column_statuses(profile: &Profile) -> Vec<String> {
    let mut statuses: Vec<String> = PROJECT_STATUSES.iter().map(|s| s.to_string()).collect();
    for project in &profile.projects {
        let status = project.status_or_default();
        if !statuses.iter().any(|s| s == status) {
            statuses.push(status.to_string());
        }
    }
    statuses
}

/// Groups the profile's projects by status
///
/// With `sort_by_score` each column is ordered by score (highest first); otherwise the
/// saved board order is used, with projects missing from it appended in list order.
pub fn board_columns(profile: &Profile, sort_by_score: bool) -> Vec<BoardColumn<'_>> {
    column_statuses(profile)
        .into_iter()
        .map(|status| {
            let mut projects: Vec<&Project> = profile
                .projects
                .iter()
                .filter(|p| p.status_or_default() == status)
                .collect();

            if sort_by_score {
                projects.sort_by(|a, b| {
                    calculate_rice_score(*b)
                        .total_cmp(&calculate_rice_score(*a))
                        .then_with(|| created_desc(a, b))
                });
            } else if let Some(order) = profile.board_order.get(&status) {
                let rank = |p: &Project| {
                    order
                        .iter()
                        .position(|id| *id == p.id)
                        .unwrap_or(usize::MAX)
                };
                // stable: unlisted projects keep their natural order
                projects.sort_by_key(|p| rank(*p));
            }

            BoardColumn { status, projects }
        })
        .collect()
}

/// Moves a project into `status` at position `index` of that column
///
/// Returns false when the project does not exist in the profile.
pub fn move_on_board(profile: &mut Profile, project_id: &str, status: &str, index: usize) -> bool {
    let Some(source_status) = profile.project(project_id).map(|p| p.status_or_default().to_string())
    else {
        return false;
    };

    // Snapshot the current visual order of both columns before touching anything
    let mut target_ids: Vec<String> = board_columns(profile, false)
        .into_iter()
        .find(|c| c.status == status)
        .map(|c| c.projects.iter().map(|p| p.id.clone()).collect())
        .unwrap_or_default();
    target_ids.retain(|id| id != project_id);
    let index = index.min(target_ids.len());
    target_ids.insert(index, project_id.to_string());

    if source_status != status {
        let source_ids: Vec<String> = board_columns(profile, false)
            .into_iter()
            .find(|c| c.status == source_status)
            .map(|c| {
                c.projects
                    .iter()
                    .filter(|p| p.id != project_id)
                    .map(|p| p.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        if source_ids.is_empty() {
            profile.board_order.remove(&source_status);
        } else {
            profile.board_order.insert(source_status.clone(), source_ids);
        }

        if let Some(project) = profile.project_mut(project_id) {
            project.project_status = Some(status.to_string());
            project.modified_at = Utc::now();
        }
    }

    profile.board_order.insert(status.to_string(), target_ids);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn project(id: &str, title: &str, reach: f64, age_days: i64) -> Project {
        let mut p = Project::new(title.to_string());
        p.id = id.to_string();
        p.reach_value = reach;
        p.created_at =
            Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap() - Duration::days(age_days);
        p.modified_at = p.created_at;
        p.refresh_score();
        p
    }

    fn ids(projects: &[&Project]) -> Vec<String> {
        projects.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let projects = vec![project("a", "A", 1.0, 0), project("b", "B", 2.0, 1)];
        let filter = ProjectFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&projects).len(), 2);
    }

    #[test]
    fn test_filter_fields() {
        let mut a = project("a", "Checkout Flow", 1.0, 0);
        a.project_period = Some("Q1".to_string());
        a.financial_impact_currency = Some("usd".to_string());
        a.countries = vec!["Spain".to_string()];
        let mut b = project("b", "Search", 1.0, 1);
        b.project_status = Some("Done".to_string());
        let projects = vec![a, b];

        let by_title = ProjectFilter {
            title: Some("checkout".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&by_title.apply(&projects)), vec!["a"]);

        let by_period = ProjectFilter {
            periods: vec!["q1".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(&by_period.apply(&projects)), vec!["a"]);

        let by_currency = ProjectFilter {
            currency: Some("USD".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&by_currency.apply(&projects)), vec!["a"]);

        let by_status = ProjectFilter {
            status: Some("Done".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&by_status.apply(&projects)), vec!["b"]);

        let by_country = ProjectFilter {
            countries: vec!["Spain".to_string(), "Peru".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(&by_country.apply(&projects)), vec!["a"]);

        let by_impact = ProjectFilter {
            impact: Some(2.0),
            ..Default::default()
        };
        assert!(by_impact.apply(&projects).is_empty());
    }

    #[test]
    fn test_sort_by_score_with_created_tiebreak() {
        let projects = vec![
            project("low", "Low", 10.0, 0),
            project("tie_old", "Tie old", 50.0, 5),
            project("tie_new", "Tie new", 50.0, 1),
        ];
        let refs: Vec<&Project> = projects.iter().collect();

        let desc = sort_projects(&refs, SortField::RiceScore, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["tie_new", "tie_old", "low"]);

        let asc = sort_projects(&refs, SortField::RiceScore, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["low", "tie_new", "tie_old"]);
    }

    #[test]
    fn test_sort_by_title_case_insensitive() {
        let projects = vec![
            project("b", "beta", 1.0, 0),
            project("a", "Alpha", 1.0, 1),
            project("c", "Gamma", 1.0, 2),
        ];
        let refs: Vec<&Project> = projects.iter().collect();
        let sorted = sort_projects(&refs, SortField::Title, SortDirection::Asc);
        assert_eq!(ids(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_by_created_at() {
        let projects = vec![project("old", "Old", 1.0, 10), project("new", "New", 1.0, 0)];
        let refs: Vec<&Project> = projects.iter().collect();
        let sorted = sort_projects(&refs, SortField::CreatedAt, SortDirection::Desc);
        assert_eq!(ids(&sorted), vec!["new", "old"]);
    }

    #[test]
    fn test_toggle_sort() {
        let current = (SortField::CreatedAt, SortDirection::Desc);
        assert_eq!(
            toggle_sort(current, SortField::CreatedAt),
            (SortField::CreatedAt, SortDirection::Asc)
        );
        assert_eq!(
            toggle_sort(current, SortField::Title),
            (SortField::Title, SortDirection::Asc)
        );
        assert_eq!(
            toggle_sort(current, SortField::RiceScore),
            (SortField::RiceScore, SortDirection::Desc)
        );
    }

    fn board_profile() -> Profile {
        let mut profile = Profile::new("Growth".to_string(), String::new());
        let mut no_status = project("n", "No status", 5.0, 0);
        no_status.project_status = None;
        let mut custom = project("c", "Custom", 5.0, 0);
        custom.project_status = Some("Blocked".to_string());
        profile.projects = vec![
            project("a", "A", 10.0, 2),
            project("b", "B", 90.0, 1),
            no_status,
            custom,
        ];
        profile
    }

    #[test]
    fn test_board_columns_grouping_and_order() {
        let mut profile = board_profile();

        let columns = board_columns(&profile, false);
        assert_eq!(columns.len(), PROJECT_STATUSES.len() + 1);
        assert_eq!(columns[0].status, "Not Started");
        assert_eq!(ids(&columns[0].projects), vec!["a", "b", "n"]);
        assert_eq!(columns.last().unwrap().status, "Blocked");

        let by_score = board_columns(&profile, true);
        assert_eq!(ids(&by_score[0].projects), vec!["b", "a", "n"]);

        profile
            .board_order
            .insert("Not Started".to_string(), vec!["n".to_string(), "a".to_string()]);
        let manual = board_columns(&profile, false);
        assert_eq!(ids(&manual[0].projects), vec!["n", "a", "b"]);
    }

    #[test]
    fn test_move_on_board() {
        let mut profile = board_profile();

        assert!(move_on_board(&mut profile, "b", "Done", 0));
        assert_eq!(profile.project("b").unwrap().project_status.as_deref(), Some("Done"));
        assert_eq!(profile.board_order["Done"], vec!["b".to_string()]);
        assert_eq!(
            profile.board_order["Not Started"],
            vec!["a".to_string(), "n".to_string()]
        );

        // reorder within a column
        assert!(move_on_board(&mut profile, "n", "Not Started", 0));
        let columns = board_columns(&profile, false);
        assert_eq!(ids(&columns[0].projects), vec!["n", "a"]);

        assert!(!move_on_board(&mut profile, "missing", "Done", 0));
    }
}
