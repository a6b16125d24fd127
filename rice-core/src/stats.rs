//! Per-profile summary: project counts by category and RICE score statistics

use std::collections::HashSet;

use crate::models::Profile;
use crate::rice::calculate_rice_score;

/// Label used when a project has no value for a counted field
pub const UNSET_LABEL: &str = "(none)";

/// Mean, median, min, max and total of a profile's RICE scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiceStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub total: f64,
}

impl RiceStats {
    /// None when there are no finite scores
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let total: f64 = sorted.iter().sum();
        let mid = n / 2;
        let median = if n % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            mean: total / n as f64,
            median,
            min: sorted[0],
            max: sorted[n - 1],
            total,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStats {
    pub total_projects: usize,
    pub unique_countries: usize,
    /// `(label, count)` in first-seen order
    pub by_status: Vec<(String, usize)>,
    pub by_type: Vec<(String, usize)>,
    pub by_tshirt_size: Vec<(String, usize)>,
    pub rice: Option<RiceStats>,
}

fn count(counts: &mut Vec<(String, usize)>, value: Option<&str>) {
    let label = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNSET_LABEL);
    match counts.iter_mut().find(|(l, _)| l == label) {
        Some((_, n)) => *n += 1,
        None => counts.push((label.to_string(), 1)),
    }
}

impl ProfileStats {
    pub fn for_profile(profile: &Profile) -> Self {
        let mut countries = HashSet::new();
        let mut by_status = Vec::new();
        let mut by_type = Vec::new();
        let mut by_tshirt_size = Vec::new();
        let mut scores = Vec::with_capacity(profile.projects.len());

        for project in &profile.projects {
            countries.extend(
                project
                    .countries
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty()),
            );
            count(&mut by_status, project.project_status.as_deref());
            count(&mut by_type, project.project_type.as_deref());
            count(&mut by_tshirt_size, project.tshirt_size.as_deref());
            scores.push(calculate_rice_score(project));
        }

        Self {
            total_projects: profile.projects.len(),
            unique_countries: countries.len(),
            by_status,
            by_type,
            by_tshirt_size,
            rice: RiceStats::from_scores(&scores),
        }
    }
}
