//! Reconciles imported profiles with the existing state
//!
//! Import is strictly additive: existing projects are never overwritten and nothing is
//! deleted, so importing the same file twice adds nothing the second time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::models::{AppState, Profile};

/// How an imported profile is matched against existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// First existing profile whose id OR name equals the imported one
    ///
    /// Two different profiles sharing a display name collapse into one.
    #[default]
    IdOrName,
    /// Ids match; a same-name profile matches only when it already holds one of the
    /// imported project ids (or the import carries no projects)
    ///
    /// Any other same-name profile is added separately and reported.
    IdOnly,
}

impl MatchPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "id-or-name" | "id_or_name" | "idorname" => Some(MatchPolicy::IdOrName),
            "id-only" | "id_only" | "idonly" | "id" => Some(MatchPolicy::IdOnly),
            _ => None,
        }
    }

    fn find(self, existing: &[Profile], imported: &Profile) -> Option<usize> {
        match self {
            MatchPolicy::IdOrName => existing
                .iter()
                .position(|p| p.id == imported.id || p.name == imported.name),
            MatchPolicy::IdOnly => existing
                .iter()
                .position(|p| p.id == imported.id)
                .or_else(|| {
                    existing
                        .iter()
                        .position(|p| p.name == imported.name && shares_projects(p, imported))
                }),
        }
    }
}

/// Import files without profile ids get a fresh id on every read, so a re-run is
/// recognised by its project ids instead
fn shares_projects(existing: &Profile, imported: &Profile) -> bool {
    imported.projects.is_empty()
        || imported
            .projects
            .iter()
            .any(|p| existing.project(&p.id).is_some())
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::IdOrName => write!(f, "id-or-name"),
            MatchPolicy::IdOnly => write!(f, "id-only"),
        }
    }
}

/// Counters reported after a merge
///
/// `merged_projects` counts the projects appended into an already existing profile;
/// they are included in `added_projects` as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added_profiles: usize,
    pub merged_profiles: usize,
    pub added_projects: usize,
    pub merged_projects: usize,
    pub skipped_projects: usize,
    /// Imported profile names that matched an existing profile with a different id
    /// under [`MatchPolicy::IdOnly`]
    pub name_collisions: Vec<String>,
}

impl MergeSummary {
    /// One-line summary for the user
    pub fn message(&self) -> String {
        self.message_for("Import")
    }

    /// Summary starting with `"{label} complete."`
    pub fn message_for(&self, label: &str) -> String {
        let mut msg = format!(
            "{} complete. {} profile(s) added, {} merged, {} project(s) imported.",
            label, self.added_profiles, self.merged_profiles, self.added_projects
        );
        if self.skipped_projects > 0 {
            msg.push_str(&format!(
                " {} project(s) already existed and were skipped.",
                self.skipped_projects
            ));
        }
        msg
    }
}

/// Merges already-normalized profiles into `state`
pub fn merge_imported_profiles(
    state: &mut AppState,
    imported: Vec<Profile>,
    policy: MatchPolicy,
) -> MergeSummary {
    let mut summary = MergeSummary::default();

    for mut profile in imported {
        match policy.find(&state.profiles, &profile) {
            None => {
                if policy == MatchPolicy::IdOnly
                    && state.profiles.iter().any(|p| p.name == profile.name)
                {
                    summary.name_collisions.push(profile.name.clone());
                }

                let mut seen = HashSet::new();
                let before = profile.projects.len();
                profile.projects.retain(|p| seen.insert(p.id.clone()));
                summary.skipped_projects += before - profile.projects.len();

                for project in &mut profile.projects {
                    project.refresh_score();
                }
                summary.added_profiles += 1;
                summary.added_projects += profile.projects.len();
                state.profiles.push(profile);
            }
            Some(idx) => {
                summary.merged_profiles += 1;
                let existing = &mut state.profiles[idx];
                let mut known: HashSet<String> =
                    existing.projects.iter().map(|p| p.id.clone()).collect();

                for mut project in profile.projects {
                    if !known.insert(project.id.clone()) {
                        summary.skipped_projects += 1;
                        continue;
                    }
                    project.refresh_score();
                    existing.projects.push(project);
                    summary.added_projects += 1;
                    summary.merged_projects += 1;
                }
            }
        }
    }

    if state.active_profile_id.is_none() {
        state.active_profile_id = state.profiles.first().map(|p| p.id.clone());
    }

    log::info!(
        "Merged import: {} profile(s) added, {} merged, {} project(s) added, {} skipped",
        summary.added_profiles,
        summary.merged_profiles,
        summary.added_projects,
        summary.skipped_projects
    );

    summary
}
