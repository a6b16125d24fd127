//! Flat CSV representation of profiles and projects
//!
//! One row per project, profile columns repeated on every row. A profile without
//! projects still gets a single row so its metadata survives a round trip.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::models::{generate_id, AppState, Profile, Project};
use crate::normalize::{normalize_countries, normalize_currency, normalize_period};
use crate::rice::calculate_rice_score;

/// Fixed export header; import looks columns up by name so order is not required there
pub const CSV_HEADER: [&str; 25] = [
    "profileId",
    "profileName",
    "profileTeam",
    "profileCreatedAt",
    "projectId",
    "projectTitle",
    "projectDescription",
    "projectCreatedAt",
    "projectModifiedAt",
    "reachValue",
    "reachDescription",
    "impactValue",
    "impactDescription",
    "confidenceValue",
    "confidenceDescription",
    "effortValue",
    "effortDescription",
    "financialImpactValue",
    "financialImpactCurrency",
    "projectType",
    "projectStatus",
    "tshirtSize",
    "projectPeriod",
    "countries",
    "riceScore",
];

/// Separator used for the list of countries inside a single cell
pub const COUNTRY_SEPARATOR: char = '|';

/// Quotes a cell when it contains a comma, quote or newline
pub fn escape_csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Splits CSV text into rows of cells
///
/// `""` inside quotes is a literal quote and `\r` is dropped everywhere. Blank rows are
/// returned as-is; callers filter them.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut value = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\r' {
            continue;
        }
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    value.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => value.push(ch),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => current.push(std::mem::take(&mut value)),
                '\n' => {
                    current.push(std::mem::take(&mut value));
                    rows.push(std::mem::take(&mut current));
                }
                _ => value.push(ch),
            }
        }
    }

    if !value.is_empty() || !current.is_empty() {
        current.push(value);
        rows.push(current);
    }

    rows
}

fn timestamp_cell(ts: &chrono::DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn number_cell(value: f64) -> String {
    value.to_string()
}

fn profile_cells(profile: &Profile) -> [String; 4] {
    [
        profile.id.clone(),
        profile.name.clone(),
        profile.team.clone(),
        timestamp_cell(&profile.created_at),
    ]
}

fn project_cells(project: &Project) -> [String; 21] {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        project.id.clone(),
        project.title.clone(),
        project.description.clone(),
        timestamp_cell(&project.created_at),
        timestamp_cell(&project.modified_at),
        number_cell(project.reach_value),
        project.reach_description.clone(),
        number_cell(project.impact_value),
        project.impact_description.clone(),
        number_cell(project.confidence_value),
        project.confidence_description.clone(),
        number_cell(project.effort_value),
        project.effort_description.clone(),
        project
            .financial_impact_value
            .map(number_cell)
            .unwrap_or_default(),
        opt(&project.financial_impact_currency),
        opt(&project.project_type),
        opt(&project.project_status),
        opt(&project.tshirt_size),
        opt(&project.project_period),
        project.countries.join(&COUNTRY_SEPARATOR.to_string()),
        number_cell(calculate_rice_score(project)),
    ]
}

/// Serializes every profile × project pair; rows are joined with `\n`
pub fn export_csv(state: &AppState) -> String {
    let mut lines = vec![CSV_HEADER.join(",")];

    for profile in &state.profiles {
        let profile_part: Vec<String> = profile_cells(profile)
            .iter()
            .map(|c| escape_csv_cell(c))
            .collect();

        if profile.projects.is_empty() {
            let mut row = profile_part.clone();
            row.resize(CSV_HEADER.len(), String::new());
            lines.push(row.join(","));
            continue;
        }

        for project in &profile.projects {
            let mut row = profile_part.clone();
            row.extend(project_cells(project).iter().map(|c| escape_csv_cell(c)));
            lines.push(row.join(","));
        }
    }

    lines.join("\n")
}

/// Column-name lookup over one data row
struct RowReader<'a> {
    columns: &'a HashMap<String, usize>,
    cells: &'a [String],
}

impl<'a> RowReader<'a> {
    fn raw(&self, column: &str) -> Option<&'a str> {
        let idx = *self.columns.get(column)?;
        self.cells.get(idx).map(String::as_str)
    }

    fn text(&self, column: &str) -> String {
        self.raw(column).unwrap_or_default().to_string()
    }

    fn trimmed(&self, column: &str) -> String {
        self.raw(column).unwrap_or_default().trim().to_string()
    }

    fn optional(&self, column: &str) -> Value {
        let value = self.trimmed(column);
        if value.is_empty() {
            Value::Null
        } else {
            Value::String(value)
        }
    }

    /// Parse-or-null: blank and unparseable cells become null
    fn number(&self, column: &str) -> Value {
        self.raw(column)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .unwrap_or(Value::Null)
    }
}

/// Groups CSV data rows into raw profile objects ready for normalization
///
/// Rows are keyed by `profileId`, falling back to `profileName`; rows without a profile
/// name are skipped. Rows with neither `projectTitle` nor `projectId` only carry profile
/// metadata.
pub fn build_profiles_from_csv_rows(header: &[String], rows: &[Vec<String>]) -> Vec<Value> {
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let key = name.trim();
            (!key.is_empty()).then(|| (key.to_string(), idx))
        })
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Map<String, Value>> = HashMap::new();
    let now = || Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    for cells in rows {
        let row = RowReader {
            columns: &columns,
            cells,
        };

        let profile_name = row.trimmed("profileName");
        if profile_name.is_empty() {
            continue;
        }
        let profile_id = row.trimmed("profileId");
        let key = if profile_id.is_empty() {
            profile_name.clone()
        } else {
            profile_id.clone()
        };

        let profile = by_key.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            let id = if profile_id.is_empty() {
                generate_id("profile")
            } else {
                profile_id.clone()
            };
            let created_at = match row.trimmed("profileCreatedAt") {
                s if s.is_empty() => now(),
                s => s,
            };
            let mut profile = Map::new();
            profile.insert("id".to_string(), Value::String(id));
            profile.insert("name".to_string(), Value::String(profile_name));
            profile.insert("team".to_string(), Value::String(row.trimmed("profileTeam")));
            profile.insert("createdAt".to_string(), Value::String(created_at));
            profile.insert("projects".to_string(), Value::Array(Vec::new()));
            profile
        });

        let project_title = row.trimmed("projectTitle");
        let project_id = row.trimmed("projectId");
        if project_title.is_empty() && project_id.is_empty() {
            continue;
        }

        let id = if project_id.is_empty() {
            generate_id("project")
        } else {
            project_id
        };
        let title = if project_title.is_empty() {
            "Imported project".to_string()
        } else {
            project_title
        };
        let created_at = match row.trimmed("projectCreatedAt") {
            s if s.is_empty() => now(),
            s => s,
        };
        let modified_at = row.optional("projectModifiedAt");
        let countries = normalize_countries(row.text("countries").split(COUNTRY_SEPARATOR));

        let project = json!({
            "id": id,
            "createdAt": created_at,
            "modifiedAt": modified_at,
            "title": title,
            "description": row.text("projectDescription"),
            "reachValue": row.number("reachValue"),
            "reachDescription": row.text("reachDescription"),
            "impactValue": row.number("impactValue"),
            "impactDescription": row.text("impactDescription"),
            "confidenceValue": row.number("confidenceValue"),
            "confidenceDescription": row.text("confidenceDescription"),
            "effortValue": row.number("effortValue"),
            "effortDescription": row.text("effortDescription"),
            "financialImpactValue": row.number("financialImpactValue"),
            "financialImpactCurrency": normalize_currency(row.raw("financialImpactCurrency")),
            "projectType": row.optional("projectType"),
            "projectStatus": row.optional("projectStatus"),
            "tshirtSize": row.optional("tshirtSize"),
            "projectPeriod": normalize_period(row.raw("projectPeriod")),
            "countries": countries,
        });

        if let Some(Value::Array(projects)) = profile.get_mut("projects") {
            projects.push(project);
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key).map(Value::Object))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_profiles, Origin};

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_csv_quoted_comma() {
        let rows = parse_csv("a,\"b,c\",d\n1,2,3");
        assert_eq!(rows, vec![strings(&["a", "b,c", "d"]), strings(&["1", "2", "3"])]);
    }

    #[test]
    fn test_parse_csv_escaped_quotes_and_newlines() {
        let rows = parse_csv("\"say \"\"hi\"\"\",\"line1\nline2\"\r\nx,y\r\n");
        assert_eq!(
            rows,
            vec![strings(&["say \"hi\"", "line1\nline2"]), strings(&["x", "y"])]
        );
    }

    #[test]
    fn test_parse_csv_keeps_blank_rows_and_trailing_empty_cell() {
        let rows = parse_csv("a,b\n\nc,");
        assert_eq!(rows, vec![strings(&["a", "b"]), strings(&[""]), strings(&["c", ""])]);
        assert!(parse_csv("").is_empty());
    }

    #[test]
    fn test_escape_csv_cell() {
        assert_eq!(escape_csv_cell("plain"), "plain");
        assert_eq!(escape_csv_cell("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_cell("say \"x\""), "\"say \"\"x\"\"\"");
        assert_eq!(escape_csv_cell("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_export_empty_profile_gets_one_row() {
        let mut state = AppState::new();
        state
            .profiles
            .push(Profile::new("Empty, Inc".to_string(), "Ops".to_string()));

        let csv = export_csv(&state);
        let rows = parse_csv(&csv);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], strings(&CSV_HEADER));
        assert_eq!(rows[1].len(), CSV_HEADER.len());
        assert_eq!(rows[1][1], "Empty, Inc");
        assert!(rows[1][4..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_export_project_row() {
        let mut state = AppState::new();
        let mut profile = Profile::new("Growth".to_string(), String::new());
        let mut project = Project::new("Referral, v2".to_string());
        project.reach_value = 1000.0;
        project.impact_value = 3.0;
        project.confidence_value = 80.0;
        project.effort_value = 5.0;
        project.countries = vec!["Spain".to_string(), "Chile".to_string()];
        profile.projects.push(project);
        state.profiles.push(profile);

        let rows = parse_csv(&export_csv(&state));
        let row = &rows[1];
        assert_eq!(row[5], "Referral, v2");
        assert_eq!(row[9], "1000");
        assert_eq!(row[17], "");
        assert_eq!(row[20], "Not Started");
        assert_eq!(row[23], "Spain|Chile");
        assert_eq!(row[24], "480");
    }

    #[test]
    fn test_build_profiles_groups_and_skips() {
        let header = strings(&[
            "profileId",
            "profileName",
            "projectId",
            "projectTitle",
            "reachValue",
            "countries",
        ]);
        let rows = vec![
            strings(&["", "Growth", "", "Search", "12", "Peru| |Peru|Chile"]),
            strings(&["", "Growth", "p2", "", "oops", ""]),
            strings(&["", "", "p3", "Orphan", "1", ""]),
            strings(&["prof_9", "Core", "", "", "", ""]),
        ];

        let profiles = build_profiles_from_csv_rows(&header, &rows);
        assert_eq!(profiles.len(), 2);

        let growth = &profiles[0];
        assert_eq!(growth["name"], "Growth");
        let projects = growth["projects"].as_array().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0]["reachValue"], 12.0);
        assert_eq!(projects[0]["countries"], json!(["Peru", "Chile"]));
        assert_eq!(projects[1]["id"], "p2");
        assert_eq!(projects[1]["title"], "Imported project");
        assert!(projects[1]["reachValue"].is_null());

        let core = &profiles[1];
        assert_eq!(core["id"], "prof_9");
        assert!(core["projects"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_csv_round_trip_preserves_projects() {
        let mut state = AppState::new();
        let mut profile = Profile::new("Growth".to_string(), "Web".to_string());
        for (title, reach) in [("Alpha", 10.0), ("Beta \"quoted\"", 250.0)] {
            let mut project = Project::new(title.to_string());
            project.reach_value = reach;
            project.confidence_value = 0.7;
            project.financial_impact_value = Some(1500.5);
            project.financial_impact_currency = Some("EUR".to_string());
            project.project_period = Some("Q1".to_string());
            project.description = "multi\nline, text".to_string();
            project.refresh_score();
            profile.projects.push(project);
        }
        state.profiles.push(profile);

        let rows = parse_csv(&export_csv(&state));
        let raw = build_profiles_from_csv_rows(&rows[0], &rows[1..]);
        let imported = normalize_profiles(&raw, Origin::Imported);

        assert_eq!(imported.len(), 1);
        let original = &state.profiles[0];
        assert_eq!(imported[0].id, original.id);
        assert_eq!(imported[0].team, "Web");
        for (a, b) in original.projects.iter().zip(&imported[0].projects) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.description, b.description);
            assert_eq!(a.reach_value, b.reach_value);
            assert_eq!(a.confidence_value, b.confidence_value);
            assert_eq!(a.financial_impact_value, b.financial_impact_value);
            assert_eq!(a.financial_impact_currency, b.financial_impact_currency);
            assert_eq!(a.project_status, b.project_status);
            assert_eq!(a.rice_score, b.rice_score);
        }
    }
}
