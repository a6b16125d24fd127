//! Coerces untrusted objects into canonical projects and profiles
//!
//! Input comes from import files, CSV rows or older storage shapes, so every field is
//! read from a loose `serde_json::Value` and replaced by a default when it is missing
//! or malformed. Normalizing an already-canonical value yields an equal value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::{generate_id, Profile, Project};

/// Where a record came from; selects placeholders and how strict some fields are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Read back from local storage
    Loaded,
    /// Read from an import file
    Imported,
}

impl Origin {
    fn project_title(self) -> &'static str {
        match self {
            Origin::Loaded => "Untitled project",
            Origin::Imported => "Imported project",
        }
    }

    fn profile_name(self) -> &'static str {
        match self {
            Origin::Loaded => "Unnamed profile",
            Origin::Imported => "Imported profile",
        }
    }
}

/// Trims a currency code; blank becomes None. Case is preserved.
pub fn normalize_currency(val: Option<&str>) -> Option<String> {
    let trimmed = val?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trims, drops blanks and removes duplicates while keeping first-seen order
pub fn normalize_countries<I, S>(countries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for country in countries {
        let country = country.as_ref().trim();
        if !country.is_empty() && !out.iter().any(|c| c == country) {
            out.push(country.to_string());
        }
    }
    out
}

/// Uppercases and trims a planning period; blank becomes None
pub fn normalize_period(val: Option<&str>) -> Option<String> {
    let trimmed = val?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Reads a number from a JSON number or a numeric string
pub fn number_or_none(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// String form of a scalar; null, missing and empty values become None
fn scalar_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn text_or(value: Option<&Value>, fallback: &str) -> String {
    scalar_text(value).unwrap_or_else(|| fallback.to_string())
}

fn trimmed_or_none(value: Option<&Value>) -> Option<String> {
    let text = scalar_text(value)?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn id_or_generate(value: Option<&Value>, prefix: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => generate_id(prefix),
    }
}

/// Parses RFC 3339 timestamps, plus naive date-times and plain dates (taken as UTC)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

/// Normalizes one project; returns None when `raw` is not an object
pub fn normalize_project(raw: &Value, origin: Origin) -> Option<Project> {
    let obj = raw.as_object()?;
    let field = |name: &str| obj.get(name);

    let created_at = timestamp(field("createdAt")).unwrap_or_else(Utc::now);
    let modified_at = timestamp(field("modifiedAt")).unwrap_or(created_at);

    let financial_impact_value =
        number_or_none(field("financialImpactValue")).filter(|v| match origin {
            Origin::Imported => *v >= 0.0,
            Origin::Loaded => true,
        });

    let countries = match field("countries") {
        Some(Value::Array(items)) => {
            normalize_countries(items.iter().filter_map(|c| scalar_text(Some(c))))
        }
        _ => Vec::new(),
    };

    let mut project = Project {
        id: id_or_generate(field("id"), "project"),
        title: text_or(field("title"), origin.project_title()),
        description: text_or(field("description"), ""),
        reach_value: number_or_none(field("reachValue")).unwrap_or(0.0),
        reach_description: text_or(field("reachDescription"), ""),
        impact_value: number_or_none(field("impactValue")).unwrap_or(1.0),
        impact_description: text_or(field("impactDescription"), ""),
        confidence_value: number_or_none(field("confidenceValue")).unwrap_or(50.0),
        confidence_description: text_or(field("confidenceDescription"), ""),
        effort_value: number_or_none(field("effortValue"))
            .filter(|v| *v > 0.0)
            .unwrap_or(1.0),
        effort_description: text_or(field("effortDescription"), ""),
        financial_impact_value,
        financial_impact_currency: normalize_currency(
            scalar_text(field("financialImpactCurrency")).as_deref(),
        ),
        project_type: trimmed_or_none(field("projectType")),
        project_status: trimmed_or_none(field("projectStatus")),
        tshirt_size: trimmed_or_none(field("tshirtSize")),
        project_period: normalize_period(scalar_text(field("projectPeriod")).as_deref()),
        countries,
        created_at,
        modified_at,
        rice_score: 0.0,
    };
    project.refresh_score();
    Some(project)
}

fn normalize_board_order(value: Option<&Value>) -> HashMap<String, Vec<String>> {
    let Some(Value::Object(columns)) = value else {
        return HashMap::new();
    };
    columns
        .iter()
        .filter_map(|(status, ids)| {
            let ids: Vec<String> = ids
                .as_array()?
                .iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect();
            (!ids.is_empty()).then(|| (status.clone(), ids))
        })
        .collect()
}

/// Normalizes a profile and its projects; malformed projects are dropped
pub fn normalize_profile(raw: &Value, origin: Origin) -> Option<Profile> {
    let obj = raw.as_object()?;

    let projects: Vec<Project> = match obj.get("projects") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|p| normalize_project(p, origin))
            .collect(),
        _ => Vec::new(),
    };

    Some(Profile {
        id: id_or_generate(obj.get("id"), "profile"),
        name: text_or(obj.get("name"), origin.profile_name()),
        team: text_or(obj.get("team"), ""),
        created_at: timestamp(obj.get("createdAt")).unwrap_or_else(Utc::now),
        projects,
        board_order: normalize_board_order(obj.get("boardOrder")),
    })
}

/// Normalizes a loose list of profiles, skipping entries that are not objects
pub fn normalize_profiles(raw: &[Value], origin: Origin) -> Vec<Profile> {
    let profiles: Vec<Profile> = raw
        .iter()
        .filter_map(|p| normalize_profile(p, origin))
        .collect();
    if profiles.len() < raw.len() {
        log::warn!(
            "Dropped {} malformed profile(s) during normalization",
            raw.len() - profiles.len()
        );
    }
    profiles
}
