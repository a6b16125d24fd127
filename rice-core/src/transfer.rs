//! JSON and CSV import/export files
//!
//! Parsing is split from file reading so the whole import pipeline can be exercised on
//! in-memory text.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::csv::{build_profiles_from_csv_rows, parse_csv};
use crate::models::{AppState, Profile, SortDirection, SortField};
use crate::normalize::{normalize_profiles, Origin};

/// Version written into JSON exports
pub const EXPORT_VERSION: u32 = 1;

/// File format of an import or export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Json,
    Csv,
}

impl ImportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(ImportFormat::Json),
            "csv" => Some(ImportFormat::Csv),
            _ => None,
        }
    }

    /// An explicit format wins; otherwise `.csv` files are CSV and everything else JSON
    pub fn detect(path: &Path, explicit: Option<ImportFormat>) -> Self {
        if let Some(format) = explicit {
            return format;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ImportFormat::Csv,
            _ => ImportFormat::Json,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImportFormat::Json => "json",
            ImportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFormat::Json => write!(f, "JSON"),
            ImportFormat::Csv => write!(f, "CSV"),
        }
    }
}

/// Reasons an import is rejected; state is left untouched for all of them
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import failed while reading the {format} file {path:?}: {source}")]
    Read {
        path: PathBuf,
        format: ImportFormat,
        #[source]
        source: std::io::Error,
    },

    #[error("Import failed. Please check that you selected a valid JSON export file. ({0})")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Import failed. Expected an array of profiles or an object with a 'profiles' array.")]
    InvalidShape,

    #[error("Import file contains no profiles.")]
    NoProfiles,

    #[error("Import file contains no rows.")]
    NoRows,

    #[error("Import file contains no data rows.")]
    NoDataRows,

    #[error("No valid data found in CSV file.")]
    NoValidData,
}

/// Top-level document of a JSON export
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload<'a> {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub profiles: &'a [Profile],
    pub active_profile_id: Option<&'a str>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl<'a> ExportPayload<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            profiles: &state.profiles,
            active_profile_id: state.active_profile_id.as_deref(),
            sort_field: state.sort_field,
            sort_direction: state.sort_direction,
        }
    }
}

/// Pretty-printed JSON export of the whole state
pub fn export_json(state: &AppState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportPayload::new(state))
}

/// `rice-prioritizer-export-YYYYMMDD-HHMM.<ext>`
pub fn export_file_name(format: ImportFormat, now: NaiveDateTime) -> String {
    format!(
        "rice-prioritizer-export-{}.{}",
        now.format("%Y%m%d-%H%M"),
        format.extension()
    )
}

pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Parses a JSON export (current object form or legacy bare array) into profiles
pub fn parse_json_import(text: &str) -> Result<Vec<Profile>, ImportError> {
    let parsed: Value = serde_json::from_str(strip_bom(text))?;

    let raw_profiles = match parsed {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("profiles") {
            Some(Value::Array(items)) => items,
            _ => return Err(ImportError::InvalidShape),
        },
        _ => return Err(ImportError::InvalidShape),
    };

    if raw_profiles.is_empty() {
        return Err(ImportError::NoProfiles);
    }
    let profiles = normalize_profiles(&raw_profiles, Origin::Imported);
    if profiles.is_empty() {
        return Err(ImportError::NoProfiles);
    }
    Ok(profiles)
}

/// Parses a CSV export into profiles
///
/// Rows whose cells are all blank are ignored.
pub fn parse_csv_import(text: &str) -> Result<Vec<Profile>, ImportError> {
    let rows = parse_csv(strip_bom(text));
    let Some((header, rest)) = rows.split_first() else {
        return Err(ImportError::NoRows);
    };

    let header: Vec<String> = header.iter().map(|cell| cell.trim().to_string()).collect();
    let data_rows: Vec<Vec<String>> = rest
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .cloned()
        .collect();
    if data_rows.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    let raw_profiles = build_profiles_from_csv_rows(&header, &data_rows);
    let profiles = normalize_profiles(&raw_profiles, Origin::Imported);
    if profiles.is_empty() {
        return Err(ImportError::NoValidData);
    }
    Ok(profiles)
}

pub fn parse_import(text: &str, format: ImportFormat) -> Result<Vec<Profile>, ImportError> {
    match format {
        ImportFormat::Json => parse_json_import(text),
        ImportFormat::Csv => parse_csv_import(text),
    }
}

/// Reads an import file, returning its text and the format it should be parsed as
pub fn read_import_file(
    path: &Path,
    format: Option<ImportFormat>,
) -> Result<(String, ImportFormat), ImportError> {
    let format = ImportFormat::detect(path, format);
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        format,
        source,
    })?;
    Ok((text, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::export_csv;
    use crate::models::Project;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn state_with_project() -> AppState {
        let mut profile = Profile::new("Growth".to_string(), "Core".to_string());
        profile.id = "p1".to_string();
        let mut project = Project::new("Checkout".to_string());
        project.id = "a".to_string();
        project.reach_value = 1000.0;
        project.impact_value = 3.0;
        project.confidence_value = 80.0;
        project.effort_value = 5.0;
        project.countries = vec!["Spain".to_string(), "Peru".to_string()];
        project.refresh_score();
        profile.projects.push(project);
        AppState {
            active_profile_id: Some("p1".to_string()),
            profiles: vec![profile],
            ..Default::default()
        }
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ImportFormat::detect(Path::new("data.CSV"), None),
            ImportFormat::Csv
        );
        assert_eq!(
            ImportFormat::detect(Path::new("data.json"), None),
            ImportFormat::Json
        );
        assert_eq!(ImportFormat::detect(Path::new("data"), None), ImportFormat::Json);
        assert_eq!(
            ImportFormat::detect(Path::new("data.json"), Some(ImportFormat::Csv)),
            ImportFormat::Csv
        );
    }

    #[test]
    fn test_export_file_name() {
        let now = NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(
            export_file_name(ImportFormat::Json, now),
            "rice-prioritizer-export-20250307-0905.json"
        );
        assert_eq!(
            export_file_name(ImportFormat::Csv, now),
            "rice-prioritizer-export-20250307-0905.csv"
        );
    }

    #[test]
    fn test_export_json_payload() {
        let state = state_with_project();
        let text = export_json(&state).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["activeProfileId"], "p1");
        assert_eq!(value["sortField"], "createdAt");
        assert_eq!(value["sortDirection"], "desc");
        assert_eq!(value["profiles"][0]["projects"][0]["riceScore"], 480.0);
        assert!(value["exportedAt"].is_string());
    }

    #[test]
    fn test_json_export_reimports() {
        let state = state_with_project();
        let profiles = parse_json_import(&export_json(&state).unwrap()).unwrap();
        assert_eq!(profiles, state.profiles);
    }

    #[test]
    fn test_json_import_strips_bom_and_accepts_legacy_array() {
        let text = format!("\u{feff}{}", json!([{"name": "Growth", "projects": []}]));
        let profiles = parse_json_import(&text).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "Growth");
    }

    #[test]
    fn test_json_import_errors() {
        assert!(matches!(
            parse_json_import("not json"),
            Err(ImportError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_json_import("\"text\""),
            Err(ImportError::InvalidShape)
        ));
        assert!(matches!(
            parse_json_import("{\"profiles\": 3}"),
            Err(ImportError::InvalidShape)
        ));
        assert!(matches!(
            parse_json_import("{\"profiles\": []}"),
            Err(ImportError::NoProfiles)
        ));
        assert!(matches!(parse_json_import("[1, 2]"), Err(ImportError::NoProfiles)));
    }

    #[test]
    fn test_csv_export_reimports_same_projects() {
        let state = state_with_project();
        let profiles = parse_csv_import(&export_csv(&state)).unwrap();

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, "p1");
        let original = &state.profiles[0].projects[0];
        let reimported = &profiles[0].projects[0];
        assert_eq!(reimported.id, original.id);
        assert_eq!(reimported.reach_value, original.reach_value);
        assert_eq!(reimported.confidence_value, original.confidence_value);
        assert_eq!(reimported.countries, original.countries);
        assert_eq!(reimported.rice_score, 480.0);
    }

    #[test]
    fn test_csv_import_errors() {
        assert!(matches!(parse_csv_import(""), Err(ImportError::NoRows)));
        assert!(matches!(
            parse_csv_import("profileId,profileName\n , \n"),
            Err(ImportError::NoDataRows)
        ));
        assert!(matches!(
            parse_csv_import("profileId,profileName\np1,\n"),
            Err(ImportError::NoValidData)
        ));
    }

    #[test]
    fn test_read_import_file() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "profileId,profileName\np1,Growth\n").unwrap();

        let (text, format) = read_import_file(file.path(), None).unwrap();
        assert_eq!(format, ImportFormat::Csv);
        let profiles = parse_import(&text, format).unwrap();
        assert_eq!(profiles[0].name, "Growth");

        let missing = read_import_file(Path::new("/nonexistent/import.json"), None);
        assert!(matches!(missing, Err(ImportError::Read { .. })));
    }
}
