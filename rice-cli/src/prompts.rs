use anyhow::Result;
use inquire::{Confirm, CustomType, Editor, Select, Text};

use rice_core::{Project, ProjectInput, PROJECT_STATUSES, TSHIRT_SIZES};

const NONE_OPTION: &str = "(none)";

/// Prompts the user for a new profile
pub fn prompt_new_profile() -> Result<(String, String)> {
    let name = Text::new("Profile name:").prompt()?;
    let team = Text::new("Team (optional):").prompt()?;
    Ok((name, team))
}

fn optional_text(label: &str, current: Option<&str>) -> Result<Option<String>> {
    let input = Text::new(label)
        .with_default(current.unwrap_or_default())
        .prompt()?;
    let trimmed = input.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Select from `options` plus a "(none)" entry; the current value is preselected
fn optional_select(
    label: &str,
    options: &[&str],
    current: Option<&str>,
) -> Result<Option<String>> {
    let mut choices = vec![NONE_OPTION.to_string()];
    choices.extend(options.iter().map(|s| s.to_string()));
    if let Some(current) = current {
        if !choices.iter().any(|c| c == current) {
            choices.push(current.to_string());
        }
    }
    let cursor = current
        .and_then(|c| choices.iter().position(|o| o == c))
        .unwrap_or(0);

    let selection = Select::new(label, choices)
        .with_starting_cursor(cursor)
        .prompt()?;
    Ok((selection != NONE_OPTION).then_some(selection))
}

/// Prompts for every project field, starting from `base`
///
/// Values are returned unvalidated; the caller runs the usual validation.
pub fn prompt_project_input(base: ProjectInput) -> Result<ProjectInput> {
    let title = Text::new("Title:").with_default(&base.title).prompt()?;
    let description = Editor::new("Description:")
        .with_predefined_text(&base.description)
        .prompt()?;

    let reach = CustomType::<f64>::new("Reach (whole number):")
        .with_default(base.reach_value.unwrap_or(0.0))
        .with_error_message("Please enter a number")
        .prompt()?;
    let reach_description = Text::new("Reach rationale (optional):")
        .with_default(&base.reach_description)
        .prompt()?;
    let impact = CustomType::<f64>::new("Impact (1-5):")
        .with_default(base.impact_value.unwrap_or(1.0))
        .with_error_message("Please enter a number")
        .prompt()?;
    let impact_description = Text::new("Impact rationale (optional):")
        .with_default(&base.impact_description)
        .prompt()?;
    let confidence = CustomType::<f64>::new("Confidence (0-100 %):")
        .with_default(base.confidence_value.unwrap_or(50.0))
        .with_error_message("Please enter a number")
        .prompt()?;
    let confidence_description = Text::new("Confidence rationale (optional):")
        .with_default(&base.confidence_description)
        .prompt()?;
    let effort = CustomType::<f64>::new("Effort (1-5):")
        .with_default(base.effort_value.unwrap_or(1.0))
        .with_error_message("Please enter a number")
        .prompt()?;
    let effort_description = Text::new("Effort rationale (optional):")
        .with_default(&base.effort_description)
        .prompt()?;

    let financial = optional_text(
        "Financial impact (blank for none):",
        base.financial_impact_value.map(|v| v.to_string()).as_deref(),
    )?;
    let financial_impact_value = match financial {
        Some(text) => Some(
            text.parse::<f64>()
                .map_err(|_| anyhow::anyhow!("Financial impact must be a number: {}", text))?,
        ),
        None => None,
    };
    let financial_impact_currency = if financial_impact_value.is_some() {
        optional_text("Currency:", base.financial_impact_currency.as_deref())?
    } else {
        None
    };

    let project_type = optional_text("Type (optional):", base.project_type.as_deref())?;
    let project_status =
        optional_select("Status:", PROJECT_STATUSES, base.project_status.as_deref())?;
    let tshirt_size =
        optional_select("T-shirt size:", TSHIRT_SIZES, base.tshirt_size.as_deref())?;
    let project_period =
        optional_text("Period (e.g. Q3-2025):", base.project_period.as_deref())?;

    let countries_input = Text::new("Countries (comma separated):")
        .with_default(&base.countries.join(", "))
        .prompt()?;
    let countries = split_list(&countries_input);

    Ok(ProjectInput {
        title,
        description,
        reach_value: Some(reach),
        reach_description: reach_description.trim().to_string(),
        impact_value: Some(impact),
        impact_description: impact_description.trim().to_string(),
        confidence_value: Some(confidence),
        confidence_description: confidence_description.trim().to_string(),
        effort_value: Some(effort),
        effort_description: effort_description.trim().to_string(),
        financial_impact_value,
        financial_impact_currency,
        project_type,
        project_status,
        tshirt_size,
        project_period,
        countries,
    })
}

/// Prompts the user to select a project from a list
pub fn prompt_select_project(projects: &[&Project]) -> Result<String> {
    if projects.is_empty() {
        anyhow::bail!("No projects in the active profile");
    }
    let options: Vec<String> = projects
        .iter()
        .map(|p| format!("{} ({})", p.title, p.id))
        .collect();

    let selection = Select::new("Select a project:", options.clone()).prompt()?;
    let index = options
        .iter()
        .position(|o| *o == selection)
        .ok_or_else(|| anyhow::anyhow!("Unknown selection"))?;
    Ok(projects[index].id.clone())
}

pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message).with_default(false).prompt()?)
}

/// Splits a comma separated list, dropping blanks
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
