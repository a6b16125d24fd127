mod cli;
mod prompts;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::{ColoredString, Colorize};
use std::path::PathBuf;

use rice_core::{
    board_columns, calculate_rice_score, csv::export_csv, export_file_name, export_json,
    format_rice, sort_projects, validate_project_input, Action, App, AppState, BackendType,
    Config, ImportFormat, Outcome, Profile, ProfileStats, Project, ProjectFilter, ProjectInput,
    SortDirection, SortField, ViewMode,
};

use crate::cli::{
    BoardCommand, Cli, Command, ListArgs, ProfileCommand, ProjectCommand, ProjectFields,
};
use crate::prompts::split_list;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.storage_path = db.clone();
    }
    if let Some(backend) = &cli.backend {
        config.backend = Some(
            BackendType::parse(backend)
                .with_context(|| format!("Unknown backend: {}", backend))?,
        );
    }
    log::debug!("Using storage at {:?}", config.storage_path);

    let mut app = App::open(&config)
        .with_context(|| format!("Failed to open storage at {:?}", config.storage_path))?;

    match cli.command {
        Command::Profile { command } => run_profile(&mut app, command)?,
        Command::Project { command } => run_project(&mut app, command)?,
        Command::Board { command } => run_board(&mut app, command)?,
        Command::View { mode } => {
            if let Some(mode) = mode {
                let mode = ViewMode::parse(&mode)
                    .with_context(|| format!("Unknown view mode: {} (table, board)", mode))?;
                app.dispatch(Action::SetViewMode(mode))?;
            }
            match app.state().view_mode {
                ViewMode::Table => list_projects(app.state(), &ListArgs::default())?,
                ViewMode::Board => show_board(app.state())?,
            }
        }
        Command::Score {
            reach,
            impact,
            confidence,
            effort,
        } => score(reach, impact, confidence, effort),
        Command::Export { format, output } => export(&app, &format, output)?,
        Command::Import { file, format } => {
            let format = match format {
                Some(f) => Some(
                    ImportFormat::parse(&f).with_context(|| format!("Unknown format: {}", f))?,
                ),
                None => None,
            };
            let report = app.import_file(&file, format)?;
            println!("{}", report.message().green());
            for name in &report.summary.name_collisions {
                println!(
                    "{} profile '{}' was added separately because an existing profile \
                     has the same name",
                    "Note:".yellow(),
                    name
                );
            }
        }
    }

    Ok(())
}

// =========================================================================
// Profiles
// =========================================================================

/// Finds a profile by exact id, then by case-insensitive name
fn find_profile<'a>(state: &'a AppState, key: &str) -> Result<&'a Profile> {
    state
        .profile(key)
        .or_else(|| {
            state
                .profiles
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(key.trim()))
        })
        .with_context(|| format!("Profile not found: {}", key))
}

fn run_profile(app: &mut App, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Add {
            name,
            team,
            interactive,
        } => {
            let (name, team) = if interactive || name.is_none() {
                prompts::prompt_new_profile()?
            } else {
                (name.unwrap_or_default(), team.unwrap_or_default())
            };
            if let Outcome::ProfileAdded(id) = app.dispatch(Action::AddProfile { name, team })? {
                println!("{} {}", "Profile added and selected:".green(), id);
            }
        }
        ProfileCommand::List => list_profiles(app.state()),
        ProfileCommand::Show { profile } => {
            let profile = match profile {
                Some(key) => find_profile(app.state(), &key)?,
                None => active_profile(app.state())?,
            };
            show_profile(profile);
        }
        ProfileCommand::Use { profile } => {
            let id = find_profile(app.state(), &profile)?.id.clone();
            app.dispatch(Action::SetActiveProfile { id })?;
            let name = app
                .state()
                .active_profile()
                .map(|p| p.name.clone())
                .unwrap_or_default();
            println!("{} {}", "Active profile:".green(), name);
        }
        ProfileCommand::Edit {
            profile,
            name,
            team,
        } => {
            let existing = find_profile(app.state(), &profile)?;
            let id = existing.id.clone();
            let name = name.unwrap_or_else(|| existing.name.clone());
            let team = team.unwrap_or_else(|| existing.team.clone());
            app.dispatch(Action::UpdateProfile { id, name, team })?;
            println!("{}", "Profile updated.".green());
        }
        ProfileCommand::Del { profile, yes } => {
            let existing = find_profile(app.state(), &profile)?;
            let id = existing.id.clone();
            let count = existing.projects.len();
            let message = format!(
                "Delete profile '{}' and its {} project(s)? This cannot be undone.",
                existing.name, count
            );
            if !yes && !prompts::confirm(&message)? {
                println!("Cancelled.");
                return Ok(());
            }
            let outcome = app.dispatch(Action::DeleteProfile { id })?;
            println!("{}", "Profile deleted.".green());
            if let Outcome::ProfileDeleted {
                synthesized: Some(_),
            } = outcome
            {
                println!("Created an empty 'Default Profile' so there is always one.");
            }
        }
    }
    Ok(())
}

fn list_profiles(state: &AppState) {
    if state.profiles.is_empty() {
        println!("{}", "No profiles found.".yellow());
        return;
    }

    let mut profiles: Vec<&Profile> = state.profiles.iter().collect();
    profiles.sort_by_key(|p| p.created_at);

    println!("  {:<30} | {:<20} | {:>8} | {}", "Name", "Team", "Projects", "ID");
    println!("{}", "-".repeat(90));
    for profile in profiles {
        let active = state.active_profile_id.as_deref() == Some(profile.id.as_str());
        let marker = if active { "*".green() } else { " ".normal() };
        let name = if active {
            profile.name.bold()
        } else {
            profile.name.normal()
        };
        println!(
            "{} {:<30} | {:<20} | {:>8} | {}",
            marker,
            name,
            profile.team,
            profile.projects.len(),
            profile.id.dimmed()
        );
    }
}

fn show_profile(profile: &Profile) {
    let stats = ProfileStats::for_profile(profile);
    let team = if profile.team.is_empty() {
        "-"
    } else {
        profile.team.as_str()
    };

    println!("{}", profile.name.bold().underline());
    println!("{:<18} {}", "Team:".bold(), team);
    println!("{:<18} {}", "Projects:".bold(), stats.total_projects);
    println!("{:<18} {}", "Unique countries:".bold(), stats.unique_countries);

    for (label, counts) in [
        ("By status:", &stats.by_status),
        ("By type:", &stats.by_type),
        ("By t-shirt size:", &stats.by_tshirt_size),
    ] {
        let chips = if counts.is_empty() {
            "None".dimmed().to_string()
        } else {
            counts
                .iter()
                .map(|(name, n)| format!("{}: {}", name, n))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("{:<18} {}", label.bold(), chips);
    }

    match stats.rice {
        None => println!("{:<18} {}", "RICE:".bold(), "No RICE scores yet.".dimmed()),
        Some(rice) => println!(
            "{:<18} Mean: {}, Median: {}, Min: {}, Max: {}, Total: {}",
            "RICE:".bold(),
            format_rice(rice.mean),
            format_rice(rice.median),
            format_rice(rice.min),
            format_rice(rice.max),
            format_rice(rice.total)
        ),
    }
}

// =========================================================================
// Projects
// =========================================================================

fn active_profile(state: &AppState) -> Result<&Profile> {
    state
        .active_profile()
        .context("No active profile. Create one with `rice profile add`.")
}

/// Finds a project in the active profile by id, then by case-insensitive title
fn find_project<'a>(state: &'a AppState, key: &str) -> Result<&'a Project> {
    let profile = active_profile(state)?;
    profile
        .project(key)
        .or_else(|| {
            profile
                .projects
                .iter()
                .find(|p| p.title.eq_ignore_ascii_case(key.trim()))
        })
        .with_context(|| format!("Project not found in '{}': {}", profile.name, key))
}

fn select_project(state: &AppState, key: Option<String>) -> Result<String> {
    match key {
        Some(key) => Ok(find_project(state, &key)?.id.clone()),
        None => {
            let profile = active_profile(state)?;
            let projects: Vec<&Project> = profile.projects.iter().collect();
            prompts::prompt_select_project(&projects)
        }
    }
}

/// Overlays the given flags on `base`
fn apply_fields(fields: ProjectFields, mut base: ProjectInput) -> ProjectInput {
    if let Some(title) = fields.title {
        base.title = title;
    }
    if let Some(description) = fields.description {
        base.description = description;
    }
    if fields.reach.is_some() {
        base.reach_value = fields.reach;
    }
    if let Some(desc) = fields.reach_description {
        base.reach_description = desc;
    }
    if fields.impact.is_some() {
        base.impact_value = fields.impact;
    }
    if let Some(desc) = fields.impact_description {
        base.impact_description = desc;
    }
    if fields.confidence.is_some() {
        base.confidence_value = fields.confidence;
    }
    if let Some(desc) = fields.confidence_description {
        base.confidence_description = desc;
    }
    if fields.effort.is_some() {
        base.effort_value = fields.effort;
    }
    if let Some(desc) = fields.effort_description {
        base.effort_description = desc;
    }
    if fields.financial_impact.is_some() {
        base.financial_impact_value = fields.financial_impact;
    }
    if fields.currency.is_some() {
        base.financial_impact_currency = fields.currency;
    }
    if fields.project_type.is_some() {
        base.project_type = fields.project_type;
    }
    if fields.status.is_some() {
        base.project_status = fields.status;
    }
    if fields.tshirt.is_some() {
        base.tshirt_size = fields.tshirt;
    }
    if fields.period.is_some() {
        base.project_period = fields.period;
    }
    if let Some(countries) = fields.countries {
        base.countries = split_list(&countries);
    }
    base
}

fn new_project_input() -> ProjectInput {
    ProjectInput {
        reach_value: Some(0.0),
        impact_value: Some(1.0),
        confidence_value: Some(50.0),
        effort_value: Some(1.0),
        ..Default::default()
    }
}

fn run_project(app: &mut App, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::Add {
            fields,
            interactive,
        } => {
            let input = if interactive || fields.is_empty() {
                prompts::prompt_project_input(apply_fields(fields, new_project_input()))?
            } else {
                apply_fields(fields, new_project_input())
            };
            if let Outcome::ProjectCreated(id) = app.dispatch(Action::CreateProject { input })? {
                print_project(find_project(app.state(), &id)?);
            }
        }
        ProjectCommand::List { args } => list_projects(app.state(), &args)?,
        ProjectCommand::Show { project } => {
            let id = select_project(app.state(), project)?;
            print_project(find_project(app.state(), &id)?);
        }
        ProjectCommand::Edit {
            project,
            fields,
            interactive,
        } => {
            let id = select_project(app.state(), project)?;
            let should_be_interactive = interactive || fields.is_empty();
            let base = ProjectInput::from_project(find_project(app.state(), &id)?);
            let input = apply_fields(fields, base);
            let input = if should_be_interactive {
                prompts::prompt_project_input(input)?
            } else {
                input
            };
            app.dispatch(Action::UpdateProject {
                id: id.clone(),
                input,
            })?;
            print_project(find_project(app.state(), &id)?);
        }
        ProjectCommand::Del { projects, yes } => {
            let mut ids = Vec::new();
            for key in &projects {
                ids.push(find_project(app.state(), key)?.id.clone());
            }
            let message = format!("Delete {} project(s)? This cannot be undone.", ids.len());
            if !yes && !prompts::confirm(&message)? {
                println!("Cancelled.");
                return Ok(());
            }
            if let Outcome::ProjectsDeleted(count) = app.dispatch(Action::DeleteProjects { ids })? {
                println!("{} {}", "Deleted project(s):".green(), count);
            }
        }
        ProjectCommand::Sort { field } => {
            let field = parse_sort_field(&field)?;
            if let Outcome::SortChanged(field, direction) =
                app.dispatch(Action::ToggleSort { field })?
            {
                println!("{} {} {}", "Sorting by".green(), field, direction);
            }
        }
    }
    Ok(())
}

fn parse_sort_field(s: &str) -> Result<SortField> {
    SortField::parse(s).with_context(|| {
        let names: Vec<&str> = SortField::all().iter().map(|f| f.as_str()).collect();
        format!("Unknown sort field: {} (one of {})", s, names.join(", "))
    })
}

fn filter_from_args(args: &ListArgs) -> ProjectFilter {
    ProjectFilter {
        title: args.title.clone(),
        periods: args.period.as_deref().map(split_list).unwrap_or_default(),
        impact: args.impact,
        effort: args.effort,
        currency: args.currency.clone(),
        status: args.status.clone(),
        tshirt_size: args.tshirt.clone(),
        project_type: args.project_type.clone(),
        countries: args.countries.as_deref().map(split_list).unwrap_or_default(),
    }
}

fn status_colored(status: &str) -> ColoredString {
    match status {
        "Not Started" => status.normal(),
        "In Progress" => status.blue(),
        "On Hold" => status.yellow(),
        "Done" => status.green(),
        "Cancelled" => status.red(),
        other => other.magenta(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let cut: String = s.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn list_projects(state: &AppState, args: &ListArgs) -> Result<()> {
    let profile = active_profile(state)?;
    let field = match &args.sort {
        Some(s) => parse_sort_field(s)?,
        None => state.sort_field,
    };
    let direction = match &args.direction {
        Some(d) => SortDirection::parse(d)
            .with_context(|| format!("Unknown sort direction: {} (asc, desc)", d))?,
        None => state.sort_direction,
    };

    let filter = filter_from_args(args);
    let filtered = filter.apply(&profile.projects);
    let projects = sort_projects(&filtered, field, direction);

    println!(
        "{} {} ({} of {} project(s), sorted by {} {})",
        "Profile:".bold(),
        profile.name,
        projects.len(),
        profile.projects.len(),
        field,
        direction
    );

    if projects.is_empty() {
        println!("{}", "No projects found.".yellow());
        return Ok(());
    }

    println!(
        "{:<30} | {:>10} | {:>8} | {:>6} | {:>10} | {:>6} | {:<12} | {:<8}",
        "Title", "RICE", "Reach", "Impact", "Confidence", "Effort", "Status", "Period"
    );
    println!("{}", "-".repeat(110));
    for project in projects {
        println!(
            "{:<30} | {:>10} | {:>8} | {:>6} | {:>10} | {:>6} | {:<12} | {:<8}",
            truncate(&project.title, 30),
            format_rice(calculate_rice_score(project)).bold(),
            project.reach_value,
            project.impact_value,
            project.confidence_value,
            project.effort_value,
            status_colored(project.status_or_default()),
            project.project_period.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn print_project(project: &Project) {
    let line = |label: &str, value: &str, desc: &str| {
        if desc.is_empty() {
            println!("{:<18} {}", label.bold(), value);
        } else {
            println!("{:<18} {} ({})", label.bold(), value, desc);
        }
    };

    println!("{}", project.title.bold().underline());
    println!("{:<18} {}", "ID:".bold(), project.id);
    if !project.description.is_empty() {
        println!("{:<18} {}", "Description:".bold(), project.description);
    }
    line("Reach:", &project.reach_value.to_string(), &project.reach_description);
    line("Impact:", &project.impact_value.to_string(), &project.impact_description);
    line(
        "Confidence:",
        &project.confidence_value.to_string(),
        &project.confidence_description,
    );
    line("Effort:", &project.effort_value.to_string(), &project.effort_description);
    println!(
        "{:<18} {}",
        "RICE score:".bold(),
        format_rice(calculate_rice_score(project)).green().bold()
    );
    if let Some(value) = project.financial_impact_value {
        println!(
            "{:<18} {} {}",
            "Financial impact:".bold(),
            format_rice(value),
            project.financial_impact_currency.as_deref().unwrap_or("")
        );
    }
    println!(
        "{:<18} {}",
        "Status:".bold(),
        status_colored(project.status_or_default())
    );
    for (label, value) in [
        ("Type:", &project.project_type),
        ("T-shirt size:", &project.tshirt_size),
        ("Period:", &project.project_period),
    ] {
        if let Some(value) = value {
            println!("{:<18} {}", label.bold(), value);
        }
    }
    if !project.countries.is_empty() {
        println!("{:<18} {}", "Countries:".bold(), project.countries.join(", "));
    }
    println!(
        "{:<18} {}",
        "Created:".bold(),
        project.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    println!(
        "{:<18} {}",
        "Modified:".bold(),
        project.modified_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
}

// =========================================================================
// Board
// =========================================================================

fn run_board(app: &mut App, command: Option<BoardCommand>) -> Result<()> {
    match command.unwrap_or(BoardCommand::Show) {
        BoardCommand::Show => show_board(app.state())?,
        BoardCommand::Move {
            project,
            status,
            index,
        } => {
            let id = find_project(app.state(), &project)?.id.clone();
            app.dispatch(Action::MoveOnBoard {
                project_id: id,
                status,
                index,
            })?;
            show_board(app.state())?;
        }
        BoardCommand::ScoreOrder { enabled } => {
            let enabled = match enabled.trim().to_lowercase().as_str() {
                "on" | "true" | "yes" => true,
                "off" | "false" | "no" => false,
                other => anyhow::bail!("Expected on or off, got: {}", other),
            };
            app.dispatch(Action::SetBoardSortByScore(enabled))?;
            show_board(app.state())?;
        }
    }
    Ok(())
}

fn show_board(state: &AppState) -> Result<()> {
    let profile = active_profile(state)?;
    let ordering = if state.board_sort_by_score {
        "by RICE score"
    } else {
        "manual order"
    };
    println!("{} {} ({})", "Board:".bold(), profile.name, ordering);

    for column in board_columns(profile, state.board_sort_by_score) {
        println!();
        println!(
            "{} ({})",
            status_colored(&column.status).bold(),
            column.projects.len()
        );
        for project in column.projects {
            println!(
                "  {:>10}  {}",
                format_rice(calculate_rice_score(project)),
                project.title
            );
        }
    }
    Ok(())
}

// =========================================================================
// Scoring, export
// =========================================================================

fn score(reach: f64, impact: f64, confidence: f64, effort: f64) {
    let input = ProjectInput {
        title: "score".to_string(),
        reach_value: Some(reach),
        impact_value: Some(impact),
        confidence_value: Some(confidence),
        effort_value: Some(effort),
        ..Default::default()
    };
    if let Err(e) = validate_project_input(&input) {
        println!("{} {}", "Warning:".yellow(), e);
    }
    println!(
        "{} {}",
        "RICE score:".bold(),
        format_rice(calculate_rice_score(&input)).green().bold()
    );
}

fn export(app: &App, format: &str, output: Option<PathBuf>) -> Result<()> {
    let format =
        ImportFormat::parse(format).with_context(|| format!("Unknown format: {}", format))?;
    let content = match format {
        ImportFormat::Json => export_json(app.state()).context("Export failed")?,
        ImportFormat::Csv => export_csv(app.state()),
    };
    let path = output
        .unwrap_or_else(|| PathBuf::from(export_file_name(format, Local::now().naive_local())));

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write export file: {:?}", path))?;
    println!(
        "{} {} profile(s) to {}",
        "Exported".green(),
        app.state().profiles.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_fields_overlays_only_given_flags() {
        let base = ProjectInput {
            title: "Old".to_string(),
            reach_value: Some(10.0),
            reach_description: "Signups last quarter".to_string(),
            impact_description: "Old guess".to_string(),
            countries: vec!["Spain".to_string()],
            ..new_project_input()
        };
        let fields = ProjectFields {
            title: Some("New".to_string()),
            impact_description: Some("Survey results".to_string()),
            confidence_description: Some("Two interviews".to_string()),
            effort_description: Some("One sprint".to_string()),
            countries: Some("Peru, Chile".to_string()),
            ..Default::default()
        };
        let input = apply_fields(fields, base);
        assert_eq!(input.title, "New");
        assert_eq!(input.reach_value, Some(10.0));
        assert_eq!(input.reach_description, "Signups last quarter");
        assert_eq!(input.impact_description, "Survey results");
        assert_eq!(input.confidence_description, "Two interviews");
        assert_eq!(input.effort_description, "One sprint");
        assert_eq!(input.countries, vec!["Peru".to_string(), "Chile".to_string()]);
    }

    #[test]
    fn test_rationale_flags_count_as_fields() {
        let fields = ProjectFields {
            reach_description: Some("Signups".to_string()),
            ..Default::default()
        };
        assert!(!fields.is_empty());
        assert!(ProjectFields::default().is_empty());
    }

    #[test]
    fn test_filter_from_args() {
        let args = ListArgs {
            period: Some("q1, q2".to_string()),
            status: Some("Done".to_string()),
            ..Default::default()
        };
        let filter = filter_from_args(&args);
        assert_eq!(filter.periods, vec!["q1".to_string(), "q2".to_string()]);
        assert_eq!(filter.status.as_deref(), Some("Done"));
        assert!(filter.countries.is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long project title", 6), "a lon…");
    }

    #[test]
    fn test_find_profile_by_name_or_id() {
        let mut state = AppState::new();
        let profile = Profile::new("Growth".to_string(), String::new());
        let id = profile.id.clone();
        state.profiles.push(profile);

        assert_eq!(find_profile(&state, "growth").unwrap().id, id);
        assert_eq!(find_profile(&state, &id).unwrap().name, "Growth");
        assert!(find_profile(&state, "missing").is_err());
    }
}
