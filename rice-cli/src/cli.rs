use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Score and prioritize projects with the RICE framework")]
pub struct Cli {
    /// Storage location (directory, or a .db file for SQLite); overrides the config file
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    /// Storage backend (file, sqlite, memory); inferred from the path when omitted
    #[clap(long, global = true)]
    pub backend: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Add a new profile and make it active
    Add {
        /// Name of the profile
        #[clap(long)]
        name: Option<String>,

        /// Team owning the profile
        #[clap(long)]
        team: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List all profiles
    List,

    /// Show project counts and RICE statistics for a profile
    Show {
        /// Profile name or ID; defaults to the active profile
        profile: Option<String>,
    },

    /// Make a profile active
    Use {
        /// Profile name or ID
        profile: String,
    },

    /// Edit a profile's name or team
    Edit {
        /// Profile name or ID
        profile: String,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        team: Option<String>,
    },

    /// Delete a profile and all of its projects
    Del {
        /// Profile name or ID
        profile: String,

        /// Skip the confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

/// Project fields shared by `project add` and `project edit`
#[derive(Args, Debug, Default)]
pub struct ProjectFields {
    #[clap(long)]
    pub title: Option<String>,

    #[clap(long)]
    pub description: Option<String>,

    /// Number of users/accounts reached (whole number)
    #[clap(long)]
    pub reach: Option<f64>,

    /// Rationale for the reach value
    #[clap(long)]
    pub reach_description: Option<String>,

    /// Impact from 1 to 5
    #[clap(long)]
    pub impact: Option<f64>,

    /// Rationale for the impact value
    #[clap(long)]
    pub impact_description: Option<String>,

    /// Confidence, as a percentage (0-100) or a fraction (0-1)
    #[clap(long)]
    pub confidence: Option<f64>,

    /// Rationale for the confidence value
    #[clap(long)]
    pub confidence_description: Option<String>,

    /// Effort from 1 to 5
    #[clap(long)]
    pub effort: Option<f64>,

    /// Rationale for the effort value
    #[clap(long)]
    pub effort_description: Option<String>,

    /// Expected financial impact
    #[clap(long)]
    pub financial_impact: Option<f64>,

    /// Currency code for the financial impact
    #[clap(long)]
    pub currency: Option<String>,

    #[clap(long = "type")]
    pub project_type: Option<String>,

    /// Status (Not Started, In Progress, On Hold, Done, Cancelled)
    #[clap(long)]
    pub status: Option<String>,

    /// T-shirt size (XS, S, M, L, XL)
    #[clap(long)]
    pub tshirt: Option<String>,

    /// Planning period, e.g. Q3-2025
    #[clap(long)]
    pub period: Option<String>,

    /// Countries (comma separated)
    #[clap(long)]
    pub countries: Option<String>,
}

impl ProjectFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.reach.is_none()
            && self.reach_description.is_none()
            && self.impact.is_none()
            && self.impact_description.is_none()
            && self.confidence.is_none()
            && self.confidence_description.is_none()
            && self.effort.is_none()
            && self.effort_description.is_none()
            && self.financial_impact.is_none()
            && self.currency.is_none()
            && self.project_type.is_none()
            && self.status.is_none()
            && self.tshirt.is_none()
            && self.period.is_none()
            && self.countries.is_none()
    }
}

/// Table filters and sort overrides for `project list`
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Title contains (case-insensitive)
    #[clap(long)]
    pub title: Option<String>,

    /// Periods (comma separated)
    #[clap(long)]
    pub period: Option<String>,

    #[clap(long)]
    pub impact: Option<f64>,

    #[clap(long)]
    pub effort: Option<f64>,

    #[clap(long)]
    pub currency: Option<String>,

    #[clap(long)]
    pub status: Option<String>,

    #[clap(long)]
    pub tshirt: Option<String>,

    #[clap(long = "type")]
    pub project_type: Option<String>,

    /// Countries (comma separated, any match)
    #[clap(long)]
    pub countries: Option<String>,

    /// Sort field for this listing (e.g. riceScore, title, createdAt)
    #[clap(long)]
    pub sort: Option<String>,

    /// Sort direction for this listing (asc, desc)
    #[clap(long)]
    pub direction: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Add a project to the active profile
    Add {
        #[clap(flatten)]
        fields: ProjectFields,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List the active profile's projects
    List {
        #[clap(flatten)]
        args: ListArgs,
    },

    /// Show details for a project
    Show {
        /// Project ID or title; prompts when omitted
        project: Option<String>,
    },

    /// Edit a project in the active profile
    Edit {
        /// Project ID or title; prompts when omitted
        project: Option<String>,

        #[clap(flatten)]
        fields: ProjectFields,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Delete one or more projects from the active profile
    Del {
        /// Project IDs or titles
        #[clap(required = true)]
        projects: Vec<String>,

        /// Skip the confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Change the saved sort column; choosing the current column flips the direction
    Sort {
        /// Sort field (e.g. riceScore, title, createdAt)
        field: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum BoardCommand {
    /// Show the board for the active profile
    Show,

    /// Move a project to a status column
    Move {
        /// Project ID or title
        project: String,

        /// Target status column
        status: String,

        /// Position within the column (0 = top)
        #[clap(long, default_value_t = 0)]
        index: usize,
    },

    /// Order board columns by RICE score (on) or manually (off)
    ScoreOrder {
        /// on or off
        enabled: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage profiles
    Profile {
        #[clap(subcommand)]
        command: ProfileCommand,
    },

    /// Manage projects in the active profile
    Project {
        #[clap(subcommand)]
        command: ProjectCommand,
    },

    /// Kanban board grouped by status
    Board {
        #[clap(subcommand)]
        command: Option<BoardCommand>,
    },

    /// Show the active profile in the saved view, optionally switching it (table, board)
    View {
        mode: Option<String>,
    },

    /// Calculate a RICE score without saving anything
    Score {
        #[clap(long)]
        reach: f64,

        #[clap(long)]
        impact: f64,

        #[clap(long)]
        confidence: f64,

        #[clap(long)]
        effort: f64,
    },

    /// Export all profiles to a file
    Export {
        /// Output format (json, csv)
        #[clap(long, default_value = "json")]
        format: String,

        /// Output file; defaults to a timestamped name in the current directory
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Import profiles from a JSON or CSV export
    Import {
        /// File to import
        file: PathBuf,

        /// Input format (json, csv); inferred from the extension when omitted
        #[clap(long)]
        format: Option<String>,
    },
}
