//! RICE scoring and validation
//!
//! Implements `(Reach × Impact × Confidence) ÷ Effort`. Confidence is accepted either
//! as a fraction (0-1) or as a percentage (0-100): any value above 1 is divided by 100.

use thiserror::Error;

use crate::models::Project;

/// Anything that carries the four RICE factors
///
/// Missing factors count as 0, which for effort means the score is 0.
pub trait RiceInputs {
    fn reach(&self) -> Option<f64>;
    fn impact(&self) -> Option<f64>;
    fn confidence(&self) -> Option<f64>;
    fn effort(&self) -> Option<f64>;
}

impl RiceInputs for Project {
    fn reach(&self) -> Option<f64> {
        Some(self.reach_value)
    }
    fn impact(&self) -> Option<f64> {
        Some(self.impact_value)
    }
    fn confidence(&self) -> Option<f64> {
        Some(self.confidence_value)
    }
    fn effort(&self) -> Option<f64> {
        Some(self.effort_value)
    }
}

impl RiceInputs for ProjectInput {
    fn reach(&self) -> Option<f64> {
        self.reach_value
    }
    fn impact(&self) -> Option<f64> {
        self.impact_value
    }
    fn confidence(&self) -> Option<f64> {
        self.confidence_value
    }
    fn effort(&self) -> Option<f64> {
        self.effort_value
    }
}

/// Converts a confidence value to a fraction; exactly 1.0 is already a fraction
pub fn confidence_fraction(confidence: f64) -> f64 {
    if confidence > 1.0 {
        confidence / 100.0
    } else {
        confidence
    }
}

/// Computes the RICE score; always finite and non-negative
pub fn calculate_rice_score<T: RiceInputs + ?Sized>(project: &T) -> f64 {
    let coerce = |v: Option<f64>| v.filter(|n| !n.is_nan()).unwrap_or(0.0);

    let reach = coerce(project.reach());
    let impact = coerce(project.impact());
    let confidence = coerce(project.confidence());
    let effort = coerce(project.effort());

    if effort <= 0.0 {
        return 0.0;
    }

    let score = (reach * impact * confidence_fraction(confidence)) / effort;
    if !score.is_finite() || score < 0.0 {
        return 0.0;
    }
    score
}

/// Formats a score for display, e.g. `1,234` or `12.35`
pub fn format_rice(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    let decimals = if value >= 1000.0 { 0 } else { 2 };
    format_grouped(value, decimals)
}

/// en-US style number: comma thousands separator, up to `max_decimals` with trailing zeros trimmed
fn format_grouped(value: f64, max_decimals: usize) -> String {
    let fixed = format!("{:.*}", max_decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.trim_end_matches('0').to_string()),
        None => (fixed.clone(), String::new()),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

/// Raw values captured from an interactive project form
///
/// Numeric fields are `None` when the form field was left empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub reach_value: Option<f64>,
    pub reach_description: String,
    pub impact_value: Option<f64>,
    pub impact_description: String,
    pub confidence_value: Option<f64>,
    pub confidence_description: String,
    pub effort_value: Option<f64>,
    pub effort_description: String,
    pub financial_impact_value: Option<f64>,
    pub financial_impact_currency: Option<String>,
    pub project_type: Option<String>,
    pub project_status: Option<String>,
    pub tshirt_size: Option<String>,
    pub project_period: Option<String>,
    pub countries: Vec<String>,
}

impl ProjectInput {
    /// Pre-fills the form from an existing project (used when editing)
    pub fn from_project(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
            reach_value: Some(project.reach_value),
            reach_description: project.reach_description.clone(),
            impact_value: Some(project.impact_value),
            impact_description: project.impact_description.clone(),
            confidence_value: Some(project.confidence_value),
            confidence_description: project.confidence_description.clone(),
            effort_value: Some(project.effort_value),
            effort_description: project.effort_description.clone(),
            financial_impact_value: project.financial_impact_value,
            financial_impact_currency: project.financial_impact_currency.clone(),
            project_type: project.project_type.clone(),
            project_status: project.project_status.clone(),
            tshirt_size: project.tshirt_size.clone(),
            project_period: project.project_period.clone(),
            countries: project.countries.clone(),
        }
    }
}

/// Reasons a project form cannot be saved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Project title is required.")]
    TitleRequired,

    #[error("Reach value must be a non-negative integer.")]
    ReachInvalid,

    #[error("Reach value must be an integer (no decimals).")]
    ReachNotInteger,

    #[error("Impact must be between 1 and 5.")]
    ImpactOutOfRange,

    #[error("Confidence must be between 0 and 100.")]
    ConfidenceOutOfRange,

    #[error("Effort must be between 1 and 5.")]
    EffortOutOfRange,

    #[error("Financial impact must be a non-negative number.")]
    FinancialImpactInvalid,

    #[error("Select a currency when financial impact is provided.")]
    CurrencyRequired,
}

fn in_range(value: Option<f64>, min: f64, max: f64) -> bool {
    matches!(value, Some(v) if v.is_finite() && v >= min && v <= max)
}

/// Checks a form submission; the first failing check wins
pub fn validate_project_input(raw: &ProjectInput) -> Result<(), ValidationError> {
    if raw.title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }

    match raw.reach_value {
        Some(reach) if reach.is_finite() && reach >= 0.0 => {
            if reach.fract() != 0.0 {
                return Err(ValidationError::ReachNotInteger);
            }
        }
        _ => return Err(ValidationError::ReachInvalid),
    }

    if !in_range(raw.impact_value, 1.0, 5.0) {
        return Err(ValidationError::ImpactOutOfRange);
    }
    if !in_range(raw.confidence_value, 0.0, 100.0) {
        return Err(ValidationError::ConfidenceOutOfRange);
    }
    if !in_range(raw.effort_value, 1.0, 5.0) {
        return Err(ValidationError::EffortOutOfRange);
    }

    if let Some(financial) = raw.financial_impact_value {
        if !financial.is_finite() || financial < 0.0 {
            return Err(ValidationError::FinancialImpactInvalid);
        }
        let has_currency = raw
            .financial_impact_currency
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if financial != 0.0 && !has_currency {
            return Err(ValidationError::CurrencyRequired);
        }
    }

    Ok(())
}
