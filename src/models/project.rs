use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Estimate,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Estimate,
        ProjectStatus::InProgress,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Estimate => "estimate",
            ProjectStatus::InProgress => "in progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Badge color per status, matching the project list cards.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            ProjectStatus::Estimate => (0xff, 0x95, 0x00),
            ProjectStatus::InProgress => (0x00, 0x7a, 0xff),
            ProjectStatus::Completed => (0x34, 0xc7, 0x59),
            ProjectStatus::Cancelled => (0x99, 0x99, 0x99),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    DesignAndConstruction,
    DesignOnly,
    ConstructionOnly,
}

impl WorkType {
    pub const ALL: [WorkType; 3] = [
        WorkType::DesignAndConstruction,
        WorkType::DesignOnly,
        WorkType::ConstructionOnly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WorkType::DesignAndConstruction => "design + construction",
            WorkType::DesignOnly => "design only",
            WorkType::ConstructionOnly => "construction only",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub project_name: String,
    pub client_name: String,
    pub status: ProjectStatus,
    pub work_type: WorkType,
    pub area: Option<f64>,
    pub location: Option<String>,
    pub business_category_major: Option<String>,
    pub business_category_minor: Option<String>,
    pub estimated_budget: f64,
    #[serde(default)]
    pub actual_cost: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub bank_account: Option<String>,
    pub google_drive_url: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parent project columns embedded into child rows via a relational select.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRef {
    pub project_name: String,
    #[serde(default)]
    pub client_name: Option<String>,
}
