use chrono::NaiveDate;
use serde::Deserialize;

use super::ProjectRef;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkLog {
    pub id: String,
    pub project_id: String,
    pub work_date: NaiveDate,
    pub work_content: String,
    pub cost: f64,
    pub work_cate1: String,
    pub worker_name: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_completed: bool,
    #[serde(rename = "projects", default)]
    pub project: Option<ProjectRef>,
}

impl WorkLog {
    pub fn project_name(&self) -> &str {
        self.project
            .as_ref()
            .map(|p| p.project_name.as_str())
            .unwrap_or("-")
    }
}
