use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ProjectRef;

/// Whether a client-facing audience may see the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Internal,
    Client,
}

impl Visibility {
    pub fn label(&self) -> &'static str {
        match self {
            Visibility::Internal => "internal",
            Visibility::Client => "client",
        }
    }
}

/// Insert payload for one uploaded photo; the date, comment and visibility
/// are shared across a whole batch.
#[derive(Debug, Clone, Serialize)]
pub struct NewSitePhoto {
    pub project_id: String,
    pub photo_date: NaiveDate,
    pub photo_url: String,
    pub comment: Option<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SitePhoto {
    pub id: String,
    pub project_id: String,
    pub photo_date: NaiveDate,
    pub photo_url: String,
    pub comment: Option<String>,
    pub visibility: Visibility,
    #[serde(rename = "projects", default)]
    pub project: Option<ProjectRef>,
}

impl SitePhoto {
    pub fn project_name(&self) -> &str {
        self.project
            .as_ref()
            .map(|p| p.project_name.as_str())
            .unwrap_or("-")
    }
}
