use serde::Deserialize;

/// Process classification lookup feeding the work-log and expense pickers.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkCategory {
    pub id: String,
    pub category_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<String>,
}
