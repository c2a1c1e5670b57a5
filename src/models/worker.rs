use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    DirectLabor,
    Subcontract,
}

impl WorkerType {
    pub fn label(&self) -> &'static str {
        match self {
            WorkerType::DirectLabor => "direct labor",
            WorkerType::Subcontract => "subcontract",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerType::DirectLabor => "direct_labor",
            WorkerType::Subcontract => "subcontract",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub default_cost: f64,
    pub worker_type: WorkerType,
    pub is_active: bool,
}
