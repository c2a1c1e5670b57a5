use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkerType;

/// Top-level expense category. Direct-labor and subcontract expenses default
/// to VAT-excluded and pick their subcategory from the worker list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Construction,
    Materials,
    DirectLabor,
    Subcontract,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::Construction,
        Classification::Materials,
        Classification::DirectLabor,
        Classification::Subcontract,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Construction => "construction",
            Classification::Materials => "materials",
            Classification::DirectLabor => "direct labor",
            Classification::Subcontract => "subcontract",
        }
    }

    /// Worker type whose roster backs the subcategory picker, if any.
    pub fn worker_type(&self) -> Option<WorkerType> {
        match self {
            Classification::DirectLabor => Some(WorkerType::DirectLabor),
            Classification::Subcontract => Some(WorkerType::Subcontract),
            _ => None,
        }
    }

    /// Labor classifications are always submitted VAT-excluded.
    pub fn forces_vat_excluded(&self) -> bool {
        self.worker_type().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Paid,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Paid => "paid",
        }
    }

    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            ExpenseStatus::Pending => (0xff, 0x95, 0x00),
            ExpenseStatus::Approved => (0x00, 0x7a, 0xff),
            ExpenseStatus::Paid => (0x34, 0xc7, 0x59),
        }
    }

    /// The list-screen badge only cycles pending and paid; an approved row
    /// is left alone rather than rewritten to a state the badge never shows.
    pub fn toggled(&self) -> Option<ExpenseStatus> {
        match self {
            ExpenseStatus::Pending => Some(ExpenseStatus::Paid),
            ExpenseStatus::Paid => Some(ExpenseStatus::Pending),
            ExpenseStatus::Approved => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseApproval {
    pub id: String,
    pub project_id: String,
    pub classification: Classification,
    pub work_category: Option<String>,
    pub work_subcategory: Option<String>,
    pub amount: f64,
    pub vat_included: bool,
    pub account_number: Option<String>,
    pub status: ExpenseStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
