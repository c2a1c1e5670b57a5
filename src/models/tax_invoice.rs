use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Sales,
    Purchase,
}

impl InvoiceType {
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceType::Sales => "sales",
            InvoiceType::Purchase => "purchase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Received,
    Paid,
}

impl InvoiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Received => "received",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            InvoiceStatus::Pending => (0xff, 0x95, 0x00),
            InvoiceStatus::Received => (0x00, 0x7a, 0xff),
            InvoiceStatus::Paid => (0x34, 0xc7, 0x59),
        }
    }
}

/// Rows are populated by the external sync function; the client only ever
/// updates the manual project assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxInvoice {
    pub id: String,
    pub project_id: Option<String>,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub invoice_type: InvoiceType,
    pub supply_amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub counterparty_name: Option<String>,
    pub status: InvoiceStatus,
}
