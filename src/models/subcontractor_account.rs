use serde::Deserialize;

/// Standalone bank-account lookup; the account number is copied by value
/// into expense approvals, not referenced by key.
#[derive(Debug, Clone, Deserialize)]
pub struct SubcontractorAccount {
    pub id: String,
    pub company_name: String,
    pub bank_name: Option<String>,
    pub account_number: String,
    pub account_holder: Option<String>,
    pub business_type: Option<String>,
    pub contact_phone: Option<String>,
}

impl SubcontractorAccount {
    /// The copyable "bank account / holder" text pasted into expense forms.
    pub fn display_account(&self) -> String {
        match (&self.bank_name, &self.account_holder) {
            (Some(bank), Some(holder)) => {
                format!("{} {} ({})", bank, self.account_number, holder)
            }
            (Some(bank), None) => format!("{} {}", bank, self.account_number),
            _ => self.account_number.clone(),
        }
    }
}
