mod expense_approval;
mod project;
mod site_photo;
mod subcontractor_account;
mod tax_invoice;
mod work_category;
mod work_log;
mod worker;

pub use expense_approval::{Classification, ExpenseApproval, ExpenseStatus};
pub use project::{Project, ProjectRef, ProjectStatus, WorkType};
pub use site_photo::{NewSitePhoto, SitePhoto, Visibility};
pub use subcontractor_account::SubcontractorAccount;
pub use tax_invoice::{InvoiceStatus, InvoiceType, TaxInvoice};
pub use work_category::WorkCategory;
pub use work_log::WorkLog;
pub use worker::{Worker, WorkerType};
