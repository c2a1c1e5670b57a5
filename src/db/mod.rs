use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};

use crate::config::Config;
use crate::models::{
    ExpenseApproval, ExpenseStatus, Project, SitePhoto, SubcontractorAccount, TaxInvoice,
    Visibility, WorkCategory, WorkLog, Worker, WorkerType,
};
use crate::remote::{decode_rows, Remote};

/// Which tax invoices to show: everything, the unassigned bucket, or one
/// project's rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceFilter {
    All,
    Unassigned,
    Project(String),
}

/// Typed data access over the remote row store. One method per operation;
/// every method decodes the loosely-typed rows at this boundary.
pub struct Database {
    remote: Remote,
    company_id: String,
}

impl Database {
    pub fn new(config: &Config) -> Self {
        Self {
            remote: Remote::new(&config.backend_url, &config.backend_key),
            company_id: config.company_id.clone(),
        }
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    // Project operations

    /// Distinct years with at least one project, newest first.
    pub async fn load_project_years(&self) -> Result<Vec<i32>> {
        let rows = self
            .remote
            .table("projects")
            .select("start_date")
            .fetch()
            .await
            .context("failed to load project years")?;

        #[derive(serde::Deserialize)]
        struct StartDate {
            start_date: NaiveDate,
        }

        let mut years: Vec<i32> = decode_rows::<StartDate>("projects", rows)?
            .into_iter()
            .map(|r| r.start_date.year())
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        Ok(years)
    }

    pub async fn load_projects_in_year(&self, year: i32) -> Result<Vec<Project>> {
        let rows = self
            .remote
            .table("projects")
            .select("*")
            .gte("start_date", &format!("{year}-01-01"))
            .lte("start_date", &format!("{year}-12-31"))
            .order_desc("start_date")
            .fetch()
            .await
            .context("failed to load projects")?;
        Ok(decode_rows("projects", rows)?)
    }

    /// Projects still accepting new work: estimates and in-progress jobs.
    pub async fn load_active_projects(&self) -> Result<Vec<Project>> {
        let rows = self
            .remote
            .table("projects")
            .select("*")
            .in_list("status", &["estimate", "in_progress"])
            .order_desc("created_at")
            .fetch()
            .await
            .context("failed to load projects")?;
        Ok(decode_rows("projects", rows)?)
    }

    pub async fn load_all_projects(&self) -> Result<Vec<Project>> {
        let rows = self
            .remote
            .table("projects")
            .select("*")
            .order_desc("created_at")
            .fetch()
            .await
            .context("failed to load projects")?;
        Ok(decode_rows("projects", rows)?)
    }

    pub async fn save_project(&self, project: &Project) -> Result<String> {
        let body = json!({
            "project_name": project.project_name,
            "client_name": project.client_name,
            "status": project.status,
            "work_type": project.work_type,
            "area": project.area,
            "location": project.location,
            "business_category_major": project.business_category_major,
            "business_category_minor": project.business_category_minor,
            "estimated_budget": project.estimated_budget,
            "start_date": project.start_date,
            "end_date": project.end_date,
            "bank_account": project.bank_account,
            "google_drive_url": project.google_drive_url,
            "notes": project.notes,
        });
        if project.id.is_empty() {
            let rows = self
                .remote
                .insert("projects", &body)
                .await
                .context("failed to create project")?;
            row_id(&rows)
        } else {
            self.remote
                .update_by_id("projects", &project.id, &body)
                .await
                .context("failed to update project")?;
            Ok(project.id.clone())
        }
    }

    // Work log operations

    pub async fn load_work_logs(
        &self,
        project_id: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<WorkLog>> {
        let mut query = self
            .remote
            .table("work_logs")
            .select("*,projects(project_name,client_name)")
            .order_desc("work_date");
        if let Some(id) = project_id {
            query = query.eq("project_id", id);
        }
        if let Some(cat) = category {
            query = query.eq("work_cate1", cat);
        }
        let rows = query.fetch().await.context("failed to load work logs")?;
        Ok(decode_rows("work_logs", rows)?)
    }

    /// Distinct process categories among the (optionally project-scoped)
    /// work logs, feeding the secondary filter.
    pub async fn load_work_log_categories(&self, project_id: Option<&str>) -> Result<Vec<String>> {
        let mut query = self.remote.table("work_logs").select("work_cate1");
        if let Some(id) = project_id {
            query = query.eq("project_id", id);
        }
        let rows = query.fetch().await.context("failed to load work logs")?;

        #[derive(serde::Deserialize)]
        struct Cat {
            work_cate1: String,
        }

        let mut cats: Vec<String> = decode_rows::<Cat>("work_logs", rows)?
            .into_iter()
            .map(|c| c.work_cate1)
            .collect();
        cats.sort();
        cats.dedup();
        Ok(cats)
    }

    pub async fn save_work_log(&self, log: &WorkLog) -> Result<String> {
        let body = json!({
            "project_id": log.project_id,
            "work_date": log.work_date,
            "work_content": log.work_content,
            "cost": log.cost,
            "work_cate1": log.work_cate1,
            "worker_name": log.worker_name,
            "notes": log.notes,
        });
        if log.id.is_empty() {
            let rows = self
                .remote
                .insert("work_logs", &body)
                .await
                .context("failed to create work log")?;
            row_id(&rows)
        } else {
            self.remote
                .update_by_id("work_logs", &log.id, &body)
                .await
                .context("failed to update work log")?;
            Ok(log.id.clone())
        }
    }

    pub async fn delete_work_log(&self, id: &str) -> Result<()> {
        self.remote
            .delete_by_id("work_logs", id)
            .await
            .context("failed to delete work log")
    }

    pub async fn set_payment_completed(&self, id: &str, completed: bool) -> Result<()> {
        self.remote
            .update_by_id("work_logs", id, &json!({ "payment_completed": completed }))
            .await
            .context("failed to update payment status")?;
        Ok(())
    }

    pub async fn load_unpaid_work_logs(&self, project_id: &str) -> Result<Vec<WorkLog>> {
        let rows = self
            .remote
            .table("work_logs")
            .select("*,projects(project_name,client_name)")
            .eq("project_id", project_id)
            .eq("payment_completed", "false")
            .order_desc("work_date")
            .fetch()
            .await
            .context("failed to load unpaid work logs")?;
        Ok(decode_rows("work_logs", rows)?)
    }

    // Work category lookup

    pub async fn load_work_categories(&self) -> Result<Vec<WorkCategory>> {
        let rows = self
            .remote
            .table("work_categories")
            .select("*")
            .order_asc("category_name")
            .fetch()
            .await
            .context("failed to load work categories")?;
        Ok(decode_rows("work_categories", rows)?)
    }

    // Site photo operations

    pub async fn load_site_photos(&self, project_id: Option<&str>) -> Result<Vec<SitePhoto>> {
        let mut query = self
            .remote
            .table("site_photos")
            .select("*,projects(project_name,client_name)")
            .order_desc("photo_date");
        if let Some(id) = project_id {
            query = query.eq("project_id", id);
        }
        let rows = query.fetch().await.context("failed to load site photos")?;
        Ok(decode_rows("site_photos", rows)?)
    }

    pub async fn update_site_photo(
        &self,
        id: &str,
        comment: Option<&str>,
        visibility: Visibility,
    ) -> Result<()> {
        self.remote
            .update_by_id(
                "site_photos",
                id,
                &json!({ "comment": comment, "visibility": visibility }),
            )
            .await
            .context("failed to update site photo")?;
        Ok(())
    }

    pub async fn delete_site_photo(&self, id: &str) -> Result<()> {
        self.remote
            .delete_by_id("site_photos", id)
            .await
            .context("failed to delete site photo")
    }

    // Expense approval operations

    pub async fn load_expenses(
        &self,
        project_id: &str,
        status: Option<ExpenseStatus>,
    ) -> Result<Vec<ExpenseApproval>> {
        let mut query = self
            .remote
            .table("expense_approvals")
            .select("*")
            .eq("project_id", project_id)
            .order_desc("created_at");
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        let rows = query.fetch().await.context("failed to load expenses")?;
        Ok(decode_rows("expense_approvals", rows)?)
    }

    /// New expenses always enter as pending regardless of the form state.
    pub async fn save_expense(&self, expense: &ExpenseApproval) -> Result<String> {
        let status = if expense.id.is_empty() {
            ExpenseStatus::Pending
        } else {
            expense.status
        };
        let body = json!({
            "project_id": expense.project_id,
            "classification": expense.classification,
            "work_category": expense.work_category,
            "work_subcategory": expense.work_subcategory,
            "amount": expense.amount,
            "vat_included": expense.vat_included,
            "account_number": expense.account_number,
            "status": status,
            "notes": expense.notes,
        });
        if expense.id.is_empty() {
            let rows = self
                .remote
                .insert("expense_approvals", &body)
                .await
                .context("failed to create expense")?;
            row_id(&rows)
        } else {
            self.remote
                .update_by_id("expense_approvals", &expense.id, &body)
                .await
                .context("failed to update expense")?;
            Ok(expense.id.clone())
        }
    }

    pub async fn set_expense_status(&self, id: &str, status: ExpenseStatus) -> Result<()> {
        self.remote
            .update_by_id("expense_approvals", id, &json!({ "status": status }))
            .await
            .context("failed to update expense status")?;
        Ok(())
    }

    pub async fn delete_expense(&self, id: &str) -> Result<()> {
        self.remote
            .delete_by_id("expense_approvals", id)
            .await
            .context("failed to delete expense")
    }

    // Subcontractor account operations

    pub async fn load_accounts(&self) -> Result<Vec<SubcontractorAccount>> {
        let rows = self
            .remote
            .table("subcontractor_accounts")
            .select("*")
            .order_asc("company_name")
            .fetch()
            .await
            .context("failed to load accounts")?;
        Ok(decode_rows("subcontractor_accounts", rows)?)
    }

    pub async fn save_account(&self, account: &SubcontractorAccount) -> Result<String> {
        let body = json!({
            "company_name": account.company_name,
            "bank_name": account.bank_name,
            "account_number": account.account_number,
            "account_holder": account.account_holder,
            "business_type": account.business_type,
            "contact_phone": account.contact_phone,
        });
        if account.id.is_empty() {
            let rows = self
                .remote
                .insert("subcontractor_accounts", &body)
                .await
                .context("failed to create account")?;
            row_id(&rows)
        } else {
            self.remote
                .update_by_id("subcontractor_accounts", &account.id, &body)
                .await
                .context("failed to update account")?;
            Ok(account.id.clone())
        }
    }

    pub async fn delete_account(&self, id: &str) -> Result<()> {
        self.remote
            .delete_by_id("subcontractor_accounts", id)
            .await
            .context("failed to delete account")
    }

    // Worker operations

    pub async fn load_workers(&self) -> Result<Vec<Worker>> {
        let rows = self
            .remote
            .table("workers")
            .select("*")
            .order_asc("name")
            .fetch()
            .await
            .context("failed to load workers")?;
        Ok(decode_rows("workers", rows)?)
    }

    /// Active workers of the given type who appear in the project's unpaid
    /// work logs; the pool the expense form may charge labor against.
    pub async fn load_workers_for_expense(
        &self,
        project_id: &str,
        worker_type: WorkerType,
    ) -> Result<Vec<Worker>> {
        let rows = self
            .remote
            .table("work_logs")
            .select("worker_name")
            .eq("project_id", project_id)
            .eq("payment_completed", "false")
            .not_null("worker_name")
            .fetch()
            .await
            .context("failed to load unpaid work logs")?;

        #[derive(serde::Deserialize)]
        struct Name {
            worker_name: String,
        }

        let mut names: Vec<String> = decode_rows::<Name>("work_logs", rows)?
            .into_iter()
            .map(|n| n.worker_name)
            .collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let rows = self
            .remote
            .table("workers")
            .select("*")
            .eq("worker_type", worker_type.as_str())
            .eq("is_active", "true")
            .in_list("name", &name_refs)
            .order_asc("name")
            .fetch()
            .await
            .context("failed to load workers")?;
        Ok(decode_rows("workers", rows)?)
    }

    pub async fn save_worker(&self, worker: &Worker) -> Result<String> {
        let body = json!({
            "name": worker.name,
            "default_cost": worker.default_cost,
            "worker_type": worker.worker_type,
            "is_active": worker.is_active,
        });
        if worker.id.is_empty() {
            let rows = self
                .remote
                .insert("workers", &body)
                .await
                .context("failed to create worker")?;
            row_id(&rows)
        } else {
            self.remote
                .update_by_id("workers", &worker.id, &body)
                .await
                .context("failed to update worker")?;
            Ok(worker.id.clone())
        }
    }

    pub async fn set_worker_active(&self, id: &str, active: bool) -> Result<()> {
        self.remote
            .update_by_id("workers", id, &json!({ "is_active": active }))
            .await
            .context("failed to update worker")?;
        Ok(())
    }

    pub async fn delete_worker(&self, id: &str) -> Result<()> {
        self.remote
            .delete_by_id("workers", id)
            .await
            .context("failed to delete worker")
    }

    // Tax invoice operations

    pub async fn load_tax_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<TaxInvoice>> {
        let mut query = self
            .remote
            .table("tax_invoices")
            .select("*")
            .order_desc("invoice_date");
        match filter {
            InvoiceFilter::All => {}
            InvoiceFilter::Unassigned => query = query.is_null("project_id"),
            InvoiceFilter::Project(id) => query = query.eq("project_id", id),
        }
        let rows = query.fetch().await.context("failed to load tax invoices")?;
        Ok(decode_rows("tax_invoices", rows)?)
    }

    pub async fn assign_invoice_project(&self, id: &str, project_id: Option<&str>) -> Result<()> {
        self.remote
            .update_by_id("tax_invoices", id, &json!({ "project_id": project_id }))
            .await
            .context("failed to assign project")?;
        Ok(())
    }

    /// Pull new invoices from the external bookkeeping service. Returns the
    /// number of freshly imported rows.
    pub async fn sync_tax_invoices(&self) -> Result<u64> {
        let reply = self
            .remote
            .invoke("sync-tax-invoices", &json!({ "companyId": self.company_id }))
            .await
            .context("failed to sync tax invoices")?;
        reply
            .get("newCount")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("sync reply missing newCount: {reply}"))
    }
}

/// Server-issued id of the first returned row.
fn row_id(rows: &[Value]) -> Result<String> {
    rows.first()
        .and_then(|row| row.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("write returned no row id"))
}

/// Initialize the typed data access layer
pub fn init(config: &Config) -> Database {
    Database::new(config)
}
