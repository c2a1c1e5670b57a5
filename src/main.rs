mod budget;
mod config;
mod db;
mod models;
mod pipeline;
mod remote;
mod ui;

use std::io;

use anyhow::Result;
use chrono::Datelike;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::db::InvoiceFilter;
use crate::pipeline::{upload_batch, INTER_ITEM_DELAY};
use crate::ui::{
    accounts::{handle_input as handle_accounts_input, render_accounts, AccountAction, AccountsState},
    expense_form::{
        handle_input as handle_expense_form_input, render_expense_form, ExpenseFormAction,
        ExpenseFormState,
    },
    expenses::{handle_input as handle_expenses_input, render_expenses, ExpenseAction, ExpensesState},
    project_form::{
        handle_input as handle_project_form_input, render_project_form, ProjectFormAction,
        ProjectFormState,
    },
    projects::{handle_input as handle_projects_input, render_projects, ProjectAction, ProjectsState},
    site_diary::{
        handle_input as handle_site_diary_input, render_site_diary, SiteDiaryAction, SiteDiaryState,
    },
    site_diary_detail::{
        handle_input as handle_diary_detail_input, render_site_diary_detail, SiteDiaryDetailAction,
        SiteDiaryDetailState,
    },
    site_diary_form::{
        handle_input as handle_diary_form_input, render_site_diary_form, scan_photo_dir,
        SiteDiaryFormAction, SiteDiaryFormState,
    },
    tax_invoices::{
        handle_input as handle_tax_invoices_input, render_tax_invoices, TaxInvoiceAction,
        TaxInvoicesState,
    },
    work_log_form::{
        handle_input as handle_work_log_form_input, render_work_log_form, WorkLogFormAction,
        WorkLogFormState,
    },
    work_logs::{
        handle_input as handle_work_logs_input, render_work_logs, WorkLogAction, WorkLogsState,
    },
    workers::{handle_input as handle_workers_input, render_workers, WorkerAction, WorkersState},
    Feature,
};

#[derive(Parser)]
#[command(name = "sitedesk", about = "Terminal back office for a contracting business")]
struct Args {
    /// Pull new tax invoices from the bookkeeping service and exit.
    #[arg(long)]
    sync_invoices: bool,
}

// Represents the current screen in the app
enum AppScreen {
    Projects,
    ProjectForm,
    WorkLogs,
    WorkLogForm,
    SiteDiary,
    SiteDiaryForm,
    SiteDiaryDetail,
    Expenses,
    ExpenseForm,
    TaxInvoices,
    Accounts,
    Workers,
}

// Main application state
struct AppState {
    db: db::Database,
    config: config::Config,
    screen: AppScreen,
    projects_state: Option<ProjectsState>,
    project_form_state: Option<ProjectFormState>,
    work_logs_state: Option<WorkLogsState>,
    work_log_form_state: Option<WorkLogFormState>,
    site_diary_state: Option<SiteDiaryState>,
    site_diary_form_state: Option<SiteDiaryFormState>,
    site_diary_detail_state: Option<SiteDiaryDetailState>,
    expenses_state: Option<ExpensesState>,
    expense_form_state: Option<ExpenseFormState>,
    tax_invoices_state: Option<TaxInvoicesState>,
    accounts_state: Option<AccountsState>,
    workers_state: Option<WorkersState>,
}

impl AppState {
    fn new(db: db::Database, config: config::Config) -> Self {
        Self {
            db,
            config,
            screen: AppScreen::Projects,
            projects_state: None,
            project_form_state: None,
            work_logs_state: None,
            work_log_form_state: None,
            site_diary_state: None,
            site_diary_form_state: None,
            site_diary_detail_state: None,
            expenses_state: None,
            expense_form_state: None,
            tax_invoices_state: None,
            accounts_state: None,
            workers_state: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::init()?;

    // The TUI owns the terminal, so logs go to a file.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let db = db::init(&config);

    if args.sync_invoices {
        let imported = db.sync_tax_invoices().await?;
        println!("{imported} new invoice(s) imported");
        return Ok(());
    }

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(db, config);
    load_projects_screen(&mut app_state, None).await?;

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = %err, "exited with error");
        println!("Error: {err:#}");
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| match app_state.screen {
            AppScreen::Projects => {
                if let Some(state) = &mut app_state.projects_state {
                    render_projects(f, state);
                }
            }
            AppScreen::ProjectForm => {
                if let Some(state) = &mut app_state.project_form_state {
                    render_project_form(f, state);
                }
            }
            AppScreen::WorkLogs => {
                if let Some(state) = &mut app_state.work_logs_state {
                    render_work_logs(f, state);
                }
            }
            AppScreen::WorkLogForm => {
                if let Some(state) = &mut app_state.work_log_form_state {
                    render_work_log_form(f, state);
                }
            }
            AppScreen::SiteDiary => {
                if let Some(state) = &mut app_state.site_diary_state {
                    render_site_diary(f, state);
                }
            }
            AppScreen::SiteDiaryForm => {
                if let Some(state) = &mut app_state.site_diary_form_state {
                    render_site_diary_form(f, state);
                }
            }
            AppScreen::SiteDiaryDetail => {
                if let Some(state) = &mut app_state.site_diary_detail_state {
                    render_site_diary_detail(f, state);
                }
            }
            AppScreen::Expenses => {
                if let Some(state) = &mut app_state.expenses_state {
                    render_expenses(f, state);
                }
            }
            AppScreen::ExpenseForm => {
                if let Some(state) = &mut app_state.expense_form_state {
                    render_expense_form(f, state);
                }
            }
            AppScreen::TaxInvoices => {
                if let Some(state) = &mut app_state.tax_invoices_state {
                    render_tax_invoices(f, state);
                }
            }
            AppScreen::Accounts => {
                if let Some(state) = &mut app_state.accounts_state {
                    render_accounts(f, state);
                }
            }
            AppScreen::Workers => {
                if let Some(state) = &mut app_state.workers_state {
                    render_workers(f, state);
                }
            }
        })?;

        let should_quit = match app_state.screen {
            AppScreen::Projects => handle_projects_screen(app_state).await?,
            AppScreen::ProjectForm => handle_project_form_screen(app_state).await?,
            AppScreen::WorkLogs => handle_work_logs_screen(app_state).await?,
            AppScreen::WorkLogForm => handle_work_log_form_screen(app_state).await?,
            AppScreen::SiteDiary => handle_site_diary_screen(app_state).await?,
            AppScreen::SiteDiaryForm => handle_site_diary_form_screen(terminal, app_state).await?,
            AppScreen::SiteDiaryDetail => handle_site_diary_detail_screen(app_state).await?,
            AppScreen::Expenses => handle_expenses_screen(app_state).await?,
            AppScreen::ExpenseForm => handle_expense_form_screen(app_state).await?,
            AppScreen::TaxInvoices => handle_tax_invoices_screen(app_state).await?,
            AppScreen::Accounts => handle_accounts_screen(app_state).await?,
            AppScreen::Workers => handle_workers_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn goto_feature(app_state: &mut AppState, feature: Feature) {
    let result = match feature {
        Feature::Projects => load_projects_screen(app_state, None).await,
        Feature::WorkLogs => load_work_logs_screen(app_state).await,
        Feature::SiteDiary => load_site_diary_screen(app_state).await,
        Feature::Expenses => load_expenses_screen(app_state).await,
        Feature::TaxInvoices => load_tax_invoices_screen(app_state).await,
        Feature::Accounts => load_accounts_screen(app_state).await,
        Feature::Workers => load_workers_screen(app_state).await,
    };
    if let Err(err) = result {
        surface_error(app_state, "Screen load", &err);
    }
}

/// Remote failures never unwind the app. The error is logged and shown on
/// whichever screen the user is currently looking at; a half-filled form
/// stays alive with its input intact.
fn surface_error(app_state: &mut AppState, what: &str, err: &anyhow::Error) {
    tracing::error!(error = %err, operation = what, "remote call failed");
    let message = format!("{what} failed: {err:#}");
    match app_state.screen {
        AppScreen::Projects => {
            if let Some(state) = &mut app_state.projects_state {
                state.set_message(message);
            }
        }
        AppScreen::ProjectForm => {
            if let Some(state) = &mut app_state.project_form_state {
                state.set_message(message);
            }
        }
        AppScreen::WorkLogs => {
            if let Some(state) = &mut app_state.work_logs_state {
                state.set_message(message);
            }
        }
        AppScreen::WorkLogForm => {
            if let Some(state) = &mut app_state.work_log_form_state {
                state.set_message(message);
            }
        }
        AppScreen::SiteDiary => {
            if let Some(state) = &mut app_state.site_diary_state {
                state.set_message(message);
            }
        }
        AppScreen::SiteDiaryForm => {
            if let Some(state) = &mut app_state.site_diary_form_state {
                state.set_message(message);
            }
        }
        AppScreen::SiteDiaryDetail => {
            if let Some(state) = &mut app_state.site_diary_detail_state {
                state.set_message(message);
            }
        }
        AppScreen::Expenses => {
            if let Some(state) = &mut app_state.expenses_state {
                state.set_message(message);
            }
        }
        AppScreen::ExpenseForm => {
            if let Some(state) = &mut app_state.expense_form_state {
                state.set_message(message);
            }
        }
        AppScreen::TaxInvoices => {
            if let Some(state) = &mut app_state.tax_invoices_state {
                state.set_message(message);
            }
        }
        AppScreen::Accounts => {
            if let Some(state) = &mut app_state.accounts_state {
                state.set_message(message);
            }
        }
        AppScreen::Workers => {
            if let Some(state) = &mut app_state.workers_state {
                state.set_message(message);
            }
        }
    }
}

// Projects

async fn load_projects_screen(app_state: &mut AppState, year: Option<i32>) -> Result<()> {
    let mut years = app_state.db.load_project_years().await?;
    let current = chrono::Local::now().year();
    let selected = year.unwrap_or(if years.contains(&current) {
        current
    } else {
        years.first().copied().unwrap_or(current)
    });
    if !years.contains(&selected) {
        years.push(selected);
        years.sort_unstable_by(|a, b| b.cmp(a));
    }

    let projects = app_state.db.load_projects_in_year(selected).await?;
    app_state.projects_state = Some(ProjectsState::new(years, selected, projects));
    app_state.screen = AppScreen::Projects;
    Ok(())
}

async fn handle_projects_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.projects_state {
        match handle_projects_input(state)? {
            Some(ProjectAction::Quit) => return Ok(true),
            Some(ProjectAction::Goto(feature)) => goto_feature(app_state, feature).await,
            Some(ProjectAction::YearChanged(year)) => {
                if let Err(err) = load_projects_screen(app_state, Some(year)).await {
                    surface_error(app_state, "Project load", &err);
                }
            }
            Some(ProjectAction::NewProject) => {
                app_state.project_form_state = Some(ProjectFormState::new());
                app_state.screen = AppScreen::ProjectForm;
            }
            Some(ProjectAction::EditProject(project)) => {
                app_state.project_form_state = Some(ProjectFormState::from_existing(*project));
                app_state.screen = AppScreen::ProjectForm;
            }
            None => {}
        }
    }
    Ok(false)
}

async fn handle_project_form_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.project_form_state {
        match handle_project_form_input(state)? {
            Some(ProjectFormAction::Cancel) => {
                if let Err(err) = load_projects_screen(app_state, None).await {
                    surface_error(app_state, "Project load", &err);
                }
            }
            Some(ProjectFormAction::Save(project)) => {
                match app_state.db.save_project(&project).await {
                    Ok(_) => {
                        let year = project.start_date.year();
                        if let Err(err) = load_projects_screen(app_state, Some(year)).await {
                            surface_error(app_state, "Project load", &err);
                        } else if let Some(state) = &mut app_state.projects_state {
                            state.set_message("Project saved");
                        }
                    }
                    Err(err) => surface_error(app_state, "Project save", &err),
                }
            }
            None => {}
        }
    }
    Ok(false)
}

// Work logs

async fn load_work_logs_screen(app_state: &mut AppState) -> Result<()> {
    let projects = app_state.db.load_active_projects().await?;
    let categories = app_state.db.load_work_log_categories(None).await?;
    let logs = app_state.db.load_work_logs(None, None).await?;
    app_state.work_logs_state = Some(WorkLogsState::new(projects, categories, logs));
    app_state.screen = AppScreen::WorkLogs;
    Ok(())
}

/// Filter-change refetches keep the last-known rows on failure.
async fn refresh_work_logs(app_state: &mut AppState) {
    if let Some(state) = &mut app_state.work_logs_state {
        let project_id = state.selected_project_id().map(str::to_string);
        let category = state.selected_category().map(str::to_string);
        match app_state
            .db
            .load_work_logs(project_id.as_deref(), category.as_deref())
            .await
        {
            Ok(logs) => state.set_logs(logs),
            Err(err) => {
                tracing::error!(error = %err, "work log refresh failed");
                state.set_message(format!("{err:#}"));
            }
        }
    }
}

async fn handle_work_logs_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.work_logs_state {
        match handle_work_logs_input(state)? {
            Some(WorkLogAction::Goto(feature)) => goto_feature(app_state, feature).await,
            Some(WorkLogAction::FilterChanged { project_changed }) => {
                if project_changed {
                    // The category list is scoped to the project, so the
                    // category filter resets alongside it.
                    let project_id = state.selected_project_id().map(str::to_string);
                    match app_state
                        .db
                        .load_work_log_categories(project_id.as_deref())
                        .await
                    {
                        Ok(categories) => state.set_categories(categories),
                        Err(err) => {
                            tracing::error!(error = %err, "category refresh failed");
                            state.set_message(format!("{err:#}"));
                        }
                    }
                }
                refresh_work_logs(app_state).await;
            }
            Some(WorkLogAction::TogglePayment { id, completed }) => {
                match app_state.db.set_payment_completed(&id, completed).await {
                    Ok(_) => {
                        refresh_work_logs(app_state).await;
                        if let Some(state) = &mut app_state.work_logs_state {
                            state.select_log(&id);
                        }
                    }
                    Err(err) => surface_error(app_state, "Payment update", &err),
                }
            }
            Some(WorkLogAction::DeleteLog(id)) => {
                match app_state.db.delete_work_log(&id).await {
                    Ok(_) => {
                        refresh_work_logs(app_state).await;
                        if let Some(state) = &mut app_state.work_logs_state {
                            state.set_message("Work log deleted");
                        }
                    }
                    Err(err) => surface_error(app_state, "Work log delete", &err),
                }
            }
            Some(WorkLogAction::NewLog) => {
                if let Err(err) = open_work_log_form(app_state, None).await {
                    surface_error(app_state, "Form load", &err);
                }
            }
            Some(WorkLogAction::EditLog(log)) => {
                if let Err(err) = open_work_log_form(app_state, Some(*log)).await {
                    surface_error(app_state, "Form load", &err);
                }
            }
            None => {}
        }
    }
    Ok(false)
}

async fn open_work_log_form(
    app_state: &mut AppState,
    existing: Option<models::WorkLog>,
) -> Result<()> {
    let projects = app_state.db.load_active_projects().await?;
    let categories = app_state.db.load_work_categories().await?;
    let workers: Vec<models::Worker> = app_state
        .db
        .load_workers()
        .await?
        .into_iter()
        .filter(|w| w.is_active)
        .collect();

    app_state.work_log_form_state = Some(match existing {
        Some(log) => WorkLogFormState::from_existing(projects, categories, workers, log),
        None => WorkLogFormState::new(projects, categories, workers),
    });
    app_state.screen = AppScreen::WorkLogForm;
    Ok(())
}

async fn handle_work_log_form_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.work_log_form_state {
        match handle_work_log_form_input(state)? {
            Some(WorkLogFormAction::Cancel) => {
                if let Err(err) = load_work_logs_screen(app_state).await {
                    surface_error(app_state, "Work log load", &err);
                }
            }
            Some(WorkLogFormAction::Save(log)) => {
                match app_state.db.save_work_log(&log).await {
                    Ok(saved_id) => {
                        if let Err(err) = load_work_logs_screen(app_state).await {
                            surface_error(app_state, "Work log load", &err);
                        } else if let Some(state) = &mut app_state.work_logs_state {
                            state.select_log(&saved_id);
                            state.set_message("Work log saved");
                        }
                    }
                    Err(err) => surface_error(app_state, "Work log save", &err),
                }
            }
            None => {}
        }
    }
    Ok(false)
}

// Site diary

async fn load_site_diary_screen(app_state: &mut AppState) -> Result<()> {
    let projects = app_state.db.load_all_projects().await?;
    let photos = app_state.db.load_site_photos(None).await?;
    app_state.site_diary_state = Some(SiteDiaryState::new(projects, photos));
    app_state.screen = AppScreen::SiteDiary;
    Ok(())
}

async fn refresh_site_diary(app_state: &mut AppState) {
    if let Some(state) = &mut app_state.site_diary_state {
        let project_id = state.selected_project_id().map(str::to_string);
        match app_state.db.load_site_photos(project_id.as_deref()).await {
            Ok(photos) => state.set_photos(photos),
            Err(err) => {
                tracing::error!(error = %err, "site diary refresh failed");
                state.set_message(format!("{err:#}"));
            }
        }
    }
}

async fn handle_site_diary_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.site_diary_state {
        match handle_site_diary_input(state)? {
            Some(SiteDiaryAction::Goto(feature)) => goto_feature(app_state, feature).await,
            Some(SiteDiaryAction::FilterChanged) => refresh_site_diary(app_state).await,
            Some(SiteDiaryAction::NewBatch) => match app_state.db.load_active_projects().await {
                Ok(projects) => {
                    let available =
                        scan_photo_dir(std::path::Path::new(&app_state.config.photo_dir));
                    app_state.site_diary_form_state =
                        Some(SiteDiaryFormState::new(projects, available));
                    app_state.screen = AppScreen::SiteDiaryForm;
                }
                Err(err) => surface_error(app_state, "Form load", &err),
            },
            Some(SiteDiaryAction::OpenGroup(photos)) => {
                app_state.site_diary_detail_state = Some(SiteDiaryDetailState::new(photos));
                app_state.screen = AppScreen::SiteDiaryDetail;
            }
            None => {}
        }
    }
    Ok(false)
}

async fn handle_site_diary_form_screen<B: Backend>(
    terminal: &mut Terminal<B>,
    app_state: &mut AppState,
) -> Result<bool> {
    if let Some(state) = &mut app_state.site_diary_form_state {
        match handle_diary_form_input(state)? {
            Some(SiteDiaryFormAction::Cancel) => {
                if let Err(err) = load_site_diary_screen(app_state).await {
                    surface_error(app_state, "Site diary load", &err);
                }
            }
            Some(SiteDiaryFormAction::Submit(batch)) => {
                // Each per-item step redraws the form so the progress is
                // visible while the batch runs.
                let outcome = upload_batch(&app_state.db, &batch, INTER_ITEM_DELAY, |step| {
                    tracing::info!(step, "upload progress");
                    state.set_message(step.to_string());
                    let _ = terminal.draw(|f| render_site_diary_form(f, &mut *state));
                })
                .await;
                match load_site_diary_screen(app_state).await {
                    Ok(()) => {
                        if let Some(state) = &mut app_state.site_diary_state {
                            state.set_message(outcome.summary());
                        }
                    }
                    Err(err) => surface_error(app_state, "Site diary load", &err),
                }
            }
            None => {}
        }
    }
    Ok(false)
}

async fn handle_site_diary_detail_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.site_diary_detail_state {
        match handle_diary_detail_input(state)? {
            Some(SiteDiaryDetailAction::Back) => {
                app_state.screen = AppScreen::SiteDiary;
                refresh_site_diary(app_state).await;
            }
            Some(SiteDiaryDetailAction::SaveEdit {
                id,
                comment,
                visibility,
            }) => {
                match app_state
                    .db
                    .update_site_photo(&id, comment.as_deref(), visibility)
                    .await
                {
                    Ok(_) => {
                        state.apply_saved_edit();
                        state.set_message("Photo updated");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "photo update failed");
                        state.set_message(format!("Photo update failed: {err:#}"));
                    }
                }
            }
            Some(SiteDiaryDetailAction::DeletePhoto(id)) => {
                match app_state.db.delete_site_photo(&id).await {
                    Ok(_) => {
                        state.remove_current();
                        if state.is_empty() {
                            app_state.screen = AppScreen::SiteDiary;
                            refresh_site_diary(app_state).await;
                        } else {
                            state.set_message("Photo deleted");
                        }
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "photo delete failed");
                        state.set_message(format!("Photo delete failed: {err:#}"));
                    }
                }
            }
            None => {}
        }
    }
    Ok(false)
}

// Expenses

async fn load_expenses_screen(app_state: &mut AppState) -> Result<()> {
    let projects = app_state.db.load_all_projects().await?;
    let expenses = match projects.first() {
        Some(project) => app_state.db.load_expenses(&project.id, None).await?,
        None => Vec::new(),
    };
    app_state.expenses_state = Some(ExpensesState::new(projects, expenses));
    app_state.screen = AppScreen::Expenses;
    Ok(())
}

/// One server-filtered fetch for the current project + status tab.
async fn refresh_expenses(app_state: &mut AppState) {
    if let Some(state) = &mut app_state.expenses_state {
        let Some(project_id) = state.selected_project_id().map(str::to_string) else {
            return;
        };
        let status = state.status_tab.server_status();
        match app_state.db.load_expenses(&project_id, status).await {
            Ok(expenses) => state.set_expenses(expenses),
            Err(err) => {
                tracing::error!(error = %err, "expense refresh failed");
                state.set_message(format!("{err:#}"));
            }
        }
    }
}

async fn handle_expenses_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.expenses_state {
        match handle_expenses_input(state)? {
            Some(ExpenseAction::Goto(feature)) => goto_feature(app_state, feature).await,
            Some(ExpenseAction::FilterChanged) => refresh_expenses(app_state).await,
            Some(ExpenseAction::SetStatus { id, status }) => {
                match app_state.db.set_expense_status(&id, status).await {
                    Ok(_) => refresh_expenses(app_state).await,
                    Err(err) => surface_error(app_state, "Status update", &err),
                }
            }
            Some(ExpenseAction::DeleteExpense(id)) => {
                match app_state.db.delete_expense(&id).await {
                    Ok(_) => {
                        refresh_expenses(app_state).await;
                        if let Some(state) = &mut app_state.expenses_state {
                            state.set_message("Expense deleted");
                        }
                    }
                    Err(err) => surface_error(app_state, "Expense delete", &err),
                }
            }
            Some(ExpenseAction::NewExpense { project_id }) => {
                if let Err(err) = open_expense_form(app_state, project_id, None).await {
                    surface_error(app_state, "Form load", &err);
                }
            }
            Some(ExpenseAction::EditExpense(expense)) => {
                let project_id = expense.project_id.clone();
                if let Err(err) = open_expense_form(app_state, project_id, Some(*expense)).await {
                    surface_error(app_state, "Form load", &err);
                }
            }
            None => {}
        }
    }
    Ok(false)
}

async fn open_expense_form(
    app_state: &mut AppState,
    project_id: String,
    existing: Option<models::ExpenseApproval>,
) -> Result<()> {
    let project_name = app_state
        .expenses_state
        .as_ref()
        .and_then(|s| s.project_name_of(&project_id))
        .unwrap_or("(unknown)")
        .to_string();

    let categories = app_state.db.load_work_categories().await?;
    let direct_workers = app_state
        .db
        .load_workers_for_expense(&project_id, models::WorkerType::DirectLabor)
        .await?;
    let subcontract_workers = app_state
        .db
        .load_workers_for_expense(&project_id, models::WorkerType::Subcontract)
        .await?;
    let accounts = app_state.db.load_accounts().await?;
    let unpaid_logs = app_state.db.load_unpaid_work_logs(&project_id).await?;

    app_state.expense_form_state = Some(ExpenseFormState::new(
        project_id,
        project_name,
        categories,
        direct_workers,
        subcontract_workers,
        accounts,
        unpaid_logs,
        existing,
    ));
    app_state.screen = AppScreen::ExpenseForm;
    Ok(())
}

async fn handle_expense_form_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.expense_form_state {
        match handle_expense_form_input(state)? {
            Some(ExpenseFormAction::Cancel) => {
                app_state.screen = AppScreen::Expenses;
                refresh_expenses(app_state).await;
            }
            Some(ExpenseFormAction::Save(expense)) => {
                let is_new = expense.id.is_empty();
                match app_state.db.save_expense(&expense).await {
                    Ok(_) => {
                        app_state.screen = AppScreen::Expenses;
                        refresh_expenses(app_state).await;
                        if let Some(state) = &mut app_state.expenses_state {
                            state.set_message(if is_new {
                                "Expense filed as pending"
                            } else {
                                "Expense updated"
                            });
                        }
                    }
                    Err(err) => surface_error(app_state, "Expense save", &err),
                }
            }
            None => {}
        }
    }
    Ok(false)
}

// Tax invoices

async fn load_tax_invoices_screen(app_state: &mut AppState) -> Result<()> {
    let projects = app_state.db.load_all_projects().await?;
    let invoices = app_state.db.load_tax_invoices(&InvoiceFilter::All).await?;
    app_state.tax_invoices_state = Some(TaxInvoicesState::new(projects, invoices));
    app_state.screen = AppScreen::TaxInvoices;
    Ok(())
}

async fn refresh_tax_invoices(app_state: &mut AppState) {
    if let Some(state) = &mut app_state.tax_invoices_state {
        let filter = state.filter();
        match app_state.db.load_tax_invoices(&filter).await {
            Ok(invoices) => state.set_invoices(invoices),
            Err(err) => {
                tracing::error!(error = %err, "tax invoice refresh failed");
                state.set_message(format!("{err:#}"));
            }
        }
    }
}

async fn handle_tax_invoices_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.tax_invoices_state {
        match handle_tax_invoices_input(state)? {
            Some(TaxInvoiceAction::Goto(feature)) => goto_feature(app_state, feature).await,
            Some(TaxInvoiceAction::FilterChanged) => refresh_tax_invoices(app_state).await,
            Some(TaxInvoiceAction::Sync) => {
                // Sync failures stay on screen instead of tearing the app down.
                match app_state.db.sync_tax_invoices().await {
                    Ok(imported) => {
                        refresh_tax_invoices(app_state).await;
                        if let Some(state) = &mut app_state.tax_invoices_state {
                            state.set_message(format!("{imported} new invoice(s) imported"));
                        }
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "invoice sync failed");
                        state.set_message(format!("Sync failed: {err:#}"));
                    }
                }
            }
            Some(TaxInvoiceAction::AssignProject {
                invoice_id,
                project_id,
            }) => {
                match app_state
                    .db
                    .assign_invoice_project(&invoice_id, project_id.as_deref())
                    .await
                {
                    Ok(_) => {
                        refresh_tax_invoices(app_state).await;
                        if let Some(state) = &mut app_state.tax_invoices_state {
                            state.set_message("Invoice assignment updated");
                        }
                    }
                    Err(err) => surface_error(app_state, "Invoice assignment", &err),
                }
            }
            None => {}
        }
    }
    Ok(false)
}

// Subcontractor accounts

async fn load_accounts_screen(app_state: &mut AppState) -> Result<()> {
    let accounts = app_state.db.load_accounts().await?;
    app_state.accounts_state = Some(AccountsState::new(accounts));
    app_state.screen = AppScreen::Accounts;
    Ok(())
}

async fn handle_accounts_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.accounts_state {
        match handle_accounts_input(state)? {
            Some(AccountAction::Goto(feature)) => goto_feature(app_state, feature).await,
            Some(AccountAction::SaveAccount(account)) => {
                match app_state.db.save_account(&account).await {
                    Ok(_) => {
                        if let Err(err) = load_accounts_screen(app_state).await {
                            surface_error(app_state, "Account load", &err);
                        } else if let Some(state) = &mut app_state.accounts_state {
                            state.set_message("Account saved");
                        }
                    }
                    Err(err) => surface_error(app_state, "Account save", &err),
                }
            }
            Some(AccountAction::DeleteAccount(id)) => {
                match app_state.db.delete_account(&id).await {
                    Ok(_) => {
                        if let Err(err) = load_accounts_screen(app_state).await {
                            surface_error(app_state, "Account load", &err);
                        } else if let Some(state) = &mut app_state.accounts_state {
                            state.set_message("Account deleted");
                        }
                    }
                    Err(err) => surface_error(app_state, "Account delete", &err),
                }
            }
            None => {}
        }
    }
    Ok(false)
}

// Workers

async fn load_workers_screen(app_state: &mut AppState) -> Result<()> {
    let workers = app_state.db.load_workers().await?;
    app_state.workers_state = Some(WorkersState::new(workers));
    app_state.screen = AppScreen::Workers;
    Ok(())
}

async fn handle_workers_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.workers_state {
        match handle_workers_input(state)? {
            Some(WorkerAction::Goto(feature)) => goto_feature(app_state, feature).await,
            Some(WorkerAction::SaveWorker(worker)) => {
                match app_state.db.save_worker(&worker).await {
                    Ok(_) => {
                        if let Err(err) = load_workers_screen(app_state).await {
                            surface_error(app_state, "Worker load", &err);
                        } else if let Some(state) = &mut app_state.workers_state {
                            state.set_message("Worker saved");
                        }
                    }
                    Err(err) => surface_error(app_state, "Worker save", &err),
                }
            }
            Some(WorkerAction::SetActive { id, active }) => {
                match app_state.db.set_worker_active(&id, active).await {
                    Ok(_) => {
                        if let Err(err) = load_workers_screen(app_state).await {
                            surface_error(app_state, "Worker load", &err);
                        }
                    }
                    Err(err) => surface_error(app_state, "Worker update", &err),
                }
            }
            Some(WorkerAction::DeleteWorker(id)) => {
                match app_state.db.delete_worker(&id).await {
                    Ok(_) => {
                        if let Err(err) = load_workers_screen(app_state).await {
                            surface_error(app_state, "Worker load", &err);
                        } else if let Some(state) = &mut app_state.workers_state {
                            state.set_message("Worker deleted");
                        }
                    }
                    Err(err) => surface_error(app_state, "Worker delete", &err),
                }
            }
            None => {}
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_state_fixture() -> AppState {
        let config = config::Config {
            backend_url: "http://localhost".to_string(),
            backend_key: "key".to_string(),
            company_id: "co".to_string(),
            photo_dir: "photos".to_string(),
            log_file: "sitedesk.log".to_string(),
        };
        let db = db::init(&config);
        AppState::new(db, config)
    }

    #[test]
    fn a_remote_failure_lands_on_the_active_list_screen() {
        let mut app_state = app_state_fixture();
        app_state.work_logs_state = Some(WorkLogsState::new(Vec::new(), Vec::new(), Vec::new()));
        app_state.screen = AppScreen::WorkLogs;

        surface_error(
            &mut app_state,
            "Work log save",
            &anyhow::anyhow!("connection refused"),
        );

        let message = app_state.work_logs_state.unwrap().message.unwrap();
        assert!(message.starts_with("Work log save failed"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn a_remote_failure_keeps_a_half_filled_form_alive() {
        let mut app_state = app_state_fixture();
        let mut form = ProjectFormState::new();
        form.project.project_name = "Cafe remodel".to_string();
        app_state.project_form_state = Some(form);
        app_state.screen = AppScreen::ProjectForm;

        surface_error(&mut app_state, "Project save", &anyhow::anyhow!("HTTP 500"));

        assert!(matches!(app_state.screen, AppScreen::ProjectForm));
        let form = app_state.project_form_state.unwrap();
        assert_eq!(form.project.project_name, "Cafe remodel");
        assert!(form.message.unwrap().starts_with("Project save failed"));
    }
}
