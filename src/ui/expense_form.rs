use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::{
    Classification, ExpenseApproval, ExpenseStatus, SubcontractorAccount, WorkCategory, WorkLog,
    Worker, WorkerType,
};
use crate::ui::components::select_input::SelectState;
use crate::ui::format_currency;

pub enum ExpenseFormAction {
    Cancel,
    Save(Box<ExpenseApproval>),
}

#[derive(Clone, Copy, PartialEq)]
pub enum ExpenseField {
    Classification,
    Category,
    Subcategory,
    Amount,
    Vat,
    Account,
    Notes,
}

const FIELD_ORDER: [ExpenseField; 7] = [
    ExpenseField::Classification,
    ExpenseField::Category,
    ExpenseField::Subcategory,
    ExpenseField::Amount,
    ExpenseField::Vat,
    ExpenseField::Account,
    ExpenseField::Notes,
];

enum Overlay {
    AccountPicker(ListState),
    UnpaidPicker(ListState),
}

/// Expense entry form. The classification drives the rest: labor
/// classifications swap the free-text subcategory for the worker roster
/// and force the amount to be treated as VAT-excluded.
pub struct ExpenseFormState {
    id: String,
    project_id: String,
    project_name: String,
    status: ExpenseStatus,
    classification_select: SelectState,
    categories: Vec<WorkCategory>,
    category_select: SelectState,
    subcategory: String,
    direct_workers: Vec<Worker>,
    subcontract_workers: Vec<Worker>,
    worker_select: SelectState,
    amount_input: String,
    vat_included: bool,
    account_number: String,
    notes: String,
    accounts: Vec<SubcontractorAccount>,
    unpaid_logs: Vec<WorkLog>,
    overlay: Option<Overlay>,
    pub current_field: ExpenseField,
    pub editing: bool,
    message: Option<String>,
}

impl ExpenseFormState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_id: String,
        project_name: String,
        categories: Vec<WorkCategory>,
        direct_workers: Vec<Worker>,
        subcontract_workers: Vec<Worker>,
        accounts: Vec<SubcontractorAccount>,
        unpaid_logs: Vec<WorkLog>,
        existing: Option<ExpenseApproval>,
    ) -> Self {
        let classification_select = SelectState::new(
            Classification::ALL.iter().map(|c| c.label().to_string()).collect(),
        );
        let category_select =
            SelectState::new(categories.iter().map(|c| c.category_name.clone()).collect());

        let mut state = Self {
            id: String::new(),
            project_id,
            project_name,
            status: ExpenseStatus::Pending,
            classification_select,
            categories,
            category_select,
            subcategory: String::new(),
            direct_workers,
            subcontract_workers,
            worker_select: SelectState::new(vec![]),
            amount_input: String::new(),
            vat_included: true,
            account_number: String::new(),
            notes: String::new(),
            accounts,
            unpaid_logs,
            overlay: None,
            current_field: ExpenseField::Classification,
            editing: false,
            message: None,
        };

        if let Some(expense) = existing {
            state.id = expense.id;
            state.status = expense.status;
            state
                .classification_select
                .select_label(expense.classification.label());
            if let Some(category) = expense.work_category {
                state.category_select.select_label(&category);
            }
            state.subcategory = expense.work_subcategory.unwrap_or_default();
            state.amount_input = format!("{:.0}", expense.amount);
            state.vat_included = expense.vat_included;
            state.account_number = expense.account_number.unwrap_or_default();
            state.notes = expense.notes.unwrap_or_default();
        }
        state.rebuild_worker_select();
        state
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    pub fn classification(&self) -> Classification {
        Classification::ALL[self.classification_select.index()]
    }

    fn workers_for_classification(&self) -> Option<&[Worker]> {
        match self.classification().worker_type()? {
            WorkerType::DirectLabor => Some(&self.direct_workers),
            WorkerType::Subcontract => Some(&self.subcontract_workers),
        }
    }

    fn rebuild_worker_select(&mut self) {
        let labels = self
            .workers_for_classification()
            .map(|workers| workers.iter().map(|w| w.name.clone()).collect())
            .unwrap_or_default();
        self.worker_select = SelectState::new(labels);
        if !self.subcategory.is_empty() {
            self.worker_select.select_label(&self.subcategory);
        }
    }

    fn after_classification_change(&mut self) {
        if self.classification().forces_vat_excluded() {
            self.vat_included = false;
        }
        self.rebuild_worker_select();
    }

    /// The subcategory the save will carry: worker name for labor rows,
    /// free text otherwise.
    pub fn effective_subcategory(&self) -> Option<String> {
        if self.classification().worker_type().is_some() {
            self.worker_select.current_label().map(str::to_string)
        } else {
            let trimmed = self.subcategory.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }

    /// Copy an unpaid work log's worker, category and cost into the form.
    fn prefill_from_log(&mut self, index: usize) {
        let Some(log) = self.unpaid_logs.get(index).cloned() else {
            return;
        };
        self.category_select.select_label(&log.work_cate1);
        self.subcategory = log.worker_name.clone();
        self.amount_input = format!("{:.0}", log.cost);
        self.rebuild_worker_select();
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        let i = FIELD_ORDER.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELD_ORDER[(i + 1) % FIELD_ORDER.len()];
    }

    pub fn previous_field(&mut self) {
        let i = FIELD_ORDER.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELD_ORDER[(i + FIELD_ORDER.len() - 1) % FIELD_ORDER.len()];
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            ExpenseField::Classification => {
                self.classification_select.handle_input(key);
                self.after_classification_change();
            }
            ExpenseField::Category => self.category_select.handle_input(key),
            ExpenseField::Subcategory => {
                if self.classification().worker_type().is_some() {
                    self.worker_select.handle_input(key);
                } else {
                    match key {
                        KeyCode::Char(c) => self.subcategory.push(c),
                        KeyCode::Backspace => {
                            self.subcategory.pop();
                        }
                        _ => {}
                    }
                }
            }
            ExpenseField::Amount => match key {
                KeyCode::Char(c) if c.is_ascii_digit() => self.amount_input.push(c),
                KeyCode::Backspace => {
                    self.amount_input.pop();
                }
                _ => {}
            },
            ExpenseField::Vat => {
                if matches!(key, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                    if self.classification().forces_vat_excluded() {
                        self.message =
                            Some("Labor expenses are always VAT-excluded".to_string());
                    } else {
                        self.vat_included = !self.vat_included;
                    }
                }
            }
            ExpenseField::Account | ExpenseField::Notes => {
                let buffer = if self.current_field == ExpenseField::Account {
                    &mut self.account_number
                } else {
                    &mut self.notes
                };
                match key {
                    KeyCode::Char(c) => buffer.push(c),
                    KeyCode::Backspace => {
                        buffer.pop();
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn validation_message(&self) -> Option<&'static str> {
        match self.amount_input.parse::<f64>() {
            Ok(amount) if amount > 0.0 => {}
            _ => return Some("Amount must be a positive number"),
        }
        if self.classification().worker_type().is_some()
            && self.worker_select.current_label().is_none()
        {
            return Some("No eligible worker for this labor expense");
        }
        None
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    fn finished_expense(&self) -> Option<ExpenseApproval> {
        let account = self.account_number.trim();
        let notes = self.notes.trim();
        Some(ExpenseApproval {
            id: self.id.clone(),
            project_id: self.project_id.clone(),
            classification: self.classification(),
            work_category: self.category_select.current_label().map(str::to_string),
            work_subcategory: self.effective_subcategory(),
            amount: self.amount_input.parse().ok()?,
            vat_included: self.vat_included,
            account_number: (!account.is_empty()).then(|| account.to_string()),
            status: self.status,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            created_at: None,
        })
    }
}

pub fn render_expense_form<B: Backend>(f: &mut Frame<B>, state: &mut ExpenseFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(9),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = if state.is_new() {
        format!("New Expense — {}", state.project_name)
    } else {
        format!("Edit Expense — {}", state.project_name)
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = if let Some(message) = &state.message {
        message.clone()
    } else if state.editing {
        "Left/Right - Change | Type to edit text | Enter - Done".to_string()
    } else {
        "Enter - Edit | Up/Down - Move | A - Pick account | W - From unpaid log | S - Save | Esc - Back"
            .to_string()
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);

    match &mut state.overlay {
        Some(Overlay::AccountPicker(list_state)) => {
            let items: Vec<ListItem> = state
                .accounts
                .iter()
                .map(|a| {
                    ListItem::new(format!("{} — {}", a.company_name, a.display_account()))
                })
                .collect();
            render_overlay(f, "Pick an account", items, list_state);
        }
        Some(Overlay::UnpaidPicker(list_state)) => {
            let items: Vec<ListItem> = state
                .unpaid_logs
                .iter()
                .map(|l| {
                    ListItem::new(format!(
                        "{} {} {} {}",
                        l.work_date.format("%Y-%m-%d"),
                        l.work_cate1,
                        l.worker_name,
                        format_currency(l.cost)
                    ))
                })
                .collect();
            render_overlay(f, "Unpaid work logs", items, list_state);
        }
        None => {}
    }
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ExpenseFormState, area: Rect) {
    let subcategory_value = if state.classification().worker_type().is_some() {
        state.worker_select.display()
    } else {
        state.subcategory.clone()
    };
    let vat_value = if state.classification().forces_vat_excluded() {
        "excluded (fixed)".to_string()
    } else if state.vat_included {
        "included".to_string()
    } else {
        "excluded".to_string()
    };

    let rows: Vec<(&str, String, ExpenseField)> = vec![
        (
            "Classification",
            state.classification_select.display(),
            ExpenseField::Classification,
        ),
        ("Category", state.category_select.display(), ExpenseField::Category),
        ("Subcategory", subcategory_value, ExpenseField::Subcategory),
        ("Amount", state.amount_input.clone(), ExpenseField::Amount),
        ("VAT", vat_value, ExpenseField::Vat),
        ("Account", state.account_number.clone(), ExpenseField::Account),
        ("Notes", state.notes.clone(), ExpenseField::Notes),
    ];

    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|(name, value, field)| {
            let selected = field == state.current_field;
            let content = if selected && state.editing {
                let displayed = match field {
                    ExpenseField::Amount
                    | ExpenseField::Account
                    | ExpenseField::Notes => format!("{value}|"),
                    ExpenseField::Subcategory
                        if state.classification().worker_type().is_none() =>
                    {
                        format!("{value}|")
                    }
                    _ => value,
                };
                Spans::from(vec![
                    Span::styled(format!("{name}: "), Style::default().fg(Color::Yellow)),
                    Span::styled(displayed, Style::default().add_modifier(Modifier::BOLD)),
                ])
            } else {
                let style = if selected {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                Spans::from(vec![
                    Span::styled(format!("{name}: "), style),
                    Span::raw(value),
                ])
            };
            ListItem::new(content)
        })
        .collect();

    let form_list =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Expense"));
    f.render_widget(form_list, area);
}

fn render_overlay<B: Backend>(
    f: &mut Frame<B>,
    title: &str,
    items: Vec<ListItem>,
    list_state: &mut ListState,
) {
    let area = centered_rect(70, 60, f.size());
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, area, list_state);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

fn overlay_nav(list_state: &mut ListState, len: usize, key: KeyCode) {
    if len == 0 {
        return;
    }
    match key {
        KeyCode::Down => {
            let i = match list_state.selected() {
                Some(i) if i >= len - 1 => 0,
                Some(i) => i + 1,
                None => 0,
            };
            list_state.select(Some(i));
        }
        KeyCode::Up => {
            let i = match list_state.selected() {
                Some(0) | None => len - 1,
                Some(i) => i - 1,
            };
            list_state.select(Some(i));
        }
        _ => {}
    }
}

pub fn handle_input(state: &mut ExpenseFormState) -> Result<Option<ExpenseFormAction>> {
    if let Event::Key(key) = event::read()? {
        state.message = None;

        if let Some(mut overlay) = state.overlay.take() {
            let keep = match &mut overlay {
                Overlay::AccountPicker(list_state) => match key.code {
                    KeyCode::Esc => false,
                    KeyCode::Enter => {
                        let picked = list_state
                            .selected()
                            .and_then(|i| state.accounts.get(i))
                            .map(SubcontractorAccount::display_account);
                        if let Some(account) = picked {
                            state.account_number = account;
                        }
                        false
                    }
                    code => {
                        overlay_nav(list_state, state.accounts.len(), code);
                        true
                    }
                },
                Overlay::UnpaidPicker(list_state) => match key.code {
                    KeyCode::Esc => false,
                    KeyCode::Enter => {
                        if let Some(i) = list_state.selected() {
                            state.prefill_from_log(i);
                        }
                        false
                    }
                    code => {
                        overlay_nav(list_state, state.unpaid_logs.len(), code);
                        true
                    }
                },
            };
            if keep {
                state.overlay = Some(overlay);
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc => {
                if state.editing {
                    state.toggle_editing();
                } else {
                    return Ok(Some(ExpenseFormAction::Cancel));
                }
            }
            KeyCode::Enter => state.toggle_editing(),
            KeyCode::Up if !state.editing => state.previous_field(),
            KeyCode::Down if !state.editing => state.next_field(),
            KeyCode::Char('a') if !state.editing => {
                if state.accounts.is_empty() {
                    state.message = Some("No saved accounts".to_string());
                } else {
                    let mut list_state = ListState::default();
                    list_state.select(Some(0));
                    state.overlay = Some(Overlay::AccountPicker(list_state));
                }
            }
            KeyCode::Char('w') if !state.editing => {
                if state.unpaid_logs.is_empty() {
                    state.message = Some("No unpaid work logs for this project".to_string());
                } else {
                    let mut list_state = ListState::default();
                    list_state.select(Some(0));
                    state.overlay = Some(Overlay::UnpaidPicker(list_state));
                }
            }
            KeyCode::Char('s') if !state.editing => match state.validation_message() {
                Some(message) => state.message = Some(message.to_string()),
                None => {
                    if let Some(expense) = state.finished_expense() {
                        return Ok(Some(ExpenseFormAction::Save(Box::new(expense))));
                    }
                }
            },
            _ if state.editing => state.edit_current_field(key.code),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn worker(name: &str, worker_type: WorkerType) -> Worker {
        Worker {
            id: name.to_string(),
            name: name.to_string(),
            default_cost: 200_000.0,
            worker_type,
            is_active: true,
        }
    }

    fn form() -> ExpenseFormState {
        ExpenseFormState::new(
            "p1".to_string(),
            "Cafe remodel".to_string(),
            vec![WorkCategory {
                id: "c1".to_string(),
                category_name: "tiling".to_string(),
                description: None,
                subcategories: vec![],
            }],
            vec![worker("Kim", WorkerType::DirectLabor)],
            vec![worker("Han Corp", WorkerType::Subcontract)],
            vec![],
            vec![WorkLog {
                id: "w1".to_string(),
                project_id: "p1".to_string(),
                work_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                work_content: "floor".to_string(),
                cost: 180_000.0,
                work_cate1: "tiling".to_string(),
                worker_name: "Kim".to_string(),
                notes: None,
                payment_completed: false,
                project: None,
            }],
            None,
        )
    }

    fn select_classification(state: &mut ExpenseFormState, classification: Classification) {
        state.current_field = ExpenseField::Classification;
        state.editing = true;
        while state.classification() != classification {
            state.edit_current_field(KeyCode::Right);
        }
        state.editing = false;
    }

    #[test]
    fn labor_classifications_force_vat_excluded() {
        let mut state = form();
        assert!(state.vat_included);
        select_classification(&mut state, Classification::DirectLabor);
        assert!(!state.vat_included);

        // and the toggle refuses to flip it back
        state.current_field = ExpenseField::Vat;
        state.editing = true;
        state.edit_current_field(KeyCode::Char(' '));
        assert!(!state.vat_included);
    }

    #[test]
    fn labor_subcategory_comes_from_the_worker_roster() {
        let mut state = form();
        select_classification(&mut state, Classification::Subcontract);
        assert_eq!(state.effective_subcategory(), Some("Han Corp".to_string()));
    }

    #[test]
    fn prefill_copies_the_unpaid_log() {
        let mut state = form();
        state.prefill_from_log(0);
        assert_eq!(state.amount_input, "180000");
        assert_eq!(state.subcategory, "Kim");
        assert_eq!(state.validation_message(), None);
    }

    #[test]
    fn amount_must_be_positive() {
        let mut state = form();
        assert_eq!(
            state.validation_message(),
            Some("Amount must be a positive number")
        );
        state.amount_input = "0".to_string();
        assert_eq!(
            state.validation_message(),
            Some("Amount must be a positive number")
        );
        state.amount_input = "50000".to_string();
        assert_eq!(state.validation_message(), None);
    }
}
