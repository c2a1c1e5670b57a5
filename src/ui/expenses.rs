use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{ExpenseApproval, ExpenseStatus, Project};
use crate::ui::components::select_input::SelectState;
use crate::ui::{feature_hotkey, format_currency, rgb, Feature, TAB_BAR};

/// Status tab over the expense list. Each tab is a distinct server-side
/// fetch, not a client-side filter of previously loaded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTab {
    All,
    Pending,
    Paid,
}

impl StatusTab {
    pub fn next(&self) -> StatusTab {
        match self {
            StatusTab::All => StatusTab::Pending,
            StatusTab::Pending => StatusTab::Paid,
            StatusTab::Paid => StatusTab::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusTab::All => "all",
            StatusTab::Pending => "pending",
            StatusTab::Paid => "paid",
        }
    }

    /// The status constraint this tab sends to the server.
    pub fn server_status(&self) -> Option<ExpenseStatus> {
        match self {
            StatusTab::All => None,
            StatusTab::Pending => Some(ExpenseStatus::Pending),
            StatusTab::Paid => Some(ExpenseStatus::Paid),
        }
    }
}

pub struct ExpensesState {
    projects: Vec<Project>,
    project_select: SelectState,
    pub status_tab: StatusTab,
    expenses: Vec<ExpenseApproval>,
    table_state: TableState,
    show_delete_confirmation: bool,
    message: Option<String>,
}

impl ExpensesState {
    pub fn new(projects: Vec<Project>, expenses: Vec<ExpenseApproval>) -> Self {
        let project_select =
            SelectState::new(projects.iter().map(|p| p.project_name.clone()).collect());
        let mut table_state = TableState::default();
        if !expenses.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            projects,
            project_select,
            status_tab: StatusTab::All,
            expenses,
            table_state,
            show_delete_confirmation: false,
            message: None,
        }
    }

    pub fn set_expenses(&mut self, expenses: Vec<ExpenseApproval>) {
        self.expenses = expenses;
        let selection = if self.expenses.is_empty() { None } else { Some(0) };
        self.table_state.select(selection);
    }

    pub fn next(&mut self) {
        if self.expenses.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= self.expenses.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.expenses.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.expenses.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_expense(&self) -> Option<&ExpenseApproval> {
        self.table_state.selected().and_then(|i| self.expenses.get(i))
    }

    pub fn selected_project_id(&self) -> Option<&str> {
        self.projects
            .get(self.project_select.index())
            .map(|p| p.id.as_str())
    }

    pub fn selected_project_name(&self) -> Option<&str> {
        self.projects
            .get(self.project_select.index())
            .map(|p| p.project_name.as_str())
    }

    pub fn project_name_of(&self, project_id: &str) -> Option<&str> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.project_name.as_str())
    }

    pub fn pending_count(&self) -> usize {
        self.expenses
            .iter()
            .filter(|e| e.status == ExpenseStatus::Pending)
            .count()
    }

    pub fn paid_count(&self) -> usize {
        self.expenses
            .iter()
            .filter(|e| e.status == ExpenseStatus::Paid)
            .count()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum ExpenseAction {
    NewExpense { project_id: String },
    EditExpense(Box<ExpenseApproval>),
    FilterChanged,
    SetStatus { id: String, status: ExpenseStatus },
    DeleteExpense(String),
    Goto(Feature),
}

pub fn render_expenses<B: Backend>(frame: &mut Frame<B>, state: &mut ExpensesState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    let counters = if state.status_tab == StatusTab::All {
        format!(
            "   {} pending / {} paid",
            state.pending_count(),
            state.paid_count()
        )
    } else {
        format!("   {} row(s)", state.expenses.len())
    };
    let header_line = Spans::from(vec![
        Span::styled("Project: ", Style::default().fg(Color::Gray)),
        Span::styled(
            state.project_select.display(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled("   Status: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("< {} >", state.status_tab.label()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(counters),
    ]);
    let header = Paragraph::new(header_line)
        .block(Block::default().title("Expense Approvals").borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    if state.selected_project_id().is_none() {
        let empty = Paragraph::new("No projects yet; create one before filing expenses.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, chunks[1]);
    } else if state.expenses.is_empty() {
        let empty = Paragraph::new("No expenses match the current filters.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, chunks[1]);
    } else {
        let header_cells = ["Class", "Category", "Subcategory", "Amount", "VAT", "Status"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = state.expenses.iter().map(|expense| {
            let vat = if expense.vat_included { "incl" } else { "excl" };
            let cells = vec![
                Cell::from(expense.classification.label()),
                Cell::from(expense.work_category.clone().unwrap_or_default()),
                Cell::from(expense.work_subcategory.clone().unwrap_or_default()),
                Cell::from(format_currency(expense.amount)),
                Cell::from(vat),
                Cell::from(expense.status.as_str())
                    .style(Style::default().fg(rgb(expense.status.color()))),
            ];
            Row::new(cells).height(1)
        });

        let table = Table::new(rows)
            .header(header)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .widths(&[
                Constraint::Percentage(14),
                Constraint::Percentage(20),
                Constraint::Percentage(20),
                Constraint::Percentage(18),
                Constraint::Percentage(8),
                Constraint::Percentage(20),
            ]);
        frame.render_stateful_widget(table, chunks[1], &mut state.table_state);
    }

    let help = if state.show_delete_confirmation {
        "Delete this expense? <Y> Yes  <Any other key> No".to_string()
    } else {
        match &state.message {
            Some(message) => format!("{message}\n{TAB_BAR}"),
            None => format!(
                "<P> Project | <T> Status tab | <N> New | <E> Edit | <M> Toggle paid | <D> Delete\n{TAB_BAR}"
            ),
        }
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[2]);
}

pub fn handle_input(state: &mut ExpensesState) -> Result<Option<ExpenseAction>> {
    if let Event::Key(key) = event::read()? {
        if state.show_delete_confirmation {
            state.show_delete_confirmation = false;
            if key.code == KeyCode::Char('y') {
                if let Some(expense) = state.selected_expense() {
                    return Ok(Some(ExpenseAction::DeleteExpense(expense.id.clone())));
                }
            }
            return Ok(None);
        }

        if let Some(feature) = feature_hotkey(key.code) {
            if feature != Feature::Expenses {
                return Ok(Some(ExpenseAction::Goto(feature)));
            }
        }

        match key.code {
            KeyCode::Char('p') => {
                state.project_select.next();
                return Ok(Some(ExpenseAction::FilterChanged));
            }
            KeyCode::Char('t') => {
                state.status_tab = state.status_tab.next();
                return Ok(Some(ExpenseAction::FilterChanged));
            }
            KeyCode::Char('n') => {
                if let Some(project_id) = state.selected_project_id() {
                    return Ok(Some(ExpenseAction::NewExpense {
                        project_id: project_id.to_string(),
                    }));
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(expense) = state.selected_expense() {
                    return Ok(Some(ExpenseAction::EditExpense(Box::new(expense.clone()))));
                }
            }
            KeyCode::Char('m') => {
                if let Some(expense) = state.selected_expense() {
                    // An approved row has no badge toggle.
                    match expense.status.toggled() {
                        Some(status) => {
                            return Ok(Some(ExpenseAction::SetStatus {
                                id: expense.id.clone(),
                                status,
                            }));
                        }
                        None => state.set_message("Approved expenses cannot be toggled here"),
                    }
                }
            }
            KeyCode::Char('d') => {
                if state.selected_expense().is_some() {
                    state.show_delete_confirmation = true;
                }
            }
            KeyCode::Down => state.next(),
            KeyCode::Up => state.previous(),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Classification;

    fn expense(id: &str, status: ExpenseStatus) -> ExpenseApproval {
        ExpenseApproval {
            id: id.to_string(),
            project_id: "p1".to_string(),
            classification: Classification::Materials,
            work_category: Some("tiling".to_string()),
            work_subcategory: None,
            amount: 500_000.0,
            vat_included: true,
            account_number: None,
            status,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn toggling_twice_restores_the_original_status() {
        for original in [ExpenseStatus::Pending, ExpenseStatus::Paid] {
            let once = original.toggled().unwrap();
            assert_ne!(once, original);
            assert_eq!(once.toggled(), Some(original));
        }
    }

    #[test]
    fn approved_rows_have_no_badge_toggle() {
        assert_eq!(ExpenseStatus::Approved.toggled(), None);
    }

    #[test]
    fn each_tab_maps_to_its_server_constraint() {
        assert_eq!(StatusTab::All.server_status(), None);
        assert_eq!(
            StatusTab::Pending.server_status(),
            Some(ExpenseStatus::Pending)
        );
        assert_eq!(StatusTab::Paid.server_status(), Some(ExpenseStatus::Paid));
        // the tab cycle visits every tab exactly once
        let mut tab = StatusTab::All;
        let mut seen = vec![tab];
        for _ in 0..2 {
            tab = tab.next();
            assert!(!seen.contains(&tab));
            seen.push(tab);
        }
        assert_eq!(tab.next(), StatusTab::All);
    }

    #[test]
    fn counters_follow_the_loaded_rows() {
        let mut state = ExpensesState::new(
            vec![],
            vec![
                expense("a", ExpenseStatus::Pending),
                expense("b", ExpenseStatus::Paid),
                expense("c", ExpenseStatus::Pending),
            ],
        );
        assert_eq!(state.pending_count(), 2);
        assert_eq!(state.paid_count(), 1);
        state.set_expenses(vec![expense("d", ExpenseStatus::Paid)]);
        assert_eq!(state.pending_count(), 0);
        assert_eq!(state.paid_count(), 1);
    }
}
