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

use crate::models::{Project, WorkLog};
use crate::ui::components::select_input::SelectState;
use crate::ui::{feature_hotkey, format_currency, Feature, TAB_BAR};

/// Work log list with a project filter and a process-category filter.
/// Changing either filter is answered by one fresh server-side fetch; the
/// category filter resets whenever the project changes.
pub struct WorkLogsState {
    projects: Vec<Project>,
    project_select: SelectState,
    categories: Vec<String>,
    category_select: SelectState,
    logs: Vec<WorkLog>,
    total_cost: f64,
    table_state: TableState,
    show_delete_confirmation: bool,
    pub message: Option<String>,
}

impl WorkLogsState {
    pub fn new(projects: Vec<Project>, categories: Vec<String>, logs: Vec<WorkLog>) -> Self {
        let mut project_labels = vec!["all".to_string()];
        project_labels.extend(projects.iter().map(|p| p.project_name.clone()));
        let mut category_labels = vec!["all".to_string()];
        category_labels.extend(categories.iter().cloned());

        let total_cost = logs.iter().map(|l| l.cost).sum();
        let mut table_state = TableState::default();
        if !logs.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            projects,
            project_select: SelectState::new(project_labels),
            categories,
            category_select: SelectState::new(category_labels),
            logs,
            total_cost,
            table_state,
            show_delete_confirmation: false,
            message: None,
        }
    }

    /// Replace the rows after a filter-change refetch.
    pub fn set_logs(&mut self, logs: Vec<WorkLog>) {
        self.total_cost = logs.iter().map(|l| l.cost).sum();
        self.logs = logs;
        let selection = if self.logs.is_empty() { None } else { Some(0) };
        self.table_state.select(selection);
    }

    /// New categories arrive with a new project scope, so the category
    /// filter drops back to "all".
    pub fn set_categories(&mut self, categories: Vec<String>) {
        let mut labels = vec!["all".to_string()];
        labels.extend(categories.iter().cloned());
        self.categories = categories;
        self.category_select = SelectState::new(labels);
    }

    pub fn select_log(&mut self, id: &str) {
        if let Some(i) = self.logs.iter().position(|l| l.id == id) {
            self.table_state.select(Some(i));
        }
    }

    pub fn next(&mut self) {
        if self.logs.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= self.logs.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.logs.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.logs.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_log(&self) -> Option<&WorkLog> {
        self.table_state.selected().and_then(|i| self.logs.get(i))
    }

    /// `None` means the "all" option.
    pub fn selected_project_id(&self) -> Option<&str> {
        match self.project_select.index() {
            0 => None,
            i => self.projects.get(i - 1).map(|p| p.id.as_str()),
        }
    }

    pub fn selected_category(&self) -> Option<&str> {
        match self.category_select.index() {
            0 => None,
            i => self.categories.get(i - 1).map(String::as_str),
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum WorkLogAction {
    NewLog,
    EditLog(Box<WorkLog>),
    FilterChanged { project_changed: bool },
    TogglePayment { id: String, completed: bool },
    DeleteLog(String),
    Goto(Feature),
}

pub fn render_work_logs<B: Backend>(frame: &mut Frame<B>, state: &mut WorkLogsState) {
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

    let header_line = Spans::from(vec![
        Span::styled("Project: ", Style::default().fg(Color::Gray)),
        Span::styled(
            state.project_select.display(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled("   Category: ", Style::default().fg(Color::Gray)),
        Span::styled(
            state.category_select.display(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "   {} row(s), total {}",
            state.logs.len(),
            format_currency(state.total_cost)
        )),
    ]);
    let header = Paragraph::new(header_line)
        .block(Block::default().title("Work Logs").borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    if state.logs.is_empty() {
        let empty = Paragraph::new("No work logs match the current filters.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, chunks[1]);
    } else {
        let header_cells = ["Date", "Project", "Category", "Content", "Worker", "Cost", "Paid"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = state.logs.iter().map(|log| {
            let paid_cell = if log.payment_completed {
                Cell::from("paid").style(Style::default().fg(Color::Green))
            } else {
                Cell::from("unpaid").style(Style::default().fg(Color::Yellow))
            };
            let cells = vec![
                Cell::from(log.work_date.format("%Y-%m-%d").to_string()),
                Cell::from(log.project_name().to_string()),
                Cell::from(log.work_cate1.clone()),
                Cell::from(log.work_content.clone()),
                Cell::from(log.worker_name.clone()),
                Cell::from(format_currency(log.cost)),
                paid_cell,
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
                Constraint::Percentage(11),
                Constraint::Percentage(18),
                Constraint::Percentage(12),
                Constraint::Percentage(25),
                Constraint::Percentage(12),
                Constraint::Percentage(13),
                Constraint::Percentage(9),
            ]);
        frame.render_stateful_widget(table, chunks[1], &mut state.table_state);
    }

    let help = if state.show_delete_confirmation {
        "Delete this work log? <Y> Yes  <Any other key> No".to_string()
    } else {
        match &state.message {
            Some(message) => format!("{message}\n{TAB_BAR}"),
            None => format!(
                "<P> Project filter | <C> Category filter | <N> New | <E> Edit | <M> Toggle paid | <D> Delete\n{TAB_BAR}"
            ),
        }
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[2]);
}

pub fn handle_input(state: &mut WorkLogsState) -> Result<Option<WorkLogAction>> {
    if let Event::Key(key) = event::read()? {
        if state.show_delete_confirmation {
            state.show_delete_confirmation = false;
            if key.code == KeyCode::Char('y') {
                if let Some(log) = state.selected_log() {
                    return Ok(Some(WorkLogAction::DeleteLog(log.id.clone())));
                }
            }
            return Ok(None);
        }

        if let Some(feature) = feature_hotkey(key.code) {
            if feature != Feature::WorkLogs {
                return Ok(Some(WorkLogAction::Goto(feature)));
            }
        }

        match key.code {
            KeyCode::Char('p') => {
                state.project_select.next();
                return Ok(Some(WorkLogAction::FilterChanged { project_changed: true }));
            }
            KeyCode::Char('c') => {
                state.category_select.next();
                return Ok(Some(WorkLogAction::FilterChanged { project_changed: false }));
            }
            KeyCode::Char('n') => return Ok(Some(WorkLogAction::NewLog)),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(log) = state.selected_log() {
                    return Ok(Some(WorkLogAction::EditLog(Box::new(log.clone()))));
                }
            }
            KeyCode::Char('m') => {
                if let Some(log) = state.selected_log() {
                    return Ok(Some(WorkLogAction::TogglePayment {
                        id: log.id.clone(),
                        completed: !log.payment_completed,
                    }));
                }
            }
            KeyCode::Char('d') => {
                if state.selected_log().is_some() {
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
    use chrono::NaiveDate;

    fn log(id: &str, cost: f64) -> WorkLog {
        WorkLog {
            id: id.to_string(),
            project_id: "p1".to_string(),
            work_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            work_content: "demolition".to_string(),
            cost,
            work_cate1: "demolition".to_string(),
            worker_name: "Kim".to_string(),
            notes: None,
            payment_completed: false,
            project: None,
        }
    }

    #[test]
    fn total_cost_tracks_the_visible_rows() {
        let mut state = WorkLogsState::new(vec![], vec![], vec![log("a", 100.0), log("b", 250.0)]);
        assert_eq!(state.total_cost, 350.0);
        state.set_logs(vec![log("c", 40.0)]);
        assert_eq!(state.total_cost, 40.0);
    }

    #[test]
    fn replacing_categories_resets_the_category_filter() {
        let mut state =
            WorkLogsState::new(vec![], vec!["tiling".to_string()], vec![log("a", 1.0)]);
        state.category_select.select(1);
        assert_eq!(state.selected_category(), Some("tiling"));
        state.set_categories(vec!["painting".to_string()]);
        assert_eq!(state.selected_category(), None);
    }

    #[test]
    fn the_all_option_maps_to_no_project_filter() {
        let state = WorkLogsState::new(vec![], vec![], vec![]);
        assert_eq!(state.selected_project_id(), None);
    }
}
