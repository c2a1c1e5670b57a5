use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Project, WorkCategory, WorkLog, Worker};
use crate::ui::components::date_input::DateInputState;
use crate::ui::components::select_input::SelectState;

/// Canned notes carried alongside a day's entry (overtime multipliers and
/// off-site markers).
const NOTE_PRESETS: [&str; 7] = [
    "standard",
    "other site",
    "overtime 0.5",
    "overtime 1",
    "overtime 1.5",
    "overtime 2",
    "half day",
];

pub enum WorkLogFormAction {
    Cancel,
    Save(Box<WorkLog>),
}

#[derive(Clone, Copy, PartialEq)]
pub enum WorkLogField {
    Project,
    Date,
    Category,
    Content,
    Worker,
    Cost,
    Notes,
}

const FIELD_ORDER: [WorkLogField; 7] = [
    WorkLogField::Project,
    WorkLogField::Date,
    WorkLogField::Category,
    WorkLogField::Content,
    WorkLogField::Worker,
    WorkLogField::Cost,
    WorkLogField::Notes,
];

pub struct WorkLogFormState {
    id: String,
    projects: Vec<Project>,
    workers: Vec<Worker>,
    project_select: SelectState,
    category_select: SelectState,
    worker_select: SelectState,
    notes_select: SelectState,
    pub date_state: DateInputState,
    content: String,
    cost_input: String,
    pub current_field: WorkLogField,
    pub editing: bool,
    message: Option<String>,
}

impl WorkLogFormState {
    pub fn new(projects: Vec<Project>, categories: Vec<WorkCategory>, workers: Vec<Worker>) -> Self {
        let today = chrono::Local::now().date_naive();
        Self::build(projects, categories, workers, None, today)
    }

    pub fn from_existing(
        projects: Vec<Project>,
        categories: Vec<WorkCategory>,
        workers: Vec<Worker>,
        log: WorkLog,
    ) -> Self {
        let date = log.work_date;
        Self::build(projects, categories, workers, Some(log), date)
    }

    fn build(
        projects: Vec<Project>,
        categories: Vec<WorkCategory>,
        workers: Vec<Worker>,
        log: Option<WorkLog>,
        date: chrono::NaiveDate,
    ) -> Self {
        let today = chrono::Local::now().date_naive();
        let project_select =
            SelectState::new(projects.iter().map(|p| p.project_name.clone()).collect());
        let category_select =
            SelectState::new(categories.iter().map(|c| c.category_name.clone()).collect());
        let worker_select = SelectState::new(workers.iter().map(|w| w.name.clone()).collect());
        let notes_select =
            SelectState::new(NOTE_PRESETS.iter().map(|n| n.to_string()).collect());

        let mut state = Self {
            id: String::new(),
            project_select,
            category_select,
            worker_select,
            notes_select,
            // Diary entries never post-date the calendar day.
            date_state: DateInputState::bounded(date.min(today), today),
            content: String::new(),
            cost_input: String::new(),
            current_field: WorkLogField::Project,
            editing: false,
            message: None,
            projects,
            workers,
        };

        if let Some(log) = log {
            state.id = log.id;
            if let Some(i) = state.projects.iter().position(|p| p.id == log.project_id) {
                state.project_select.select(i);
            }
            state.category_select.select_label(&log.work_cate1);
            state.worker_select.select_label(&log.worker_name);
            state.content = log.work_content;
            state.cost_input = format!("{:.0}", log.cost);
            if let Some(notes) = log.notes {
                state.notes_select.select_label(&notes);
            }
        }
        state
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    pub fn selected_project_id(&self) -> Option<&str> {
        self.projects
            .get(self.project_select.index())
            .map(|p| p.id.as_str())
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.current_field == WorkLogField::Date {
            if self.editing {
                self.date_state.toggle_editing();
            } else {
                self.date_state.editing = false;
            }
        }
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
            WorkLogField::Project => self.project_select.handle_input(key),
            WorkLogField::Date => self.date_state.handle_input(key),
            WorkLogField::Category => self.category_select.handle_input(key),
            WorkLogField::Worker => {
                self.worker_select.handle_input(key);
                // Picking a worker fills an empty cost with their day rate.
                if self.cost_input.is_empty() {
                    if let Some(worker) = self.workers.get(self.worker_select.index()) {
                        self.cost_input = format!("{:.0}", worker.default_cost);
                    }
                }
            }
            WorkLogField::Notes => self.notes_select.handle_input(key),
            WorkLogField::Content => match key {
                KeyCode::Char(c) => self.content.push(c),
                KeyCode::Backspace => {
                    self.content.pop();
                }
                _ => {}
            },
            WorkLogField::Cost => match key {
                KeyCode::Char(c) if c.is_ascii_digit() => self.cost_input.push(c),
                KeyCode::Backspace => {
                    self.cost_input.pop();
                }
                _ => {}
            },
        }
    }

    pub fn validation_message(&self) -> Option<&'static str> {
        if self.selected_project_id().is_none() {
            return Some("A project is required");
        }
        if self.category_select.current_label().is_none() {
            return Some("A work category is required");
        }
        if self.content.trim().is_empty() {
            return Some("Work content is required");
        }
        match self.cost_input.parse::<f64>() {
            Ok(cost) if cost > 0.0 => {}
            _ => return Some("Cost must be a positive number"),
        }
        if self.worker_select.current_label().is_none() {
            return Some("A worker is required");
        }
        None
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    fn finished_log(&self) -> Option<WorkLog> {
        Some(WorkLog {
            id: self.id.clone(),
            project_id: self.selected_project_id()?.to_string(),
            work_date: self.date_state.date,
            work_content: self.content.trim().to_string(),
            cost: self.cost_input.parse().ok()?,
            work_cate1: self.category_select.current_label()?.to_string(),
            worker_name: self.worker_select.current_label()?.to_string(),
            notes: self.notes_select.current_label().map(str::to_string),
            payment_completed: false,
            project: None,
        })
    }
}

pub fn render_work_log_form<B: Backend>(f: &mut Frame<B>, state: &mut WorkLogFormState) {
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
        "New Work Log"
    } else {
        "Edit Work Log"
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = if let Some(message) = &state.message {
        message.clone()
    } else if state.editing {
        "Left/Right - Change | Type to edit text | Enter - Done | Esc - Cancel editing".to_string()
    } else {
        "Enter - Edit field | Up/Down - Move | S - Save | Esc - Back".to_string()
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut WorkLogFormState, area: Rect) {
    let rows: Vec<(&str, String, WorkLogField)> = vec![
        ("Project", state.project_select.display(), WorkLogField::Project),
        (
            "Date",
            state.date_state.get_display_string(),
            WorkLogField::Date,
        ),
        ("Category", state.category_select.display(), WorkLogField::Category),
        ("Content", state.content.clone(), WorkLogField::Content),
        ("Worker", state.worker_select.display(), WorkLogField::Worker),
        ("Cost", state.cost_input.clone(), WorkLogField::Cost),
        ("Notes", state.notes_select.display(), WorkLogField::Notes),
    ];

    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|(name, value, field)| {
            let selected = field == state.current_field;
            let content = if selected && state.editing {
                let displayed = match field {
                    WorkLogField::Content | WorkLogField::Cost => format!("{value}|"),
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
        List::new(items).block(Block::default().borders(Borders::ALL).title("Work Log"));
    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut WorkLogFormState) -> Result<Option<WorkLogFormAction>> {
    if let Event::Key(key) = event::read()? {
        state.message = None;
        match key.code {
            KeyCode::Esc => {
                if state.editing {
                    state.toggle_editing();
                } else {
                    return Ok(Some(WorkLogFormAction::Cancel));
                }
            }
            KeyCode::Enter => state.toggle_editing(),
            KeyCode::Up if !state.editing => state.previous_field(),
            KeyCode::Down if !state.editing => state.next_field(),
            KeyCode::Char('s') if !state.editing => match state.validation_message() {
                Some(message) => state.message = Some(message.to_string()),
                None => {
                    if let Some(log) = state.finished_log() {
                        return Ok(Some(WorkLogFormAction::Save(Box::new(log))));
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
    use crate::models::{ProjectStatus, WorkType, WorkerType};
    use chrono::NaiveDate;

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            project_name: format!("Project {id}"),
            client_name: "Acme".to_string(),
            status: ProjectStatus::InProgress,
            work_type: WorkType::ConstructionOnly,
            area: None,
            location: None,
            business_category_major: None,
            business_category_minor: None,
            estimated_budget: 0.0,
            actual_cost: 0.0,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: None,
            bank_account: None,
            google_drive_url: None,
            notes: None,
            created_at: None,
        }
    }

    fn category(name: &str) -> WorkCategory {
        WorkCategory {
            id: name.to_string(),
            category_name: name.to_string(),
            description: None,
            subcategories: vec![],
        }
    }

    fn worker(name: &str, rate: f64) -> Worker {
        Worker {
            id: name.to_string(),
            name: name.to_string(),
            default_cost: rate,
            worker_type: WorkerType::DirectLabor,
            is_active: true,
        }
    }

    #[test]
    fn picking_a_worker_fills_an_empty_cost() {
        let mut state = WorkLogFormState::new(
            vec![project("p1")],
            vec![category("tiling")],
            vec![worker("Kim", 180_000.0), worker("Lee", 200_000.0)],
        );
        state.current_field = WorkLogField::Worker;
        state.editing = true;
        state.edit_current_field(KeyCode::Right);
        assert_eq!(state.cost_input, "200000");
    }

    #[test]
    fn a_typed_cost_is_not_overwritten_by_the_worker_rate() {
        let mut state = WorkLogFormState::new(
            vec![project("p1")],
            vec![category("tiling")],
            vec![worker("Kim", 180_000.0), worker("Lee", 200_000.0)],
        );
        state.cost_input = "150000".to_string();
        state.current_field = WorkLogField::Worker;
        state.editing = true;
        state.edit_current_field(KeyCode::Right);
        assert_eq!(state.cost_input, "150000");
    }

    #[test]
    fn validation_requires_content_and_a_positive_cost() {
        let mut state = WorkLogFormState::new(
            vec![project("p1")],
            vec![category("tiling")],
            vec![worker("Kim", 180_000.0)],
        );
        assert_eq!(state.validation_message(), Some("Work content is required"));
        state.content = "floor tiling".to_string();
        assert_eq!(
            state.validation_message(),
            Some("Cost must be a positive number")
        );
        state.cost_input = "180000".to_string();
        assert_eq!(state.validation_message(), None);
    }
}
