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

use crate::models::{Project, ProjectStatus, WorkType};
use crate::ui::components::date_input::DateInputState;
use crate::ui::components::select_input::SelectState;

pub enum ProjectFormAction {
    Cancel,
    Save(Box<Project>),
}

#[derive(Clone, Copy, PartialEq)]
pub enum ProjectField {
    Name,
    Client,
    Status,
    WorkType,
    Area,
    Location,
    BusinessMajor,
    BusinessMinor,
    StartDate,
    EndDate,
    Budget,
    BankAccount,
    DriveUrl,
    Notes,
}

const FIELD_ORDER: [ProjectField; 14] = [
    ProjectField::Name,
    ProjectField::Client,
    ProjectField::Status,
    ProjectField::WorkType,
    ProjectField::Area,
    ProjectField::Location,
    ProjectField::BusinessMajor,
    ProjectField::BusinessMinor,
    ProjectField::StartDate,
    ProjectField::EndDate,
    ProjectField::Budget,
    ProjectField::BankAccount,
    ProjectField::DriveUrl,
    ProjectField::Notes,
];

pub struct ProjectFormState {
    pub project: Project,
    pub current_field: ProjectField,
    pub editing: bool,
    status_select: SelectState,
    work_type_select: SelectState,
    start_date_state: DateInputState,
    end_date_state: DateInputState,
    area_input: String,
    budget_input: String,
    location_input: String,
    major_input: String,
    minor_input: String,
    bank_input: String,
    url_input: String,
    notes_input: String,
    pub message: Option<String>,
}

impl ProjectFormState {
    pub fn new() -> Self {
        let today = chrono::Local::now().date_naive();
        Self::build(
            Project {
                id: String::new(),
                project_name: String::new(),
                client_name: String::new(),
                status: ProjectStatus::Estimate,
                work_type: WorkType::DesignAndConstruction,
                area: None,
                location: None,
                business_category_major: None,
                business_category_minor: None,
                estimated_budget: 0.0,
                actual_cost: 0.0,
                start_date: today,
                end_date: None,
                bank_account: None,
                google_drive_url: None,
                notes: None,
                created_at: None,
            },
        )
    }

    pub fn from_existing(project: Project) -> Self {
        Self::build(project)
    }

    fn build(project: Project) -> Self {
        let mut status_select =
            SelectState::new(ProjectStatus::ALL.iter().map(|s| s.label().to_string()).collect());
        status_select.select_label(project.status.label());

        let mut work_type_select =
            SelectState::new(WorkType::ALL.iter().map(|w| w.label().to_string()).collect());
        work_type_select.select_label(project.work_type.label());

        let end_date = project.end_date.unwrap_or(project.start_date);
        let area_input = project.area.map(|a| a.to_string()).unwrap_or_default();
        let budget_input = if project.estimated_budget == 0.0 {
            String::new()
        } else {
            format!("{:.0}", project.estimated_budget)
        };

        Self {
            start_date_state: DateInputState::new(project.start_date),
            end_date_state: DateInputState::new(end_date),
            current_field: ProjectField::Name,
            editing: false,
            status_select,
            work_type_select,
            area_input,
            budget_input,
            location_input: project.location.clone().unwrap_or_default(),
            major_input: project.business_category_major.clone().unwrap_or_default(),
            minor_input: project.business_category_minor.clone().unwrap_or_default(),
            bank_input: project.bank_account.clone().unwrap_or_default(),
            url_input: project.google_drive_url.clone().unwrap_or_default(),
            notes_input: project.notes.clone().unwrap_or_default(),
            project,
            message: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.project.id.is_empty()
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            match self.current_field {
                ProjectField::StartDate => self.start_date_state.toggle_editing(),
                ProjectField::EndDate => self.end_date_state.toggle_editing(),
                _ => {}
            }
        } else {
            self.start_date_state.editing = false;
            self.end_date_state.editing = false;
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

    fn text_buffer(&mut self) -> Option<&mut String> {
        match self.current_field {
            ProjectField::Name => Some(&mut self.project.project_name),
            ProjectField::Client => Some(&mut self.project.client_name),
            ProjectField::Area => Some(&mut self.area_input),
            ProjectField::Location => Some(&mut self.location_input),
            ProjectField::BusinessMajor => Some(&mut self.major_input),
            ProjectField::BusinessMinor => Some(&mut self.minor_input),
            ProjectField::Budget => Some(&mut self.budget_input),
            ProjectField::BankAccount => Some(&mut self.bank_input),
            ProjectField::DriveUrl => Some(&mut self.url_input),
            ProjectField::Notes => Some(&mut self.notes_input),
            _ => None,
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            ProjectField::Status => {
                self.status_select.handle_input(key);
                self.project.status = ProjectStatus::ALL[self.status_select.index()];
            }
            ProjectField::WorkType => {
                self.work_type_select.handle_input(key);
                self.project.work_type = WorkType::ALL[self.work_type_select.index()];
            }
            ProjectField::StartDate => {
                self.start_date_state.handle_input(key);
                self.project.start_date = self.start_date_state.date;
            }
            ProjectField::EndDate => {
                if self.project.end_date.is_none() {
                    self.project.end_date = Some(self.project.start_date);
                    self.end_date_state.date = self.project.start_date;
                }
                self.end_date_state.handle_input(key);
                if let Some(end_date) = &mut self.project.end_date {
                    *end_date = self.end_date_state.date;
                }
            }
            _ => {
                if let Some(buffer) = self.text_buffer() {
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
    }

    pub fn clear_end_date(&mut self) {
        self.project.end_date = None;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn validation_message(&self) -> Option<&'static str> {
        if self.project.project_name.trim().is_empty() {
            return Some("Project name is required");
        }
        if self.project.client_name.trim().is_empty() {
            return Some("Client name is required");
        }
        if self.budget_input.trim().is_empty() {
            return Some("An estimated budget is required");
        }
        if self.budget_input.parse::<f64>().is_err() {
            return Some("Budget must be a number");
        }
        if !self.area_input.is_empty() && self.area_input.parse::<f64>().is_err() {
            return Some("Area must be a number");
        }
        if let Some(end) = self.project.end_date {
            if end < self.project.start_date {
                return Some("End date is before the start date");
            }
        }
        None
    }

    fn finished_project(&self) -> Project {
        fn non_empty(s: &str) -> Option<String> {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        let mut project = self.project.clone();
        project.estimated_budget = self.budget_input.parse().unwrap_or(0.0);
        project.area = self.area_input.parse().ok();
        project.location = non_empty(&self.location_input);
        project.business_category_major = non_empty(&self.major_input);
        project.business_category_minor = non_empty(&self.minor_input);
        project.bank_account = non_empty(&self.bank_input);
        project.google_drive_url = non_empty(&self.url_input);
        project.notes = non_empty(&self.notes_input);
        project
    }
}

pub fn render_project_form<B: Backend>(f: &mut Frame<B>, state: &mut ProjectFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(14),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = if state.is_new() {
        "New Project"
    } else {
        "Edit Project"
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = if let Some(message) = &state.message {
        message.clone()
    } else if state.editing {
        match state.current_field {
            ProjectField::Status | ProjectField::WorkType => {
                "Left/Right - Change | Enter - Done".to_string()
            }
            ProjectField::StartDate | ProjectField::EndDate => {
                "Type digits | Left/Right - Date part | Enter - Done".to_string()
            }
            _ => "Type to edit | Enter - Done | Esc - Cancel editing".to_string(),
        }
    } else {
        "Enter - Edit field | Up/Down - Move | X - Clear end date | S - Save | Esc - Back"
            .to_string()
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut ProjectFormState, area: Rect) {
    let end_date_str = match &state.project.end_date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => "Not set".to_string(),
    };

    let rows: Vec<(&str, String, ProjectField)> = vec![
        ("Name", state.project.project_name.clone(), ProjectField::Name),
        ("Client", state.project.client_name.clone(), ProjectField::Client),
        ("Status", state.status_select.display(), ProjectField::Status),
        ("Work type", state.work_type_select.display(), ProjectField::WorkType),
        ("Area (py)", state.area_input.clone(), ProjectField::Area),
        ("Location", state.location_input.clone(), ProjectField::Location),
        (
            "Business (major)",
            state.major_input.clone(),
            ProjectField::BusinessMajor,
        ),
        (
            "Business (minor)",
            state.minor_input.clone(),
            ProjectField::BusinessMinor,
        ),
        (
            "Start date",
            state.project.start_date.format("%Y-%m-%d").to_string(),
            ProjectField::StartDate,
        ),
        ("End date", end_date_str, ProjectField::EndDate),
        ("Budget", state.budget_input.clone(), ProjectField::Budget),
        ("Bank account", state.bank_input.clone(), ProjectField::BankAccount),
        ("Drive URL", state.url_input.clone(), ProjectField::DriveUrl),
        ("Notes", state.notes_input.clone(), ProjectField::Notes),
    ];

    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|(name, value, field)| {
            let selected = field == state.current_field;
            let content = if selected && state.editing {
                let displayed = match field {
                    ProjectField::StartDate => state.start_date_state.get_display_string(),
                    ProjectField::EndDate => state.end_date_state.get_display_string(),
                    ProjectField::Status | ProjectField::WorkType => value,
                    _ => format!("{value}|"),
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

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Project Details"));
    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ProjectFormState) -> Result<Option<ProjectFormAction>> {
    if let Event::Key(key) = event::read()? {
        state.message = None;
        match key.code {
            KeyCode::Esc => {
                if state.editing {
                    state.toggle_editing();
                } else {
                    return Ok(Some(ProjectFormAction::Cancel));
                }
            }
            KeyCode::Enter => {
                state.toggle_editing();
            }
            KeyCode::Up if !state.editing => state.previous_field(),
            KeyCode::Down if !state.editing => state.next_field(),
            KeyCode::Char('x') if !state.editing => {
                if state.current_field == ProjectField::EndDate {
                    state.clear_end_date();
                }
            }
            KeyCode::Char('s') if !state.editing => match state.validation_message() {
                Some(message) => state.message = Some(message.to_string()),
                None => {
                    return Ok(Some(ProjectFormAction::Save(Box::new(
                        state.finished_project(),
                    ))));
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

    #[test]
    fn a_blank_form_reports_missing_required_fields() {
        let mut state = ProjectFormState::new();
        assert_eq!(state.validation_message(), Some("Project name is required"));
        state.project.project_name = "Cafe remodel".to_string();
        assert_eq!(state.validation_message(), Some("Client name is required"));
        state.project.client_name = "Acme".to_string();
        assert_eq!(
            state.validation_message(),
            Some("An estimated budget is required")
        );
        state.budget_input = "1200000".to_string();
        assert_eq!(state.validation_message(), None);
    }

    #[test]
    fn budget_text_is_parsed_on_save() {
        let mut state = ProjectFormState::new();
        state.project.project_name = "Cafe".to_string();
        state.project.client_name = "Acme".to_string();
        state.budget_input = "2500000".to_string();
        assert_eq!(state.finished_project().estimated_budget, 2_500_000.0);
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let mut state = ProjectFormState::new();
        state.project.project_name = "Cafe".to_string();
        state.project.client_name = "Acme".to_string();
        state.budget_input = "1000".to_string();
        state.project.end_date = Some(state.project.start_date.pred_opt().unwrap());
        assert_eq!(
            state.validation_message(),
            Some("End date is before the start date")
        );
    }
}
