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

use crate::budget::{remaining_color, remaining_percent};
use crate::models::Project;
use crate::ui::components::select_input::SelectState;
use crate::ui::{feature_hotkey, format_currency, rgb, Feature, TAB_BAR};

// State of the projects list screen, filtered to one start-date year.
pub struct ProjectsState {
    years: Vec<i32>,
    year_select: SelectState,
    projects: Vec<Project>,
    table_state: TableState,
    message: Option<String>,
}

impl ProjectsState {
    pub fn new(years: Vec<i32>, selected_year: i32, projects: Vec<Project>) -> Self {
        let mut year_select = SelectState::new(years.iter().map(i32::to_string).collect());
        year_select.select_label(&selected_year.to_string());

        let mut table_state = TableState::default();
        if !projects.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            years,
            year_select,
            projects,
            table_state,
            message: None,
        }
    }

    pub fn next(&mut self) {
        if self.projects.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) => {
                if i >= self.projects.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.projects.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.projects.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.table_state.selected().and_then(|i| self.projects.get(i))
    }

    pub fn selected_year(&self) -> Option<i32> {
        self.years.get(self.year_select.index()).copied()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum ProjectAction {
    Quit,
    NewProject,
    EditProject(Box<Project>),
    YearChanged(i32),
    Goto(Feature),
}

pub fn render_projects<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectsState) {
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
        Span::styled("Year: ", Style::default().fg(Color::Gray)),
        Span::styled(
            state.year_select.display(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("   {} project(s)", state.projects.len())),
    ]);
    let header = Paragraph::new(header_line)
        .block(Block::default().title("Projects").borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    if state.projects.is_empty() {
        let empty = Paragraph::new("No projects in this year. Press <N> to add one.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, chunks[1]);
    } else {
        let header_cells = [
            "Name", "Client", "Status", "Type", "Budget", "Spent", "Left %", "Start",
        ]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = state.projects.iter().map(|project| {
            let percent = remaining_percent(project.estimated_budget, project.actual_cost);
            let percent_cell = if project.estimated_budget == 0.0 {
                Cell::from("-")
            } else {
                Cell::from(format!("{percent}%"))
                    .style(Style::default().fg(rgb(remaining_color(percent))))
            };

            let cells = vec![
                Cell::from(project.project_name.clone()),
                Cell::from(project.client_name.clone()),
                Cell::from(project.status.label())
                    .style(Style::default().fg(rgb(project.status.color()))),
                Cell::from(project.work_type.label()),
                Cell::from(format_currency(project.estimated_budget)),
                Cell::from(format_currency(project.actual_cost)),
                percent_cell,
                Cell::from(project.start_date.format("%Y-%m-%d").to_string()),
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
                Constraint::Percentage(22),
                Constraint::Percentage(14),
                Constraint::Percentage(10),
                Constraint::Percentage(12),
                Constraint::Percentage(12),
                Constraint::Percentage(12),
                Constraint::Percentage(8),
                Constraint::Percentage(10),
            ]);
        frame.render_stateful_widget(table, chunks[1], &mut state.table_state);
    }

    let help = match &state.message {
        Some(message) => format!("{message}\n{TAB_BAR}"),
        None => format!(
            "<←/→> Year | <N> New | <E> Edit | <Q> Quit\n{TAB_BAR}"
        ),
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[2]);
}

pub fn handle_input(state: &mut ProjectsState) -> Result<Option<ProjectAction>> {
    if let Event::Key(key) = event::read()? {
        if let Some(feature) = feature_hotkey(key.code) {
            if feature != Feature::Projects {
                return Ok(Some(ProjectAction::Goto(feature)));
            }
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                return Ok(Some(ProjectAction::Quit));
            }
            KeyCode::Char('n') => {
                return Ok(Some(ProjectAction::NewProject));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(project) = state.selected_project() {
                    return Ok(Some(ProjectAction::EditProject(Box::new(project.clone()))));
                }
            }
            KeyCode::Left => {
                state.year_select.previous();
                if let Some(year) = state.selected_year() {
                    return Ok(Some(ProjectAction::YearChanged(year)));
                }
            }
            KeyCode::Right => {
                state.year_select.next();
                if let Some(year) = state.selected_year() {
                    return Ok(Some(ProjectAction::YearChanged(year)));
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
    use crate::models::{ProjectStatus, WorkType};
    use chrono::NaiveDate;

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: id.to_string(),
            project_name: name.to_string(),
            client_name: "Acme".to_string(),
            status: ProjectStatus::InProgress,
            work_type: WorkType::ConstructionOnly,
            area: None,
            location: None,
            business_category_major: None,
            business_category_minor: None,
            estimated_budget: 1_000_000.0,
            actual_cost: 0.0,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: None,
            bank_account: None,
            google_drive_url: None,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn year_selection_follows_the_requested_year() {
        let state = ProjectsState::new(vec![2026, 2025, 2024], 2025, vec![]);
        assert_eq!(state.selected_year(), Some(2025));
    }

    #[test]
    fn selection_wraps_around_the_list() {
        let mut state = ProjectsState::new(
            vec![2025],
            2025,
            vec![project("a", "Cafe"), project("b", "Office")],
        );
        state.previous();
        assert_eq!(state.selected_project().map(|p| p.id.as_str()), Some("b"));
        state.next();
        assert_eq!(state.selected_project().map(|p| p.id.as_str()), Some("a"));
    }
}
