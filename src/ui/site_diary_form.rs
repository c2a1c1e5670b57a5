use std::path::{Path, PathBuf};

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

use crate::models::{Project, Visibility};
use crate::pipeline::{PhotoBatch, PhotoSelection, MAX_PHOTOS};
use crate::ui::components::date_input::DateInputState;
use crate::ui::components::select_input::SelectState;

/// Image files in the local photo directory, sorted by name. This is the
/// pick list the terminal offers in place of a gallery.
pub fn scan_photo_dir(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("jpg") | Some("jpeg") | Some("png")
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    paths.sort();
    paths
}

pub enum SiteDiaryFormAction {
    Cancel,
    Submit(Box<PhotoBatch>),
}

#[derive(Clone, Copy, PartialEq)]
pub enum DiaryField {
    Project,
    Date,
    Photos,
    Comment,
    Visibility,
}

const FIELD_ORDER: [DiaryField; 5] = [
    DiaryField::Project,
    DiaryField::Date,
    DiaryField::Photos,
    DiaryField::Comment,
    DiaryField::Visibility,
];

pub struct SiteDiaryFormState {
    projects: Vec<Project>,
    project_select: SelectState,
    pub date_state: DateInputState,
    available: Vec<PathBuf>,
    available_state: ListState,
    selection: PhotoSelection,
    comment: String,
    visibility_select: SelectState,
    pub current_field: DiaryField,
    pub editing: bool,
    message: Option<String>,
}

impl SiteDiaryFormState {
    pub fn new(projects: Vec<Project>, available: Vec<PathBuf>) -> Self {
        let today = chrono::Local::now().date_naive();
        let project_select =
            SelectState::new(projects.iter().map(|p| p.project_name.clone()).collect());
        let mut available_state = ListState::default();
        if !available.is_empty() {
            available_state.select(Some(0));
        }

        Self {
            projects,
            project_select,
            date_state: DateInputState::bounded(today, today),
            available,
            available_state,
            selection: PhotoSelection::new(),
            comment: String::new(),
            visibility_select: SelectState::new(vec![
                Visibility::Internal.label().to_string(),
                Visibility::Client.label().to_string(),
            ]),
            current_field: DiaryField::Project,
            editing: false,
            message: None,
        }
    }

    pub fn selected_project_id(&self) -> Option<&str> {
        self.projects
            .get(self.project_select.index())
            .map(|p| p.id.as_str())
    }

    fn visibility(&self) -> Visibility {
        if self.visibility_select.index() == 1 {
            Visibility::Client
        } else {
            Visibility::Internal
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.current_field == DiaryField::Date {
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

    fn next_available(&mut self) {
        if self.available.is_empty() {
            return;
        }
        let i = match self.available_state.selected() {
            Some(i) if i >= self.available.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.available_state.select(Some(i));
    }

    fn previous_available(&mut self) {
        if self.available.is_empty() {
            return;
        }
        let i = match self.available_state.selected() {
            Some(0) | None => self.available.len() - 1,
            Some(i) => i - 1,
        };
        self.available_state.select(Some(i));
    }

    fn pick_highlighted(&mut self) {
        let Some(path) = self
            .available_state
            .selected()
            .and_then(|i| self.available.get(i))
            .cloned()
        else {
            return;
        };
        if self.selection.paths().contains(&path) {
            self.message = Some("That photo is already selected".to_string());
            return;
        }
        if let Err(err) = self.selection.add(path) {
            self.message = Some(err.to_string());
        }
    }

    fn unpick_last(&mut self) {
        if !self.selection.is_empty() {
            self.selection.remove(self.selection.len() - 1);
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            DiaryField::Project => self.project_select.handle_input(key),
            DiaryField::Date => self.date_state.handle_input(key),
            DiaryField::Visibility => self.visibility_select.handle_input(key),
            DiaryField::Photos => match key {
                KeyCode::Down => self.next_available(),
                KeyCode::Up => self.previous_available(),
                KeyCode::Char(' ') => self.pick_highlighted(),
                KeyCode::Char('x') => self.unpick_last(),
                _ => {}
            },
            DiaryField::Comment => match key {
                KeyCode::Char(c) => self.comment.push(c),
                KeyCode::Backspace => {
                    self.comment.pop();
                }
                _ => {}
            },
        }
    }

    pub fn validation_message(&self) -> Option<&'static str> {
        if self.selected_project_id().is_none() {
            return Some("A project is required");
        }
        if self.selection.is_empty() {
            return Some("Pick at least one photo");
        }
        None
    }

    fn finished_batch(&self) -> Option<PhotoBatch> {
        let comment = self.comment.trim();
        Some(PhotoBatch {
            project_id: self.selected_project_id()?.to_string(),
            photo_date: self.date_state.date,
            comment: (!comment.is_empty()).then(|| comment.to_string()),
            visibility: self.visibility(),
            images: self.selection.paths().to_vec(),
        })
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub fn render_site_diary_form<B: Backend>(f: &mut Frame<B>, state: &mut SiteDiaryFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(6),
                Constraint::Min(6),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title = Paragraph::new("New Diary Entry")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_fields(f, state, chunks[1]);
    render_photo_picker(f, state, chunks[2]);

    let help_text = if let Some(message) = &state.message {
        message.clone()
    } else if state.editing && state.current_field == DiaryField::Photos {
        "Up/Down - Browse | Space - Pick | X - Unpick last | Enter - Done".to_string()
    } else if state.editing {
        "Left/Right - Change | Type to edit text | Enter - Done".to_string()
    } else {
        "Enter - Edit field | Up/Down - Move | S - Upload | Esc - Back".to_string()
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_fields<B: Backend>(f: &mut Frame<B>, state: &SiteDiaryFormState, area: Rect) {
    let rows: Vec<(&str, String, DiaryField)> = vec![
        ("Project", state.project_select.display(), DiaryField::Project),
        ("Date", state.date_state.get_display_string(), DiaryField::Date),
        ("Comment", state.comment.clone(), DiaryField::Comment),
        (
            "Visibility",
            state.visibility_select.display(),
            DiaryField::Visibility,
        ),
    ];

    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|(name, value, field)| {
            let selected = field == state.current_field;
            let style = if selected && state.editing {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{name}: "), style),
                Span::raw(value),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Entry"));
    f.render_widget(list, area);
}

fn render_photo_picker<B: Backend>(f: &mut Frame<B>, state: &mut SiteDiaryFormState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(area);

    let items: Vec<ListItem> = state
        .available
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let marker = if state.selection.paths().contains(path) {
                "[x] "
            } else {
                "[ ] "
            };
            ListItem::new(format!("{marker}{name}"))
        })
        .collect();

    let picker_title = format!("Photos ({}/{MAX_PHOTOS})", state.selection.len());
    let border_style = if state.current_field == DiaryField::Photos {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(picker_title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, halves[0], &mut state.available_state);

    let picked: Vec<ListItem> = state
        .selection
        .paths()
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ListItem::new(format!("{}. {name}", i + 1))
        })
        .collect();
    let picked_list =
        List::new(picked).block(Block::default().borders(Borders::ALL).title("Upload order"));
    f.render_widget(picked_list, halves[1]);
}

pub fn handle_input(state: &mut SiteDiaryFormState) -> Result<Option<SiteDiaryFormAction>> {
    if let Event::Key(key) = event::read()? {
        state.message = None;
        match key.code {
            KeyCode::Esc => {
                if state.editing {
                    state.toggle_editing();
                } else {
                    return Ok(Some(SiteDiaryFormAction::Cancel));
                }
            }
            KeyCode::Enter => state.toggle_editing(),
            KeyCode::Up if !state.editing => state.previous_field(),
            KeyCode::Down if !state.editing => state.next_field(),
            KeyCode::Char('s') if !state.editing => match state.validation_message() {
                Some(message) => state.message = Some(message.to_string()),
                None => {
                    if let Some(batch) = state.finished_batch() {
                        return Ok(Some(SiteDiaryFormAction::Submit(Box::new(batch))));
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
    use crate::models::{ProjectStatus, WorkType};
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

    #[test]
    fn scan_only_returns_image_files_sorted() {
        let dir = std::env::temp_dir().join(format!("sitedesk-scan-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.jpg"), b"x").unwrap();
        std::fs::write(dir.join("a.png"), b"x").unwrap();
        std::fs::write(dir.join("notes.txt"), b"x").unwrap();

        let names: Vec<String> = scan_photo_dir(&dir)
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn picking_past_the_cap_reports_instead_of_growing() {
        let mut state = SiteDiaryFormState::new(
            vec![project("p1")],
            vec![
                PathBuf::from("1.jpg"),
                PathBuf::from("2.jpg"),
                PathBuf::from("3.jpg"),
                PathBuf::from("4.jpg"),
            ],
        );
        state.current_field = DiaryField::Photos;
        state.editing = true;
        for _ in 0..4 {
            state.edit_current_field(KeyCode::Char(' '));
            state.edit_current_field(KeyCode::Down);
        }
        assert_eq!(state.selection.len(), MAX_PHOTOS);
        assert!(state.message.is_some());
    }

    #[test]
    fn duplicate_picks_are_rejected() {
        let mut state =
            SiteDiaryFormState::new(vec![project("p1")], vec![PathBuf::from("1.jpg")]);
        state.current_field = DiaryField::Photos;
        state.editing = true;
        state.edit_current_field(KeyCode::Char(' '));
        state.edit_current_field(KeyCode::Char(' '));
        assert_eq!(state.selection.len(), 1);
    }

    #[test]
    fn an_empty_selection_fails_validation() {
        let state = SiteDiaryFormState::new(vec![project("p1")], vec![]);
        assert_eq!(state.validation_message(), Some("Pick at least one photo"));
    }
}
