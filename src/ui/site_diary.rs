use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::{Project, SitePhoto};
use crate::ui::components::select_input::SelectState;
use crate::ui::{feature_hotkey, Feature, TAB_BAR};

/// Photos collapsed into per-day diary entries, newest day first.
pub fn group_by_date(photos: &[SitePhoto]) -> Vec<(NaiveDate, Vec<usize>)> {
    let mut groups: Vec<(NaiveDate, Vec<usize>)> = Vec::new();
    for (i, photo) in photos.iter().enumerate() {
        match groups.iter_mut().find(|(date, _)| *date == photo.photo_date) {
            Some((_, members)) => members.push(i),
            None => groups.push((photo.photo_date, vec![i])),
        }
    }
    groups.sort_by(|a, b| b.0.cmp(&a.0));
    groups
}

pub struct SiteDiaryState {
    projects: Vec<Project>,
    project_select: SelectState,
    photos: Vec<SitePhoto>,
    groups: Vec<(NaiveDate, Vec<usize>)>,
    list_state: ListState,
    message: Option<String>,
}

impl SiteDiaryState {
    pub fn new(projects: Vec<Project>, photos: Vec<SitePhoto>) -> Self {
        let mut project_labels = vec!["all".to_string()];
        project_labels.extend(projects.iter().map(|p| p.project_name.clone()));

        let groups = group_by_date(&photos);
        let mut list_state = ListState::default();
        if !groups.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            projects,
            project_select: SelectState::new(project_labels),
            photos,
            groups,
            list_state,
            message: None,
        }
    }

    pub fn set_photos(&mut self, photos: Vec<SitePhoto>) {
        self.groups = group_by_date(&photos);
        self.photos = photos;
        let selection = if self.groups.is_empty() { None } else { Some(0) };
        self.list_state.select(selection);
    }

    pub fn next(&mut self) {
        if self.groups.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i >= self.groups.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.groups.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.groups.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn selected_group(&self) -> Option<Vec<SitePhoto>> {
        let (_, members) = self.groups.get(self.list_state.selected()?)?;
        Some(members.iter().map(|&i| self.photos[i].clone()).collect())
    }

    pub fn selected_project_id(&self) -> Option<&str> {
        match self.project_select.index() {
            0 => None,
            i => self.projects.get(i - 1).map(|p| p.id.as_str()),
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum SiteDiaryAction {
    NewBatch,
    OpenGroup(Vec<SitePhoto>),
    FilterChanged,
    Goto(Feature),
}

pub fn render_site_diary<B: Backend>(frame: &mut Frame<B>, state: &mut SiteDiaryState) {
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
        Span::raw(format!(
            "   {} day(s), {} photo(s)",
            state.groups.len(),
            state.photos.len()
        )),
    ]);
    let header = Paragraph::new(header_line)
        .block(Block::default().title("Site Diary").borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    if state.groups.is_empty() {
        let empty = Paragraph::new("No site photos yet. Press <N> to upload a batch.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, chunks[1]);
    } else {
        let items: Vec<ListItem> = state
            .groups
            .iter()
            .map(|(date, members)| {
                let first = &state.photos[members[0]];
                let comment = first.comment.as_deref().unwrap_or("");
                ListItem::new(Spans::from(vec![
                    Span::styled(
                        date.format("%Y-%m-%d").to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(
                        "  {} photo(s)  {}  {}",
                        members.len(),
                        first.project_name(),
                        comment
                    )),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_stateful_widget(list, chunks[1], &mut state.list_state);
    }

    let help = match &state.message {
        Some(message) => format!("{message}\n{TAB_BAR}"),
        None => format!(
            "<P> Project filter | <N> New batch | <Enter> Open day\n{TAB_BAR}"
        ),
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[2]);
}

pub fn handle_input(state: &mut SiteDiaryState) -> Result<Option<SiteDiaryAction>> {
    if let Event::Key(key) = event::read()? {
        if let Some(feature) = feature_hotkey(key.code) {
            if feature != Feature::SiteDiary {
                return Ok(Some(SiteDiaryAction::Goto(feature)));
            }
        }

        match key.code {
            KeyCode::Char('p') => {
                state.project_select.next();
                return Ok(Some(SiteDiaryAction::FilterChanged));
            }
            KeyCode::Char('n') => return Ok(Some(SiteDiaryAction::NewBatch)),
            KeyCode::Enter => {
                if let Some(group) = state.selected_group() {
                    return Ok(Some(SiteDiaryAction::OpenGroup(group)));
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
    use crate::models::Visibility;

    fn photo(id: &str, date: (i32, u32, u32)) -> SitePhoto {
        SitePhoto {
            id: id.to_string(),
            project_id: "p1".to_string(),
            photo_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            photo_url: format!("https://example.test/{id}.jpg"),
            comment: None,
            visibility: Visibility::Internal,
            project: None,
        }
    }

    #[test]
    fn grouping_collapses_same_day_photos_newest_first() {
        let photos = vec![
            photo("a", (2025, 7, 14)),
            photo("b", (2025, 7, 10)),
            photo("c", (2025, 7, 14)),
            photo("d", (2025, 7, 20)),
        ];
        let groups = group_by_date(&photos);
        let dates: Vec<NaiveDate> = groups.iter().map(|(d, _)| *d).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 7, 20).unwrap(),
                NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
                NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            ]
        );
        assert_eq!(groups[1].1, vec![0, 2]);
    }

    #[test]
    fn opening_a_group_returns_that_days_photos() {
        let state = SiteDiaryState::new(
            vec![],
            vec![photo("a", (2025, 7, 14)), photo("b", (2025, 7, 14))],
        );
        let group = state.selected_group().unwrap();
        assert_eq!(group.len(), 2);
        assert!(group.iter().all(|p| p.photo_date
            == NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()));
    }
}
