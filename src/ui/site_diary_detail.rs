use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::models::{SitePhoto, Visibility};
use crate::ui::components::select_input::SelectState;

/// One day's photos, paged through one at a time. Comment and visibility
/// edits apply to the photo currently shown.
pub struct SiteDiaryDetailState {
    photos: Vec<SitePhoto>,
    index: usize,
    editing: bool,
    edit_comment: String,
    edit_visibility: SelectState,
    show_delete_confirmation: bool,
    message: Option<String>,
}

impl SiteDiaryDetailState {
    pub fn new(photos: Vec<SitePhoto>) -> Self {
        Self {
            photos,
            index: 0,
            editing: false,
            edit_comment: String::new(),
            edit_visibility: SelectState::new(vec![
                Visibility::Internal.label().to_string(),
                Visibility::Client.label().to_string(),
            ]),
            show_delete_confirmation: false,
            message: None,
        }
    }

    pub fn current(&self) -> Option<&SitePhoto> {
        self.photos.get(self.index)
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn next(&mut self) {
        if !self.photos.is_empty() {
            self.index = (self.index + 1) % self.photos.len();
        }
    }

    pub fn previous(&mut self) {
        if !self.photos.is_empty() {
            self.index = (self.index + self.photos.len() - 1) % self.photos.len();
        }
    }

    fn begin_edit(&mut self) {
        if let Some(photo) = self.current() {
            let comment = photo.comment.clone().unwrap_or_default();
            let label = photo.visibility.label();
            self.edit_comment = comment;
            self.edit_visibility.select_label(label);
            self.editing = true;
        }
    }

    fn edited_visibility(&self) -> Visibility {
        if self.edit_visibility.index() == 1 {
            Visibility::Client
        } else {
            Visibility::Internal
        }
    }

    /// Fold a confirmed save back into the local copy so the screen shows
    /// the new values without a refetch.
    pub fn apply_saved_edit(&mut self) {
        let comment = self.edit_comment.trim().to_string();
        let visibility = self.edited_visibility();
        if let Some(photo) = self.photos.get_mut(self.index) {
            photo.comment = (!comment.is_empty()).then_some(comment);
            photo.visibility = visibility;
        }
        self.editing = false;
    }

    pub fn remove_current(&mut self) {
        if self.index < self.photos.len() {
            self.photos.remove(self.index);
            if self.index >= self.photos.len() && self.index > 0 {
                self.index -= 1;
            }
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum SiteDiaryDetailAction {
    Back,
    SaveEdit {
        id: String,
        comment: Option<String>,
        visibility: Visibility,
    },
    DeletePhoto(String),
}

pub fn render_site_diary_detail<B: Backend>(frame: &mut Frame<B>, state: &mut SiteDiaryDetailState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(8), Constraint::Length(3)].as_ref())
        .split(size);

    let body = match state.current() {
        Some(photo) => {
            let comment_line = if state.editing {
                Spans::from(vec![
                    Span::styled("Comment: ", Style::default().fg(Color::Yellow)),
                    Span::styled(
                        format!("{}|", state.edit_comment),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Spans::from(vec![
                    Span::styled("Comment: ", Style::default().fg(Color::Gray)),
                    Span::raw(photo.comment.clone().unwrap_or_default()),
                ])
            };
            let visibility_line = if state.editing {
                Spans::from(vec![
                    Span::styled("Visibility: ", Style::default().fg(Color::Yellow)),
                    Span::styled(
                        state.edit_visibility.display(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Spans::from(vec![
                    Span::styled("Visibility: ", Style::default().fg(Color::Gray)),
                    Span::raw(photo.visibility.label()),
                ])
            };

            vec![
                Spans::from(vec![
                    Span::styled("Date: ", Style::default().fg(Color::Gray)),
                    Span::raw(photo.photo_date.format("%Y-%m-%d").to_string()),
                    Span::raw(format!(
                        "   ({}/{})",
                        state.index + 1,
                        state.photos.len()
                    )),
                ]),
                Spans::from(vec![
                    Span::styled("Project: ", Style::default().fg(Color::Gray)),
                    Span::raw(photo.project_name().to_string()),
                ]),
                Spans::from(vec![
                    Span::styled("URL: ", Style::default().fg(Color::Gray)),
                    Span::raw(photo.photo_url.clone()),
                ]),
                comment_line,
                visibility_line,
            ]
        }
        None => vec![Spans::from("No photos left for this day.")],
    };

    let detail = Paragraph::new(body)
        .block(Block::default().title("Diary Photo").borders(Borders::ALL));
    frame.render_widget(detail, chunks[0]);

    let help = if state.show_delete_confirmation {
        "Delete this photo? The stored image is kept. <Y> Yes  <Any other key> No".to_string()
    } else if state.editing {
        "Type comment | Tab - Visibility | Enter - Save | Esc - Cancel".to_string()
    } else {
        match &state.message {
            Some(message) => message.clone(),
            None => "<←/→> Photo | <E> Edit | <D> Delete | <Esc> Back".to_string(),
        }
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[1]);
}

pub fn handle_input(state: &mut SiteDiaryDetailState) -> Result<Option<SiteDiaryDetailAction>> {
    if let Event::Key(key) = event::read()? {
        state.message = None;

        if state.show_delete_confirmation {
            state.show_delete_confirmation = false;
            if key.code == KeyCode::Char('y') {
                if let Some(photo) = state.current() {
                    return Ok(Some(SiteDiaryDetailAction::DeletePhoto(photo.id.clone())));
                }
            }
            return Ok(None);
        }

        if state.editing {
            match key.code {
                KeyCode::Esc => state.editing = false,
                KeyCode::Enter => {
                    if let Some(photo) = state.current() {
                        let comment = state.edit_comment.trim();
                        return Ok(Some(SiteDiaryDetailAction::SaveEdit {
                            id: photo.id.clone(),
                            comment: (!comment.is_empty()).then(|| comment.to_string()),
                            visibility: state.edited_visibility(),
                        }));
                    }
                }
                KeyCode::Tab => state.edit_visibility.next(),
                KeyCode::Char(c) => state.edit_comment.push(c),
                KeyCode::Backspace => {
                    state.edit_comment.pop();
                }
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(SiteDiaryDetailAction::Back)),
            KeyCode::Right | KeyCode::Down => state.next(),
            KeyCode::Left | KeyCode::Up => state.previous(),
            KeyCode::Char('e') => state.begin_edit(),
            KeyCode::Char('d') => {
                if state.current().is_some() {
                    state.show_delete_confirmation = true;
                }
            }
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn photo(id: &str) -> SitePhoto {
        SitePhoto {
            id: id.to_string(),
            project_id: "p1".to_string(),
            photo_date: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
            photo_url: format!("https://example.test/{id}.jpg"),
            comment: Some("before".to_string()),
            visibility: Visibility::Internal,
            project: None,
        }
    }

    #[test]
    fn a_saved_edit_is_visible_without_a_refetch() {
        let mut state = SiteDiaryDetailState::new(vec![photo("a")]);
        state.begin_edit();
        state.edit_comment = "after".to_string();
        state.edit_visibility.select(1);
        state.apply_saved_edit();

        let current = state.current().unwrap();
        assert_eq!(current.comment.as_deref(), Some("after"));
        assert_eq!(current.visibility, Visibility::Client);
    }

    #[test]
    fn deleting_the_last_photo_moves_the_cursor_back() {
        let mut state = SiteDiaryDetailState::new(vec![photo("a"), photo("b")]);
        state.next();
        state.remove_current();
        assert_eq!(state.current().map(|p| p.id.as_str()), Some("a"));
        state.remove_current();
        assert!(state.is_empty());
    }
}
