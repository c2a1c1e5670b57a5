use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{Worker, WorkerType};
use crate::ui::components::select_input::SelectState;
use crate::ui::{feature_hotkey, format_currency, Feature, TAB_BAR};

#[derive(Clone, Copy, PartialEq)]
enum WorkerField {
    Name,
    Cost,
    Type,
}

struct WorkerForm {
    id: String,
    name: String,
    cost: String,
    type_select: SelectState,
    is_active: bool,
    field: WorkerField,
}

impl WorkerForm {
    fn new() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            cost: String::new(),
            type_select: SelectState::new(vec![
                WorkerType::DirectLabor.label().to_string(),
                WorkerType::Subcontract.label().to_string(),
            ]),
            is_active: true,
            field: WorkerField::Name,
        }
    }

    fn from_existing(worker: &Worker) -> Self {
        let mut form = Self::new();
        form.id = worker.id.clone();
        form.name = worker.name.clone();
        form.cost = format!("{:.0}", worker.default_cost);
        form.type_select.select_label(worker.worker_type.label());
        form.is_active = worker.is_active;
        form
    }

    fn worker_type(&self) -> WorkerType {
        if self.type_select.index() == 1 {
            WorkerType::Subcontract
        } else {
            WorkerType::DirectLabor
        }
    }

    fn validation_message(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("Worker name is required");
        }
        match self.cost.parse::<f64>() {
            Ok(cost) if cost >= 0.0 => None,
            _ => Some("Default cost must be a number"),
        }
    }

    fn finished(&self) -> Option<Worker> {
        Some(Worker {
            id: self.id.clone(),
            name: self.name.trim().to_string(),
            default_cost: self.cost.parse().ok()?,
            worker_type: self.worker_type(),
            is_active: self.is_active,
        })
    }
}

pub struct WorkersState {
    workers: Vec<Worker>,
    table_state: TableState,
    form: Option<WorkerForm>,
    show_delete_confirmation: bool,
    message: Option<String>,
}

impl WorkersState {
    pub fn new(workers: Vec<Worker>) -> Self {
        let mut table_state = TableState::default();
        if !workers.is_empty() {
            table_state.select(Some(0));
        }
        Self {
            workers,
            table_state,
            form: None,
            show_delete_confirmation: false,
            message: None,
        }
    }

    pub fn next(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= self.workers.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.workers.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_worker(&self) -> Option<&Worker> {
        self.table_state.selected().and_then(|i| self.workers.get(i))
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum WorkerAction {
    SaveWorker(Box<Worker>),
    SetActive { id: String, active: bool },
    DeleteWorker(String),
    Goto(Feature),
}

pub fn render_workers<B: Backend>(frame: &mut Frame<B>, state: &mut WorkersState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(size);

    if state.workers.is_empty() {
        let empty = Paragraph::new("No workers yet. Press <N> to add one.")
            .block(Block::default().title("Workers").borders(Borders::ALL));
        frame.render_widget(empty, chunks[0]);
    } else {
        let header_cells = ["Name", "Type", "Default cost", "Active"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = state.workers.iter().map(|worker| {
            let active_cell = if worker.is_active {
                Cell::from("active").style(Style::default().fg(Color::Green))
            } else {
                Cell::from("inactive").style(Style::default().fg(Color::DarkGray))
            };
            let cells = vec![
                Cell::from(worker.name.clone()),
                Cell::from(worker.worker_type.label()),
                Cell::from(format_currency(worker.default_cost)),
                active_cell,
            ];
            Row::new(cells).height(1)
        });

        let table = Table::new(rows)
            .header(header)
            .block(Block::default().title("Workers").borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .widths(&[
                Constraint::Percentage(30),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(20),
            ]);
        frame.render_stateful_widget(table, chunks[0], &mut state.table_state);
    }

    let help = if state.show_delete_confirmation {
        "Delete this worker? <Y> Yes  <Any other key> No".to_string()
    } else {
        match &state.message {
            Some(message) => format!("{message}\n{TAB_BAR}"),
            None => format!("<N> New | <E> Edit | <M> Toggle active | <D> Delete\n{TAB_BAR}"),
        }
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[1]);

    if state.form.is_some() {
        render_form(frame, state, size);
    }
}

fn render_form<B: Backend>(frame: &mut Frame<B>, state: &mut WorkersState, size: Rect) {
    let Some(form) = &state.form else { return };

    let rows: Vec<(&str, String, WorkerField)> = vec![
        ("Name", form.name.clone(), WorkerField::Name),
        ("Default cost", form.cost.clone(), WorkerField::Cost),
        ("Type", form.type_select.display(), WorkerField::Type),
    ];

    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|(name, value, field)| {
            let selected = field == form.field;
            let style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let value = if selected && field != WorkerField::Type {
                format!("{value}|")
            } else {
                value
            };
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{name}: "), style),
                Span::raw(value),
            ]))
        })
        .collect();

    let title = if form.id.is_empty() {
        "New Worker (Tab - Next field, Enter - Save, Esc - Cancel)"
    } else {
        "Edit Worker (Tab - Next field, Enter - Save, Esc - Cancel)"
    };
    let area = centered_rect(60, 40, size);
    let list = List::new(items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(list, area);
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

pub fn handle_input(state: &mut WorkersState) -> Result<Option<WorkerAction>> {
    if let Event::Key(key) = event::read()? {
        if let Some(mut form) = state.form.take() {
            match key.code {
                KeyCode::Esc => {}
                KeyCode::Enter => match form.validation_message() {
                    Some(message) => {
                        state.message = Some(message.to_string());
                        state.form = Some(form);
                    }
                    None => {
                        if let Some(worker) = form.finished() {
                            return Ok(Some(WorkerAction::SaveWorker(Box::new(worker))));
                        }
                        state.form = Some(form);
                    }
                },
                KeyCode::Tab | KeyCode::Down => {
                    form.field = match form.field {
                        WorkerField::Name => WorkerField::Cost,
                        WorkerField::Cost => WorkerField::Type,
                        WorkerField::Type => WorkerField::Name,
                    };
                    state.form = Some(form);
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.field = match form.field {
                        WorkerField::Name => WorkerField::Type,
                        WorkerField::Cost => WorkerField::Name,
                        WorkerField::Type => WorkerField::Cost,
                    };
                    state.form = Some(form);
                }
                code => {
                    match form.field {
                        WorkerField::Name => match code {
                            KeyCode::Char(c) => form.name.push(c),
                            KeyCode::Backspace => {
                                form.name.pop();
                            }
                            _ => {}
                        },
                        WorkerField::Cost => match code {
                            KeyCode::Char(c) if c.is_ascii_digit() => form.cost.push(c),
                            KeyCode::Backspace => {
                                form.cost.pop();
                            }
                            _ => {}
                        },
                        WorkerField::Type => form.type_select.handle_input(code),
                    }
                    state.form = Some(form);
                }
            }
            return Ok(None);
        }

        if state.show_delete_confirmation {
            state.show_delete_confirmation = false;
            if key.code == KeyCode::Char('y') {
                if let Some(worker) = state.selected_worker() {
                    return Ok(Some(WorkerAction::DeleteWorker(worker.id.clone())));
                }
            }
            return Ok(None);
        }

        if let Some(feature) = feature_hotkey(key.code) {
            if feature != Feature::Workers {
                return Ok(Some(WorkerAction::Goto(feature)));
            }
        }

        match key.code {
            KeyCode::Char('n') => state.form = Some(WorkerForm::new()),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(worker) = state.selected_worker() {
                    state.form = Some(WorkerForm::from_existing(worker));
                }
            }
            KeyCode::Char('m') => {
                if let Some(worker) = state.selected_worker() {
                    return Ok(Some(WorkerAction::SetActive {
                        id: worker.id.clone(),
                        active: !worker.is_active,
                    }));
                }
            }
            KeyCode::Char('d') => {
                if state.selected_worker().is_some() {
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

    #[test]
    fn the_form_round_trips_an_existing_worker() {
        let worker = Worker {
            id: "w1".to_string(),
            name: "Kim".to_string(),
            default_cost: 180_000.0,
            worker_type: WorkerType::Subcontract,
            is_active: false,
        };
        let rebuilt = WorkerForm::from_existing(&worker).finished().unwrap();
        assert_eq!(rebuilt.id, "w1");
        assert_eq!(rebuilt.default_cost, 180_000.0);
        assert_eq!(rebuilt.worker_type, WorkerType::Subcontract);
        assert!(!rebuilt.is_active);
    }

    #[test]
    fn a_name_is_required_before_saving() {
        let mut form = WorkerForm::new();
        form.cost = "100000".to_string();
        assert_eq!(form.validation_message(), Some("Worker name is required"));
        form.name = "Kim".to_string();
        assert_eq!(form.validation_message(), None);
    }
}
