use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::db::InvoiceFilter;
use crate::models::{Project, TaxInvoice};
use crate::ui::components::select_input::SelectState;
use crate::ui::{feature_hotkey, format_currency, rgb, Feature, TAB_BAR};

/// Tax invoice list. The filter cycles all / unassigned / one project,
/// each answered by a fresh server-side fetch; rows themselves are
/// imported by the external sync and only the project assignment is
/// editable here.
pub struct TaxInvoicesState {
    projects: Vec<Project>,
    filter_select: SelectState,
    invoices: Vec<TaxInvoice>,
    table_state: TableState,
    assign_picker: Option<ListState>,
    message: Option<String>,
}

impl TaxInvoicesState {
    pub fn new(projects: Vec<Project>, invoices: Vec<TaxInvoice>) -> Self {
        let mut labels = vec!["all".to_string(), "unassigned".to_string()];
        labels.extend(projects.iter().map(|p| p.project_name.clone()));

        let mut table_state = TableState::default();
        if !invoices.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            projects,
            filter_select: SelectState::new(labels),
            invoices,
            table_state,
            assign_picker: None,
            message: None,
        }
    }

    pub fn set_invoices(&mut self, invoices: Vec<TaxInvoice>) {
        self.invoices = invoices;
        let selection = if self.invoices.is_empty() { None } else { Some(0) };
        self.table_state.select(selection);
    }

    pub fn filter(&self) -> InvoiceFilter {
        match self.filter_select.index() {
            0 => InvoiceFilter::All,
            1 => InvoiceFilter::Unassigned,
            i => self
                .projects
                .get(i - 2)
                .map(|p| InvoiceFilter::Project(p.id.clone()))
                .unwrap_or(InvoiceFilter::All),
        }
    }

    pub fn next(&mut self) {
        if self.invoices.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= self.invoices.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.invoices.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.invoices.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_invoice(&self) -> Option<&TaxInvoice> {
        self.table_state.selected().and_then(|i| self.invoices.get(i))
    }

    fn project_name(&self, project_id: Option<&str>) -> String {
        match project_id {
            None => "-".to_string(),
            Some(id) => self
                .projects
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.project_name.clone())
                .unwrap_or_else(|| "(unknown)".to_string()),
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum TaxInvoiceAction {
    FilterChanged,
    Sync,
    AssignProject {
        invoice_id: String,
        project_id: Option<String>,
    },
    Goto(Feature),
}

pub fn render_tax_invoices<B: Backend>(frame: &mut Frame<B>, state: &mut TaxInvoicesState) {
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
        Span::styled("Filter: ", Style::default().fg(Color::Gray)),
        Span::styled(
            state.filter_select.display(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("   {} invoice(s)", state.invoices.len())),
    ]);
    let header = Paragraph::new(header_line)
        .block(Block::default().title("Tax Invoices").borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    if state.invoices.is_empty() {
        let empty = Paragraph::new("No invoices for this filter. Press <Y> to pull new ones.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, chunks[1]);
    } else {
        let header_cells = ["Date", "Number", "Type", "Counterparty", "Total", "Status", "Project"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = state.invoices.iter().map(|invoice| {
            let cells = vec![
                Cell::from(invoice.invoice_date.format("%Y-%m-%d").to_string()),
                Cell::from(invoice.invoice_number.clone()),
                Cell::from(invoice.invoice_type.label()),
                Cell::from(invoice.counterparty_name.clone().unwrap_or_default()),
                Cell::from(format_currency(invoice.total_amount)),
                Cell::from(invoice.status.label())
                    .style(Style::default().fg(rgb(invoice.status.color()))),
                Cell::from(state.project_name(invoice.project_id.as_deref())),
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
                Constraint::Percentage(15),
                Constraint::Percentage(10),
                Constraint::Percentage(18),
                Constraint::Percentage(14),
                Constraint::Percentage(10),
                Constraint::Percentage(22),
            ]);
        frame.render_stateful_widget(table, chunks[1], &mut state.table_state);
    }

    let help = match &state.message {
        Some(message) => format!("{message}\n{TAB_BAR}"),
        None => format!(
            "<F> Filter | <Y> Sync | <Enter> Assign project\n{TAB_BAR}"
        ),
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[2]);

    if state.assign_picker.is_some() {
        render_assign_picker(frame, state, size);
    }
}

fn render_assign_picker<B: Backend>(frame: &mut Frame<B>, state: &mut TaxInvoicesState, size: Rect) {
    let mut items = vec![ListItem::new("(unassigned)")];
    items.extend(
        state
            .projects
            .iter()
            .map(|p| ListItem::new(format!("{} — {}", p.project_name, p.client_name))),
    );

    let area = centered_rect(60, 60, size);
    let list = List::new(items)
        .block(
            Block::default()
                .title("Assign to project")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    if let Some(list_state) = &mut state.assign_picker {
        frame.render_stateful_widget(list, area, list_state);
    }
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

pub fn handle_input(state: &mut TaxInvoicesState) -> Result<Option<TaxInvoiceAction>> {
    if let Event::Key(key) = event::read()? {
        if let Some(mut picker) = state.assign_picker.take() {
            let option_count = state.projects.len() + 1;
            match key.code {
                KeyCode::Esc => {}
                KeyCode::Enter => {
                    let picked = picker.selected().unwrap_or(0);
                    let project_id = if picked == 0 {
                        None
                    } else {
                        state.projects.get(picked - 1).map(|p| p.id.clone())
                    };
                    if let Some(invoice) = state.selected_invoice() {
                        return Ok(Some(TaxInvoiceAction::AssignProject {
                            invoice_id: invoice.id.clone(),
                            project_id,
                        }));
                    }
                }
                KeyCode::Down => {
                    let i = match picker.selected() {
                        Some(i) if i >= option_count - 1 => 0,
                        Some(i) => i + 1,
                        None => 0,
                    };
                    picker.select(Some(i));
                    state.assign_picker = Some(picker);
                }
                KeyCode::Up => {
                    let i = match picker.selected() {
                        Some(0) | None => option_count - 1,
                        Some(i) => i - 1,
                    };
                    picker.select(Some(i));
                    state.assign_picker = Some(picker);
                }
                _ => state.assign_picker = Some(picker),
            }
            return Ok(None);
        }

        if let Some(feature) = feature_hotkey(key.code) {
            if feature != Feature::TaxInvoices {
                return Ok(Some(TaxInvoiceAction::Goto(feature)));
            }
        }

        match key.code {
            KeyCode::Char('f') => {
                state.filter_select.next();
                return Ok(Some(TaxInvoiceAction::FilterChanged));
            }
            KeyCode::Char('y') => return Ok(Some(TaxInvoiceAction::Sync)),
            KeyCode::Enter => {
                if state.selected_invoice().is_some() {
                    let mut picker = ListState::default();
                    picker.select(Some(0));
                    state.assign_picker = Some(picker);
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
    fn the_filter_cycles_all_unassigned_then_projects() {
        let mut state = TaxInvoicesState::new(vec![project("p1", "Cafe")], vec![]);
        assert_eq!(state.filter(), InvoiceFilter::All);
        state.filter_select.next();
        assert_eq!(state.filter(), InvoiceFilter::Unassigned);
        state.filter_select.next();
        assert_eq!(state.filter(), InvoiceFilter::Project("p1".to_string()));
        state.filter_select.next();
        assert_eq!(state.filter(), InvoiceFilter::All);
    }

    #[test]
    fn unknown_project_ids_render_as_placeholders() {
        let state = TaxInvoicesState::new(vec![project("p1", "Cafe")], vec![]);
        assert_eq!(state.project_name(None), "-");
        assert_eq!(state.project_name(Some("p1")), "Cafe");
        assert_eq!(state.project_name(Some("gone")), "(unknown)");
    }
}
