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

use crate::models::SubcontractorAccount;
use crate::ui::{feature_hotkey, Feature, TAB_BAR};

#[derive(Clone, Copy, PartialEq)]
enum AccountField {
    Company,
    Bank,
    Number,
    Holder,
    BusinessType,
    Phone,
}

const FIELD_ORDER: [AccountField; 6] = [
    AccountField::Company,
    AccountField::Bank,
    AccountField::Number,
    AccountField::Holder,
    AccountField::BusinessType,
    AccountField::Phone,
];

/// Inline editor over the list; an empty id means a new account.
struct AccountForm {
    id: String,
    company: String,
    bank: String,
    number: String,
    holder: String,
    business_type: String,
    phone: String,
    field: AccountField,
}

impl AccountForm {
    fn new() -> Self {
        Self {
            id: String::new(),
            company: String::new(),
            bank: String::new(),
            number: String::new(),
            holder: String::new(),
            business_type: String::new(),
            phone: String::new(),
            field: AccountField::Company,
        }
    }

    fn from_existing(account: &SubcontractorAccount) -> Self {
        Self {
            id: account.id.clone(),
            company: account.company_name.clone(),
            bank: account.bank_name.clone().unwrap_or_default(),
            number: account.account_number.clone(),
            holder: account.account_holder.clone().unwrap_or_default(),
            business_type: account.business_type.clone().unwrap_or_default(),
            phone: account.contact_phone.clone().unwrap_or_default(),
            field: AccountField::Company,
        }
    }

    fn buffer(&mut self) -> &mut String {
        match self.field {
            AccountField::Company => &mut self.company,
            AccountField::Bank => &mut self.bank,
            AccountField::Number => &mut self.number,
            AccountField::Holder => &mut self.holder,
            AccountField::BusinessType => &mut self.business_type,
            AccountField::Phone => &mut self.phone,
        }
    }

    fn validation_message(&self) -> Option<&'static str> {
        if self.company.trim().is_empty() {
            return Some("Company name is required");
        }
        if self.number.trim().is_empty() {
            return Some("Account number is required");
        }
        None
    }

    fn finished(&self) -> SubcontractorAccount {
        fn non_empty(s: &str) -> Option<String> {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        SubcontractorAccount {
            id: self.id.clone(),
            company_name: self.company.trim().to_string(),
            bank_name: non_empty(&self.bank),
            account_number: self.number.trim().to_string(),
            account_holder: non_empty(&self.holder),
            business_type: non_empty(&self.business_type),
            contact_phone: non_empty(&self.phone),
        }
    }
}

pub struct AccountsState {
    accounts: Vec<SubcontractorAccount>,
    table_state: TableState,
    form: Option<AccountForm>,
    show_delete_confirmation: bool,
    message: Option<String>,
}

impl AccountsState {
    pub fn new(accounts: Vec<SubcontractorAccount>) -> Self {
        let mut table_state = TableState::default();
        if !accounts.is_empty() {
            table_state.select(Some(0));
        }
        Self {
            accounts,
            table_state,
            form: None,
            show_delete_confirmation: false,
            message: None,
        }
    }

    pub fn next(&mut self) {
        if self.accounts.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= self.accounts.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.accounts.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.accounts.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_account(&self) -> Option<&SubcontractorAccount> {
        self.table_state.selected().and_then(|i| self.accounts.get(i))
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub enum AccountAction {
    SaveAccount(Box<SubcontractorAccount>),
    DeleteAccount(String),
    Goto(Feature),
}

pub fn render_accounts<B: Backend>(frame: &mut Frame<B>, state: &mut AccountsState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(size);

    if state.accounts.is_empty() {
        let empty = Paragraph::new("No subcontractor accounts yet. Press <N> to add one.").block(
            Block::default()
                .title("Subcontractor Accounts")
                .borders(Borders::ALL),
        );
        frame.render_widget(empty, chunks[0]);
    } else {
        let header_cells = ["Company", "Bank", "Number", "Holder", "Business", "Phone"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = state.accounts.iter().map(|account| {
            let cells = vec![
                Cell::from(account.company_name.clone()),
                Cell::from(account.bank_name.clone().unwrap_or_default()),
                Cell::from(account.account_number.clone()),
                Cell::from(account.account_holder.clone().unwrap_or_default()),
                Cell::from(account.business_type.clone().unwrap_or_default()),
                Cell::from(account.contact_phone.clone().unwrap_or_default()),
            ];
            Row::new(cells).height(1)
        });

        let table = Table::new(rows)
            .header(header)
            .block(
                Block::default()
                    .title("Subcontractor Accounts")
                    .borders(Borders::ALL),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .widths(&[
                Constraint::Percentage(20),
                Constraint::Percentage(14),
                Constraint::Percentage(20),
                Constraint::Percentage(14),
                Constraint::Percentage(16),
                Constraint::Percentage(16),
            ]);
        frame.render_stateful_widget(table, chunks[0], &mut state.table_state);
    }

    let help = if state.show_delete_confirmation {
        "Delete this account? <Y> Yes  <Any other key> No".to_string()
    } else {
        match &state.message {
            Some(message) => format!("{message}\n{TAB_BAR}"),
            None => format!("<N> New | <E> Edit | <D> Delete\n{TAB_BAR}"),
        }
    };
    let buttons = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
    frame.render_widget(buttons, chunks[1]);

    if state.form.is_some() {
        render_form(frame, state, size);
    }
}

fn render_form<B: Backend>(frame: &mut Frame<B>, state: &mut AccountsState, size: Rect) {
    let Some(form) = &state.form else { return };

    let rows: Vec<(&str, &String, AccountField)> = vec![
        ("Company", &form.company, AccountField::Company),
        ("Bank", &form.bank, AccountField::Bank),
        ("Number", &form.number, AccountField::Number),
        ("Holder", &form.holder, AccountField::Holder),
        ("Business type", &form.business_type, AccountField::BusinessType),
        ("Phone", &form.phone, AccountField::Phone),
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
            let value = if selected {
                format!("{value}|")
            } else {
                value.clone()
            };
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{name}: "), style),
                Span::styled(
                    value,
                    if selected {
                        Style::default().add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    },
                ),
            ]))
        })
        .collect();

    let title = if form.id.is_empty() {
        "New Account (Tab - Next field, Enter - Save, Esc - Cancel)"
    } else {
        "Edit Account (Tab - Next field, Enter - Save, Esc - Cancel)"
    };
    let area = centered_rect(70, 60, size);
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

pub fn handle_input(state: &mut AccountsState) -> Result<Option<AccountAction>> {
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
                        return Ok(Some(AccountAction::SaveAccount(Box::new(form.finished()))));
                    }
                },
                KeyCode::Tab | KeyCode::Down => {
                    let i = FIELD_ORDER.iter().position(|f| *f == form.field).unwrap_or(0);
                    form.field = FIELD_ORDER[(i + 1) % FIELD_ORDER.len()];
                    state.form = Some(form);
                }
                KeyCode::BackTab | KeyCode::Up => {
                    let i = FIELD_ORDER.iter().position(|f| *f == form.field).unwrap_or(0);
                    form.field = FIELD_ORDER[(i + FIELD_ORDER.len() - 1) % FIELD_ORDER.len()];
                    state.form = Some(form);
                }
                KeyCode::Char(c) => {
                    form.buffer().push(c);
                    state.form = Some(form);
                }
                KeyCode::Backspace => {
                    form.buffer().pop();
                    state.form = Some(form);
                }
                _ => state.form = Some(form),
            }
            return Ok(None);
        }

        if state.show_delete_confirmation {
            state.show_delete_confirmation = false;
            if key.code == KeyCode::Char('y') {
                if let Some(account) = state.selected_account() {
                    return Ok(Some(AccountAction::DeleteAccount(account.id.clone())));
                }
            }
            return Ok(None);
        }

        if let Some(feature) = feature_hotkey(key.code) {
            if feature != Feature::Accounts {
                return Ok(Some(AccountAction::Goto(feature)));
            }
        }

        match key.code {
            KeyCode::Char('n') => state.form = Some(AccountForm::new()),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(account) = state.selected_account() {
                    state.form = Some(AccountForm::from_existing(account));
                }
            }
            KeyCode::Char('d') => {
                if state.selected_account().is_some() {
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
    fn the_form_requires_company_and_number() {
        let mut form = AccountForm::new();
        assert_eq!(form.validation_message(), Some("Company name is required"));
        form.company = "Han Interiors".to_string();
        assert_eq!(form.validation_message(), Some("Account number is required"));
        form.number = "110-222-333".to_string();
        assert_eq!(form.validation_message(), None);
    }

    #[test]
    fn empty_optional_fields_save_as_none() {
        let mut form = AccountForm::new();
        form.company = "Han Interiors".to_string();
        form.number = "110-222-333".to_string();
        form.holder = "  ".to_string();
        let account = form.finished();
        assert_eq!(account.bank_name, None);
        assert_eq!(account.account_holder, None);
    }
}
