use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Inline year/month/day editor used by every date field. Digits are typed
/// per part; an optional upper bound rejects future dates where a screen
/// forbids them.
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    pending: String,
    max_date: Option<NaiveDate>,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            pending: String::new(),
            max_date: None,
        }
    }

    /// Like [`new`](Self::new) but clamped to `max` (inclusive).
    pub fn bounded(date: NaiveDate, max: NaiveDate) -> Self {
        let mut state = Self::new(date.min(max));
        state.max_date = Some(max);
        state
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.date_part = DatePart::Year;
            self.pending.clear();
        }
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.pending.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.pending.clear();
    }

    fn try_set(&mut self, date: Option<NaiveDate>) {
        if let Some(date) = date {
            match self.max_date {
                Some(max) if date > max => {}
                _ => self.date = date,
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
                self.pending.push(c);
                match self.date_part {
                    DatePart::Year => {
                        if self.pending.len() == 4 {
                            if let Ok(new_year) = self.pending.parse::<i32>() {
                                if (1900..=2100).contains(&new_year) {
                                    self.try_set(NaiveDate::from_ymd_opt(new_year, month, day));
                                }
                            }
                            self.pending.clear();
                        }
                    }
                    DatePart::Month => {
                        if self.pending.len() == 2 {
                            if let Ok(new_month) = self.pending.parse::<u32>() {
                                if (1..=12).contains(&new_month) {
                                    self.try_set(NaiveDate::from_ymd_opt(year, new_month, day));
                                }
                            }
                            self.pending.clear();
                        }
                    }
                    DatePart::Day => {
                        if self.pending.len() == 2 {
                            if let Ok(new_day) = self.pending.parse::<u32>() {
                                self.try_set(NaiveDate::from_ymd_opt(year, month, new_day));
                            }
                            self.pending.clear();
                        }
                    }
                }
            }
            KeyCode::Backspace => {
                self.pending.pop();
            }
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    pub fn get_display_string(&self) -> String {
        let date_str = self.date.format("%Y-%m-%d").to_string();
        if !self.editing {
            return date_str;
        }

        let cursor = if self.pending.is_empty() {
            match self.date_part {
                DatePart::Year => "[YYYY]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Day => "[DD]".to_string(),
            }
        } else {
            format!("[{}]", self.pending)
        };

        match self.date_part {
            DatePart::Year => format!("{}{}", cursor, &date_str[4..]),
            DatePart::Month => format!("{}{}{}", &date_str[..5], cursor, &date_str[7..]),
            DatePart::Day => format!("{}{}", &date_str[..8], cursor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn typing_a_full_year_updates_the_date() {
        let mut state = DateInputState::new(date(2025, 7, 14));
        state.toggle_editing();
        for c in "2024".chars() {
            state.handle_input(KeyCode::Char(c));
        }
        assert_eq!(state.date, date(2024, 7, 14));
    }

    #[test]
    fn invalid_day_is_ignored() {
        let mut state = DateInputState::new(date(2025, 2, 10));
        state.toggle_editing();
        state.next_date_part();
        state.next_date_part();
        for c in "31".chars() {
            state.handle_input(KeyCode::Char(c));
        }
        assert_eq!(state.date, date(2025, 2, 10));
    }

    #[test]
    fn bounded_input_rejects_dates_past_the_maximum() {
        let today = date(2025, 7, 14);
        let mut state = DateInputState::bounded(today, today);
        state.toggle_editing();
        state.next_date_part();
        state.next_date_part();
        for c in "20".chars() {
            state.handle_input(KeyCode::Char(c));
        }
        assert_eq!(state.date, today);
    }
}
