pub mod accounts;
pub mod components;
pub mod expense_form;
pub mod expenses;
pub mod project_form;
pub mod projects;
pub mod site_diary;
pub mod site_diary_detail;
pub mod site_diary_form;
pub mod tax_invoices;
pub mod work_log_form;
pub mod work_logs;
pub mod workers;

use crossterm::event::KeyCode;
use tui::style::Color;

/// Top-level feature areas reachable from any list screen via digit keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Projects,
    WorkLogs,
    SiteDiary,
    Expenses,
    TaxInvoices,
    Accounts,
    Workers,
}

pub fn feature_hotkey(key: KeyCode) -> Option<Feature> {
    match key {
        KeyCode::Char('1') => Some(Feature::Projects),
        KeyCode::Char('2') => Some(Feature::WorkLogs),
        KeyCode::Char('3') => Some(Feature::SiteDiary),
        KeyCode::Char('4') => Some(Feature::Expenses),
        KeyCode::Char('5') => Some(Feature::TaxInvoices),
        KeyCode::Char('6') => Some(Feature::Accounts),
        KeyCode::Char('7') => Some(Feature::Workers),
        _ => None,
    }
}

pub const TAB_BAR: &str =
    "<1> Projects | <2> Work Logs | <3> Site Diary | <4> Expenses | <5> Tax Invoices | <6> Accounts | <7> Workers";

pub fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

/// Won amounts with thousands separators, e.g. `₩1,234,567`.
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let whole = amount.abs().round() as u64;
    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if negative {
        format!("-₩{grouped}")
    } else {
        format!("₩{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "₩0");
        assert_eq!(format_currency(1_000.0), "₩1,000");
        assert_eq!(format_currency(12_345_678.0), "₩12,345,678");
        assert_eq!(format_currency(-2_500_000.0), "-₩2,500,000");
    }

    #[test]
    fn digit_keys_map_to_features() {
        assert_eq!(feature_hotkey(KeyCode::Char('1')), Some(Feature::Projects));
        assert_eq!(feature_hotkey(KeyCode::Char('7')), Some(Feature::Workers));
        assert_eq!(feature_hotkey(KeyCode::Char('8')), None);
        assert_eq!(feature_hotkey(KeyCode::Esc), None);
    }
}
