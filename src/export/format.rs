//! Display formatting shared by the spreadsheet writer and the terminal UI.
//! Numbers follow the vi-VN convention: `.` groups thousands, `,` marks
//! decimals.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::catalog::{DrugRecord, Field, FieldKind};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Rewrites a date to `DD/MM/YYYY`. Text that isn't a recognisable
/// year-first date (including values already in `DD/MM/YYYY`) is returned
/// unchanged.
pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }
    parse_date(trimmed)
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.date_naive());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|timestamp| timestamp.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        })
}

/// Groups the integer part in threes and keeps at most three decimals.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let scaled = (value.abs() * 1000.0).round();
    if scaled >= u128::MAX as f64 {
        return value.to_string();
    }
    let scaled = scaled as u128;
    let (whole, fraction) = (scaled / 1000, scaled % 1000);

    let mut out = String::new();
    if value < 0.0 && scaled != 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(&whole.to_string()));
    if fraction != 0 {
        let digits = format!("{fraction:03}");
        out.push(',');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

pub fn format_integer(value: i64) -> String {
    let grouped = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// `1.234` style count, as used in status lines.
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// "Hiển thị 21–40 trên tổng 1.234 kết quả", or the empty-result notice.
pub fn range_label(range: Option<(u64, u64)>, total: u64) -> String {
    match range {
        Some((from, to)) => format!(
            "Hiển thị {}–{} trên tổng {} kết quả",
            format_count(from),
            format_count(to),
            format_count(total)
        ),
        None => "Không có kết quả".to_string(),
    }
}

/// A record field as shown to users.
pub fn display_value(record: &DrugRecord, field: Field) -> String {
    match field {
        Field::Quantity => format_integer(record.quantity),
        Field::UnitPrice => format_number(record.unit_price),
        _ if field.kind() == FieldKind::Date => format_date(&record.text(field)),
        _ => record.text(field).into_owned(),
    }
}
