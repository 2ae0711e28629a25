//! Schedule feed parsing and next-slot lookup.
//!
//! The feed is a loosely structured spreadsheet export: the first column holds
//! trainer names, and any column titled `DD/MM/YYYY` holds per-date slot
//! notes. A trainer's block starts at the first row naming them and runs
//! until the next row whose name cell contains a comma.

use chrono::{Local, NaiveDate};
use regex::Regex;

/// Label returned when no slot can be offered.
pub const FULL: &str = "Full";

/// Suffix marking a fallback date with no confirmed opening.
pub const UNCONFIRMED_MARKER: &str = "*";

/// Parsed schedule feed: a header row plus data rows, in feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ScheduleTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Parse CSV text whose first record is the header row.
    ///
    /// Blank lines are skipped and ragged rows are accepted. Malformed input
    /// yields an empty table rather than an error.
    pub fn parse_csv(text: &str) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = match reader.headers() {
            Ok(record) => record.iter().map(str::to_string).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "schedule header unreadable, using empty table");
                return Self::default();
            }
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            match record {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                Err(e) => {
                    tracing::warn!(error = %e, "schedule row unreadable, using empty table");
                    return Self::default();
                }
            }
        }

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, empty when the row is shorter than the header.
    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Date-titled columns as `(column index, date)`, earliest first.
    fn date_columns(&self) -> Vec<(usize, NaiveDate)> {
        let Ok(pattern) = Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$") else {
            return Vec::new();
        };

        let mut columns: Vec<(usize, NaiveDate)> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, header)| pattern.is_match(header.trim()))
            .filter_map(|(idx, header)| parse_day_month_year(header.trim()).map(|date| (idx, date)))
            .collect();

        columns.sort_by_key(|(_, date)| *date);
        columns
    }

    /// Row range `[start, end)` belonging to `provider_name`.
    fn provider_block(&self, provider_name: &str) -> Option<(usize, usize)> {
        let token = search_token(provider_name);

        let start = (0..self.rows.len())
            .find(|&row| self.cell(row, 0).to_lowercase().contains(&token))?;

        let end = (start + 1..self.rows.len())
            .find(|&row| self.cell(row, 0).contains(','))
            .unwrap_or(self.rows.len());

        Some((start, end))
    }

    /// Next available slot for `provider_name`, counting dates on or after
    /// `today`.
    ///
    /// Returns `"<Mon> <day>"` for the first open cell (with `" (<N> weeks)"`
    /// when the cell carries a number), the earliest upcoming date suffixed
    /// with `*` when nothing is open, or `"Full"`.
    pub fn next_slot(&self, provider_name: &str, today: NaiveDate) -> String {
        if self.rows.is_empty() {
            return FULL.to_string();
        }

        let Some((start, end)) = self.provider_block(provider_name) else {
            return FULL.to_string();
        };

        let upcoming: Vec<(usize, NaiveDate)> = self
            .date_columns()
            .into_iter()
            .filter(|(_, date)| *date >= today)
            .collect();

        for &(column, date) in &upcoming {
            for row in start..end {
                let value = self.cell(row, column).trim().to_uppercase();
                if is_open_cell(&value) {
                    return match first_number(&value) {
                        Some(weeks) => format!("{} ({} weeks)", format_day(date), weeks),
                        None => format_day(date),
                    };
                }
            }
        }

        match upcoming.first() {
            Some(&(_, date)) => format!("{}{}", format_day(date), UNCONFIRMED_MARKER),
            None => FULL.to_string(),
        }
    }

    /// [`next_slot`](Self::next_slot) against the local calendar date.
    pub fn next_slot_today(&self, provider_name: &str) -> String {
        self.next_slot(provider_name, Local::now().date_naive())
    }
}

/// Lower-cased word after the first space, or the whole lower-cased name.
fn search_token(provider_name: &str) -> String {
    let lower = provider_name.to_lowercase();
    match lower.split(' ').nth(1) {
        Some(word) if !word.is_empty() => word.to_string(),
        _ => lower,
    }
}

/// `DD/MM/YYYY` → date; impossible dates such as `31/02/2030` are rejected.
fn parse_day_month_year(text: &str) -> Option<NaiveDate> {
    let mut parts = text.split('/');
    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// An upper-cased, trimmed cell signals an opening when it mentions OPEN or is
/// a bare number.
fn is_open_cell(value: &str) -> bool {
    value.contains("OPEN") || (!value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
}

fn first_number(value: &str) -> Option<&str> {
    let re = Regex::new(r"[0-9]+").ok()?;
    re.find(value).map(|m| m.as_str())
}

/// `Feb 1`
fn format_day(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}
