//! Expiry date extraction from recognized text.
//!
//! Strategies run in order and the first one that yields any valid date wins;
//! among its candidates the latest date is returned, since packaging that
//! prints both a production and an expiry date prints the expiry later.

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Day, month and 2-4 digit year, e.g. `15.09.24` or `01 - 02 - 2025`.
static FULL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{2})\s*[./,\-]\s*([0-9]{2})\s*[./,\-]\s*([0-9]{2,4})")
        .expect("full date pattern")
});

/// Day and month only, e.g. `05/07`.
static SHORT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{2})\s*[./,\-]\s*([0-9]{2})").expect("short date pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Full,
    DayMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCandidate {
    pub date: NaiveDate,
    pub completeness: Completeness,
}

pub trait DateStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn candidates(&self, text: &str, current_year: i32) -> Vec<DateCandidate>;
}

#[derive(Debug, Default)]
pub struct FullDate;

impl DateStrategy for FullDate {
    fn name(&self) -> &'static str {
        "full"
    }

    fn candidates(&self, text: &str, _current_year: i32) -> Vec<DateCandidate> {
        isolated_captures(&FULL_DATE, text)
            .iter()
            .filter_map(|caps| {
                let year = expand_year(&caps[3])?;
                build(year, &caps[2], &caps[1])
            })
            .map(|date| DateCandidate {
                date,
                completeness: Completeness::Full,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ShortDate;

impl DateStrategy for ShortDate {
    fn name(&self) -> &'static str {
        "short"
    }

    fn candidates(&self, text: &str, current_year: i32) -> Vec<DateCandidate> {
        isolated_captures(&SHORT_DATE, text)
            .iter()
            .filter_map(|caps| build(current_year, &caps[2], &caps[1]))
            .map(|date| DateCandidate {
                date,
                completeness: Completeness::DayMonth,
            })
            .collect()
    }
}

pub struct Extractor {
    strategies: Vec<Box<dyn DateStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(vec![Box::new(FullDate), Box::new(ShortDate)])
    }
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn DateStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extracts using the local calendar year for day-month dates.
    pub fn extract(&self, text: &str) -> Option<NaiveDate> {
        self.extract_in_year(text, Local::now().year())
    }

    pub fn extract_in_year(&self, text: &str, current_year: i32) -> Option<NaiveDate> {
        self.strategies.iter().find_map(|strategy| {
            let latest = strategy
                .candidates(text, current_year)
                .into_iter()
                .map(|c| c.date)
                .max();
            if let Some(date) = latest {
                tracing::debug!(strategy = strategy.name(), %date, "date extracted");
            }
            latest
        })
    }
}

/// Shorthand for the default strategies in a given year.
pub fn extract_date(text: &str, current_year: i32) -> Option<NaiveDate> {
    Extractor::default().extract_in_year(text, current_year)
}

/// Non-overlapping matches that are not glued to another digit on either side.
///
/// A rejected match restarts the search one byte further, so a longer
/// digit run is never split into a date.
fn isolated_captures<'t>(re: &Regex, text: &'t str) -> Vec<Captures<'t>> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(m) = caps.get(0) else {
            break;
        };
        let digit_before = m.start() > 0 && bytes[m.start() - 1].is_ascii_digit();
        let digit_after = m.end() < bytes.len() && bytes[m.end()].is_ascii_digit();
        if digit_before || digit_after {
            // Matches always start on an ASCII digit, so +1 is a char boundary.
            pos = m.start() + 1;
        } else {
            pos = m.end();
            found.push(caps);
        }
    }
    found
}

/// Two-digit years belong to the 2000s; only 2 or 4 digit years are accepted.
fn expand_year(raw: &str) -> Option<i32> {
    match raw.len() {
        2 => format!("20{}", raw).parse().ok(),
        4 => raw.parse().ok().filter(|y| *y >= 1),
        _ => None,
    }
}

fn build(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}
