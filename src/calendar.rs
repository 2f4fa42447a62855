use std::collections::HashMap;
use std::str::FromStr;

use chrono::Month;

use crate::error::{HwiError, Result};
use crate::models::ScoreRecord;

pub trait PeriodCalendar {
    /// Month number (1-12) for a period label, if the token is recognised.
    fn month_index(&self, label: &str) -> Option<u32>;

    fn chronological_key(&self, record: &ScoreRecord) -> Result<(i32, u32)> {
        self.month_index(&record.period_label)
            .map(|month| (record.year, month))
            .ok_or_else(|| HwiError::UnknownPeriod(record.period_label.clone()))
    }
}

fn month_token(label: &str) -> Option<&str> {
    label.split_whitespace().next()
}

fn numeric_month(token: &str) -> Option<u32> {
    token.parse::<u32>().ok().filter(|month| (1..=12).contains(month))
}

fn fold_accents(token: &str) -> String {
    token
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'û' | 'ù' | 'ü' => 'u',
            'à' | 'â' => 'a',
            'ô' => 'o',
            'î' | 'ï' => 'i',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrenchCalendar;

impl PeriodCalendar for FrenchCalendar {
    fn month_index(&self, label: &str) -> Option<u32> {
        let token = month_token(label)?;
        if let Some(month) = numeric_month(token) {
            return Some(month);
        }

        let month = match fold_accents(token).as_str() {
            "janvier" => 1,
            "fevrier" => 2,
            "mars" => 3,
            "avril" => 4,
            "mai" => 5,
            "juin" => 6,
            "juillet" => 7,
            "aout" => 8,
            "septembre" => 9,
            "octobre" => 10,
            "novembre" => 11,
            "decembre" => 12,
            _ => return None,
        };
        Some(month)
    }
}

/// English month names and three-letter abbreviations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishCalendar;

impl PeriodCalendar for EnglishCalendar {
    fn month_index(&self, label: &str) -> Option<u32> {
        let token = month_token(label)?;
        numeric_month(token).or_else(|| {
            Month::from_str(token)
                .ok()
                .map(|month| month.number_from_month())
        })
    }
}

/// Caller-supplied token table, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MonthTable {
    months: HashMap<String, u32>,
}

impl MonthTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let months = entries
            .into_iter()
            .map(|(token, month)| (token.as_ref().to_lowercase(), month))
            .collect();
        Self { months }
    }
}

impl PeriodCalendar for MonthTable {
    fn month_index(&self, label: &str) -> Option<u32> {
        let token = month_token(label)?;
        numeric_month(token).or_else(|| self.months.get(&token.to_lowercase()).copied())
    }
}
