//! Day-token resolution for away-day replies
//!
//! Formats are tried in order: weekday name (two letters, three letters or full),
//! month/day, then ISO date. Every format resolves strictly into the future:
//! a weekday means its next occurrence after today (today's weekday is next
//! week), a month/day on or before today means next year, and an ISO date that is
//! not after today is rejected.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use roost_core::{Result, RoostError};

const WEEKDAYS: [(Weekday, [&str; 3]); 7] = [
    (Weekday::Sun, ["su", "sun", "sunday"]),
    (Weekday::Mon, ["mo", "mon", "monday"]),
    (Weekday::Tue, ["tu", "tue", "tuesday"]),
    (Weekday::Wed, ["we", "wed", "wednesday"]),
    (Weekday::Thu, ["th", "thu", "thursday"]),
    (Weekday::Fri, ["fr", "fri", "friday"]),
    (Weekday::Sat, ["sa", "sat", "saturday"]),
];

fn parse_weekday(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (weekday, _) = WEEKDAYS.iter().find(|(_, names)| names.contains(&token))?;
    let from = today.weekday().num_days_from_sunday() as i64;
    let to = weekday.num_days_from_sunday() as i64;
    let ahead = match (to - from).rem_euclid(7) {
        0 => 7,
        n => n,
    };
    Some(today + Duration::days(ahead))
}

fn parse_month_day(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (month, day) = token.split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date > today {
        Some(date)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

fn parse_iso(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()?;
    (date > today).then_some(date)
}

/// Resolve one token relative to `today`
pub fn parse_day(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }
    if let Some(date) = parse_weekday(&token, today) {
        return Some(date);
    }
    if token.contains('/') {
        return parse_month_day(&token, today);
    }
    parse_iso(&token, today)
}

/// Resolve a comma-separated reply; fails on the first token that does not parse
pub fn parse_days(text: &str, today: NaiveDate) -> Result<Vec<NaiveDate>> {
    let tokens: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(unparsable(text.trim()));
    }

    let mut days = Vec::with_capacity(tokens.len());
    for token in tokens {
        let date = parse_day(token, today).ok_or_else(|| unparsable(token))?;
        if !days.contains(&date) {
            days.push(date);
        }
    }
    Ok(days)
}

fn unparsable(token: &str) -> RoostError {
    RoostError::Validation(format!(
        "Sorry I couldn't make sense of '{}'. Please try again.",
        token
    ))
}
