//! Availability model
//!
//! A person's `away` list holds dates they cannot take a task. An entry without a
//! qualifier blocks the whole day; a qualified entry blocks half of it.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Which part of a day an away entry covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HalfDay {
    /// 00:00 through noon
    #[serde(rename = "am")]
    Morning,
    /// Noon through midnight
    #[serde(rename = "pm")]
    Evening,
    /// The entire day
    #[serde(rename = "full")]
    FullDay,
}

impl HalfDay {
    /// Human label used in confirmations
    pub fn label(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
            Self::FullDay => "full day",
        }
    }

    /// Whether `time` falls inside this window. Both halves include noon.
    pub fn covers(&self, time: NaiveTime) -> bool {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
        match self {
            Self::Morning => time <= noon,
            Self::Evening => time >= noon,
            Self::FullDay => true,
        }
    }
}

impl std::fmt::Display for HalfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Morning => write!(f, "am"),
            Self::Evening => write!(f, "pm"),
            Self::FullDay => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for HalfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "am" => Ok(Self::Morning),
            "pm" => Ok(Self::Evening),
            "full" => Ok(Self::FullDay),
            _ => Err(format!("Invalid half-day: {}", s)),
        }
    }
}

/// One availability exception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwayDay {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<HalfDay>,
}

impl AwayDay {
    pub fn full(date: NaiveDate) -> Self {
        Self { date, part: None }
    }

    pub fn with_part(mut self, part: HalfDay) -> Self {
        self.part = Some(part);
        self
    }

    /// Does this entry block a task at `date` `time`?
    pub fn blocks(&self, date: NaiveDate, time: NaiveTime) -> bool {
        if self.date != date {
            return false;
        }
        match self.part {
            None => true,
            Some(part) => part.covers(time),
        }
    }
}

impl std::fmt::Display for AwayDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date.format("%a %-m/%-d"))?;
        if let Some(part) = self.part {
            write!(f, " ({})", part.label())?;
        }
        Ok(())
    }
}

/// Is someone with this away list unavailable for a task at `date` `time`?
pub fn is_unavailable(away: &[AwayDay], date: NaiveDate, time: NaiveTime) -> bool {
    away.iter().any(|day| day.blocks(date, time))
}

/// Render a list of away days as "Mon 6/20, Tue 6/21 (morning)"
pub fn describe(days: &[AwayDay]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_plain_entry_blocks_whole_day() {
        let away = vec![AwayDay::full(date(6, 20))];
        assert!(is_unavailable(&away, date(6, 20), time(0, 0)));
        assert!(is_unavailable(&away, date(6, 20), time(23, 59)));
        assert!(!is_unavailable(&away, date(6, 21), time(9, 0)));
    }

    #[test]
    fn test_half_days_share_noon() {
        let morning = vec![AwayDay::full(date(6, 20)).with_part(HalfDay::Morning)];
        assert!(is_unavailable(&morning, date(6, 20), time(7, 30)));
        assert!(is_unavailable(&morning, date(6, 20), time(12, 0)));
        assert!(!is_unavailable(&morning, date(6, 20), time(18, 0)));

        let evening = vec![AwayDay::full(date(6, 20)).with_part(HalfDay::Evening)];
        assert!(!is_unavailable(&evening, date(6, 20), time(7, 30)));
        assert!(is_unavailable(&evening, date(6, 20), time(12, 0)));
        assert!(is_unavailable(&evening, date(6, 20), time(20, 45)));
    }

    #[test]
    fn test_full_day_qualifier() {
        let away = vec![AwayDay::full(date(6, 20)).with_part(HalfDay::FullDay)];
        assert!(is_unavailable(&away, date(6, 20), time(6, 0)));
        assert!(is_unavailable(&away, date(6, 20), time(21, 0)));
    }

    #[test]
    fn test_describe() {
        let days = vec![
            AwayDay::full(date(6, 22)),
            AwayDay::full(date(6, 23)).with_part(HalfDay::Morning),
        ];
        assert_eq!(describe(&days), "Mon 6/22, Tue 6/23 (morning)");
    }

    #[test]
    fn test_half_day_parse() {
        assert_eq!("AM".parse::<HalfDay>().unwrap(), HalfDay::Morning);
        assert_eq!(" pm ".parse::<HalfDay>().unwrap(), HalfDay::Evening);
        assert_eq!("Full".parse::<HalfDay>().unwrap(), HalfDay::FullDay);
        assert!("noon".parse::<HalfDay>().is_err());
    }
}
