use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// When and how a job fires.
///
/// Only two trigger kinds exist: a classical five-field cron expression, or
/// a single absolute instant. There is no interval/daily/weekly sugar — the
/// `reminder` tool's natural-language forms ("in N minutes", "in N hours")
/// resolve to `Once` before a job is ever persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Fire exactly once at the given UTC instant, then self-delete.
    Once { at: DateTime<Utc> },

    /// Five-field cron expression: `minute hour day-of-month month weekday`.
    /// Each field accepts `*`, comma lists, ranges, and `/step`.
    Cron { expression: String },
}

impl Schedule {
    pub fn is_one_shot(&self) -> bool {
        matches!(self, Schedule::Once { .. })
    }
}

/// Parse a user-facing trigger spec into a [`Schedule`].
///
/// Accepts the natural-language forms `"in N minutes"` / `"in N hours"`
/// (which resolve to a one-shot `Once` at the current instant plus the
/// duration), or a raw five-field cron expression.
pub fn parse_trigger_spec(input: &str) -> Result<Schedule, String> {
    let trimmed = input.trim();

    if let Some(rest) = trimmed.strip_prefix("in ") {
        let mut parts = rest.split_whitespace();
        let count: i64 = parts
            .next()
            .ok_or_else(|| "expected a number after 'in'".to_string())?
            .parse()
            .map_err(|_| "expected a number after 'in'".to_string())?;
        let unit = parts
            .next()
            .ok_or_else(|| "expected a unit (minutes/hours) after the number".to_string())?;

        let minutes = match unit.trim_end_matches('s') {
            "minute" => count,
            "hour" => count * 60,
            other => return Err(format!("unknown unit '{other}', expected minutes or hours")),
        };
        if minutes <= 0 {
            return Err("duration must be positive".to_string());
        }
        return Ok(Schedule::Once {
            at: Utc::now() + Duration::minutes(minutes),
        });
    }

    CronFields::parse(trimmed)?;
    Ok(Schedule::Cron {
        expression: trimmed.to_string(),
    })
}

/// Compute the next UTC execution time for `schedule` starting *after* `from`.
///
/// Returns `None` when the schedule is exhausted (a `Once` job whose time has
/// already passed) or when no matching cron slot exists within the next year
/// (a malformed or impossible field combination, e.g. `31 * 2 *` for a
/// February that never has a 31st).
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => (*at > from).then_some(*at),
        Schedule::Cron { expression } => {
            let fields = CronFields::parse(expression).ok()?;
            fields.next_after(from)
        }
    }
}

/// Parsed five-field cron expression, expanded into explicit value sets.
struct CronFields {
    minute: HashSet<u32>,
    hour: HashSet<u32>,
    day_of_month: HashSet<u32>,
    month: HashSet<u32>,
    /// 0 = Sunday … 6 = Saturday (cron's 7 is folded into 0).
    weekday: HashSet<u32>,
}

/// Upper bound on how far ahead to search for a matching minute — one year,
/// beyond which a cron expression is almost certainly malformed rather than
/// genuinely sparse.
const MAX_SEARCH_MINUTES: i64 = 366 * 24 * 60;

impl CronFields {
    fn parse(expression: &str) -> Result<Self, String> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!(
                "cron expression must have 5 fields (minute hour dom month dow), got {}",
                fields.len()
            ));
        }

        let minute = parse_field(fields[0], 0, 59)?;
        let hour = parse_field(fields[1], 0, 23)?;
        let day_of_month = parse_field(fields[2], 1, 31)?;
        let month = parse_field(fields[3], 1, 12)?;
        let mut weekday = parse_field(fields[4], 0, 7)?;
        if weekday.remove(&7) {
            weekday.insert(0);
        }

        Ok(Self {
            minute,
            hour,
            day_of_month,
            month,
            weekday,
        })
    }

    fn matches(&self, dt: &DateTime<Utc>) -> bool {
        self.minute.contains(&dt.minute())
            && self.hour.contains(&dt.hour())
            && self.day_of_month.contains(&dt.day())
            && self.month.contains(&dt.month())
            && self.weekday.contains(&dt.weekday().num_days_from_sunday())
    }

    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = truncate_to_minute(from) + Duration::minutes(1);
        for _ in 0..MAX_SEARCH_MINUTES {
            if self.matches(&candidate) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt - Duration::seconds(dt.second() as i64) - Duration::nanoseconds(dt.nanosecond() as i64)
}

/// Parse a single cron field into the explicit set of values it matches.
fn parse_field(spec: &str, min: u32, max: u32) -> Result<HashSet<u32>, String> {
    let mut values = HashSet::new();
    for part in spec.split(',') {
        parse_field_part(part, min, max, &mut values)?;
    }
    Ok(values)
}

fn parse_field_part(part: &str, min: u32, max: u32, out: &mut HashSet<u32>) -> Result<(), String> {
    let (range_part, step) = match part.split_once('/') {
        Some((r, s)) => (
            r,
            s.parse::<u32>()
                .map_err(|_| format!("invalid step in cron field '{part}'"))?,
        ),
        None => (part, 1),
    };
    if step == 0 {
        return Err(format!("step must be positive in cron field '{part}'"));
    }

    let (start, end) = if range_part == "*" {
        (min, max)
    } else if let Some((a, b)) = range_part.split_once('-') {
        let a: u32 = a
            .parse()
            .map_err(|_| format!("invalid range start in cron field '{part}'"))?;
        let b: u32 = b
            .parse()
            .map_err(|_| format!("invalid range end in cron field '{part}'"))?;
        (a, b)
    } else {
        let v: u32 = range_part
            .parse()
            .map_err(|_| format!("invalid value in cron field '{part}'"))?;
        (v, v)
    };

    if start < min || end > max || start > end {
        return Err(format!(
            "cron field '{part}' out of range ({min}-{max})"
        ));
    }

    let mut v = start;
    while v <= end {
        out.insert(v);
        v += step;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_minute_matches_everything() {
        let f = CronFields::parse("* * * * *").unwrap();
        let now = Utc::now();
        assert!(f.matches(&truncate_to_minute(now)));
    }

    #[test]
    fn daily_nine_am() {
        let f = CronFields::parse("0 9 * * *").unwrap();
        let at_nine = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        let at_ten = Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap();
        assert!(f.matches(&at_nine));
        assert!(!f.matches(&at_ten));
    }

    #[test]
    fn weekday_field_folds_seven_into_zero() {
        let f = CronFields::parse("0 0 * * 7").unwrap();
        assert!(f.weekday.contains(&0));
        assert!(!f.weekday.contains(&7));
    }

    #[test]
    fn step_expands_correctly() {
        let f = parse_field("*/15", 0, 59).unwrap();
        assert_eq!(f, [0, 15, 30, 45].into_iter().collect());
    }

    #[test]
    fn comma_list_and_range_combine() {
        let f = parse_field("1,5-7", 0, 10).unwrap();
        assert_eq!(f, [1, 5, 6, 7].into_iter().collect());
    }

    #[test]
    fn next_after_finds_tomorrow_when_today_passed() {
        let schedule = Schedule::Cron {
            expression: "30 8 * * *".to_string(),
        };
        let from = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        let next = compute_next_run(&schedule, from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 7, 2, 8, 30, 0).unwrap());
    }

    #[test]
    fn natural_language_in_minutes_is_one_shot() {
        let schedule = parse_trigger_spec("in 5 minutes").unwrap();
        assert!(schedule.is_one_shot());
    }

    #[test]
    fn natural_language_in_hours_is_one_shot() {
        let schedule = parse_trigger_spec("in 2 hours").unwrap();
        assert!(schedule.is_one_shot());
    }

    #[test]
    fn malformed_field_count_is_rejected() {
        assert!(parse_trigger_spec("* * *").is_err());
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert!(parse_trigger_spec("61 * * * *").is_err());
    }

    use chrono::TimeZone;
}
