//! Five-field cron expressions and the due-window check.
//!
//! Schedules are stored in classic crontab syntax
//! (`minute hour day-of-month month day-of-week`, Sunday = 0 or 7). The
//! `cron` crate wants a leading seconds field and numbers weekdays from 1,
//! so expressions are translated before parsing; weekday numbers become
//! names to sidestep the numbering difference.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::ServerError;

const WEEKDAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Check that `expr` has exactly five fields that parse. Returns the
/// expression with whitespace normalised to single spaces.
pub fn validate_cron(expr: &str) -> Result<String, ServerError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ServerError::BadRequest(format!(
            "Cron expression must have exactly 5 fields (minute hour day month weekday), got {}: '{}'",
            fields.len(),
            expr.trim()
        )));
    }
    parse_fields(&fields)?;
    Ok(fields.join(" "))
}

pub fn validate_timezone(tz: &str) -> Result<Tz, ServerError> {
    Tz::from_str(tz.trim()).map_err(|_| ServerError::BadRequest(format!("Unknown timezone: '{}'", tz)))
}

/// Parse a five-field expression into a `cron::Schedule`.
pub fn parse_cron(expr: &str) -> Result<cron::Schedule, ServerError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ServerError::BadRequest(format!(
            "Cron expression must have exactly 5 fields, got {}",
            fields.len()
        )));
    }
    parse_fields(&fields)
}

fn parse_fields(fields: &[&str]) -> Result<cron::Schedule, ServerError> {
    let weekday = translate_weekday_field(fields[4])?;
    let translated = format!("0 {} {} {} {} {}", fields[0], fields[1], fields[2], fields[3], weekday);
    cron::Schedule::from_str(&translated).map_err(|e| {
        ServerError::BadRequest(format!("Invalid cron expression '{}': {}", fields.join(" "), e))
    })
}

/// Rewrite numeric weekdays (0-7, Sunday = 0 and 7) as names.
fn translate_weekday_field(field: &str) -> Result<String, ServerError> {
    let parts = field
        .split(',')
        .map(translate_weekday_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(","))
}

fn translate_weekday_item(item: &str) -> Result<String, ServerError> {
    let (base, step) = match item.split_once('/') {
        Some((b, s)) => (b, Some(s)),
        None => (item, None),
    };
    let with_step = |s: String| match step {
        Some(st) => format!("{}/{}", s, st),
        None => s,
    };

    if base == "*" || base == "?" {
        return Ok(with_step(base.to_string()));
    }

    match base.split_once('-') {
        Some((start, end)) => {
            let start_n = weekday_number(start)?;
            let end_n = weekday_number(end)?;
            match (start_n, end_n) {
                (Some(0), Some(6)) | (Some(0), Some(7)) => Ok(with_step("SUN-SAT".to_string())),
                // A range ending on Sunday-as-7 wraps past Saturday.
                (Some(s), Some(7)) => match step {
                    None => Ok(format!("{}-SAT,SUN", WEEKDAYS[s])),
                    Some(st) => stepped_days(s, 7, st),
                },
                (Some(s), Some(e)) if s <= e => Ok(with_step(format!("{}-{}", WEEKDAYS[s], WEEKDAYS[e]))),
                (Some(_), Some(_)) => Err(ServerError::BadRequest(format!(
                    "Invalid weekday range '{}'",
                    base
                ))),
                _ => Ok(with_step(base.to_string())),
            }
        }
        None => match weekday_number(base)? {
            Some(n) => Ok(with_step(WEEKDAYS[n].to_string())),
            None => Ok(with_step(base.to_string())),
        },
    }
}

/// Spell out `start-end/step` as a list of names, so Sunday-as-7 lands
/// after Saturday.
fn stepped_days(start: usize, end: usize, step: &str) -> Result<String, ServerError> {
    let step = match step.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return Err(ServerError::BadRequest(format!("Invalid weekday step '{}'", step))),
    };
    let days: Vec<&str> = (start..=end).step_by(step).map(|d| WEEKDAYS[d]).collect();
    Ok(days.join(","))
}

/// `Some(n)` for a numeric weekday, `None` for a name (left to the parser).
fn weekday_number(token: &str) -> Result<Option<usize>, ServerError> {
    if !token.chars().all(|c| c.is_ascii_digit()) || token.is_empty() {
        return Ok(None);
    }
    match token.parse::<usize>() {
        Ok(n) if n <= 7 => Ok(Some(n)),
        _ => Err(ServerError::BadRequest(format!("Weekday out of range (0-7): '{}'", token))),
    }
}

/// The fire instant that makes a schedule due at `now`, if any.
///
/// A schedule is due when one of its fire instants, computed in its own
/// timezone, lies within `tolerance` of `now` on either side. The returned
/// instant identifies the window and is what executions are keyed on.
pub fn due_fire_time(
    expr: &str,
    timezone: &str,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<Option<DateTime<Utc>>, ServerError> {
    let schedule = parse_cron(expr)?;
    let tz = validate_timezone(timezone)?;

    // `after` is exclusive; back off one second so a fire exactly at the
    // window's lower edge still counts.
    let window_start = (now - tolerance - Duration::seconds(1)).with_timezone(&tz);
    let next = schedule
        .after(&window_start)
        .next()
        .map(|t| t.with_timezone(&Utc));

    Ok(next.filter(|t| *t <= now + tolerance))
}

/// Upcoming fire instants in UTC, for display.
pub fn upcoming(expr: &str, timezone: &str, from: DateTime<Utc>, count: usize) -> Result<Vec<DateTime<Utc>>, ServerError> {
    let schedule = parse_cron(expr)?;
    let tz = validate_timezone(timezone)?;
    Ok(schedule
        .after(&from.with_timezone(&tz))
        .take(count)
        .map(|t| t.with_timezone(&Utc))
        .collect())
}
