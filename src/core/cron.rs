//! Cron expression parsing and next occurrence calculation.
//!
//! Supports standard cron expressions, extended 6-field cron (with seconds),
//! shortcuts (@daily, @hourly, etc.), and interval expressions (@every).
//! Used to validate the recurrence of a schedule; materializing firings is
//! left to the run path.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when parsing or evaluating a cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    /// Invalid cron expression.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// Invalid interval expression.
    #[error("invalid interval expression: {0}")]
    InvalidInterval(String),

    /// Invalid timezone.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// No more occurrences.
    #[error("no more occurrences")]
    NoMoreOccurrences,
}

/// A parsed recurrence.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    timezone: Tz,
    kind: Recurrence,
}

#[derive(Debug, Clone)]
enum Recurrence {
    Cron(Box<Schedule>),
    Interval(Duration),
}

impl CronSchedule {
    /// Parse an expression in UTC.
    ///
    /// Supports:
    /// - Standard 5-field cron: `minute hour day month weekday`
    /// - Extended 6-field cron: `second minute hour day month weekday`
    /// - Shortcuts: `@yearly`, `@monthly`, `@weekly`, `@daily`, `@hourly`
    /// - Intervals: `@every 5m`, `@every 1h30m`
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        Self::with_timezone(expression, "UTC")
    }

    /// Parse an expression evaluated in the given timezone.
    pub fn with_timezone(expression: &str, timezone: &str) -> Result<Self, CronError> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|_| CronError::InvalidTimezone(timezone.to_string()))?;

        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(CronError::InvalidCron("expression is empty".to_string()));
        }

        let kind = if trimmed.starts_with('@') {
            Self::parse_shortcut(trimmed)?
        } else {
            Self::parse_cron(trimmed)?
        };

        Ok(Self {
            expression: trimmed.to_string(),
            timezone,
            kind,
        })
    }

    fn parse_shortcut(expression: &str) -> Result<Recurrence, CronError> {
        match expression.to_lowercase().as_str() {
            "@yearly" | "@annually" => Self::parse_cron("0 0 1 1 *"),
            "@monthly" => Self::parse_cron("0 0 1 * *"),
            "@weekly" => Self::parse_cron("0 0 * * SUN"),
            "@daily" | "@midnight" => Self::parse_cron("0 0 * * *"),
            "@hourly" => Self::parse_cron("0 * * * *"),
            s if s.starts_with("@every ") => {
                Self::parse_duration(s[7..].trim()).map(Recurrence::Interval)
            }
            _ => Err(CronError::InvalidCron(format!(
                "unknown shortcut: {}",
                expression
            ))),
        }
    }

    /// Parse a duration string like "5m", "1h", "1h30m", "30s".
    fn parse_duration(s: &str) -> Result<Duration, CronError> {
        let mut total_secs: u64 = 0;
        let mut current_num = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_num.push(c);
                continue;
            }
            let num: u64 = current_num
                .parse()
                .map_err(|_| CronError::InvalidInterval(s.to_string()))?;
            current_num.clear();

            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(CronError::InvalidInterval(s.to_string())),
            };
            total_secs = num
                .checked_mul(unit)
                .and_then(|secs| total_secs.checked_add(secs))
                .ok_or_else(|| CronError::InvalidInterval(s.to_string()))?;
        }

        // Trailing digits without a unit
        if !current_num.is_empty() || total_secs == 0 {
            return Err(CronError::InvalidInterval(s.to_string()));
        }

        Ok(Duration::from_secs(total_secs))
    }

    fn parse_cron(expression: &str) -> Result<Recurrence, CronError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();

        let cron_expr = match fields.len() {
            5 => format!("0 {}", fields.join(" ")),
            6 => fields.join(" "),
            n => {
                return Err(CronError::InvalidCron(format!(
                    "expected 5 or 6 fields, got {}",
                    n
                )));
            }
        };

        let schedule = Schedule::from_str(&cron_expr)
            .map_err(|e| CronError::InvalidCron(e.to_string()))?;

        Ok(Recurrence::Cron(Box::new(schedule)))
    }

    /// Get the next N occurrences after the given time.
    pub fn next_n_after(&self, after: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        match &self.kind {
            Recurrence::Cron(schedule) => {
                let local_time = after.with_timezone(&self.timezone);
                schedule
                    .after(&local_time)
                    .take(n)
                    .map(|dt| dt.with_timezone(&Utc))
                    .collect()
            }
            Recurrence::Interval(duration) => {
                let Ok(step) = chrono::Duration::from_std(*duration) else {
                    return Vec::new();
                };
                let mut results = Vec::with_capacity(n);
                let mut current = after;
                for _ in 0..n {
                    // Firings past the last representable instant never happen.
                    let Some(next) = current.checked_add_signed(step) else {
                        break;
                    };
                    current = next;
                    results.push(current);
                }
                results
            }
        }
    }

    /// Get the next occurrence after the given time.
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, CronError> {
        self.next_n_after(after, 1)
            .into_iter()
            .next()
            .ok_or(CronError::NoMoreOccurrences)
    }

    /// Smallest gap between consecutive firings among the next `samples`.
    ///
    /// Returns `None` when fewer than two firings remain, or when an
    /// interval never fires at all.
    pub fn min_gap_after(&self, after: DateTime<Utc>, samples: usize) -> Option<Duration> {
        if let Recurrence::Interval(duration) = self.kind {
            return (!self.next_n_after(after, 1).is_empty()).then_some(duration);
        }
        self.next_n_after(after, samples.max(2))
            .windows(2)
            .filter_map(|pair| (pair[1] - pair[0]).to_std().ok())
            .min()
    }

    /// Get the original expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Get the timezone name.
    pub fn timezone(&self) -> &str {
        self.timezone.name()
    }
}
