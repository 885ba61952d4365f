//! Cron expression parsing and human-readable summaries.
//!
//! Scheduled actions carry a standard five-field expression (`minute hour
//! day-of-month month day-of-week`) or one of the `@hourly`, `@daily`,
//! `@midnight`, `@weekly`, `@monthly`, `@yearly` and `@annually` shorthands.
//! The unit never runs the schedule itself; the host does. The parsed form
//! only backs the `cronSummary` shown in manifests, so [`summary`] degrades to
//! the raw expression instead of failing.

use std::fmt;

use thiserror::Error;

/// Failure to parse a cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    /// The expression does not have five fields.
    #[error("expected 5 fields, found {found}")]
    FieldCount {
        /// Number of whitespace-separated fields found.
        found: usize,
    },

    /// A field item could not be parsed.
    #[error("invalid {field} field '{value}'")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// A value lies outside the field's range.
    #[error("{field} value {value} is outside {min}-{max}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: u8,
        /// Smallest allowed value.
        min: u8,
        /// Largest allowed value.
        max: u8,
    },

    /// An `@` shorthand is not recognised.
    #[error("unknown schedule shorthand '{name}'")]
    UnknownShorthand {
        /// The shorthand as written.
        name: String,
    },
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    min: u8,
    max: u8,
    names: &'static [&'static str],
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: &[
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ],
};
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Parsed value set of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// `*`
    Any,
    /// `*/n`
    Every(u8),
    /// Explicit values, sorted and deduplicated.
    Values(Vec<u8>),
}

impl Field {
    fn parse(text: &str, spec: FieldSpec) -> Result<Self, CronError> {
        if text == "*" {
            return Ok(Self::Any);
        }
        if let Some(step) = text.strip_prefix("*/") {
            let every = parse_step(step, spec, text)?;
            return Ok(if every == 1 { Self::Any } else { Self::Every(every) });
        }

        let mut values = Vec::new();
        for item in text.split(',') {
            expand_item(item, spec, &mut values)?;
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self::Values(values))
    }
}

fn invalid(spec: FieldSpec, value: &str) -> CronError {
    CronError::InvalidField {
        field: spec.name,
        value: value.to_owned(),
    }
}

fn parse_step(step: &str, spec: FieldSpec, item: &str) -> Result<u8, CronError> {
    match step.parse::<u8>() {
        Ok(0) | Err(_) => Err(invalid(spec, item)),
        Ok(value) => Ok(value),
    }
}

fn parse_value(text: &str, spec: FieldSpec, item: &str) -> Result<u8, CronError> {
    let lowered = text.to_ascii_lowercase();
    let value = if let Some(position) = spec.names.iter().position(|name| *name == lowered) {
        u8::try_from(position)
            .map(|offset| offset + spec.min)
            .map_err(|_| invalid(spec, item))?
    } else {
        text.parse::<u8>().map_err(|_| invalid(spec, item))?
    };
    if value < spec.min || value > spec.max {
        return Err(CronError::OutOfRange {
            field: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

fn expand_item(item: &str, spec: FieldSpec, values: &mut Vec<u8>) -> Result<(), CronError> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, parse_step(step, spec, item)?),
        None => (item, 1),
    };

    let (start, end) = if range == "*" {
        (spec.min, spec.max)
    } else if let Some((low, high)) = range.split_once('-') {
        (parse_value(low, spec, item)?, parse_value(high, spec, item)?)
    } else {
        let single = parse_value(range, spec, item)?;
        let open_end = if step > 1 { spec.max } else { single };
        (single, open_end)
    };
    if start > end {
        return Err(invalid(spec, item));
    }

    for value in (start..=end).step_by(usize::from(step)) {
        // Sunday may be written as 7.
        let normalised = if spec.name == DAY_OF_WEEK.name && value == 7 {
            0
        } else {
            value
        };
        values.push(normalised);
    }
    Ok(())
}

/// A parsed five-field schedule.
///
/// # Example
///
/// ```
/// use unitkit::cron::Schedule;
///
/// let schedule: Schedule = "30 9 * * mon-fri".parse().expect("valid");
/// assert_eq!(
///     schedule.to_string(),
///     "at 09:30 on Monday, Tuesday, Wednesday, Thursday, Friday"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl Schedule {
    /// Minute field.
    #[must_use]
    pub const fn minute(&self) -> &Field {
        &self.minute
    }

    /// Hour field.
    #[must_use]
    pub const fn hour(&self) -> &Field {
        &self.hour
    }

    /// Day-of-month field.
    #[must_use]
    pub const fn day_of_month(&self) -> &Field {
        &self.day_of_month
    }

    /// Month field.
    #[must_use]
    pub const fn month(&self) -> &Field {
        &self.month
    }

    /// Day-of-week field, with Sunday as 0.
    #[must_use]
    pub const fn day_of_week(&self) -> &Field {
        &self.day_of_week
    }

    /// Renders a human-readable description of when the schedule fires.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut text = describe_time(&self.minute, &self.hour);
        match &self.day_of_month {
            Field::Any => {}
            Field::Every(step) => text.push_str(&format!(" every {step} days")),
            Field::Values(days) => {
                text.push_str(&format!(" on day {} of the month", join_numbers(days)));
            }
        }
        match &self.month {
            Field::Any => {}
            Field::Every(step) => text.push_str(&format!(" every {step} months")),
            Field::Values(months) => {
                text.push_str(" in ");
                text.push_str(&join_names(months, &MONTH_NAMES, 1));
            }
        }
        match &self.day_of_week {
            Field::Any => {}
            Field::Every(step) => text.push_str(&format!(" every {step} days of the week")),
            Field::Values(days) => {
                text.push_str(" on ");
                text.push_str(&join_names(days, &WEEKDAY_NAMES, 0));
            }
        }
        text
    }
}

fn describe_time(minute: &Field, hour: &Field) -> String {
    match (minute, hour) {
        (Field::Any, Field::Any) => "every minute".to_owned(),
        (Field::Every(step), Field::Any) => format!("every {step} minutes"),
        (Field::Values(minutes), Field::Any) => match minutes.as_slice() {
            [single] => format!("every hour at minute {single}"),
            _ => format!("every hour at minutes {}", join_numbers(minutes)),
        },
        (Field::Values(minutes), Field::Every(step)) => {
            format!("at minute {} every {step} hours", join_numbers(minutes))
        }
        (Field::Values(minutes), Field::Values(hours)) => match minutes.as_slice() {
            [single] => {
                let times: Vec<String> = hours
                    .iter()
                    .map(|hour_value| format!("{hour_value:02}:{single:02}"))
                    .collect();
                format!("at {}", times.join(", "))
            }
            _ => format!(
                "at minutes {} past hour {}",
                join_numbers(minutes),
                join_numbers(hours)
            ),
        },
        (Field::Any, Field::Values(hours)) => {
            format!("every minute during hour {}", join_numbers(hours))
        }
        (Field::Every(step), Field::Values(hours)) => {
            format!("every {step} minutes during hour {}", join_numbers(hours))
        }
        (Field::Any, Field::Every(hour_step)) => {
            format!("every minute of every {hour_step} hours")
        }
        (Field::Every(step), Field::Every(hour_step)) => {
            format!("every {step} minutes of every {hour_step} hours")
        }
    }
}

fn join_numbers(values: &[u8]) -> String {
    values
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_names(values: &[u8], names: &[&str], first: u8) -> String {
    values
        .iter()
        .map(|value| {
            names
                .get(usize::from(value.saturating_sub(first)))
                .map_or_else(|| value.to_string(), |name| (*name).to_owned())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn expand_shorthand(expression: &str) -> Result<&'static str, CronError> {
    match expression.to_ascii_lowercase().as_str() {
        "@hourly" => Ok("0 * * * *"),
        "@daily" | "@midnight" => Ok("0 0 * * *"),
        "@weekly" => Ok("0 0 * * 0"),
        "@monthly" => Ok("0 0 1 * *"),
        "@yearly" | "@annually" => Ok("0 0 1 1 *"),
        _ => Err(CronError::UnknownShorthand {
            name: expression.to_owned(),
        }),
    }
}

impl std::str::FromStr for Schedule {
    type Err = CronError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let trimmed = expression.trim();
        let expanded = if trimmed.starts_with('@') {
            expand_shorthand(trimmed)?
        } else {
            trimmed
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(CronError::FieldCount {
                found: fields.len(),
            });
        };
        Ok(Self {
            minute: Field::parse(minute, MINUTE)?,
            hour: Field::parse(hour, HOUR)?,
            day_of_month: Field::parse(day_of_month, DAY_OF_MONTH)?,
            month: Field::parse(month, MONTH)?,
            day_of_week: Field::parse(day_of_week, DAY_OF_WEEK)?,
        })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Summarises an expression, falling back to the expression itself when it
/// cannot be parsed.
///
/// ```
/// assert_eq!(unitkit::cron::summary("0 * * * *"), "every hour at minute 0");
/// assert_eq!(unitkit::cron::summary("not a schedule"), "not a schedule");
/// ```
#[must_use]
pub fn summary(expression: &str) -> String {
    expression
        .parse::<Schedule>()
        .map_or_else(|_| expression.to_owned(), |schedule| schedule.describe())
}
