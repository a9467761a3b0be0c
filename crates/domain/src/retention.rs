//! Retention policy and TTL parsing.

use chrono::TimeDelta;
use regex::Regex;
use rg_cleanup_core::{AppError, AppResult};

/// Default minimum age before a resource group is considered stale.
pub const DEFAULT_TTL_HOURS: i64 = 72;

/// Resource group name filter compiled from the configured pattern.
#[derive(Debug, Clone)]
pub enum NameFilter {
    /// No pattern configured; every name passes.
    MatchAll,
    /// Pattern that must match the whole name.
    Pattern {
        /// Pattern as configured.
        source: String,
        /// Pattern wrapped in `^(?:...)$`.
        regex: Regex,
    },
    /// Pattern that failed to compile. Every name is rejected.
    Invalid {
        /// Pattern as configured.
        source: String,
        /// Compiler error message.
        error: String,
    },
}

impl NameFilter {
    /// Compiles a name filter. An empty pattern matches every name.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        if pattern.is_empty() {
            return Self::MatchAll;
        }

        // Validate the pattern on its own first: wrapping can turn an
        // unbalanced pattern such as `)(` into a valid one.
        let anchored = Regex::new(pattern)
            .and_then(|_| Regex::new(format!("^(?:{pattern})$").as_str()));

        match anchored {
            Ok(regex) => Self::Pattern {
                source: pattern.to_owned(),
                regex,
            },
            Err(error) => Self::Invalid {
                source: pattern.to_owned(),
                error: error.to_string(),
            },
        }
    }

    /// Returns the configured pattern, empty when matching everything.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::MatchAll => "",
            Self::Pattern { source, .. } | Self::Invalid { source, .. } => source.as_str(),
        }
    }
}

/// Retention policy applied to every resource group of a run.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    ttl: TimeDelta,
    name_filter: NameFilter,
}

impl RetentionPolicy {
    /// Creates a retention policy.
    ///
    /// The TTL must not be negative. An invalid `name_pattern` does not fail
    /// construction; it makes every evaluation fail closed instead.
    pub fn new(ttl: TimeDelta, name_pattern: &str) -> AppResult<Self> {
        if ttl < TimeDelta::zero() {
            return Err(AppError::Validation(
                "retention ttl must not be negative".to_owned(),
            ));
        }

        Ok(Self {
            ttl,
            name_filter: NameFilter::compile(name_pattern),
        })
    }

    /// Returns the minimum age before a group becomes eligible.
    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Returns the compiled name filter.
    #[must_use]
    pub fn name_filter(&self) -> &NameFilter {
        &self.name_filter
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::hours(DEFAULT_TTL_HOURS),
            name_filter: NameFilter::MatchAll,
        }
    }
}

/// Parses a duration such as `72h`, `3h30m`, `1.5h` or `4d`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`, `d`. A bare `0` is accepted.
pub fn parse_ttl(value: &str) -> AppResult<TimeDelta> {
    let trimmed = value.trim();
    let invalid = |detail: &str| AppError::Validation(format!("invalid ttl '{value}': {detail}"));

    let (negative, mut rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }

    if rest.is_empty() {
        return Err(invalid("duration is empty"));
    }

    let mut total_nanos = 0_f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|character: char| !(character.is_ascii_digit() || character == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|character: char| character.is_ascii_digit() || character == '.')
            .unwrap_or(tail.len());
        let (unit, remaining) = tail.split_at(unit_len);

        let unit_nanos = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3_600e9,
            "d" => 86_400e9,
            "" => return Err(invalid("missing unit")),
            other => return Err(invalid(format!("unknown unit '{other}'").as_str())),
        };
        let amount = number
            .parse::<f64>()
            .map_err(|error| invalid(error.to_string().as_str()))?;

        total_nanos += amount * unit_nanos;
        rest = remaining;
    }

    if !total_nanos.is_finite() || total_nanos >= i64::MAX as f64 {
        return Err(invalid("duration is out of range"));
    }

    let nanos = total_nanos.round() as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}
