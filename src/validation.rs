//! Field validators for the metadata editor.
//!
//! Every validator treats blank input as valid; a blank field means "unset".

use chrono::NaiveDateTime;
use thiserror::Error;

/// Maximum length of the free-text ASCII tags (make, model, software).
pub const ASCII_MAX_CHARS: usize = 255;
/// Upper bound for LONG tags (pixel dimensions, ISO): `i32::MAX`.
pub const LONG_MAX_VAL: f64 = 2_147_483_647.0;

/// Input patterns accepted by [`Validator::Date`], most specific first.
pub const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validator {
    NonNegative,
    Min(f64),
    Max(f64),
    MaxChars(usize),
    Date,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("value must not be negative")]
    Negative,
    #[error("value must be at least {min}")]
    BelowMin { min: f64 },
    #[error("value must be at most {max}")]
    AboveMax { max: f64 },
    #[error("at most {max} characters allowed, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("'{0}' is not a valid date and time")]
    InvalidDate(String),
}

impl Validator {
    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        match *self {
            Self::NonNegative => {
                if parse_number(trimmed)? < 0.0 {
                    return Err(ValidationError::Negative);
                }
            }
            Self::Min(min) => {
                if parse_number(trimmed)? < min {
                    return Err(ValidationError::BelowMin { min });
                }
            }
            Self::Max(max) => {
                if parse_number(trimmed)? > max {
                    return Err(ValidationError::AboveMax { max });
                }
            }
            Self::MaxChars(max) => {
                let actual = value.chars().count();
                if actual > max {
                    return Err(ValidationError::TooLong { max, actual });
                }
            }
            Self::Date => {
                parse_date_input(trimmed)
                    .ok_or_else(|| ValidationError::InvalidDate(trimmed.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Run every validator and collect the failures.
pub fn validate_all(validators: &[Validator], value: &str) -> Vec<ValidationError> {
    validators
        .iter()
        .filter_map(|v| v.validate(value).err())
        .collect()
}

pub(crate) fn parse_number(value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ValidationError::NotANumber(value.trim().to_string()))
}

pub(crate) fn parse_date_input(value: &str) -> Option<NaiveDateTime> {
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value.trim(), fmt).ok())
}
