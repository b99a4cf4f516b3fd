//! Record Module
//!
//! The student record stored by every strategy.
//!
//! ## Responsibilities
//! - Hold the record fields in their encoding order
//! - Validate invariants the codec relies on (positive key, 11-byte ID, bounded score)
//! - Clamp variable-length fields to their configured maxima
//!
//! Storage strategies never call `validate()` or `truncate_fields()` themselves;
//! they require that every record handed to them already passed both.

mod generator;

pub use generator::StudentGenerator;

use crate::error::{Result, StoreError};

/// Width of the national ID field (not length-prefixed)
pub const NATIONAL_ID_LEN: usize = 11;

/// Lowest accepted score
pub const MIN_SCORE: f64 = 0.0;

/// Highest accepted score
pub const MAX_SCORE: f64 = 10.0;

/// Maximum byte lengths of the variable-length fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    /// Max bytes for `name`
    pub name: usize,
    /// Max bytes for `course`
    pub course: usize,
    /// Max bytes for each filiation field (`mother`, `father`)
    pub filiation: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            name: 50,
            course: 30,
            filiation: 50,
        }
    }
}

/// A student record
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    /// Unique identifier, must be > 0
    pub key: u32,
    pub name: String,
    /// Exactly `NATIONAL_ID_LEN` bytes
    pub national_id: String,
    pub course: String,
    pub mother: String,
    pub father: String,
    pub admission_year: u32,
    /// Bounded to `MIN_SCORE..=MAX_SCORE`, stored with two decimal places
    pub score: f64,
}

impl Student {
    /// Check the invariants the codec depends on
    pub fn validate(&self) -> Result<()> {
        if self.key == 0 {
            return Err(StoreError::Validation(
                "key must be greater than zero".to_string(),
            ));
        }

        if self.national_id.len() != NATIONAL_ID_LEN {
            return Err(StoreError::Validation(format!(
                "national ID of record {} must be exactly {} bytes, got {}",
                self.key,
                NATIONAL_ID_LEN,
                self.national_id.len()
            )));
        }

        if !(MIN_SCORE..=MAX_SCORE).contains(&self.score) {
            return Err(StoreError::Validation(format!(
                "score of record {} must be between {:.1} and {:.1}, got {}",
                self.key, MIN_SCORE, MAX_SCORE, self.score
            )));
        }

        Ok(())
    }

    /// Clamp every variable-length field to its configured maximum
    pub fn truncate_fields(&mut self, limits: &FieldLimits) {
        truncate_utf8(&mut self.name, limits.name);
        truncate_utf8(&mut self.course, limits.course);
        truncate_utf8(&mut self.mother, limits.filiation);
        truncate_utf8(&mut self.father, limits.filiation);
    }

    /// Score as the integer number of hundredths written to disk
    pub fn score_hundredths(&self) -> u64 {
        (self.score * 100.0).round() as u64
    }
}

/// Truncate `value` to at most `max` bytes without splitting a character
fn truncate_utf8(value: &mut String, max: usize) {
    if value.len() <= max {
        return;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}
