//! Tests for the student record and its generator
//!
//! These tests verify:
//! - Validation of key, national ID and score
//! - UTF-8 safe truncation to the configured limits
//! - Deterministic, valid synthetic data

use blockstore::record::{MAX_SCORE, MIN_SCORE, NATIONAL_ID_LEN};
use blockstore::{FieldLimits, Student, StoreError, StudentGenerator};

// =============================================================================
// Helper Functions
// =============================================================================

fn valid_student() -> Student {
    Student {
        key: 1,
        name: "Bruno Santos".to_string(),
        national_id: "11122233344".to_string(),
        course: "Statistics".to_string(),
        mother: "Elisa Santos".to_string(),
        father: "Marcos Santos".to_string(),
        admission_year: 2018,
        score: 7.0,
    }
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_valid_student_passes() {
    assert!(valid_student().validate().is_ok());
}

#[test]
fn test_zero_key_rejected() {
    let mut s = valid_student();
    s.key = 0;
    assert!(matches!(s.validate(), Err(StoreError::Validation(_))));
}

#[test]
fn test_national_id_must_be_exact_length() {
    let mut s = valid_student();
    s.national_id = "1234567890".to_string();
    assert!(matches!(s.validate(), Err(StoreError::Validation(_))));

    s.national_id = "123456789012".to_string();
    assert!(matches!(s.validate(), Err(StoreError::Validation(_))));
}

#[test]
fn test_score_bounds() {
    let mut s = valid_student();

    s.score = MIN_SCORE;
    assert!(s.validate().is_ok());
    s.score = MAX_SCORE;
    assert!(s.validate().is_ok());

    s.score = -0.01;
    assert!(matches!(s.validate(), Err(StoreError::Validation(_))));
    s.score = 10.01;
    assert!(matches!(s.validate(), Err(StoreError::Validation(_))));
}

#[test]
fn test_score_hundredths_rounds() {
    let mut s = valid_student();
    s.score = 9.99;
    assert_eq!(s.score_hundredths(), 999);

    s.score = 0.125;
    assert_eq!(s.score_hundredths(), 13);
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncate_fields_to_limits() {
    let limits = FieldLimits {
        name: 5,
        course: 3,
        filiation: 4,
    };
    let mut s = valid_student();
    s.truncate_fields(&limits);

    assert_eq!(s.name, "Bruno");
    assert_eq!(s.course, "Sta");
    assert_eq!(s.mother, "Elis");
    assert_eq!(s.father, "Marc");
    // Fixed-width fields are never touched
    assert_eq!(s.national_id, "11122233344");
}

#[test]
fn test_truncate_keeps_short_fields() {
    let mut s = valid_student();
    let before = s.clone();
    s.truncate_fields(&FieldLimits::default());
    assert_eq!(s, before);
}

#[test]
fn test_truncate_respects_char_boundaries() {
    let limits = FieldLimits {
        name: 3,
        course: 30,
        filiation: 50,
    };
    let mut s = valid_student();
    // 'é' is two bytes: "éé" is 4 bytes, a 3-byte cut would split the second
    s.name = "éé".to_string();
    s.truncate_fields(&limits);

    assert_eq!(s.name, "é");
}

// =============================================================================
// Generator Tests
// =============================================================================

#[test]
fn test_generator_produces_valid_students() {
    let students = StudentGenerator::with_seed(1).generate(200);
    assert_eq!(students.len(), 200);

    for s in &students {
        s.validate().unwrap();
        assert_eq!(s.national_id.len(), NATIONAL_ID_LEN);
        assert!(s.national_id.chars().all(|c| c.is_ascii_digit()));
        assert!((2015..=2025).contains(&s.admission_year));
    }
}

#[test]
fn test_generator_sequential_keys() {
    let students = StudentGenerator::with_seed(3).starting_at(100).generate(5);
    let keys: Vec<u32> = students.iter().map(|s| s.key).collect();
    assert_eq!(keys, vec![100, 101, 102, 103, 104]);
}

#[test]
fn test_generator_keys_continue_across_calls() {
    let mut generator = StudentGenerator::with_seed(3);
    let first = generator.generate(2);
    let second = generator.generate(2);

    assert_eq!(first[1].key, 2);
    assert_eq!(second[0].key, 3);
}

#[test]
fn test_generator_stops_at_last_key() {
    let mut generator = StudentGenerator::with_seed(3).starting_at(u32::MAX - 1);

    let keys: Vec<u32> = generator.generate(5).iter().map(|s| s.key).collect();
    assert_eq!(keys, vec![u32::MAX - 1, u32::MAX]);
    assert!(generator.generate(1).is_empty());
}

#[test]
fn test_generator_is_deterministic_with_seed() {
    let a = StudentGenerator::with_seed(99).generate(20);
    let b = StudentGenerator::with_seed(99).generate(20);
    assert_eq!(a, b);
}

#[test]
fn test_generator_fits_default_limits() {
    let limits = FieldLimits::default();
    for s in StudentGenerator::with_seed(5).generate(100) {
        let mut truncated = s.clone();
        truncated.truncate_fields(&limits);
        assert_eq!(truncated, s);
    }
}
