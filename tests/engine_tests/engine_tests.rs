//! Tests for Engine
//!
//! These tests verify:
//! - Strategy selection and block-size validation from `Config`
//! - Truncation and validation before records reach storage
//! - Record operations against the configured data file
//! - Reorganization and statistics through the facade

use blockstore::config::{Config, StrategyKind};
use blockstore::engine::Engine;
use blockstore::{FieldLimits, Student, StoreError, StudentGenerator};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine(strategy: StrategyKind, block_size: usize) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_file(temp_dir.path().join("students.dat"))
        .block_size(block_size)
        .strategy(strategy)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn student(key: u32) -> Student {
    Student {
        key,
        name: "Isabela Ribeiro".to_string(),
        national_id: "32132132132".to_string(),
        course: "Mathematics".to_string(),
        mother: "Paula Ribeiro".to_string(),
        father: "Fabio Ribeiro".to_string(),
        admission_year: 2020,
        score: 8.0,
    }
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_does_not_create_file() {
    let (_temp, engine) = setup_temp_engine(StrategyKind::Contiguous, 256);

    assert!(!engine.data_file().exists());
    assert_eq!(engine.block_size(), 256);
    assert_eq!(engine.strategy(), StrategyKind::Contiguous);
}

#[test]
fn test_open_rejects_unusable_block_size() {
    let temp_dir = TempDir::new().unwrap();
    for (strategy, block_size) in [
        (StrategyKind::Fixed, 100),
        (StrategyKind::Contiguous, 40),
        (StrategyKind::Fragmented, 3),
    ] {
        let config = Config::builder()
            .data_file(temp_dir.path().join("x.dat"))
            .block_size(block_size)
            .strategy(strategy)
            .build();
        assert!(matches!(Engine::open(config), Err(StoreError::Config(_))));
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.block_size, 512);
    assert_eq!(config.strategy, StrategyKind::Contiguous);
    assert_eq!(config.limits, FieldLimits::default());
}

#[test]
fn test_strategy_parsing() {
    assert_eq!("fixed".parse::<StrategyKind>().unwrap(), StrategyKind::Fixed);
    assert_eq!(
        "Variable".parse::<StrategyKind>().unwrap(),
        StrategyKind::Contiguous
    );
    assert_eq!(
        "spanned".parse::<StrategyKind>().unwrap(),
        StrategyKind::Fragmented
    );
    assert!(matches!(
        "linked".parse::<StrategyKind>(),
        Err(StoreError::Config(_))
    ));
    assert_eq!(StrategyKind::Fragmented.to_string(), "fragmented");
}

// =============================================================================
// Record Preparation Tests
// =============================================================================

#[test]
fn test_load_truncates_long_fields() {
    let (_temp, engine) = setup_temp_engine(StrategyKind::Contiguous, 512);
    let mut long = student(1);
    long.name = "x".repeat(80);

    engine.load(&[long]).unwrap();

    assert_eq!(engine.get(1).unwrap().name.len(), 50);
}

#[test]
fn test_truncation_lets_fixed_slots_accept_long_fields() {
    let (_temp, engine) = setup_temp_engine(StrategyKind::Fixed, 512);
    let mut long = student(1);
    long.course = "Computer Science and Applied Mathematics".to_string();

    engine.add(&[long]).unwrap();

    assert_eq!(engine.get(1).unwrap().course.len(), 30);
}

#[test]
fn test_load_rejects_invalid_record_before_writing() {
    let (_temp, engine) = setup_temp_engine(StrategyKind::Contiguous, 512);
    let mut bad = student(2);
    bad.national_id = "123".to_string();

    assert!(matches!(
        engine.load(&[student(1), bad]),
        Err(StoreError::Validation(_))
    ));
    assert!(!engine.data_file().exists());
}

#[test]
fn test_update_rejects_out_of_range_score() {
    let (_temp, engine) = setup_temp_engine(StrategyKind::Contiguous, 512);
    engine.load(&[student(1)]).unwrap();

    let mut bad = student(1);
    bad.score = 11.0;

    assert!(matches!(engine.update(&bad), Err(StoreError::Validation(_))));
    assert_eq!(engine.get(1).unwrap().score, 8.0);
}

// =============================================================================
// Operation Tests
// =============================================================================

#[test]
fn test_engine_crud_on_every_strategy() {
    for strategy in [
        StrategyKind::Fixed,
        StrategyKind::Contiguous,
        StrategyKind::Fragmented,
    ] {
        let (_temp, engine) = setup_temp_engine(strategy, 512);

        assert_eq!(engine.load(&[student(1), student(2)]).unwrap(), 2);
        assert_eq!(engine.add(&[student(3)]).unwrap(), 1);

        let mut changed = student(2);
        changed.score = 2.5;
        engine.update(&changed).unwrap();
        engine.delete(1).unwrap();

        let keys: Vec<u32> = engine.list().unwrap().iter().map(|s| s.key).collect();
        assert_eq!(keys, vec![2, 3], "strategy {}", strategy);
        assert_eq!(engine.get(2).unwrap().score, 2.5);
        assert!(matches!(engine.get(1), Err(StoreError::NotFound(1))));
    }
}

#[test]
fn test_next_key() {
    let (_temp, engine) = setup_temp_engine(StrategyKind::Contiguous, 512);
    assert_eq!(engine.next_key().unwrap(), 1);

    engine.load(&[student(4), student(9), student(2)]).unwrap();
    assert_eq!(engine.next_key().unwrap(), 10);
}

#[test]
fn test_next_key_after_largest_key_is_an_error() {
    for strategy in [
        StrategyKind::Fixed,
        StrategyKind::Contiguous,
        StrategyKind::Fragmented,
    ] {
        let (_temp, engine) = setup_temp_engine(strategy, 512);
        engine.add(&[student(3), student(u32::MAX)]).unwrap();

        assert!(matches!(
            engine.next_key(),
            Err(StoreError::KeysExhausted(u32::MAX))
        ));
        assert_eq!(engine.list().unwrap().len(), 2);
    }
}

#[test]
fn test_stats_on_missing_file_is_empty() {
    let (_temp, engine) = setup_temp_engine(StrategyKind::Fragmented, 512);
    let stats = engine.stats().unwrap();
    assert_eq!(stats.total_blocks, 0);
}

#[test]
fn test_reorganize_through_engine() {
    let (temp, engine) = setup_temp_engine(StrategyKind::Contiguous, 256);
    let records = StudentGenerator::with_seed(11).generate(60);
    engine.load(&records).unwrap();
    for key in (1..=60).step_by(2) {
        engine.delete(key).unwrap();
    }

    let report = engine.reorganize().unwrap();

    assert_eq!(report.output, temp.path().join("students_reorg.dat"));
    assert!(report.freed_blocks > 0);
    assert!(report.blocks_after < report.blocks_before);

    let reorganized = Engine::open(
        Config::builder()
            .data_file(&report.output)
            .block_size(256)
            .build(),
    )
    .unwrap();
    assert_eq!(reorganized.list().unwrap(), engine.list().unwrap());
}

#[test]
fn test_open_path_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("default.dat");

    let engine = Engine::open_path(&path).unwrap();
    assert_eq!(engine.data_file(), path.as_path());
    assert_eq!(engine.block_size(), 512);
    assert_eq!(engine.config().strategy, StrategyKind::Contiguous);
}
