//! Student Generator
//!
//! Produces syntactically valid synthetic students for bulk loads.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Student, MAX_SCORE, NATIONAL_ID_LEN};

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Diego", "Elisa", "Fabio", "Gabriela", "Heitor", "Isabela",
    "Joao", "Larissa", "Marcos", "Natalia", "Otavio", "Paula", "Rafael", "Sofia", "Tiago",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Barbosa", "Cardoso", "Duarte", "Ferreira", "Gomes", "Lima", "Martins",
    "Nogueira", "Oliveira", "Pereira", "Ribeiro", "Santos", "Teixeira", "Vieira",
];

const COURSES: &[&str] = &[
    "Computer Science",
    "Software Engineering",
    "Information Systems",
    "Mathematics",
    "Physics",
    "Electrical Engineering",
    "Civil Engineering",
    "Statistics",
];

/// Generates valid students with sequential keys
///
/// Generation stops once `u32::MAX` has been issued.
pub struct StudentGenerator {
    rng: StdRng,
    next_key: Option<u32>,
}

impl StudentGenerator {
    /// Create a generator seeded from system entropy, keys starting at 1
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            next_key: Some(1),
        }
    }

    /// Create a deterministic generator
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_key: Some(1),
        }
    }

    /// Start numbering keys at `key` (must be > 0)
    pub fn starting_at(mut self, key: u32) -> Self {
        self.next_key = Some(key.max(1));
        self
    }

    /// Produce up to `count` students; fewer once the key space runs out
    pub fn generate(&mut self, count: usize) -> Vec<Student> {
        (0..count).map_while(|_| self.next_student()).collect()
    }

    fn next_student(&mut self) -> Option<Student> {
        let key = self.next_key?;
        self.next_key = key.checked_add(1);

        let national_id: String = (0..NATIONAL_ID_LEN)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect();

        Some(Student {
            key,
            name: self.full_name(),
            national_id,
            course: self.pick(COURSES),
            mother: self.full_name(),
            father: self.full_name(),
            admission_year: self.rng.gen_range(2015..=2025),
            score: self.rng.gen_range(0..=(MAX_SCORE as u32 * 100)) as f64 / 100.0,
        })
    }

    fn full_name(&mut self) -> String {
        let first = self.pick(FIRST_NAMES);
        let last = self.pick(LAST_NAMES);
        // Roughly half the names carry a second surname to vary frame sizes
        if self.rng.gen_bool(0.5) {
            let extra = self.pick(LAST_NAMES);
            format!("{} {} {}", first, extra, last)
        } else {
            format!("{} {}", first, last)
        }
    }

    fn pick(&mut self, words: &[&str]) -> String {
        words.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }
}

impl Default for StudentGenerator {
    fn default() -> Self {
        Self::new()
    }
}
