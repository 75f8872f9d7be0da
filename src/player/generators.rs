// Value generators - note, chord and velocity factories for players
// Stateful producers behind the shared Generate capability

use crate::clock::Generate;
use rand::Rng;
use rand::rngs::ThreadRng;
use thiserror::Error;

/// Errors raised at generator construction and layout boundaries
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("expected {expected} items, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("pattern needs at least one item")]
    Empty,
}

/// Cycles through a fixed list of values
///
/// `with_length` enforces the cycle size up front, for grids where every
/// row must line up (a 16-step row of velocities, say).
pub struct Cycle<T> {
    items: Vec<T>,
    index: usize,
}

impl<T: Clone> Cycle<T> {
    pub fn new(items: Vec<T>) -> Result<Self, PatternError> {
        if items.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self { items, index: 0 })
    }

    /// A cycle that must hold exactly `expected` items
    pub fn with_length(expected: usize, items: Vec<T>) -> Result<Self, PatternError> {
        if items.len() != expected {
            return Err(PatternError::WrongLength {
                expected,
                actual: items.len(),
            });
        }
        Self::new(items)
    }
}

impl<T: Clone> Generate<T> for Cycle<T> {
    fn next_value(&mut self) -> T {
        let value = self.items[self.index].clone();
        self.index = (self.index + 1) % self.items.len();
        value
    }
}

/// Uniform random pick from a fixed list
pub struct Choice<T> {
    items: Vec<T>,
    rng: ThreadRng,
}

impl<T: Clone> Choice<T> {
    pub fn new(items: Vec<T>) -> Result<Self, PatternError> {
        if items.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self {
            items,
            rng: rand::thread_rng(),
        })
    }
}

impl<T: Clone> Generate<T> for Choice<T> {
    fn next_value(&mut self) -> T {
        let index = self.rng.gen_range(0..self.items.len());
        self.items[index].clone()
    }
}

/// Random pick proportional to per-item weights
pub struct Weighted<T> {
    items: Vec<(T, u32)>,
    total: u32,
    rng: ThreadRng,
}

impl<T: Clone> Weighted<T> {
    pub fn new(items: Vec<(T, u32)>) -> Result<Self, PatternError> {
        let total: u32 = items.iter().map(|(_, weight)| weight).sum();
        if items.is_empty() || total == 0 {
            return Err(PatternError::Empty);
        }
        Ok(Self {
            items,
            total,
            rng: rand::thread_rng(),
        })
    }
}

impl<T: Clone> Generate<T> for Weighted<T> {
    fn next_value(&mut self) -> T {
        let mut roll = self.rng.gen_range(0..self.total);
        for (item, weight) in &self.items {
            if roll < *weight {
                return item.clone();
            }
            roll -= weight;
        }
        // unreachable: roll < total == sum of weights
        self.items[self.items.len() - 1].0.clone()
    }
}

/// Walks the list one step at a time, bouncing at the ends
///
/// Between the ends each step flips direction with probability one half,
/// which keeps phrases wandering instead of sweeping.
pub struct RandomWalk<T> {
    items: Vec<T>,
    index: usize,
    direction: i32,
    rng: ThreadRng,
}

impl<T: Clone> RandomWalk<T> {
    pub fn new(items: Vec<T>) -> Result<Self, PatternError> {
        if items.is_empty() {
            return Err(PatternError::Empty);
        }
        let mut rng = rand::thread_rng();
        let index = rng.gen_range(0..items.len());
        Ok(Self {
            items,
            index,
            direction: 1,
            rng,
        })
    }
}

impl<T: Clone> Generate<T> for RandomWalk<T> {
    fn next_value(&mut self) -> T {
        let value = self.items[self.index].clone();
        if self.items.len() == 1 {
            return value;
        }

        let last = self.items.len() - 1;
        if self.index == 0 {
            self.direction = 1;
        } else if self.index == last {
            self.direction = -1;
        } else if self.rng.gen_range(0..2) == 1 {
            self.direction = -self.direction;
        }
        self.index = (self.index as i32 + self.direction) as usize;

        value
    }
}

/// Plays whole phrases, picking the next one at random
///
/// With a nonzero `expected` length every phrase must match it; mixed-length
/// phrases under a fixed grid are rejected at construction.
pub struct Phrases<T> {
    phrases: Vec<Vec<T>>,
    current: usize,
    position: usize,
    rng: ThreadRng,
}

impl<T: Clone> Phrases<T> {
    pub fn new(phrases: Vec<Vec<T>>) -> Result<Self, PatternError> {
        Self::with_length(0, phrases)
    }

    /// Phrases that must each hold exactly `expected` items (0 = any length)
    pub fn with_length(expected: usize, phrases: Vec<Vec<T>>) -> Result<Self, PatternError> {
        if phrases.is_empty() || phrases.iter().any(Vec::is_empty) {
            return Err(PatternError::Empty);
        }
        if expected > 0 {
            for phrase in &phrases {
                if phrase.len() != expected {
                    return Err(PatternError::WrongLength {
                        expected,
                        actual: phrase.len(),
                    });
                }
            }
        }

        let mut rng = rand::thread_rng();
        let current = rng.gen_range(0..phrases.len());
        Ok(Self {
            phrases,
            current,
            position: 0,
            rng,
        })
    }
}

impl<T: Clone> Generate<T> for Phrases<T> {
    fn next_value(&mut self) -> T {
        if self.position == self.phrases[self.current].len() {
            self.current = self.rng.gen_range(0..self.phrases.len());
            self.position = 0;
        }
        let value = self.phrases[self.current][self.position].clone();
        self.position += 1;
        value
    }
}

/// Lays out sparse `(value, step)` pairs into a rest-padded row
///
/// Steps must be strictly increasing and fit inside `length`; the gaps are
/// filled with `None` rests. Feed the result to a [`Cycle`] to loop it.
pub fn sequence<T: Clone>(
    steps: &[(T, usize)],
    length: usize,
) -> Result<Vec<Option<T>>, PatternError> {
    let mut row = Vec::with_capacity(length);
    let mut next = 0usize;

    for (value, step) in steps {
        if *step < next || *step >= length {
            return Err(PatternError::WrongLength {
                expected: length,
                actual: *step + 1,
            });
        }
        row.resize(*step, None);
        row.push(Some(value.clone()));
        next = step + 1;
    }
    row.resize(length, None);
    Ok(row)
}

/// Stretches a row by `factor`, padding each step with rests
pub fn explode<T: Clone>(row: &[Option<T>], factor: usize) -> Vec<Option<T>> {
    assert!(factor > 0, "explode factor must be > 0");

    let mut stretched = Vec::with_capacity(row.len() * factor);
    for step in row {
        stretched.push(step.clone());
        for _ in 1..factor {
            stretched.push(None);
        }
    }
    stretched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        let mut cycle = Cycle::new(vec![1, 2, 3]).unwrap();
        let row: Vec<i32> = (0..7).map(|_| cycle.next_value()).collect();
        assert_eq!(row, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_cycle_length_check() {
        assert_eq!(
            Cycle::with_length(8, vec![60, 62, 64]).err(),
            Some(PatternError::WrongLength { expected: 8, actual: 3 })
        );
        assert!(Cycle::<u8>::new(Vec::new()).is_err());
    }

    #[test]
    fn test_choice_stays_in_domain() {
        let mut choice = Choice::new(vec![60u8, 64, 67]).unwrap();
        for _ in 0..64 {
            assert!([60, 64, 67].contains(&choice.next_value()));
        }
    }

    #[test]
    fn test_weighted_respects_zero_weight() {
        // only the nonzero-weight item can ever come up
        let mut weighted = Weighted::new(vec![(60u8, 4), (99u8, 0)]).unwrap();
        for _ in 0..64 {
            assert_eq!(weighted.next_value(), 60);
        }
    }

    #[test]
    fn test_weighted_rejects_all_zero() {
        assert_eq!(
            Weighted::new(vec![(60u8, 0), (61u8, 0)]).err(),
            Some(PatternError::Empty)
        );
    }

    #[test]
    fn test_random_walk_moves_one_step() {
        let items = vec![0i32, 1, 2, 3, 4];
        let mut walk = RandomWalk::new(items).unwrap();
        let mut previous = walk.next_value();
        for _ in 0..128 {
            let value = walk.next_value();
            assert_eq!((value - previous).abs(), 1);
            previous = value;
        }
    }

    #[test]
    fn test_phrases_yield_whole_phrases() {
        // single phrase: the output must repeat it verbatim
        let mut phrases = Phrases::new(vec![vec![1, 2, 3]]).unwrap();
        let row: Vec<i32> = (0..6).map(|_| phrases.next_value()).collect();
        assert_eq!(row, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_phrases_length_check() {
        assert_eq!(
            Phrases::with_length(4, vec![vec![1, 2, 3, 4], vec![5, 6]]).err(),
            Some(PatternError::WrongLength { expected: 4, actual: 2 })
        );
    }

    #[test]
    fn test_sequence_layout() {
        let row = sequence(&[(60u8, 0), (62, 3), (64, 4)], 8).unwrap();
        assert_eq!(
            row,
            vec![Some(60), None, None, Some(62), Some(64), None, None, None]
        );
    }

    #[test]
    fn test_sequence_rejects_overflow_and_disorder() {
        assert!(sequence(&[(60u8, 9)], 8).is_err());
        assert!(sequence(&[(60u8, 3), (62, 3)], 8).is_err());
        assert!(sequence(&[(60u8, 4), (62, 2)], 8).is_err());
    }

    #[test]
    fn test_explode_stretches_with_rests() {
        let row = vec![Some(60u8), Some(62)];
        assert_eq!(
            explode(&row, 2),
            vec![Some(60), None, Some(62), None]
        );
    }
}
