//! Math problem generation
//!
//! Every generated problem has an exact integer answer.

use blockd_api::{Difficulty, ProblemKind, ProblemView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A problem with its answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub kind: ProblemKind,
    pub question: String,
    pub answer: i64,
}

impl Problem {
    pub fn view(&self) -> ProblemView {
        ProblemView {
            kind: self.kind,
            question: self.question.clone(),
        }
    }
}

/// Source of challenge problems
pub trait ProblemSupplier: Send + Sync {
    fn generate(&mut self, count: usize, difficulty: Difficulty) -> Vec<Problem>;
}

/// Random problems across all kinds
pub struct RandomProblemSupplier {
    rng: StdRng,
}

impl RandomProblemSupplier {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for reproducible tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `lo..hi`
    fn int(&mut self, lo: i64, hi: i64) -> i64 {
        self.rng.gen_range(lo..hi)
    }

    fn one(&mut self, difficulty: Difficulty) -> Problem {
        if difficulty == Difficulty::Easy {
            return self.simple_sum();
        }

        let kind = match self.int(0, 5) {
            0 => ProblemKind::Arithmetic,
            1 => ProblemKind::Algebra,
            2 => ProblemKind::Geometry,
            3 => ProblemKind::Sequence,
            _ => ProblemKind::Logic,
        };
        let hard = difficulty == Difficulty::Hard;

        match kind {
            ProblemKind::Arithmetic => self.arithmetic(hard),
            ProblemKind::Algebra => self.algebra(hard),
            ProblemKind::Geometry => self.geometry(hard),
            ProblemKind::Sequence => self.sequence(hard),
            ProblemKind::Logic => self.logic(hard),
        }
    }

    fn simple_sum(&mut self) -> Problem {
        let a = self.int(10, 60);
        let b = self.int(5, 35);
        let (question, answer) = if self.rng.gen_bool(0.5) {
            (format!("{} + {} = ?", a, b), a + b)
        } else {
            (format!("{} - {} = ?", a, b), a - b)
        };
        Problem {
            kind: ProblemKind::Arithmetic,
            question,
            answer,
        }
    }

    fn arithmetic(&mut self, hard: bool) -> Problem {
        if hard {
            let a = self.int(15, 40);
            let b = self.int(8, 26);
            let c = self.int(5, 17);
            Problem {
                kind: ProblemKind::Arithmetic,
                question: format!("Calculate: {} × {} + {}", a, b, c),
                answer: a * b + c,
            }
        } else {
            let a = self.int(8, 20);
            let b = self.int(4, 12);
            Problem {
                kind: ProblemKind::Arithmetic,
                question: format!("Calculate: {} × {}", a, b),
                answer: a * b,
            }
        }
    }

    fn algebra(&mut self, hard: bool) -> Problem {
        let (a, b, x) = if hard {
            (
                self.int(2, 10),
                self.int(5, 20),
                self.int(3, 15),
            )
        } else {
            (
                self.int(2, 7),
                self.int(3, 13),
                self.int(2, 10),
            )
        };
        Problem {
            kind: ProblemKind::Algebra,
            question: format!("If {}x + {} = {}, what is x?", a, b, a * x + b),
            answer: x,
        }
    }

    fn geometry(&mut self, hard: bool) -> Problem {
        let pick = self.rng.gen_bool(0.5);
        let (question, answer) = match (hard, pick) {
            (true, true) => {
                // Even base keeps the area whole
                let base = 2 * self.int(2, 9);
                let height = self.int(3, 13);
                (
                    format!(
                        "What is the area of a triangle with base {} and height {}?",
                        base, height
                    ),
                    base * height / 2,
                )
            }
            (true, false) => {
                let a = self.int(3, 12);
                let b = self.int(3, 12);
                let c = self.int(3, 12);
                (
                    format!("What is the volume of a box measuring {} × {} × {}?", a, b, c),
                    a * b * c,
                )
            }
            (false, true) => {
                let length = self.int(3, 11);
                let width = self.int(2, 8);
                (
                    format!(
                        "What is the area of a rectangle with length {} and width {}?",
                        length, width
                    ),
                    length * width,
                )
            }
            (false, false) => {
                let side = self.int(3, 11);
                (
                    format!("What is the perimeter of a square with side length {}?", side),
                    side * 4,
                )
            }
        };
        Problem {
            kind: ProblemKind::Geometry,
            question,
            answer,
        }
    }

    fn sequence(&mut self, hard: bool) -> Problem {
        let (terms, next) = if hard {
            let mut seq = vec![self.int(1, 4), self.int(2, 5)];
            while seq.len() < 5 {
                let n = seq.len();
                seq.push(seq[n - 1] + seq[n - 2]);
            }
            let next = seq[4] + seq[3];
            (seq, next)
        } else {
            let start = self.int(2, 7);
            let diff = self.int(2, 6);
            let seq: Vec<i64> = (0..4).map(|i| start + diff * i).collect();
            (seq, start + diff * 4)
        };
        Problem {
            kind: ProblemKind::Sequence,
            question: format!("Complete the sequence: {}, ___", join(&terms)),
            answer: next,
        }
    }

    fn logic(&mut self, hard: bool) -> Problem {
        if hard {
            let start = self.int(2, 7);
            let factor = self.int(2, 5);
            let seq: Vec<i64> = (0..4).map(|i| start * factor.pow(i)).collect();
            Problem {
                kind: ProblemKind::Logic,
                question: format!("Complete the sequence: {}, ___", join(&seq)),
                answer: start * factor.pow(4),
            }
        } else {
            let apples = self.int(5, 13);
            let eaten = self.int(2, 5);
            Problem {
                kind: ProblemKind::Logic,
                question: format!("You have {} apples and eat {}. How many are left?", apples, eaten),
                answer: apples - eaten,
            }
        }
    }
}

impl Default for RandomProblemSupplier {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemSupplier for RandomProblemSupplier {
    fn generate(&mut self, count: usize, difficulty: Difficulty) -> Vec<Problem> {
        (0..count).map(|_| self.one(difficulty)).collect()
    }
}

/// Predictable problems whose answers count up from 1
///
/// Problem `n` of a challenge asks for `n`, so a test knows the right
/// answers without inspecting the gate.
#[derive(Debug, Default)]
pub struct SequentialProblemSupplier;

impl ProblemSupplier for SequentialProblemSupplier {
    fn generate(&mut self, count: usize, _difficulty: Difficulty) -> Vec<Problem> {
        (1..=count as i64)
            .map(|n| Problem {
                kind: ProblemKind::Arithmetic,
                question: format!("{} + 0 = ?", n),
                answer: n,
            })
            .collect()
    }
}

fn join(terms: &[i64]) -> String {
    terms
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_count() {
        let mut supplier = RandomProblemSupplier::with_seed(7);
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(supplier.generate(3, difficulty).len(), 3);
        }
        assert!(supplier.generate(0, Difficulty::Medium).is_empty());
    }

    #[test]
    fn easy_problems_are_sums_in_range() {
        let mut supplier = RandomProblemSupplier::with_seed(1);
        for p in supplier.generate(50, Difficulty::Easy) {
            assert_eq!(p.kind, ProblemKind::Arithmetic);
            assert!(p.answer >= 10 - 34 && p.answer <= 59 + 34, "{:?}", p);
        }
    }

    #[test]
    fn algebra_answers_check_out() {
        let mut supplier = RandomProblemSupplier::with_seed(3);
        for _ in 0..50 {
            let p = supplier.algebra(false);
            // "If ax + b = r, what is x?"
            let nums: Vec<i64> = p
                .question
                .split(|c: char| !c.is_ascii_digit())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().unwrap())
                .collect();
            let (a, b, r) = (nums[0], nums[1], nums[2]);
            assert_eq!(a * p.answer + b, r);
        }
    }

    #[test]
    fn medium_mixes_kinds() {
        let mut supplier = RandomProblemSupplier::with_seed(11);
        let kinds: std::collections::HashSet<_> = supplier
            .generate(200, Difficulty::Medium)
            .into_iter()
            .map(|p| p.kind)
            .collect();
        assert_eq!(kinds.len(), 5);
    }

    #[test]
    fn sequential_supplier_is_predictable() {
        let problems = SequentialProblemSupplier.generate(3, Difficulty::Hard);
        let answers: Vec<i64> = problems.iter().map(|p| p.answer).collect();
        assert_eq!(answers, vec![1, 2, 3]);
        assert_eq!(problems[0].view().question, "1 + 0 = ?");
    }
}
