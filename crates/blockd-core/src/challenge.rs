//! Challenge creation and verification
//!
//! Each problem has its own attempt budget; only a wrong answer spends it.
//! A challenge is consumed at most once: solving it or using up any
//! problem's last attempt removes it from the table, and any later submission against the
//! same id is rejected as not found. Lockouts after exhaustion belong to the
//! caller.

use blockd_api::{ChallengeKind, ChallengeView, Difficulty};
use blockd_util::{deadline_after, BlockdError, ChallengeId, Clock, Domain, Result};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{Problem, ProblemSupplier};

/// What a challenge unlocks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChallengeSubject {
    Unblock(Domain),
    FocusDeactivation,
}

impl ChallengeSubject {
    pub fn kind(&self) -> ChallengeKind {
        match self {
            ChallengeSubject::Unblock(_) => ChallengeKind::Unblock,
            ChallengeSubject::FocusDeactivation => ChallengeKind::FocusDeactivation,
        }
    }

    pub fn domain(&self) -> Option<&Domain> {
        match self {
            ChallengeSubject::Unblock(d) => Some(d),
            ChallengeSubject::FocusDeactivation => None,
        }
    }
}

/// Problem count and difficulty for one kind of challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeSpec {
    pub problems: usize,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone)]
struct PendingChallenge {
    subject: ChallengeSubject,
    problems: Vec<Problem>,
    created_at: DateTime<Local>,
    expires_at: DateTime<Local>,
    /// Attempts left, one counter per problem
    attempts: Vec<u32>,
}

impl PendingChallenge {
    /// The tightest budget across problems
    fn attempts_remaining(&self) -> u32 {
        self.attempts.iter().copied().min().unwrap_or(0)
    }

    fn view(&self, id: ChallengeId) -> ChallengeView {
        ChallengeView {
            challenge_id: id,
            kind: self.subject.kind(),
            subject: self.subject.domain().cloned(),
            problems: self.problems.iter().map(Problem::view).collect(),
            attempts_remaining: self.attempts_remaining(),
            expires_at: self.expires_at,
        }
    }
}

/// Result of checking answers against a pending challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every answer matched; the challenge is consumed
    Solved(ChallengeSubject),
    /// Wrong answers with attempts left on every problem
    Incorrect {
        subject: ChallengeSubject,
        attempts_remaining: u32,
    },
    /// A problem was answered wrong on its final attempt; the challenge is
    /// consumed
    Exhausted(ChallengeSubject),
}

/// Issues challenges and checks submitted answers
pub struct ChallengeGate {
    clock: Arc<dyn Clock>,
    supplier: Box<dyn ProblemSupplier>,
    max_attempts: u32,
    ttl: Duration,
    pending: HashMap<ChallengeId, PendingChallenge>,
}

impl ChallengeGate {
    pub fn new(
        clock: Arc<dyn Clock>,
        supplier: Box<dyn ProblemSupplier>,
        max_attempts: u32,
        ttl: Duration,
    ) -> Self {
        Self {
            clock,
            supplier,
            max_attempts: max_attempts.max(1),
            ttl,
            pending: HashMap::new(),
        }
    }

    /// Create a challenge for `subject`
    pub fn create(&mut self, subject: ChallengeSubject, spec: ChallengeSpec) -> ChallengeView {
        self.prune_expired();

        let now = self.clock.now();
        let id = ChallengeId::new();
        let problems = self.supplier.generate(spec.problems, spec.difficulty);
        let challenge = PendingChallenge {
            subject,
            attempts: vec![self.max_attempts; problems.len()],
            problems,
            created_at: now,
            expires_at: deadline_after(now, self.ttl),
        };

        debug!(
            challenge_id = %id,
            kind = ?challenge.subject.kind(),
            problems = challenge.problems.len(),
            "Challenge created"
        );

        let view = challenge.view(id);
        self.pending.insert(id, challenge);
        view
    }

    /// Check `answers` against challenge `id` of the given kind
    ///
    /// Answers are compared as exact integers and each wrong one spends an
    /// attempt of its own problem. An answer list that cannot be parsed is a
    /// validation error and does not use up an attempt. A
    /// challenge of another kind is treated as unknown.
    pub fn submit(
        &mut self,
        id: ChallengeId,
        kind: ChallengeKind,
        answers: &[String],
    ) -> Result<Verdict> {
        self.prune_expired();

        let challenge = match self.pending.get_mut(&id) {
            Some(c) if c.subject.kind() == kind => c,
            _ => return Err(BlockdError::ChallengeNotFound(id)),
        };

        if answers.len() != challenge.problems.len() {
            return Err(BlockdError::validation(format!(
                "Expected {} answers, got {}",
                challenge.problems.len(),
                answers.len()
            )));
        }

        let parsed = answers
            .iter()
            .map(|a| parse_answer(a))
            .collect::<Result<Vec<i64>>>()?;

        let mut correct = true;
        for ((problem, answer), left) in challenge
            .problems
            .iter()
            .zip(&parsed)
            .zip(challenge.attempts.iter_mut())
        {
            if problem.answer != *answer {
                correct = false;
                *left = left.saturating_sub(1);
            }
        }

        if correct {
            let solved = self.pending.remove(&id).map(|c| c.subject);
            return solved
                .map(Verdict::Solved)
                .ok_or(BlockdError::ChallengeNotFound(id));
        }

        let attempts_remaining = challenge.attempts_remaining();
        if attempts_remaining > 0 {
            return Ok(Verdict::Incorrect {
                subject: challenge.subject.clone(),
                attempts_remaining,
            });
        }

        let exhausted = self.pending.remove(&id).map(|c| c.subject);
        exhausted
            .map(Verdict::Exhausted)
            .ok_or(BlockdError::ChallengeNotFound(id))
    }

    /// Drop challenges older than their time-to-live
    pub fn prune_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.pending.len();
        self.pending.retain(|id, c| {
            let keep = c.expires_at > now;
            if !keep {
                debug!(
                    challenge_id = %id,
                    age_secs = (now - c.created_at).num_seconds(),
                    "Challenge expired"
                );
            }
            keep
        });
        before - self.pending.len()
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: ChallengeId) -> bool {
        self.pending.contains_key(&id)
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn parse_answer(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| BlockdError::validation(format!("Answer is not a whole number: {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequentialProblemSupplier;
    use blockd_util::ManualClock;
    use chrono::TimeZone;

    const UNBLOCK: ChallengeSpec = ChallengeSpec {
        problems: 2,
        difficulty: Difficulty::Medium,
    };

    fn setup() -> (ManualClock, ChallengeGate) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let gate = ChallengeGate::new(
            Arc::new(clock.clone()),
            Box::new(SequentialProblemSupplier),
            3,
            Duration::from_secs(600),
        );
        (clock, gate)
    }

    fn subject() -> ChallengeSubject {
        ChallengeSubject::Unblock(Domain::parse("reddit.com").unwrap())
    }

    fn answers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn solved_challenge_is_consumed_once() {
        let (_, mut gate) = setup();
        let view = gate.create(subject(), UNBLOCK);
        assert_eq!(view.problems.len(), 2);
        assert_eq!(view.attempts_remaining, 3);

        let verdict = gate
            .submit(view.challenge_id, ChallengeKind::Unblock, &answers(&["1", " 2 "]))
            .unwrap();
        assert_eq!(verdict, Verdict::Solved(subject()));

        let again = gate.submit(view.challenge_id, ChallengeKind::Unblock, &answers(&["1", "2"]));
        assert!(matches!(again, Err(BlockdError::ChallengeNotFound(_))));
    }

    #[test]
    fn three_wrong_answers_to_one_problem_exhaust_the_challenge() {
        let (_, mut gate) = setup();
        let id = gate.create(subject(), UNBLOCK).challenge_id;
        let wrong = answers(&["1", "3"]);

        assert_eq!(
            gate.submit(id, ChallengeKind::Unblock, &wrong).unwrap(),
            Verdict::Incorrect {
                subject: subject(),
                attempts_remaining: 2
            }
        );
        assert!(matches!(
            gate.submit(id, ChallengeKind::Unblock, &wrong).unwrap(),
            Verdict::Incorrect {
                attempts_remaining: 1,
                ..
            }
        ));
        assert_eq!(
            gate.submit(id, ChallengeKind::Unblock, &wrong).unwrap(),
            Verdict::Exhausted(subject())
        );

        // Even the right answers are too late now
        let fourth = gate.submit(id, ChallengeKind::Unblock, &answers(&["1", "2"]));
        assert!(matches!(fourth, Err(BlockdError::ChallengeNotFound(_))));
        assert_eq!(gate.pending_count(), 0);
    }

    #[test]
    fn attempts_are_counted_per_problem() {
        let (_, mut gate) = setup();
        let id = gate.create(subject(), UNBLOCK).challenge_id;
        let first_wrong = answers(&["0", "2"]);
        let second_wrong = answers(&["1", "0"]);

        // Two wrong answers to each problem leave one attempt on both
        for wrong in [&first_wrong, &second_wrong, &first_wrong, &second_wrong] {
            assert!(matches!(
                gate.submit(id, ChallengeKind::Unblock, wrong).unwrap(),
                Verdict::Incorrect { .. }
            ));
        }
        assert_eq!(
            gate.submit(id, ChallengeKind::Unblock, &answers(&["5", "5"])).unwrap(),
            Verdict::Exhausted(subject())
        );

        // A fresh challenge survives more than three wrong submissions
        let id = gate.create(subject(), UNBLOCK).challenge_id;
        for wrong in [&first_wrong, &second_wrong, &first_wrong, &second_wrong] {
            gate.submit(id, ChallengeKind::Unblock, wrong).unwrap();
        }
        assert_eq!(
            gate.submit(id, ChallengeKind::Unblock, &answers(&["1", "2"])).unwrap(),
            Verdict::Solved(subject())
        );
    }

    #[test]
    fn malformed_answers_keep_attempts() {
        let (_, mut gate) = setup();
        let id = gate.create(subject(), UNBLOCK).challenge_id;

        let bad = gate.submit(id, ChallengeKind::Unblock, &answers(&["one", "2"]));
        assert!(matches!(bad, Err(BlockdError::ValidationError(_))));

        let short = gate.submit(id, ChallengeKind::Unblock, &answers(&["1"]));
        assert!(matches!(short, Err(BlockdError::ValidationError(_))));

        assert_eq!(
            gate.submit(id, ChallengeKind::Unblock, &answers(&["0", "0"])).unwrap(),
            Verdict::Incorrect {
                subject: subject(),
                attempts_remaining: 2
            }
        );
    }

    #[test]
    fn kind_mismatch_is_not_found() {
        let (_, mut gate) = setup();
        let id = gate.create(subject(), UNBLOCK).challenge_id;

        let result = gate.submit(id, ChallengeKind::FocusDeactivation, &answers(&["1", "2"]));
        assert!(matches!(result, Err(BlockdError::ChallengeNotFound(_))));
        assert!(gate.is_pending(id));
    }

    #[test]
    fn challenges_expire_after_ttl() {
        let (clock, mut gate) = setup();
        let id = gate.create(ChallengeSubject::FocusDeactivation, UNBLOCK).challenge_id;

        clock.advance(Duration::from_secs(601));
        let result = gate.submit(id, ChallengeKind::FocusDeactivation, &answers(&["1", "2"]));
        assert!(matches!(result, Err(BlockdError::ChallengeNotFound(_))));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (_, mut gate) = setup();
        let result = gate.submit(ChallengeId::new(), ChallengeKind::Unblock, &[]);
        assert!(matches!(result, Err(BlockdError::ChallengeNotFound(_))));
    }
}
