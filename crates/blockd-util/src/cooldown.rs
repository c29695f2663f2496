//! Lockout tracking after exhausted challenges

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use crate::remaining_until;

/// Per-subject lockout windows
///
/// A subject is locked from [`Cooldowns::start`] until `period` has
/// elapsed. Times come from the caller so a virtual clock can drive it.
#[derive(Debug)]
pub struct Cooldowns<K> {
    period: Duration,
    until: HashMap<K, DateTime<Local>>,
}

impl<K: Eq + Hash + Clone> Cooldowns<K> {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            until: HashMap::new(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Lock `subject` for one period starting at `now`
    pub fn start(&mut self, subject: K, now: DateTime<Local>) -> DateTime<Local> {
        let until = now + chrono::Duration::from_std(self.period).unwrap_or(chrono::Duration::zero());
        self.until.insert(subject, until);
        until
    }

    /// Time left on the lockout, or `None` if the subject is free
    pub fn remaining(&self, subject: &K, now: DateTime<Local>) -> Option<Duration> {
        let until = self.until.get(subject)?;
        let left = remaining_until(*until, now);
        (!left.is_zero()).then_some(left)
    }

    /// Returns `Err(remaining)` while the subject is locked
    pub fn check(&self, subject: &K, now: DateTime<Local>) -> Result<(), Duration> {
        match self.remaining(subject, now) {
            Some(left) => Err(left),
            None => Ok(()),
        }
    }

    pub fn clear(&mut self, subject: &K) {
        self.until.remove(subject);
    }

    /// Drop lockouts that have already ended
    pub fn cleanup(&mut self, now: DateTime<Local>) {
        self.until.retain(|_, until| *until > now);
    }

    pub fn len(&self) -> usize {
        self.until.len()
    }

    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}
