//! Wall-clock budget shared by the stages of one analysis

use crate::error::{Result, SkillGapError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// No limit; `check` always succeeds
    pub fn none() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
        }
    }

    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit: Some(limit),
        }
    }

    pub fn from_option(limit: Option<Duration>) -> Self {
        limit.map_or_else(Self::none, Self::after)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Time left, or `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }

    /// Fail with `Timeout` naming `stage` if the budget is spent
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_expired() {
            return Err(self.timeout(stage));
        }
        Ok(())
    }

    pub fn timeout(&self, stage: &str) -> SkillGapError {
        SkillGapError::Timeout {
            stage: stage.to_string(),
            elapsed_ms: self.elapsed_ms(),
        }
    }

    /// The smaller of `cap` and the remaining budget
    pub fn budget(&self, cap: Duration) -> Duration {
        match self.remaining() {
            Some(left) => left.min(cap),
            None => cap,
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
