//! Failed-login counting and temporary account lockout.
//!
//! State lives on the user row (`login_attempts`, `locked_until`); this
//! module only decides what the next values are.

use time::{Duration, OffsetDateTime};

use crate::config::LockoutConfig;

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_attempts: i32,
    pub lockout: Duration,
}

impl Default for LockoutPolicy {
    /// 5 consecutive failures, 15 minute lock.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout: Duration::minutes(15),
        }
    }
}

impl From<&LockoutConfig> for LockoutPolicy {
    fn from(cfg: &LockoutConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            lockout: Duration::minutes(cfg.lockout_minutes.max(1)),
        }
    }
}

/// Counter values to persist after a wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub login_attempts: i32,
    pub locked_until: Option<OffsetDateTime>,
}

impl LockoutPolicy {
    /// Whether `locked_until` is still in the future.
    pub fn is_locked(&self, locked_until: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
        matches!(locked_until, Some(until) if now < until)
    }

    /// Next counter state after a failed password check.
    ///
    /// The count only resets on a successful login, so a failure after an
    /// expired lock locks the account again.
    pub fn register_failure(&self, login_attempts: i32, now: OffsetDateTime) -> FailedAttempt {
        let attempts = login_attempts.max(0).saturating_add(1);
        let locked_until = (attempts >= self.max_attempts).then(|| now + self.lockout);
        FailedAttempt {
            login_attempts: attempts,
            locked_until,
        }
    }
}
