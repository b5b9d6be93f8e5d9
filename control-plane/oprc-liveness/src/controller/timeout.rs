use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::LivenessConfig;

/// Heuristic window within which a claim is expected to launch.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Heuristic window within which a launched node is expected to register.
pub const DEFAULT_REGISTRATION_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutReason {
    Launch,
    Registration,
}

impl TimeoutReason {
    /// Label value used on the disruption counter and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutReason::Launch => "launch_timeout",
            TimeoutReason::Registration => "registration_timeout",
        }
    }
}

impl fmt::Display for TimeoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub duration: Duration,
    pub reason: TimeoutReason,
}

impl TimeoutPolicy {
    pub const fn new(duration: Duration, reason: TimeoutReason) -> Self {
        Self { duration, reason }
    }

    /// Time left before `since + duration`, or `None` once that instant is
    /// reached. `now` is read once by the caller and reused for every check.
    pub fn remaining(
        &self,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let limit = TimeDelta::from_std(self.duration).unwrap_or(TimeDelta::MAX);
        let elapsed = now.signed_duration_since(since);
        limit
            .checked_sub(&elapsed)
            .and_then(|left| left.to_std().ok())
            .filter(|left| !left.is_zero())
    }
}

/// Both stage policies, built once at startup and shared read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutPolicies {
    pub launch: TimeoutPolicy,
    pub registration: TimeoutPolicy,
}

impl TimeoutPolicies {
    pub const fn new(launch: Duration, registration: Duration) -> Self {
        Self {
            launch: TimeoutPolicy::new(launch, TimeoutReason::Launch),
            registration: TimeoutPolicy::new(
                registration,
                TimeoutReason::Registration,
            ),
        }
    }

    pub fn from_config(cfg: &LivenessConfig) -> Self {
        Self::new(cfg.launch_timeout(), cfg.registration_timeout())
    }
}

impl Default for TimeoutPolicies {
    fn default() -> Self {
        Self::new(DEFAULT_LAUNCH_TIMEOUT, DEFAULT_REGISTRATION_TIMEOUT)
    }
}
