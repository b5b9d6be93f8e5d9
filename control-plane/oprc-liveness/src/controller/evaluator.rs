use std::time::Duration;

use chrono::{DateTime, Utc};

use super::timeout::{TimeoutPolicies, TimeoutPolicy};
use crate::crd::{
    conditions::StatusConditions,
    node_claim::{CONDITION_LAUNCHED, CONDITION_REGISTERED, NodeClaim},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision<'a> {
    /// Registered; nothing left to watch.
    Done,
    /// A condition has not been written yet; look again shortly.
    RequeueNow,
    /// Still inside the window of the current stage.
    RequeueAfter(Duration),
    /// The stage's window elapsed; the claim must be reclaimed.
    Expired(&'a TimeoutPolicy),
}

/// Decide what to do with a claim from its conditions alone.
///
/// `now` is sampled once by the caller so every comparison in a pass sees the
/// same instant. Timers run from the `lastTransitionTime` of the condition
/// guarding the stage, never from the claim's creation.
pub fn evaluate<'a>(
    claim: &NodeClaim,
    now: DateTime<Utc>,
    policies: &'a TimeoutPolicies,
) -> Decision<'a> {
    let registered = claim.condition(CONDITION_REGISTERED);
    if registered.is_some_and(|c| c.is_true()) {
        return Decision::Done;
    }

    let Some(launched) = claim.condition(CONDITION_LAUNCHED) else {
        return Decision::RequeueNow;
    };
    if !launched.is_true() {
        // Launch failures normally surface as reconcile errors from the
        // launch controller; this window only catches a claim left pending.
        return match policies.launch.remaining(launched.last_transition(), now) {
            Some(left) => Decision::RequeueAfter(left),
            None => Decision::Expired(&policies.launch),
        };
    }

    // The registration timer starts when Registered is first written, not
    // when Launched went True.
    let Some(registered) = registered else {
        return Decision::RequeueNow;
    };
    match policies
        .registration
        .remaining(registered.last_transition(), now)
    {
        Some(left) => Decision::RequeueAfter(left),
        None => Decision::Expired(&policies.registration),
    }
}
