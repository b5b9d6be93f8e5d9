use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kubernetes-style status condition shared by NodeClaim and NodePool.
///
/// `type_` stays a plain string: status patches rewrite the whole list, so
/// condition types owned by other controllers must round-trip untouched.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// RFC 3339 timestamp of the last status change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// What a reader observes for a named condition. `Absent` means the owning
/// controller has not written it yet, which is not the same as `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionValue {
    True,
    False,
    Unknown,
    Absent,
}

impl ConditionValue {
    pub fn of(condition: Option<&Condition>) -> Self {
        match condition.map(|c| c.status) {
            Some(ConditionStatus::True) => ConditionValue::True,
            Some(ConditionStatus::False) => ConditionValue::False,
            Some(ConditionStatus::Unknown) => ConditionValue::Unknown,
            None => ConditionValue::Absent,
        }
    }
}

impl Condition {
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    /// Parsed `lastTransitionTime`. A missing or malformed timestamp reads as
    /// the Unix epoch, so any timer measured from it has already elapsed.
    pub fn last_transition(&self) -> DateTime<Utc> {
        self.last_transition_time
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Read access to a resource's status conditions.
pub trait StatusConditions {
    fn conditions(&self) -> &[Condition];

    fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions().iter().find(|c| c.type_ == type_)
    }

    fn condition_value(&self, type_: &str) -> ConditionValue {
        ConditionValue::of(self.condition(type_))
    }
}

/// Upsert a condition by type. `lastTransitionTime` only moves when the
/// status actually changes.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) {
    let stamp = now.to_rfc3339();
    match conditions.iter_mut().find(|c| c.type_ == type_) {
        Some(existing) => {
            if existing.status != status {
                existing.last_transition_time = Some(stamp);
            }
            existing.status = status;
            existing.reason = Some(reason.to_string());
            existing.message = Some(message.to_string());
        }
        None => conditions.push(Condition {
            type_: type_.to_string(),
            status,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            last_transition_time: Some(stamp),
            observed_generation: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cond(type_: &str, status: ConditionStatus, ts: Option<&str>) -> Condition {
        Condition {
            type_: type_.into(),
            status,
            reason: None,
            message: None,
            last_transition_time: ts.map(str::to_string),
            observed_generation: None,
        }
    }

    #[test]
    fn value_distinguishes_absent_from_unknown() {
        let unknown = cond("Launched", ConditionStatus::Unknown, None);
        assert_eq!(ConditionValue::of(None), ConditionValue::Absent);
        assert_eq!(ConditionValue::of(Some(&unknown)), ConditionValue::Unknown);
    }

    #[test]
    fn last_transition_parses_rfc3339() {
        let c = cond(
            "Registered",
            ConditionStatus::False,
            Some("2024-05-01T10:00:00Z"),
        );
        assert_eq!(
            c.last_transition(),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn malformed_timestamp_reads_as_epoch() {
        let c = cond("Registered", ConditionStatus::False, Some("yesterday"));
        assert_eq!(c.last_transition(), DateTime::UNIX_EPOCH);
        let c = cond("Registered", ConditionStatus::False, None);
        assert_eq!(c.last_transition(), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn set_condition_keeps_transition_time_when_status_unchanged() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        let mut conds = vec![cond(
            "NodeRegistrationHealthy",
            ConditionStatus::False,
            Some(&t0.to_rfc3339()),
        )];
        set_condition(
            &mut conds,
            "NodeRegistrationHealthy",
            ConditionStatus::False,
            "RegistrationFailed",
            "Failed to register node",
            t1,
        );
        assert_eq!(conds.len(), 1);
        assert_eq!(conds[0].last_transition(), t0);
        assert_eq!(conds[0].reason.as_deref(), Some("RegistrationFailed"));
    }

    #[test]
    fn set_condition_preserves_foreign_types() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut conds = vec![
            cond("ValidationSucceeded", ConditionStatus::True, None),
            cond("NodeRegistrationHealthy", ConditionStatus::Unknown, None),
        ];
        set_condition(
            &mut conds,
            "NodeRegistrationHealthy",
            ConditionStatus::False,
            "RegistrationFailed",
            "Failed to register node",
            t0,
        );
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[0].type_, "ValidationSucceeded");
        assert_eq!(conds[1].status, ConditionStatus::False);
        assert_eq!(conds[1].last_transition(), t0);
    }

    #[test]
    fn condition_roundtrips_camel_case() {
        let json = serde_json::json!({
            "type": "Launched",
            "status": "True",
            "lastTransitionTime": "2024-05-01T10:00:00Z"
        });
        let c: Condition = serde_json::from_value(json).unwrap();
        assert!(c.is_true());
        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["lastTransitionTime"], "2024-05-01T10:00:00Z");
        assert!(back.get("reason").is_none());
    }
}
