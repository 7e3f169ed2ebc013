use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user. The password hash never leaves the DB layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub created_by: Uuid,
}

/// A group member as shown on the group page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    Completed,
    Missed,
    Skipped,
    #[default]
    Done,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Missed => "missed",
            Self::Skipped => "skipped",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CheckInStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check-in status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for CheckInStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "missed" => Ok(Self::Missed),
            "skipped" => Ok(Self::Skipped),
            "done" => Ok(Self::Done),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// What a check-in is recorded against.
///
/// A habit check-in may carry the group it was made in as context; the habit
/// is then the uniqueness discriminant. A group-only check-in is keyed by the
/// group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInTarget {
    Habit { habit_id: Uuid, group_id: Option<Uuid> },
    Group { group_id: Uuid },
}

impl CheckInTarget {
    /// Build a target from the two optional wire fields. Returns `None` when
    /// both are absent.
    pub fn from_parts(habit_id: Option<Uuid>, group_id: Option<Uuid>) -> Option<Self> {
        match (habit_id, group_id) {
            (Some(habit_id), group_id) => Some(Self::Habit { habit_id, group_id }),
            (None, Some(group_id)) => Some(Self::Group { group_id }),
            (None, None) => None,
        }
    }

    pub fn habit_id(&self) -> Option<Uuid> {
        match self {
            Self::Habit { habit_id, .. } => Some(*habit_id),
            Self::Group { .. } => None,
        }
    }

    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            Self::Habit { group_id, .. } => *group_id,
            Self::Group { group_id } => Some(*group_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub habit_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub date: NaiveDate,
    pub status: CheckInStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    MissedCheckIn,
}

impl PenaltyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissedCheckIn => "missed_check_in",
        }
    }
}

impl FromStr for PenaltyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missed_check_in" => Ok(Self::MissedCheckIn),
            other => Err(format!("unknown penalty type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Option<Uuid>,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: PenaltyKind,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltySuggestion {
    pub id: Uuid,
    pub group_id: Uuid,
    pub suggested_by: Uuid,
    pub text: String,
    pub votes: i64,
    pub target_user_id: Option<Uuid>,
    /// Display name of the target, resolved on group reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_name: Option<String>,
}

/// Outcome of one missed-check-in penalty derivation pass for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationReport {
    pub target_date: NaiveDate,
    pub missed: usize,
    pub created: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_to_done() {
        assert_eq!(CheckInStatus::default(), CheckInStatus::Done);
    }

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!("missed".parse::<CheckInStatus>(), Ok(CheckInStatus::Missed));
        assert!("MISSED".parse::<CheckInStatus>().is_err());
        assert!("late".parse::<CheckInStatus>().is_err());
    }

    #[test]
    fn target_prefers_habit_when_both_set() {
        let habit = Uuid::new_v4();
        let group = Uuid::new_v4();

        let target = CheckInTarget::from_parts(Some(habit), Some(group)).unwrap();
        assert_eq!(target.habit_id(), Some(habit));
        assert_eq!(target.group_id(), Some(group));

        let target = CheckInTarget::from_parts(None, Some(group)).unwrap();
        assert_eq!(target, CheckInTarget::Group { group_id: group });

        assert!(CheckInTarget::from_parts(None, None).is_none());
    }

    #[test]
    fn penalty_serializes_kind_as_type() {
        let penalty = Penalty {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            group_id: None,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            kind: PenaltyKind::MissedCheckIn,
            completed: false,
        };
        let json = serde_json::to_value(&penalty).unwrap();
        assert_eq!(json["type"], "missed_check_in");
        assert_eq!(json["date"], "2025-06-01");
        assert_eq!(json["group_id"], serde_json::Value::Null);
    }
}
