use chrono::NaiveDate;
use habitual_types::models::{CheckIn, CheckInStatus, CheckInTarget};
use rusqlite::{OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::Database;
use crate::error::{StoreError, StoreResult, classify};
use crate::groups::{query_group_exists, query_is_member};
use crate::models::{date_col, opt_uuid_col, status_col, uuid_col};

pub(crate) const SELECT_CHECK_IN: &str =
    "SELECT c.id, c.user_id, c.habit_id, c.group_id, c.date, c.status FROM check_ins c";

pub(crate) fn check_in_from_row(row: &Row<'_>) -> rusqlite::Result<CheckIn> {
    Ok(CheckIn {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        habit_id: opt_uuid_col(row, 2)?,
        group_id: opt_uuid_col(row, 3)?,
        date: date_col(row, 4)?,
        status: status_col(row, 5)?,
    })
}

impl Database {
    /// Record one daily check-in.
    ///
    /// Duplicates are rejected by the partial unique indexes on
    /// `(user_id, date, habit_id)` and, for group-only check-ins,
    /// `(user_id, date, group_id)`, so two racing requests cannot both land.
    /// A check-in may only name a group the user belongs to.
    pub fn record_check_in(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        target: CheckInTarget,
        status: CheckInStatus,
    ) -> StoreResult<CheckIn> {
        let id = Uuid::new_v4();
        let habit_id = target.habit_id();
        let group_id = target.group_id();

        self.with_conn(|conn| {
            if let Some(habit_id) = habit_id {
                let owner: String = conn
                    .query_row(
                        "SELECT user_id FROM habits WHERE id = ?1",
                        [habit_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(|| StoreError::NotFound("habit not found".into()))?;
                if owner != user_id.to_string() {
                    return Err(StoreError::Forbidden("habit belongs to another user".into()));
                }
            }

            if let Some(group_id) = group_id {
                if !query_group_exists(conn, group_id)? {
                    return Err(StoreError::NotFound("group not found".into()));
                }
                if !query_is_member(conn, user_id, group_id)? {
                    return Err(StoreError::Forbidden("not a member of this group".into()));
                }
            }

            conn.execute(
                "INSERT INTO check_ins (id, user_id, habit_id, group_id, date, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    id.to_string(),
                    user_id.to_string(),
                    habit_id.map(|h| h.to_string()),
                    group_id.map(|g| g.to_string()),
                    date.to_string(),
                    status.as_str(),
                ),
            )
            .map_err(|e| {
                classify(
                    e,
                    "Check-in already exists for this user on this date.",
                    "user or group not found",
                )
            })?;

            debug!("Check-in {} recorded for {} on {} ({})", id, user_id, date, status);
            Ok(CheckIn {
                id,
                user_id,
                habit_id,
                group_id,
                date,
                status,
            })
        })
    }

    pub fn list_check_ins(&self, user_id: Uuid) -> StoreResult<Vec<CheckIn>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_CHECK_IN} WHERE c.user_id = ?1 ORDER BY c.date DESC, c.rowid"
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], check_in_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_group_check_ins(&self, group_id: Uuid) -> StoreResult<Vec<CheckIn>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_CHECK_IN} WHERE c.group_id = ?1 ORDER BY c.date DESC, c.rowid"
            ))?;
            let rows = stmt
                .query_map([group_id.to_string()], check_in_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
