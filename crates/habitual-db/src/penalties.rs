use chrono::NaiveDate;
use habitual_types::models::{
    CheckIn, DerivationReport, Penalty, PenaltyKind, PenaltySuggestion,
};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Database;
use crate::checkins::{SELECT_CHECK_IN, check_in_from_row};
use crate::error::{StoreError, StoreResult, classify};
use crate::groups::{query_group_exists, query_is_member};
use crate::models::{date_col, kind_col, opt_uuid_col, uuid_col};
use crate::profiles::required;

const SELECT_PENALTY: &str =
    "SELECT id, user_id, group_id, date, type, completed FROM penalties";

fn penalty_from_row(row: &Row<'_>) -> rusqlite::Result<Penalty> {
    Ok(Penalty {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        group_id: opt_uuid_col(row, 2)?,
        date: date_col(row, 3)?,
        kind: kind_col(row, 4)?,
        completed: row.get(5)?,
    })
}

fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<PenaltySuggestion> {
    Ok(PenaltySuggestion {
        id: uuid_col(row, 0)?,
        group_id: uuid_col(row, 1)?,
        suggested_by: uuid_col(row, 2)?,
        text: row.get(3)?,
        votes: row.get(4)?,
        target_user_id: opt_uuid_col(row, 5)?,
        target_user_name: row.get(6)?,
    })
}

impl Database {
    // -- Derivation --

    /// Missed check-ins on `date` against habits owned by `user_id`.
    pub fn missed_check_ins_on(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<CheckIn>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_CHECK_IN}
                 JOIN habits h ON h.id = c.habit_id
                 WHERE h.user_id = ?1 AND c.date = ?2 AND c.status = 'missed'
                 ORDER BY c.rowid"
            ))?;
            let rows = stmt
                .query_map((user_id.to_string(), date.to_string()), check_in_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Insert the penalty for `(user, group, date, kind)` unless it already
    /// exists. Returns whether a row was written. A null group counts as a
    /// single key through the `COALESCE` in the unique index.
    pub fn ensure_penalty(
        &self,
        user_id: Uuid,
        group_id: Option<Uuid>,
        date: NaiveDate,
        kind: PenaltyKind,
    ) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let inserted = conn
                .execute(
                    "INSERT INTO penalties (id, user_id, group_id, date, type, completed)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0)
                     ON CONFLICT DO NOTHING",
                    (
                        Uuid::new_v4().to_string(),
                        user_id.to_string(),
                        group_id.map(|g| g.to_string()),
                        date.to_string(),
                        kind.as_str(),
                    ),
                )
                .map_err(|e| classify(e, "penalty already exists", "user or group not found"))?;
            Ok(inserted == 1)
        })
    }

    /// Turn yesterday's missed check-ins (relative to `as_of`) into penalties.
    ///
    /// Each penalty insert is its own statement, so a failure part way
    /// through leaves earlier penalties in place and the next run fills in
    /// the rest. Re-running over unchanged data writes nothing.
    pub fn derive_missed_penalties(
        &self,
        user_id: Uuid,
        as_of: NaiveDate,
    ) -> StoreResult<DerivationReport> {
        let target_date = as_of
            .pred_opt()
            .ok_or_else(|| StoreError::Validation("date out of range".into()))?;

        let missed = self.missed_check_ins_on(user_id, target_date)?;
        let mut report = DerivationReport {
            target_date,
            missed: missed.len(),
            created: 0,
            failed: 0,
        };

        for check_in in &missed {
            match self.ensure_penalty(
                user_id,
                check_in.group_id,
                check_in.date,
                PenaltyKind::MissedCheckIn,
            ) {
                Ok(true) => report.created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "Failed to record penalty for check-in {} of {}: {}",
                        check_in.id, user_id, e
                    );
                    report.failed += 1;
                }
            }
        }

        if report.created > 0 {
            info!(
                "Derived {} penalties for {} on {}",
                report.created, user_id, target_date
            );
        }
        Ok(report)
    }

    pub fn list_penalties(&self, user_id: Uuid) -> StoreResult<Vec<Penalty>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_PENALTY} WHERE user_id = ?1 ORDER BY date DESC, rowid"
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], penalty_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark one of the caller's penalties as done. Idempotent.
    pub fn complete_penalty(&self, user_id: Uuid, penalty_id: Uuid) -> StoreResult<Penalty> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE penalties SET completed = 1 WHERE id = ?1 AND user_id = ?2",
                (penalty_id.to_string(), user_id.to_string()),
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("penalty not found".into()));
            }

            let penalty = conn.query_row(
                &format!("{SELECT_PENALTY} WHERE id = ?1"),
                [penalty_id.to_string()],
                penalty_from_row,
            )?;
            Ok(penalty)
        })
    }

    // -- Suggestions & votes --

    pub fn suggest_penalty(
        &self,
        group_id: Uuid,
        author: Uuid,
        text: &str,
        target_user_id: Option<Uuid>,
    ) -> StoreResult<PenaltySuggestion> {
        let text = required(text, "suggestion text is required")?;
        let id = Uuid::new_v4();

        self.with_conn(|conn| {
            if !query_group_exists(conn, group_id)? {
                return Err(StoreError::NotFound("group not found".into()));
            }
            if !query_is_member(conn, author, group_id)? {
                return Err(StoreError::Forbidden(
                    "only group members can suggest penalties".into(),
                ));
            }
            if let Some(target) = target_user_id {
                if !query_is_member(conn, target, group_id)? {
                    return Err(StoreError::Validation(
                        "target user is not a member of this group".into(),
                    ));
                }
            }

            conn.execute(
                "INSERT INTO penalty_suggestions (id, group_id, suggested_by, text, votes, target_user_id)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                (
                    id.to_string(),
                    group_id.to_string(),
                    author.to_string(),
                    text,
                    target_user_id.map(|t| t.to_string()),
                ),
            )
            .map_err(|e| classify(e, "suggestion already exists", "target user not found"))?;

            let target_user_name = match target_user_id {
                Some(target) => profile_name(conn, target)?,
                None => None,
            };

            debug!("Penalty suggestion {} added to group {}", id, group_id);
            Ok(PenaltySuggestion {
                id,
                group_id,
                suggested_by: author,
                text: text.to_string(),
                votes: 0,
                target_user_id,
                target_user_name,
            })
        })
    }

    /// Suggestions for a group, most voted first, with target names resolved.
    pub fn list_suggestions(&self, group_id: Uuid) -> StoreResult<Vec<PenaltySuggestion>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.group_id, s.suggested_by, s.text, s.votes, s.target_user_id, p.name
                 FROM penalty_suggestions s
                 LEFT JOIN profiles p ON p.id = s.target_user_id
                 WHERE s.group_id = ?1
                 ORDER BY s.votes DESC, s.rowid",
            )?;
            let rows = stmt
                .query_map([group_id.to_string()], suggestion_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record one vote and bump the counter in the same transaction.
    /// Returns the count after the increment.
    ///
    /// Only members of the suggestion's group may vote. The
    /// `(user_id, suggestion_id)` primary key makes a repeat vote fail,
    /// and the increment is a single `votes = votes + 1` statement.
    pub fn cast_vote(&self, user_id: Uuid, suggestion_id: Uuid) -> StoreResult<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let group_id = tx
                .query_row(
                    "SELECT group_id FROM penalty_suggestions WHERE id = ?1",
                    [suggestion_id.to_string()],
                    |row| uuid_col(row, 0),
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound("suggestion not found".into()))?;
            if !query_is_member(&tx, user_id, group_id)? {
                return Err(StoreError::Forbidden(
                    "only group members can vote on its suggestions".into(),
                ));
            }

            tx.execute(
                "INSERT INTO penalty_votes (user_id, suggestion_id) VALUES (?1, ?2)",
                (user_id.to_string(), suggestion_id.to_string()),
            )
            .map_err(|e| classify(e, "Already voted", "user not found"))?;

            let votes: i64 = tx.query_row(
                "UPDATE penalty_suggestions SET votes = votes + 1 WHERE id = ?1 RETURNING votes",
                [suggestion_id.to_string()],
                |row| row.get(0),
            )?;
            tx.commit()?;

            debug!("Vote by {} on {} (now {})", user_id, suggestion_id, votes);
            Ok(votes)
        })
    }

    /// Group a suggestion belongs to, if the suggestion exists.
    pub fn suggestion_group(&self, suggestion_id: Uuid) -> StoreResult<Option<Uuid>> {
        self.with_conn(|conn| {
            let group_id = conn
                .query_row(
                    "SELECT group_id FROM penalty_suggestions WHERE id = ?1",
                    [suggestion_id.to_string()],
                    |row| uuid_col(row, 0),
                )
                .optional()?;
            Ok(group_id)
        })
    }

    /// Current vote counter. An unknown suggestion reads as zero votes.
    pub fn get_vote_count(&self, suggestion_id: Uuid) -> StoreResult<i64> {
        self.with_conn(|conn| {
            let votes = conn
                .query_row(
                    "SELECT votes FROM penalty_suggestions WHERE id = ?1",
                    [suggestion_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(votes.unwrap_or(0))
        })
    }
}

fn profile_name(conn: &Connection, id: Uuid) -> StoreResult<Option<String>> {
    let name = conn
        .query_row(
            "SELECT name FROM profiles WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use habitual_types::models::{CheckInStatus, CheckInTarget};

    use super::*;
    use crate::test_support::{db, user};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn habit_target(habit_id: Uuid) -> CheckInTarget {
        CheckInTarget::Habit {
            habit_id,
            group_id: None,
        }
    }

    #[test]
    fn missed_check_in_yields_one_penalty_for_previous_day() {
        let db = db();
        let ana = user(&db, "Ana");
        let h1 = db.create_habit(ana, "H1").unwrap();
        db.record_check_in(ana, day("2025-06-01"), habit_target(h1.id), CheckInStatus::Missed)
            .unwrap();

        let report = db.derive_missed_penalties(ana, day("2025-06-02")).unwrap();
        assert_eq!(report.target_date, day("2025-06-01"));
        assert_eq!((report.missed, report.created, report.failed), (1, 1, 0));

        let penalties = db.list_penalties(ana).unwrap();
        assert_eq!(penalties.len(), 1);
        let p = &penalties[0];
        assert_eq!(p.user_id, ana);
        assert_eq!(p.group_id, None);
        assert_eq!(p.date, day("2025-06-01"));
        assert_eq!(p.kind, PenaltyKind::MissedCheckIn);
        assert!(!p.completed);
    }

    #[test]
    fn derivation_is_idempotent() {
        let db = db();
        let ana = user(&db, "Ana");
        let group = db.create_group("Crew", ana).unwrap();
        let h1 = db.create_habit(ana, "H1").unwrap();
        let h2 = db.create_habit(ana, "H2").unwrap();
        let h3 = db.create_habit(ana, "H3").unwrap();

        db.record_check_in(ana, day("2025-06-01"), habit_target(h1.id), CheckInStatus::Missed)
            .unwrap();
        db.record_check_in(
            ana,
            day("2025-06-01"),
            CheckInTarget::Habit {
                habit_id: h2.id,
                group_id: Some(group.id),
            },
            CheckInStatus::Missed,
        )
        .unwrap();
        db.record_check_in(ana, day("2025-06-01"), habit_target(h3.id), CheckInStatus::Completed)
            .unwrap();

        let first = db.derive_missed_penalties(ana, day("2025-06-02")).unwrap();
        assert_eq!((first.missed, first.created), (2, 2));

        let second = db.derive_missed_penalties(ana, day("2025-06-02")).unwrap();
        assert_eq!((second.missed, second.created, second.failed), (2, 0, 0));

        let penalties = db.list_penalties(ana).unwrap();
        assert_eq!(penalties.len(), 2);
        assert!(penalties.iter().any(|p| p.group_id == Some(group.id)));
        assert!(penalties.iter().any(|p| p.group_id.is_none()));
    }

    #[test]
    fn two_ungrouped_misses_share_one_penalty() {
        let db = db();
        let ana = user(&db, "Ana");
        let h1 = db.create_habit(ana, "H1").unwrap();
        let h2 = db.create_habit(ana, "H2").unwrap();
        db.record_check_in(ana, day("2025-06-01"), habit_target(h1.id), CheckInStatus::Missed)
            .unwrap();
        db.record_check_in(ana, day("2025-06-01"), habit_target(h2.id), CheckInStatus::Missed)
            .unwrap();

        let report = db.derive_missed_penalties(ana, day("2025-06-02")).unwrap();
        assert_eq!((report.missed, report.created), (2, 1));
        assert_eq!(db.list_penalties(ana).unwrap().len(), 1);
    }

    #[test]
    fn derivation_only_looks_at_the_previous_day_and_own_habits() {
        let db = db();
        let ana = user(&db, "Ana");
        let ben = user(&db, "Ben");
        let h1 = db.create_habit(ana, "H1").unwrap();
        let bens = db.create_habit(ben, "Read").unwrap();
        db.record_check_in(ana, day("2025-05-30"), habit_target(h1.id), CheckInStatus::Missed)
            .unwrap();
        db.record_check_in(ben, day("2025-06-01"), habit_target(bens.id), CheckInStatus::Missed)
            .unwrap();

        let report = db.derive_missed_penalties(ana, day("2025-06-02")).unwrap();
        assert_eq!(report.missed, 0);
        assert!(db.list_penalties(ana).unwrap().is_empty());
    }

    #[test]
    fn completing_a_penalty_is_owner_only() {
        let db = db();
        let ana = user(&db, "Ana");
        let ben = user(&db, "Ben");
        db.ensure_penalty(ana, None, day("2025-06-01"), PenaltyKind::MissedCheckIn)
            .unwrap();
        let penalty = db.list_penalties(ana).unwrap().remove(0);

        assert!(matches!(
            db.complete_penalty(ben, penalty.id),
            Err(StoreError::NotFound(_))
        ));
        assert!(db.complete_penalty(ana, penalty.id).unwrap().completed);
        assert!(db.complete_penalty(ana, penalty.id).unwrap().completed);
    }

    fn group_with_members(db: &Database) -> (Uuid, Uuid, Uuid, Uuid, Uuid) {
        let a = user(db, "A");
        let b = user(db, "B");
        let c = user(db, "C");
        let d = user(db, "D");
        let g1 = db.create_group("G1", a).unwrap();
        for member in [b, c, d] {
            db.join_group(member, &g1.invite_code).unwrap();
        }
        (g1.id, a, b, c, d)
    }

    #[test]
    fn two_voters_count_two() {
        let db = db();
        let (g1, a, b, c, d) = group_with_members(&db);

        let suggestion = db.suggest_penalty(g1, a, "30 push-ups", Some(b)).unwrap();
        assert_eq!(suggestion.votes, 0);
        assert_eq!(suggestion.target_user_name.as_deref(), Some("B"));

        assert_eq!(db.cast_vote(c, suggestion.id).unwrap(), 1);
        assert_eq!(db.cast_vote(d, suggestion.id).unwrap(), 2);
        assert_eq!(db.get_vote_count(suggestion.id).unwrap(), 2);
    }

    #[test]
    fn repeat_vote_conflicts_and_does_not_count() {
        let db = db();
        let (g1, a, b, c, _) = group_with_members(&db);
        let suggestion = db.suggest_penalty(g1, a, "30 push-ups", Some(b)).unwrap();

        db.cast_vote(c, suggestion.id).unwrap();
        let err = db.cast_vote(c, suggestion.id).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(db.get_vote_count(suggestion.id).unwrap(), 1);
    }

    #[test]
    fn vote_on_unknown_suggestion_is_not_found() {
        let db = db();
        let a = user(&db, "A");
        assert!(matches!(
            db.cast_vote(a, Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(db.get_vote_count(Uuid::new_v4()).unwrap(), 0);
    }

    #[test]
    fn concurrent_voters_are_all_counted() {
        let db = Arc::new(db());
        let owner = user(&db, "Owner");
        let group = db.create_group("Crew", owner).unwrap();
        let suggestion_id = db
            .suggest_penalty(group.id, owner, "Cold shower", None)
            .unwrap()
            .id;

        let voters: Vec<Uuid> = (0..16)
            .map(|i| {
                let voter = user(&db, &format!("V{i}"));
                db.join_group(voter, &group.invite_code).unwrap();
                voter
            })
            .collect();

        // Every voter tries twice; only the first attempt per voter may land.
        let handles: Vec<_> = voters
            .iter()
            .chain(voters.iter())
            .map(|&voter| {
                let db = db.clone();
                std::thread::spawn(move || db.cast_vote(voter, suggestion_id).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, voters.len());
        assert_eq!(db.get_vote_count(suggestion_id).unwrap(), voters.len() as i64);
    }

    #[test]
    fn suggestion_rules() {
        let db = db();
        let (g1, a, _, _, _) = group_with_members(&db);
        let outsider = user(&db, "Outsider");

        assert!(matches!(
            db.suggest_penalty(g1, a, "   ", None),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            db.suggest_penalty(g1, outsider, "Plank", None),
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            db.suggest_penalty(Uuid::new_v4(), a, "Plank", None),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn outsiders_cannot_vote_or_be_targeted() {
        let db = db();
        let (g1, a, b, _, _) = group_with_members(&db);
        let outsider = user(&db, "Out");

        assert!(matches!(
            db.suggest_penalty(g1, a, "Plank", Some(outsider)),
            Err(StoreError::Validation(_))
        ));
        assert!(db.list_suggestions(g1).unwrap().is_empty());

        let suggestion = db.suggest_penalty(g1, a, "Plank", Some(b)).unwrap();
        assert!(matches!(
            db.cast_vote(outsider, suggestion.id),
            Err(StoreError::Forbidden(_))
        ));
        assert_eq!(db.get_vote_count(suggestion.id).unwrap(), 0);
        assert_eq!(db.suggestion_group(suggestion.id).unwrap(), Some(g1));
        assert_eq!(db.suggestion_group(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn suggestions_list_most_voted_first() {
        let db = db();
        let (g1, a, b, c, d) = group_with_members(&db);
        let low = db.suggest_penalty(g1, a, "Low", None).unwrap();
        let high = db.suggest_penalty(g1, a, "High", Some(b)).unwrap();
        db.cast_vote(c, high.id).unwrap();
        db.cast_vote(d, high.id).unwrap();

        let listed = db.list_suggestions(g1).unwrap();
        assert_eq!(listed[0].id, high.id);
        assert_eq!(listed[0].votes, 2);
        assert_eq!(listed[0].target_user_name.as_deref(), Some("B"));
        assert_eq!(listed[1].id, low.id);
        assert_eq!(listed[1].target_user_name, None);
    }
}
