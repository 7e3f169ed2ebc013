use habitual_types::models::{Group, Member};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Database;
use crate::error::{StoreError, StoreResult, Violation, classify, violation};
use crate::models::uuid_col;
use crate::profiles::required;

pub const INVITE_CODE_LEN: usize = 6;
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INVITE_CODE_ATTEMPTS: usize = 5;

const SELECT_GROUP: &str = "SELECT id, name, invite_code, created_by FROM groups";

/// Random invite code of `INVITE_CODE_LEN` uppercase alphanumerics.
pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.random_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        invite_code: row.get(2)?,
        created_by: uuid_col(row, 3)?,
    })
}

impl Database {
    /// Create a group and make the owner its first member, atomically.
    /// A clash on the invite code draws a fresh one.
    pub fn create_group(&self, name: &str, owner: Uuid) -> StoreResult<Group> {
        let name = required(name, "group name is required")?;
        let id = Uuid::new_v4();

        self.with_conn_mut(|conn| {
            for _ in 0..INVITE_CODE_ATTEMPTS {
                let invite_code = generate_invite_code();
                let tx = conn.transaction()?;

                let inserted = tx.execute(
                    "INSERT INTO groups (id, name, invite_code, created_by) VALUES (?1, ?2, ?3, ?4)",
                    (id.to_string(), name, &invite_code, owner.to_string()),
                );
                match inserted {
                    Ok(_) => {}
                    Err(e) if violation(&e) == Some(Violation::Unique) => {
                        debug!("Invite code {} already taken, retrying", invite_code);
                        continue;
                    }
                    Err(e) => return Err(classify(e, "group already exists", "user not found")),
                }

                tx.execute(
                    "INSERT INTO user_groups (user_id, group_id) VALUES (?1, ?2)",
                    (owner.to_string(), id.to_string()),
                )
                .map_err(|e| classify(e, "already a member", "user not found"))?;
                tx.commit()?;

                info!("Group {} created by {} with code {}", id, owner, invite_code);
                return Ok(Group {
                    id,
                    name: name.to_string(),
                    invite_code,
                    created_by: owner,
                });
            }

            Err(StoreError::Conflict(
                "could not allocate a unique invite code".into(),
            ))
        })
    }

    /// Join the group behind `invite_code`. The code is matched trimmed and
    /// uppercased. The membership primary key rejects a second join.
    pub fn join_group(&self, user_id: Uuid, invite_code: &str) -> StoreResult<Group> {
        let code = required(invite_code, "invite code is required")?.to_uppercase();

        self.with_conn(|conn| {
            let group = conn
                .query_row(
                    &format!("{SELECT_GROUP} WHERE invite_code = ?1"),
                    [&code],
                    group_from_row,
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound("invalid invite code".into()))?;

            conn.execute(
                "INSERT INTO user_groups (user_id, group_id) VALUES (?1, ?2)",
                (user_id.to_string(), group.id.to_string()),
            )
            .map_err(|e| {
                classify(
                    e,
                    &format!("already a member of \"{}\"", group.name),
                    "user not found",
                )
            })?;

            info!("User {} joined group {}", user_id, group.id);
            Ok(group)
        })
    }

    pub fn get_group(&self, id: Uuid) -> StoreResult<Group> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{SELECT_GROUP} WHERE id = ?1"),
                [id.to_string()],
                group_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound("group not found".into()))
        })
    }

    pub fn list_groups(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.invite_code, g.created_by
                 FROM groups g
                 JOIN user_groups ug ON ug.group_id = g.id
                 WHERE ug.user_id = ?1
                 ORDER BY g.id",
            )?;
            let groups = stmt
                .query_map([user_id.to_string()], group_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(groups)
        })
    }

    pub fn list_members(&self, group_id: Uuid) -> StoreResult<Vec<Member>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name
                 FROM user_groups ug
                 JOIN profiles p ON p.id = ug.user_id
                 WHERE ug.group_id = ?1
                 ORDER BY ug.rowid",
            )?;
            let members = stmt
                .query_map([group_id.to_string()], |row| {
                    Ok(Member {
                        id: uuid_col(row, 0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(members)
        })
    }

    pub fn is_member(&self, user_id: Uuid, group_id: Uuid) -> StoreResult<bool> {
        self.with_conn(|conn| query_is_member(conn, user_id, group_id))
    }
}

pub(crate) fn query_group_exists(conn: &Connection, group_id: Uuid) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM groups WHERE id = ?1",
            [group_id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn query_is_member(conn: &Connection, user_id: Uuid, group_id: Uuid) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM user_groups WHERE user_id = ?1 AND group_id = ?2",
            (user_id.to_string(), group_id.to_string()),
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, user};

    #[test]
    fn invite_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..100 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn creator_becomes_member() {
        let db = db();
        let ana = user(&db, "Ana");

        let group = db.create_group(" Morning crew ", ana).unwrap();
        assert_eq!(group.name, "Morning crew");
        assert!(db.is_member(ana, group.id).unwrap());
        assert_eq!(db.list_groups(ana).unwrap(), vec![group]);
    }

    #[test]
    fn join_creates_exactly_one_membership() {
        let db = db();
        let ana = user(&db, "Ana");
        let ben = user(&db, "Ben");
        let group = db.create_group("Crew", ana).unwrap();

        let joined = db
            .join_group(ben, &format!("  {}  ", group.invite_code.to_lowercase()))
            .unwrap();
        assert_eq!(joined.id, group.id);

        let again = db.join_group(ben, &group.invite_code).unwrap_err();
        assert!(matches!(again, StoreError::Conflict(_)));

        let members: Vec<_> = db
            .list_members(group.id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(members, vec!["Ana", "Ben"]);
    }

    #[test]
    fn unknown_invite_code_is_not_found() {
        let db = db();
        let ana = user(&db, "Ana");

        assert!(matches!(
            db.join_group(ana, "ZZZZZZ"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(db.join_group(ana, " "), Err(StoreError::Validation(_))));
    }

    #[test]
    fn get_group_missing_is_not_found() {
        let db = db();
        assert!(matches!(
            db.get_group(Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
    }
}
