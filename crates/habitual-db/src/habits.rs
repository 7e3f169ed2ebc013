use habitual_types::models::Habit;
use rusqlite::Row;
use uuid::Uuid;

use crate::Database;
use crate::error::{StoreResult, classify};
use crate::models::uuid_col;
use crate::profiles::required;

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        name: row.get(2)?,
    })
}

impl Database {
    pub fn create_habit(&self, user_id: Uuid, name: &str) -> StoreResult<Habit> {
        let name = required(name, "habit name is required")?;
        let id = Uuid::new_v4();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO habits (id, user_id, name) VALUES (?1, ?2, ?3)",
                (id.to_string(), user_id.to_string(), name),
            )
            .map_err(|e| classify(e, "habit already exists", "user not found"))?;

            Ok(Habit {
                id,
                user_id,
                name: name.to_string(),
            })
        })
    }

    pub fn list_habits(&self, user_id: Uuid) -> StoreResult<Vec<Habit>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name FROM habits WHERE user_id = ?1 ORDER BY rowid",
            )?;
            let habits = stmt
                .query_map([user_id.to_string()], habit_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(habits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use crate::test_support::{db, user};

    #[test]
    fn habits_are_scoped_to_owner() {
        let db = db();
        let ana = user(&db, "Ana");
        let ben = user(&db, "Ben");

        db.create_habit(ana, "Drink water").unwrap();
        db.create_habit(ana, "  Stretch ").unwrap();
        db.create_habit(ben, "Read").unwrap();

        let names: Vec<_> = db
            .list_habits(ana)
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Drink water", "Stretch"]);
    }

    #[test]
    fn unknown_owner_is_not_found() {
        let db = db();
        let err = db.create_habit(Uuid::new_v4(), "Run").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn blank_name_is_rejected() {
        let db = db();
        let ana = user(&db, "Ana");
        assert!(matches!(
            db.create_habit(ana, "   "),
            Err(StoreError::Validation(_))
        ));
    }
}
