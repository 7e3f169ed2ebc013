use habitual_types::models::Profile;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::Database;
use crate::error::{StoreError, StoreResult, classify};
use crate::models::{ProfileRow, uuid_col};

const SELECT_PROFILE: &str = "SELECT id, name, email, password FROM profiles";

impl Database {
    /// Insert a profile. Emails are stored trimmed and lowercased so the
    /// unique index compares them case-insensitively.
    pub fn create_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Profile> {
        let name = required(name, "name is required")?;
        let email = normalize_email(email)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, name, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), name, &email, password_hash),
            )
            .map_err(|e| classify(e, "email already registered", "profile not found"))?;

            Ok(Profile {
                id,
                name: name.to_string(),
                email,
            })
        })
    }

    pub fn get_profile_row_by_email(&self, email: &str) -> StoreResult<Option<ProfileRow>> {
        let email = email.trim().to_lowercase();
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{SELECT_PROFILE} WHERE email = ?1"),
                    [&email],
                    ProfileRow::from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_profile(&self, id: Uuid) -> StoreResult<Profile> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    /// Name is the only mutable profile field.
    pub fn update_profile_name(&self, id: Uuid, name: &str) -> StoreResult<Profile> {
        let name = required(name, "name is required")?;

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET name = ?1 WHERE id = ?2",
                (name, id.to_string()),
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("profile not found".into()));
            }
            query_profile(conn, id)
        })
    }

    pub fn list_profile_ids(&self) -> StoreResult<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM profiles ORDER BY rowid")?;
            let ids = stmt
                .query_map([], |row| uuid_col(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}

fn query_profile(conn: &Connection, id: Uuid) -> StoreResult<Profile> {
    conn.query_row(
        &format!("{SELECT_PROFILE} WHERE id = ?1"),
        [id.to_string()],
        ProfileRow::from_row,
    )
    .optional()?
    .map(ProfileRow::into_profile)
    .ok_or_else(|| StoreError::NotFound("profile not found".into()))
}

/// Trim a required text field, rejecting blanks.
pub(crate) fn required<'a>(value: &'a str, message: &str) -> StoreResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::Validation(message.to_string()));
    }
    Ok(value)
}

fn normalize_email(email: &str) -> StoreResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(StoreError::Validation("a valid email is required".into())),
    }
}
