//! Row types and column decoders.
//!
//! Ids and dates are stored as TEXT; the decoders below turn a bad value into
//! a `FromSqlConversionFailure` so it surfaces as a store error, not a panic.

use std::error::Error as StdError;

use chrono::NaiveDate;
use habitual_types::models::{CheckInStatus, PenaltyKind, Profile};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

/// A profile as stored, including the password hash.
pub struct ProfileRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl ProfileRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_col(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
        })
    }

    pub fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            name: self.name,
            email: self.email,
        }
    }
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn StdError + Send + Sync + 'static>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion(idx, e))
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<Uuid>().map_err(|e| conversion(idx, e)))
        .transpose()
}

pub(crate) fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion(idx, e))
}

pub(crate) fn status_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<CheckInStatus> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion(idx, e))
}

pub(crate) fn kind_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<PenaltyKind> {
    let raw: String = row.get(idx)?;
    raw.parse::<PenaltyKind>().map_err(|e| conversion(idx, e))
}
