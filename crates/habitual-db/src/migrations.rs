use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // Uniqueness rules live here as indexes so that duplicate writes
        // fail inside the insert itself.
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE habits (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX idx_habits_user ON habits(user_id);
            CREATE TABLE groups (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                invite_code TEXT NOT NULL UNIQUE,
                created_by  TEXT NOT NULL REFERENCES profiles(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE user_groups (
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                group_id    TEXT NOT NULL REFERENCES groups(id),
                joined_at   TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, group_id)
            );
            CREATE INDEX idx_user_groups_group ON user_groups(group_id);
            CREATE TABLE check_ins (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                habit_id    TEXT REFERENCES habits(id),
                group_id    TEXT REFERENCES groups(id),
                date        TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'done'
                            CHECK (status IN ('completed', 'missed', 'skipped', 'done')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (habit_id IS NOT NULL OR group_id IS NOT NULL)
            );
            CREATE UNIQUE INDEX ux_check_ins_habit
                ON check_ins(user_id, date, habit_id) WHERE habit_id IS NOT NULL;
            CREATE UNIQUE INDEX ux_check_ins_group
                ON check_ins(user_id, date, group_id) WHERE habit_id IS NULL;
            CREATE INDEX idx_check_ins_date_status ON check_ins(date, status);
            CREATE TABLE penalties (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                group_id    TEXT REFERENCES groups(id),
                date        TEXT NOT NULL,
                type        TEXT NOT NULL,
                completed   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE UNIQUE INDEX ux_penalties_key
                ON penalties(user_id, COALESCE(group_id, ''), date, type);
            CREATE TABLE penalty_suggestions (
                id              TEXT PRIMARY KEY,
                group_id        TEXT NOT NULL REFERENCES groups(id),
                suggested_by    TEXT NOT NULL REFERENCES profiles(id),
                text            TEXT NOT NULL,
                votes           INTEGER NOT NULL DEFAULT 0,
                target_user_id  TEXT REFERENCES profiles(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX idx_penalty_suggestions_group ON penalty_suggestions(group_id, votes);
            CREATE TABLE penalty_votes (
                user_id         TEXT NOT NULL REFERENCES profiles(id),
                suggestion_id   TEXT NOT NULL REFERENCES penalty_suggestions(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, suggestion_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
