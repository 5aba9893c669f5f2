use super::{
    check_drafted_len, new_record, CurrentCards, SessionCredentials, SessionRecord, SessionStore,
    StoreError, UpdateOutcome,
};
use draftwatch_core::cards::CardId;
use draftwatch_core::hero::Hero;
use draftwatch_core::DRAFT_SIZE;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT NOT NULL PRIMARY KEY,
    auth_token TEXT NOT NULL,
    current_cards TEXT NOT NULL,
    drafted TEXT NOT NULL,
    num_drafted INTEGER NOT NULL DEFAULT 0,
    hero TEXT NOT NULL
)";

/// SQLite-backed store. Each guarded update is one conditional `UPDATE`
/// statement, so the guard and the write cannot interleave with another
/// writer even across processes sharing the file.
#[derive(Debug)]
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!(
                        "failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Turns an affected-row count into an outcome, telling "no such
    /// session" apart from "guard did not match".
    fn outcome(
        conn: &Connection,
        session_id: &str,
        changed: usize,
    ) -> Result<UpdateOutcome, StoreError> {
        if changed > 0 {
            return Ok(UpdateOutcome::Applied);
        }
        if Self::row_exists(conn, session_id)? {
            Ok(UpdateOutcome::Ignored)
        } else {
            Err(StoreError::NotFound(session_id.to_string()))
        }
    }

    fn row_exists(conn: &Connection, session_id: &str) -> Result<bool, StoreError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Backend(e.to_string()))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(info, _)
            if info.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl SessionStore for SqliteSessionStore {
    fn create(&self, session_id: &str) -> Result<SessionCredentials, StoreError> {
        let record = new_record(session_id);
        let conn = self.lock()?;

        let inserted = conn.execute(
            "INSERT INTO sessions (session_id, auth_token, current_cards, drafted, num_drafted, hero)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                record.session_id,
                record.auth_token,
                to_json(&record.current_cards)?,
                to_json(&record.drafted)?,
                record.hero.as_str(),
            ],
        );

        match inserted {
            Ok(_) => Ok(SessionCredentials {
                session_id: record.session_id,
                auth_token: record.auth_token,
            }),
            Err(err) if is_constraint_violation(&err) => {
                Err(StoreError::Conflict(session_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        Self::row_exists(&conn, session_id)
    }

    fn get(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT auth_token, current_cards, drafted, num_drafted, hero
                 FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let (auth_token, current_cards, drafted, num_drafted, hero) =
            row.ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;

        Ok(SessionRecord {
            session_id: session_id.to_string(),
            auth_token,
            current_cards: from_json(&current_cards)?,
            drafted: from_json(&drafted)?,
            num_drafted: usize::try_from(num_drafted)
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            hero: hero
                .parse::<Hero>()
                .map_err(|e| StoreError::Backend(e.to_string()))?,
        })
    }

    fn update_current_cards(
        &self,
        session_id: &str,
        auth_token: &str,
        cards: CurrentCards,
    ) -> Result<UpdateOutcome, StoreError> {
        let cards = to_json(&cards)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE sessions SET current_cards = ?1
             WHERE session_id = ?2 AND auth_token = ?3 AND num_drafted < ?4",
            params![cards, session_id, auth_token, DRAFT_SIZE as i64],
        )?;
        Self::outcome(&conn, session_id, changed)
    }

    fn update_drafted(
        &self,
        session_id: &str,
        auth_token: &str,
        drafted: Vec<CardId>,
    ) -> Result<UpdateOutcome, StoreError> {
        check_drafted_len(&drafted)?;
        let count = drafted.len() as i64;
        let drafted = to_json(&drafted)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE sessions SET drafted = ?1, num_drafted = ?2
             WHERE session_id = ?3 AND auth_token = ?4 AND num_drafted < ?5",
            params![drafted, count, session_id, auth_token, DRAFT_SIZE as i64],
        )?;
        Self::outcome(&conn, session_id, changed)
    }

    fn update_hero(
        &self,
        session_id: &str,
        auth_token: &str,
        hero: Hero,
    ) -> Result<UpdateOutcome, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE sessions SET hero = ?1 WHERE session_id = ?2 AND auth_token = ?3",
            params![hero.as_str(), session_id, auth_token],
        )?;
        Self::outcome(&conn, session_id, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[test]
    fn satisfies_store_contract() {
        contract::run_all(|| SqliteSessionStore::open_in_memory().expect("open"));
    }

    #[test]
    fn state_survives_reopening_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("sessions.db");

        let token = {
            let store = SqliteSessionStore::open(&path).expect("open");
            let creds = store.create("persist").expect("create");
            store
                .update_drafted("persist", &creds.auth_token, contract::ids(4))
                .expect("drafted");
            store
                .update_hero("persist", &creds.auth_token, Hero::Shaman)
                .expect("hero");
            creds.auth_token
        };

        let store = SqliteSessionStore::open(&path).expect("reopen");
        let record = store.get("persist").expect("get");
        assert_eq!(record.auth_token, token);
        assert_eq!(record.num_drafted, 4);
        assert_eq!(record.drafted, contract::ids(4));
        assert_eq!(record.hero, Hero::Shaman);
    }
}
