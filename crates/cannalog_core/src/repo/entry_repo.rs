//! Entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `entries` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Entry::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Owner listings are ordered by `timestamp_ms DESC, uuid ASC`.

use crate::db::DbError;
use crate::model::entry::{Entry, EntryId, EntryValidationError, Stage};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ENTRY_SELECT_SQL: &str = "SELECT
    uuid,
    owner_id,
    title,
    description,
    stage,
    timestamp_ms,
    images_json
FROM entries";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entry persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    NotFound(EntryId),
    /// Write attempted on a draft that carries no id.
    MissingId,
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::MissingId => write!(f, "entry has no id"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::MissingId | Self::InvalidData(_) => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for entry CRUD operations.
pub trait EntryRepository {
    /// Inserts an entry whose `id` is already set.
    fn insert_entry(&self, entry: &Entry) -> RepoResult<EntryId>;
    /// Replaces mutable fields of an existing entry. `owner_id` is never updated.
    fn update_entry(&self, entry: &Entry) -> RepoResult<()>;
    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>>;
    fn list_entries_by_owner(&self, owner_id: &str) -> RepoResult<Vec<Entry>>;
    /// Hard-deletes by id. Returns whether a row was removed.
    fn delete_entry(&self, id: EntryId) -> RepoResult<bool>;
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn insert_entry(&self, entry: &Entry) -> RepoResult<EntryId> {
        entry.validate()?;
        let id = entry.id.ok_or(RepoError::MissingId)?;

        self.conn.execute(
            "INSERT INTO entries (
                uuid,
                owner_id,
                title,
                description,
                stage,
                timestamp_ms,
                images_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id.to_string(),
                entry.owner_id.as_str(),
                entry.title.as_str(),
                entry.description.as_str(),
                entry.stage.as_str(),
                entry.timestamp_ms,
                images_to_db(&entry.images)?,
            ],
        )?;

        Ok(id)
    }

    fn update_entry(&self, entry: &Entry) -> RepoResult<()> {
        entry.validate()?;
        let id = entry.id.ok_or(RepoError::MissingId)?;

        let changed = self.conn.execute(
            "UPDATE entries
             SET
                title = ?1,
                description = ?2,
                stage = ?3,
                timestamp_ms = ?4,
                images_json = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?6;",
            params![
                entry.title.as_str(),
                entry.description.as_str(),
                entry.stage.as_str(),
                entry.timestamp_ms,
                images_to_db(&entry.images)?,
                id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }

        Ok(None)
    }

    fn list_entries_by_owner(&self, owner_id: &str) -> RepoResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY timestamp_ms DESC, uuid ASC;"
        ))?;

        let mut rows = stmt.query(params![owner_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }

        Ok(entries)
    }

    fn delete_entry(&self, id: EntryId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE uuid = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }
}

/// Returns the owner of a persisted entry, if the entry exists.
pub fn entry_owner(conn: &Connection, id: EntryId) -> RepoResult<Option<String>> {
    let owner = conn
        .query_row(
            "SELECT owner_id FROM entries WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(owner)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<Entry> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in entries.uuid"))
    })?;

    let stage_text: String = row.get("stage")?;
    let stage = Stage::parse(&stage_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid stage `{stage_text}` in entries.stage"))
    })?;

    let images_text: String = row.get("images_json")?;
    let images = serde_json::from_str::<Vec<String>>(&images_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid entries.images_json for {id}: {err}"))
    })?;

    let entry = Entry {
        id: Some(id),
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        stage,
        timestamp_ms: row.get("timestamp_ms")?,
        images,
    };
    entry.validate()?;
    Ok(entry)
}

fn images_to_db(images: &[String]) -> RepoResult<String> {
    serde_json::to_string(images)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode images: {err}")))
}
