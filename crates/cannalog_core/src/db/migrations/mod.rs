//! Grow-log schema history.
//!
//! Each step is a plain SQL script. The version reached is stored in
//! `PRAGMA user_version`; an upgrade either applies every pending step or
//! none of them.

use super::{DbError, DbResult, DbTarget};
use log::{debug, info};
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: [SchemaStep; 2] = [
    SchemaStep {
        version: 1,
        name: "entries",
        sql: include_str!("0001_entries.sql"),
    },
    SchemaStep {
        version: 2,
        name: "session_state",
        sql: include_str!("0002_session_state.sql"),
    },
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    STEPS[STEPS.len() - 1].version
}

/// Schema version recorded in the open database.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Brings the grow log at `target` up to [`latest_version`].
///
/// Returns the version found before upgrading.
pub(crate) fn upgrade(conn: &mut Connection, target: &DbTarget) -> DbResult<u32> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew {
            target: target.clone(),
            found,
            supported,
        });
    }

    let pending: Vec<&SchemaStep> = STEPS.iter().filter(|step| step.version > found).collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=skip version={found}");
        return Ok(found);
    }

    let tx = conn.transaction()?;
    for step in pending {
        let applied = tx
            .execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version));
        applied.map_err(|source| DbError::Migration {
            version: step.version,
            name: step.name,
            source,
        })?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok mode={} from_version={found} to_version={supported}",
        target.mode()
    );
    Ok(found)
}
