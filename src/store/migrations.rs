use rusqlite::{Connection, Transaction};

use crate::error::{Result, ServiceError};

const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Brings the schema up to date. Safe to call on an already-migrated file.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(ServiceError::Schema(format!(
            "database version ({version}) is newer than supported schema ({CURRENT_SCHEMA_VERSION})"
        )));
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    while version < CURRENT_SCHEMA_VERSION {
        version += 1;
        apply_migration(&tx, version)?;
        log::info!("Applied prediction store migration v{version}");
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => tx.execute_batch(include_str!("schemas/schema_v1.sql"))?,
        _ => {
            return Err(ServiceError::Schema(format!(
                "no migration defined for version {version}"
            )))
        }
    }
    Ok(())
}
