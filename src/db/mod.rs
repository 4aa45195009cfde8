//! SQLite storage for persistent resource properties.

use crate::resource::{PersistentProperties, QualifiedName};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

mod error;

pub use error::{DbError, DbErrorCode, DbResult};

fn map_db_io(
    fallback: DbErrorCode,
    context: impl FnOnce() -> String,
) -> impl FnOnce(std::io::Error) -> DbError {
    move |error| DbError::from_io_error(fallback, context(), error)
}

fn map_db_sqlite(
    fallback: DbErrorCode,
    context: impl FnOnce() -> String,
) -> impl FnOnce(rusqlite::Error) -> DbError {
    move |error| DbError::from_sqlite_error(fallback, context(), error)
}

fn ensure_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS persistent_properties (
            path TEXT NOT NULL,
            qualifier TEXT NOT NULL,
            local_name TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (path, qualifier, local_name)
        );",
    )
    .map_err(map_db_sqlite(DbErrorCode::SchemaInitFailed, || {
        "Failed to init schema".to_string()
    }))?;
    Ok(())
}

pub struct PropertyDb {
    conn: Mutex<Connection>,
}

impl PropertyDb {
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(map_db_io(
                DbErrorCode::DataDirUnavailable,
                || format!("Failed to create data dir {}", parent.display()),
            ))?;
        }
        let conn = Connection::open(path).map_err(map_db_sqlite(DbErrorCode::OpenFailed, || {
            format!("Failed to open db {}", path.display())
        }))?;
        ensure_schema(&conn)?;
        debug!(path = %path.display(), "property db opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory().map_err(map_db_sqlite(
            DbErrorCode::OpenFailed,
            || "Failed to open in-memory db".to_string(),
        ))?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DbError::new(DbErrorCode::LockFailed, "Failed to lock db connection"))
    }

    pub fn properties(&self, path: &str) -> DbResult<PersistentProperties> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT qualifier, local_name, value FROM persistent_properties
                 WHERE path = ?1",
            )
            .map_err(map_db_sqlite(DbErrorCode::ReadFailed, || {
                "Failed to prepare property query".to_string()
            }))?;
        let rows = stmt
            .query_map(params![path], |row: &Row| {
                Ok((
                    QualifiedName::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(map_db_sqlite(DbErrorCode::ReadFailed, || {
                format!("Failed to read properties of {path}")
            }))?;
        let mut props = PersistentProperties::new();
        for row in rows {
            let (key, value) = row.map_err(map_db_sqlite(DbErrorCode::ReadFailed, || {
                format!("Failed to read property row of {path}")
            }))?;
            props.insert(key, value);
        }
        Ok(props)
    }

    pub fn set_property(&self, path: &str, key: &QualifiedName, value: &str) -> DbResult<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO persistent_properties (path, qualifier, local_name, value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![path, key.qualifier, key.local_name, value],
            )
            .map_err(map_db_sqlite(DbErrorCode::WriteFailed, || {
                format!("Failed to store property {key} of {path}")
            }))?;
        Ok(())
    }

    pub fn remove_properties(&self, path: &str) -> DbResult<usize> {
        self.conn()?
            .execute(
                "DELETE FROM persistent_properties WHERE path = ?1",
                params![path],
            )
            .map_err(map_db_sqlite(DbErrorCode::WriteFailed, || {
                format!("Failed to delete properties of {path}")
            }))
    }
}
