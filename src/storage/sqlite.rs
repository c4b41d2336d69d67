//! SQLite storage implementation

use std::path::Path;
use std::sync::Mutex;
use rusqlite::{Connection, ffi, params_from_iter};
use crate::{Result, Error};
use crate::predicate::{Filter, Predicate, check_arity};
use crate::schema::{Schema, SchemaRegistry};

/// One stored row, values in schema field order
pub type Record = Vec<String>;

/// Connection state of a [`RecordStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Disconnected,
    Connected,
}

/// Schema-parameterized record store over a single SQLite connection.
///
/// Every operation takes the connection lock for its whole duration, so
/// statements never interleave. Construction never fails: if the database
/// cannot be opened the store stays [`StoreState::Disconnected`] and every
/// call returns [`Error::Disconnected`].
pub struct RecordStore {
    registry: SchemaRegistry,
    conn: Mutex<Option<Connection>>,
}

impl RecordStore {
    /// Open (or create) the database file and materialize missing tables
    pub fn init(registry: SchemaRegistry, path: &Path) -> Self {
        let label = path.display().to_string();
        Self::connect(registry, Connection::open(path), &label)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(registry: SchemaRegistry) -> Self {
        Self::connect(registry, Connection::open_in_memory(), ":memory:")
    }

    fn connect(
        registry: SchemaRegistry,
        opened: rusqlite::Result<Connection>,
        label: &str,
    ) -> Self {
        let conn = match opened
            .map_err(Error::from)
            .and_then(|conn| initialize_tables(&conn, &registry).map(|_| conn))
        {
            Ok(conn) => {
                tracing::info!("Connected to {} ({} schemas)", label, registry.len());
                Some(conn)
            }
            Err(e) => {
                tracing::error!("Failed to open record store at {}: {}", label, e);
                None
            }
        };

        Self {
            registry,
            conn: Mutex::new(conn),
        }
    }

    pub fn state(&self) -> StoreState {
        match self.conn.lock() {
            Ok(guard) if guard.is_some() => StoreState::Connected,
            _ => StoreState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == StoreState::Connected
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Look up a registered schema by name
    pub fn schema(&self, name: &str) -> Result<&Schema> {
        self.registry
            .get(name)
            .ok_or_else(|| Error::UnknownSchema(name.to_string()))
    }

    // ========== Record Operations ==========

    /// Insert one record; values are bound positionally in field order.
    ///
    /// A second record with an existing key value fails with
    /// [`Error::DuplicateKey`] and leaves the stored row untouched.
    pub fn insert<S: AsRef<str>>(&self, schema: &Schema, values: &[S]) -> Result<()> {
        let result = self.check_registered(schema).and_then(|_| {
            check_arity(schema, values.len())?;
            self.with_connection(|conn| {
                conn.execute(
                    schema.insert_statement(),
                    params_from_iter(values.iter().map(|v| v.as_ref())),
                )
                .map_err(|e| insert_error(schema, e))?;
                tracing::debug!("Inserted record into {}", schema.name());
                Ok(())
            })
        });
        log_failure("insert", schema.name(), result)
    }

    /// Return every row matching all concrete slots of `predicate`.
    ///
    /// Rows come back in whatever order SQLite yields them.
    pub fn search(&self, schema: &Schema, predicate: &Predicate) -> Result<Vec<Record>> {
        let result = self.check_registered(schema).and_then(|_| {
            let filter = Filter::build(schema, predicate)?;
            let sql = format!(
                "SELECT {} FROM {} WHERE {}",
                schema.column_list(),
                schema.table(),
                filter.clause
            );
            self.with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(params_from_iter(filter.params.iter()), |row| {
                        row_to_record(row, schema.field_count())
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                tracing::debug!("Search on {} matched {} rows", schema.name(), records.len());
                Ok(records)
            })
        });
        log_failure("search", schema.name(), result)
    }

    /// Delete every row matching all concrete slots of `predicate`.
    ///
    /// Returns the number of rows removed.
    pub fn delete(&self, schema: &Schema, predicate: &Predicate) -> Result<usize> {
        let result = self.check_registered(schema).and_then(|_| {
            let filter = Filter::build(schema, predicate)?;
            let sql = format!("DELETE FROM {} WHERE {}", schema.table(), filter.clause);
            self.with_connection(|conn| {
                let removed = conn.execute(&sql, params_from_iter(filter.params.iter()))?;
                tracing::debug!("Deleted {} rows from {}", removed, schema.name());
                Ok(removed)
            })
        });
        log_failure("delete", schema.name(), result)
    }

    /// Unfiltered contents of a table (introspection)
    pub fn fetch_all(&self, schema_name: &str) -> Result<Vec<Record>> {
        let result = self.schema(schema_name).and_then(|schema| {
            let sql = format!("SELECT {} FROM {}", schema.column_list(), schema.table());
            self.with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map([], |row| row_to_record(row, schema.field_count()))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
        });
        log_failure("fetch_all", schema_name, result)
    }

    /// Count rows of a table
    pub fn count(&self, schema_name: &str) -> Result<usize> {
        let schema = self.schema(schema_name)?;
        let sql = format!("SELECT COUNT(*) FROM {}", schema.table());
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Whether the backing table for `schema_name` exists
    pub fn has_table(&self, schema_name: &str) -> Result<bool> {
        self.with_connection(|conn| table_exists(conn, schema_name))
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let tables = self
            .registry
            .names()
            .map(|name| -> Result<(String, usize)> { Ok((name.to_string(), self.count(name)?)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(StoreStats { tables })
    }

    fn check_registered(&self, schema: &Schema) -> Result<()> {
        if self.registry.contains(schema) {
            Ok(())
        } else {
            Err(Error::UnknownSchema(schema.name().to_string()))
        }
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| Error::Disconnected("connection mutex poisoned".to_string()))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| Error::Disconnected("no open connection".to_string()))?;
        f(conn)
    }
}

/// Create the backing table of every schema that does not have one yet
fn initialize_tables(conn: &Connection, registry: &SchemaRegistry) -> Result<()> {
    for schema in registry.iter() {
        if table_exists(conn, schema.name())? {
            continue;
        }
        conn.execute(schema.create_statement(), [])?;
        tracing::debug!("Created table {}", schema.name());
    }
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Helper to convert a row to a Record
fn row_to_record(row: &rusqlite::Row, width: usize) -> rusqlite::Result<Record> {
    (0..width).map(|i| row.get(i)).collect()
}

fn insert_error(schema: &Schema, error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Error::DuplicateKey {
                schema: schema.name().to_string(),
                field: schema
                    .key_field()
                    .map(|f| f.name.clone())
                    .unwrap_or_default(),
            }
        }
        other => Error::Storage(other),
    }
}

fn log_failure<T>(op: &str, schema: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_rejection() {
            tracing::warn!("Rejected {} on {}: {}", op, schema, e);
        } else {
            tracing::error!("{} on {} failed: {}", op, schema, e);
        }
    }
    result
}

/// Row counts per table
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub tables: Vec<(String, usize)>,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (name, rows) in &self.tables {
            writeln!(f, "  {}: {}", name, rows)?;
        }
        write!(f, "  Total: {}", self.total())
    }
}
