//! Tabular source over a SQLite query.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::types::ValueRef;

use super::{RecordSink, RecordSource, SourceContext, SourceRecord, DEFAULT_CONNECTION};
use crate::error::Error;
use crate::value::Value;

/// Reads the rows of a query, each row keyed by column name.
///
/// The query is either custom SQL or `SELECT * FROM "<table>"` synthesized
/// from a table name. Custom SQL wins when both are given.
#[derive(Debug, Clone)]
pub struct SqlSource {
    connection: String,
    sql: Option<String>,
    table: Option<String>,
}

impl SqlSource {
    /// Read every row of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            connection: DEFAULT_CONNECTION.to_string(),
            sql: None,
            table: Some(table.into()),
        }
    }

    /// Read the rows returned by `sql`.
    pub fn query(sql: impl Into<String>) -> Self {
        Self {
            connection: DEFAULT_CONNECTION.to_string(),
            sql: Some(sql.into()),
            table: None,
        }
    }

    /// A source with neither query nor table, to be completed with builders.
    pub fn unconfigured() -> Self {
        Self {
            connection: DEFAULT_CONNECTION.to_string(),
            sql: None,
            table: None,
        }
    }

    /// Use a named connection instead of the default one.
    pub fn on(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Set the custom SQL.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Set the source table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// The connection name this source reads from.
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// The SQL that will be executed.
    pub fn sql(&self) -> Result<String, Error> {
        match (&self.sql, &self.table) {
            (Some(sql), _) => Ok(sql.clone()),
            (None, Some(table)) => Ok(format!("SELECT * FROM {}", quote_identifier(table))),
            (None, None) => Err(Error::definition("no sql or source table specified")),
        }
    }
}

impl RecordSource for SqlSource {
    fn fields(&self, ctx: &SourceContext<'_>) -> Result<Option<BTreeSet<String>>, Error> {
        let conn = ctx.connections.get(&self.connection)?;
        let stmt = conn.prepare(&self.sql()?)?;
        let columns: BTreeSet<String> = stmt.column_names().into_iter().map(String::from).collect();
        Ok(Some(columns))
    }

    fn scan(&self, ctx: &SourceContext<'_>, sink: &mut RecordSink<'_>) -> Result<(), Error> {
        let conn = ctx.connections.get(&self.connection)?;
        let mut stmt = conn.prepare(&self.sql()?)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut fields = BTreeMap::new();
            for (i, name) in columns.iter().enumerate() {
                fields.insert(name.clone(), from_sql(row.get_ref(i)?));
            }
            sink(SourceRecord::new(fields))?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match (&self.sql, &self.table) {
            (Some(sql), _) => format!("query on {}: {}", self.connection, sql),
            (None, Some(table)) => format!("table {} on {}", table, self.connection),
            (None, None) => format!("unconfigured query on {}", self.connection),
        }
    }
}

/// Quote a SQL identifier, doubling embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}
