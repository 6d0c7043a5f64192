//! LanceDB connection and housekeeping helpers.

use arrow_array::RecordBatchIterator;
use coldata_core::{Error, Result};
use lancedb::{connect, Connection, Table};
use std::sync::Arc;

pub(crate) fn index_err(e: lancedb::Error) -> Error { Error::VectorIndex(e.to_string()) }

pub(crate) fn store_err(e: lancedb::Error) -> Error { Error::Store(e.to_string()) }

pub async fn open_db(uri: &str) -> Result<Connection> {
    let uri = coldata_core::config::expand_path(uri);
    let uri = uri.to_string_lossy();
    tracing::debug!(uri = %uri, "connecting to lancedb");
    connect(uri.as_ref()).execute().await.map_err(|e| Error::Connection(format!("{uri}: {e}")))
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(index_err)?;
    Ok(names.iter().any(|n| n == name))
}

/// Opens `name`, creating it empty with `schema` when absent.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<Table> {
    if !table_exists(conn, name).await? {
        // create empty table with 0 rows
        let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
        conn.create_table(name, Box::new(iter)).execute().await.map_err(index_err)?;
        tracing::info!(table = name, "created table");
    }
    conn.open_table(name).execute().await.map_err(index_err)
}

pub async fn drop_table(conn: &Connection, name: &str) -> Result<()> {
    if table_exists(conn, name).await? {
        conn.drop_table(name, &[]).await.map_err(index_err)?;
        tracing::info!(table = name, "dropped table");
    }
    Ok(())
}

/// Quotes a string literal for a Lance SQL filter.
pub(crate) fn sql_literal(value: &str) -> String { format!("'{}'", value.replace('\'', "''")) }
