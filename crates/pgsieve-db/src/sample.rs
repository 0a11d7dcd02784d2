//! Column content sampling.

use crate::error::Result;
use pgsieve_core::ColumnDescriptor;
use sqlx::{Pool, Postgres};

/// Quote an SQL identifier, doubling embedded double quotes.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Build the bounded distinct-value sample query for a column.
#[must_use]
pub fn sample_query(column: &ColumnDescriptor, limit: u32) -> String {
    format!(
        "SELECT DISTINCT {}::text FROM {}.{} LIMIT {limit}",
        quote_ident(&column.column),
        quote_ident(&column.schema),
        quote_ident(&column.table)
    )
}

/// Fetch up to `limit` distinct values of a column rendered as text.
///
/// `NULL` is returned as `None` and left for the caller to skip.
///
/// # Errors
/// Returns `DatabaseError` if no connection can be acquired or the query fails.
pub async fn sample_column(
    pool: &Pool<Postgres>,
    column: &ColumnDescriptor,
    limit: u32,
) -> Result<Vec<Option<String>>> {
    let values = sqlx::query_scalar::<_, Option<String>>(&sample_query(column, limit))
        .fetch_all(pool)
        .await?;

    Ok(values)
}
