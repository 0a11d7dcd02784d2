//! Catalog enumeration.
//!
//! Reads `pg_catalog` to find the columns worth sampling: columns of ordinary
//! and partitioned tables that are neither part of a primary key nor owned by
//! a sequence (serial and identity columns).

use crate::error::Result;
use crate::sample::quote_ident;
use pgsieve_core::{ColumnDescriptor, SequenceBorder};
use sqlx::{PgConnection, Row};

/// Columns eligible for scanning, ordered by schema, table and column position.
pub const ELIGIBLE_COLUMNS_QUERY: &str = r"
SELECT
    n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    a.attname::text AS column_name,
    format_type(a.atttypid, a.atttypmod) AS column_type
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
JOIN pg_attribute a ON a.attrelid = c.oid
WHERE
    a.attnum > 0
    AND NOT a.attisdropped
    AND c.relkind IN ('r', 'p')
    AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
    AND NOT EXISTS (
        SELECT 1
        FROM pg_index i
        WHERE i.indrelid = c.oid
            AND i.indisprimary
            AND a.attnum = ANY(i.indkey)
    )
    AND NOT EXISTS (
        SELECT 1
        FROM pg_depend d
        JOIN pg_class s ON s.oid = d.objid
        WHERE d.refobjid = c.oid
            AND d.refobjsubid = a.attnum
            AND s.relkind = 'S'
            AND d.deptype IN ('a', 'i')
            AND d.classid = 'pg_catalog.pg_class'::regclass
            AND d.refclassid = 'pg_catalog.pg_class'::regclass
    )
ORDER BY n.nspname, c.relname, a.attnum
";

/// Sequence-owned columns of ordinary and partitioned tables.
pub const SEQUENCE_COLUMNS_QUERY: &str = r"
SELECT
    n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    a.attname::text AS column_name,
    format_type(a.atttypid, a.atttypmod) AS column_type
FROM pg_class c
JOIN pg_attribute a ON a.attrelid = c.oid
JOIN pg_depend d ON d.refobjid = c.oid AND d.refobjsubid = a.attnum
JOIN pg_class s ON s.oid = d.objid
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE
    c.relkind IN ('r', 'p')
    AND s.relkind = 'S'
    AND d.deptype IN ('a', 'i')
    AND d.classid = 'pg_catalog.pg_class'::regclass
    AND d.refclassid = 'pg_catalog.pg_class'::regclass
ORDER BY n.nspname, c.relname, a.attnum
";

fn descriptor_from_row(row: &sqlx::postgres::PgRow) -> Result<ColumnDescriptor> {
    Ok(ColumnDescriptor::new(
        row.try_get::<String, _>("schema_name")?,
        row.try_get::<String, _>("table_name")?,
        row.try_get::<String, _>("column_name")?,
        row.try_get::<String, _>("column_type")?,
    ))
}

/// Enumerate scan-eligible columns from a point-in-time catalog snapshot.
///
/// An empty result is returned as-is; the caller decides whether that is fatal.
///
/// # Errors
/// Returns `DatabaseError` if the catalog query fails.
pub async fn eligible_columns(conn: &mut PgConnection) -> Result<Vec<ColumnDescriptor>> {
    let rows = sqlx::query(ELIGIBLE_COLUMNS_QUERY)
        .fetch_all(&mut *conn)
        .await?;

    let columns = rows
        .iter()
        .map(descriptor_from_row)
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(count = columns.len(), "enumerated scan-eligible columns");

    Ok(columns)
}

/// Build the `max()` query for a sequence-owned column.
#[must_use]
pub fn max_value_query(column: &ColumnDescriptor) -> String {
    format!(
        "SELECT max({})::bigint FROM {}.{}",
        quote_ident(&column.column),
        quote_ident(&column.schema),
        quote_ident(&column.table)
    )
}

/// Find sequence-backed columns together with their current maximum value.
///
/// # Errors
/// Returns `DatabaseError` if the catalog query or any `max()` query fails.
pub async fn sequence_borders(conn: &mut PgConnection) -> Result<Vec<SequenceBorder>> {
    let rows = sqlx::query(SEQUENCE_COLUMNS_QUERY)
        .fetch_all(&mut *conn)
        .await?;

    let mut borders = Vec::with_capacity(rows.len());
    for row in &rows {
        let column = descriptor_from_row(row)?;
        let max_value: Option<i64> = sqlx::query_scalar(&max_value_query(&column))
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(column = %column.qualified_name(), ?max_value, "sequence border");
        borders.push(SequenceBorder { column, max_value });
    }

    Ok(borders)
}
