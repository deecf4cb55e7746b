use serde::Serialize;
use sqlx::postgres::Postgres;
use sqlx::FromRow;

use crate::model::AttributeTable;

/// One aggregate bucket: a decoded attribute value and how many rows,
/// across all devices, carry it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ValueCount {
    pub label: String,
    pub count: i64,
}

/// Grouped counts of the values stored under one key of an attribute table,
/// biggest bucket first. `upcase` folds case before counting, for dimensions
/// like manufacturer names where clients disagree on casing.
///
/// Read-only reporting; a plain snapshot read is enough.
pub async fn count_by_value<'c, E>(
    executor: E,
    table: AttributeTable,
    key: &str,
    upcase: bool,
) -> Result<Vec<ValueCount>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    // Identifiers come from the closed AttributeTable enum, never callers.
    let label = if upcase {
        "upper(convert_from(value, 'UTF8'))"
    } else {
        "convert_from(value, 'UTF8')"
    };
    let query = format!(
        "SELECT {label} AS label, COUNT(*) AS count FROM {table} \
         WHERE {key_column} = $1 GROUP BY label ORDER BY count DESC, label",
        table = table.table(),
        key_column = table.key_column(),
    );

    sqlx::query_as(&query).bind(key).fetch_all(executor).await
}
