use std::collections::HashMap;

use census_common::model::Device;
use sqlx::postgres::PgConnection;

use crate::error::IngestError;

/// Dependent collections owned by a device. Purged together when the same
/// identity is submitted again, so decomposition always starts from a clean
/// slate.
const DEPENDENT_TABLES: &[&str] = &[
    "system_properties",
    "sysctls",
    "environment_variables",
    "permissions",
    "content_providers",
    "small_files",
    "file_permissions",
    "devices_features",
    "devices_shared_libraries",
];

/// The build-identifying string for a submission: the reported
/// `ro.build.description` when present and non-empty, else the device name.
pub fn build_description(
    name: &str,
    system_properties: Option<&HashMap<String, String>>,
) -> String {
    system_properties
        .and_then(|properties| properties.get("ro.build.description"))
        .filter(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| name.to_owned())
}

/// Find or create the device identity for (name, build_description).
///
/// When the pair already exists, every dependent collection is purged before
/// returning, making ingestion idempotent under resubmission. Must run inside
/// the caller's decomposition transaction.
pub async fn resolve(
    conn: &mut PgConnection,
    name: &str,
    build_description: &str,
) -> Result<Device, IngestError> {
    let existing: Option<Device> = sqlx::query_as(
        "SELECT id, name, build_description FROM devices \
         WHERE name = $1 AND build_description = $2",
    )
    .bind(name)
    .bind(build_description)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(device) => {
            purge_device(conn, device.id).await?;
            Ok(device)
        }
        None => {
            let device = sqlx::query_as(
                "INSERT INTO devices (name, build_description) VALUES ($1, $2) \
                 RETURNING id, name, build_description",
            )
            .bind(name)
            .bind(build_description)
            .fetch_one(&mut *conn)
            .await?;

            Ok(device)
        }
    }
}

async fn purge_device(conn: &mut PgConnection, device_id: i64) -> Result<(), IngestError> {
    for table in DEPENDENT_TABLES {
        sqlx::query(&format!("DELETE FROM {table} WHERE device_id = $1"))
            .bind(device_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
