use std::collections::HashMap;

use census_common::model::{AttributeTable, Device};
use census_common::submission::Submission;
use sqlx::postgres::PgConnection;

use crate::error::IngestError;

/// The deduplicated global name vocabularies and their device join tables.
#[derive(Debug, Clone, Copy)]
enum Vocabulary {
    Features,
    SharedLibraries,
}

impl Vocabulary {
    fn table(&self) -> &'static str {
        match self {
            Vocabulary::Features => "features",
            Vocabulary::SharedLibraries => "shared_libraries",
        }
    }

    fn join_table(&self) -> &'static str {
        match self {
            Vocabulary::Features => "devices_features",
            Vocabulary::SharedLibraries => "devices_shared_libraries",
        }
    }

    fn join_column(&self) -> &'static str {
        match self {
            Vocabulary::Features => "feature_id",
            Vocabulary::SharedLibraries => "shared_library_id",
        }
    }

    fn section(&self) -> &'static str {
        match self {
            Vocabulary::Features => "features",
            Vocabulary::SharedLibraries => "system_shared_libraries",
        }
    }
}

/// Map each section of a submission onto rows of the corresponding table.
///
/// Must run inside the same transaction as the resolver's purge/create and
/// the final processed mark: either every section lands or none do. Absent
/// sections are skipped.
pub async fn decompose(
    conn: &mut PgConnection,
    device: &Device,
    submission: &Submission,
) -> Result<(), IngestError> {
    if let Some(properties) = &submission.system_properties {
        insert_attributes(conn, AttributeTable::SystemProperties, device.id, properties).await?;
    }

    if let Some(sysctls) = &submission.sysctl {
        insert_attributes(conn, AttributeTable::Sysctls, device.id, sysctls).await?;
    }

    if let Some(variables) = &submission.environment_variables {
        insert_attributes(conn, AttributeTable::EnvironmentVariables, device.id, variables)
            .await?;
    }

    if let Some(features) = &submission.features {
        link_vocabulary(conn, Vocabulary::Features, device.id, features).await?;
    }

    if let Some(libraries) = &submission.system_shared_libraries {
        link_vocabulary(conn, Vocabulary::SharedLibraries, device.id, libraries).await?;
    }

    if let Some(permissions) = &submission.permissions {
        for permission in permissions {
            sqlx::query(
                "INSERT INTO permissions \
                 (device_id, name, package_name, protection_level, flags) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(device.id)
            .bind(&permission.name)
            .bind(&permission.package_name)
            .bind(permission.protection_level)
            .bind(permission.flags)
            .execute(&mut *conn)
            .await?;
        }
    }

    if let Some(file_permissions) = &submission.file_permissions {
        for entry in file_permissions {
            sqlx::query(
                "INSERT INTO file_permissions \
                 (device_id, path, link_path, mode, size, uid, gid, selinux_context) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(device.id)
            .bind(&entry.path)
            .bind(&entry.link_path)
            .bind(entry.mode)
            .bind(entry.size)
            .bind(entry.uid)
            .bind(entry.gid)
            .bind(&entry.selinux_context)
            .execute(&mut *conn)
            .await?;
        }
    }

    if let Some(providers) = &submission.providers {
        for provider in providers {
            sqlx::query(
                "INSERT INTO content_providers \
                 (device_id, authority, init_order, multiprocess, grant_uri_permissions, \
                  read_permission, write_permission, path_permissions, \
                  uri_permission_patterns, flags) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(device.id)
            .bind(&provider.authority)
            .bind(provider.init_order)
            .bind(provider.multiprocess)
            .bind(provider.grant_uri_permissions)
            .bind(&provider.read_permission)
            .bind(&provider.write_permission)
            .bind(&provider.path_permissions)
            .bind(&provider.uri_permission_patterns)
            .bind(provider.flags)
            .execute(&mut *conn)
            .await?;
        }
    }

    for (path, contents) in submission.decoded_small_files()? {
        sqlx::query("INSERT INTO small_files (device_id, path, contents) VALUES ($1, $2, $3)")
            .bind(device.id)
            .bind(&path)
            .bind(contents.as_slice())
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

async fn insert_attributes(
    conn: &mut PgConnection,
    table: AttributeTable,
    device_id: i64,
    entries: &HashMap<String, String>,
) -> Result<(), IngestError> {
    let query = format!(
        "INSERT INTO {table} (device_id, {key_column}, value) VALUES ($1, $2, $3)",
        table = table.table(),
        key_column = table.key_column(),
    );

    for (key, value) in entries {
        sqlx::query(&query)
            .bind(device_id)
            .bind(key)
            .bind(value.as_bytes())
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Insert unknown names into the vocabulary, then link the device to every
/// named entity. The join-insert's row count must equal the submitted name
/// count; a submission that names the same entity twice fails here.
async fn link_vocabulary(
    conn: &mut PgConnection,
    vocabulary: Vocabulary,
    device_id: i64,
    names: &[String],
) -> Result<(), IngestError> {
    sqlx::query(&format!(
        "INSERT INTO {table} (name) \
         SELECT name FROM unnest($1::text[]) AS incoming (name) \
         ON CONFLICT (name) DO NOTHING",
        table = vocabulary.table(),
    ))
    .bind(names)
    .execute(&mut *conn)
    .await?;

    let linked = sqlx::query(&format!(
        "INSERT INTO {join_table} (device_id, {join_column}) \
         SELECT $1, id FROM {table} WHERE name = ANY($2)",
        join_table = vocabulary.join_table(),
        join_column = vocabulary.join_column(),
        table = vocabulary.table(),
    ))
    .bind(device_id)
    .bind(names)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if linked != names.len() as u64 {
        return Err(IngestError::CardinalityMismatch {
            section: vocabulary.section(),
            submitted: names.len(),
            linked,
        });
    }

    Ok(())
}
