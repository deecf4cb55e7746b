use serde::Serialize;
use sqlx::postgres::Postgres;
use sqlx::FromRow;

/// Canonical identity for one census submission lineage. Resubmissions for
/// the same (name, build_description) pair reuse the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub build_description: String,
}

/// The key/value attribute tables a device owns. A closed set so table and
/// column names never come from caller strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTable {
    SystemProperties,
    Sysctls,
    EnvironmentVariables,
}

impl AttributeTable {
    pub fn table(&self) -> &'static str {
        match self {
            AttributeTable::SystemProperties => "system_properties",
            AttributeTable::Sysctls => "sysctls",
            AttributeTable::EnvironmentVariables => "environment_variables",
        }
    }

    pub fn key_column(&self) -> &'static str {
        match self {
            AttributeTable::SystemProperties | AttributeTable::Sysctls => "property",
            AttributeTable::EnvironmentVariables => "variable",
        }
    }
}

/// One key/value pair captured from a device. Values are raw bytes in
/// storage; read views render them as lossy UTF-8.
#[derive(Debug, FromRow, Serialize)]
pub struct AttributeRow {
    pub name: String,
    #[serde(serialize_with = "utf8_lossy")]
    pub value: Vec<u8>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct Permission {
    pub name: String,
    pub package_name: String,
    pub protection_level: i32,
    pub flags: i32,
}

#[derive(Debug, FromRow, Serialize)]
pub struct ContentProvider {
    pub authority: String,
    pub init_order: i32,
    pub multiprocess: bool,
    pub grant_uri_permissions: bool,
    pub read_permission: Option<String>,
    pub write_permission: Option<String>,
    pub path_permissions: Option<String>,
    pub uri_permission_patterns: Option<String>,
    pub flags: Option<i32>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct FilePermission {
    pub path: String,
    pub link_path: Option<String>,
    pub mode: i32,
    pub size: i64,
    pub uid: i32,
    pub gid: i32,
    pub selinux_context: Option<String>,
}

pub async fn list_devices<'c, E>(executor: E) -> Result<Vec<Device>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT id, name, build_description FROM devices ORDER BY name, build_description",
    )
    .fetch_all(executor)
    .await
}

pub async fn get_device<'c, E>(executor: E, device_id: i64) -> Result<Option<Device>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT id, name, build_description FROM devices WHERE id = $1")
        .bind(device_id)
        .fetch_optional(executor)
        .await
}

pub async fn attributes_for_device<'c, E>(
    executor: E,
    table: AttributeTable,
    device_id: i64,
) -> Result<Vec<AttributeRow>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let query = format!(
        "SELECT {key} AS name, value FROM {table} WHERE device_id = $1 ORDER BY {key}",
        key = table.key_column(),
        table = table.table(),
    );

    sqlx::query_as(&query).bind(device_id).fetch_all(executor).await
}

pub async fn feature_names_for_device<'c, E>(
    executor: E,
    device_id: i64,
) -> Result<Vec<String>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "SELECT f.name FROM features f \
         JOIN devices_features df ON df.feature_id = f.id \
         WHERE df.device_id = $1 ORDER BY f.name",
    )
    .bind(device_id)
    .fetch_all(executor)
    .await
}

pub async fn shared_library_names_for_device<'c, E>(
    executor: E,
    device_id: i64,
) -> Result<Vec<String>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "SELECT l.name FROM shared_libraries l \
         JOIN devices_shared_libraries dl ON dl.shared_library_id = l.id \
         WHERE dl.device_id = $1 ORDER BY l.name",
    )
    .bind(device_id)
    .fetch_all(executor)
    .await
}

pub async fn permissions_for_device<'c, E>(
    executor: E,
    device_id: i64,
) -> Result<Vec<Permission>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT name, package_name, protection_level, flags \
         FROM permissions WHERE device_id = $1 ORDER BY name",
    )
    .bind(device_id)
    .fetch_all(executor)
    .await
}

pub async fn content_providers_for_device<'c, E>(
    executor: E,
    device_id: i64,
) -> Result<Vec<ContentProvider>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT authority, init_order, multiprocess, grant_uri_permissions, \
                read_permission, write_permission, path_permissions, \
                uri_permission_patterns, flags \
         FROM content_providers WHERE device_id = $1 ORDER BY authority",
    )
    .bind(device_id)
    .fetch_all(executor)
    .await
}

pub async fn file_permissions_for_device<'c, E>(
    executor: E,
    device_id: i64,
) -> Result<Vec<FilePermission>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT path, link_path, mode, size, uid, gid, selinux_context \
         FROM file_permissions WHERE device_id = $1 ORDER BY path",
    )
    .bind(device_id)
    .fetch_all(executor)
    .await
}

pub async fn small_file_paths_for_device<'c, E>(
    executor: E,
    device_id: i64,
) -> Result<Vec<String>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT path FROM small_files WHERE device_id = $1 ORDER BY path")
        .bind(device_id)
        .fetch_all(executor)
        .await
}

pub async fn small_file_contents<'c, E>(
    executor: E,
    device_id: i64,
    path: &str,
) -> Result<Option<Vec<u8>>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT contents FROM small_files WHERE device_id = $1 AND path = $2")
        .bind(device_id)
        .bind(path)
        .fetch_optional(executor)
        .await
}

fn utf8_lossy<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(value))
}
