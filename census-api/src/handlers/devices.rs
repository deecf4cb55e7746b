use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use census_common::model::{
    self, AttributeRow, AttributeTable, ContentProvider, Device, FilePermission, Permission,
};

use crate::api::ApiError;
use crate::state::AppState;

/// Everything stored for one device, for the presentation layer.
#[derive(Serialize)]
pub struct DeviceDetail {
    #[serde(flatten)]
    pub device: Device,
    pub system_properties: Vec<AttributeRow>,
    pub sysctls: Vec<AttributeRow>,
    pub environment_variables: Vec<AttributeRow>,
    pub features: Vec<String>,
    pub shared_libraries: Vec<String>,
    pub permissions: Vec<Permission>,
    pub content_providers: Vec<ContentProvider>,
    pub file_permissions: Vec<FilePermission>,
    /// Paths only; contents are fetched one file at a time.
    pub small_files: Vec<String>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(model::list_devices(&state.pool).await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Result<Json<DeviceDetail>, ApiError> {
    let device = model::get_device(&state.pool, device_id)
        .await?
        .ok_or(ApiError::NotFound("device"))?;

    let detail = DeviceDetail {
        system_properties: model::attributes_for_device(
            &state.pool,
            AttributeTable::SystemProperties,
            device_id,
        )
        .await?,
        sysctls: model::attributes_for_device(&state.pool, AttributeTable::Sysctls, device_id)
            .await?,
        environment_variables: model::attributes_for_device(
            &state.pool,
            AttributeTable::EnvironmentVariables,
            device_id,
        )
        .await?,
        features: model::feature_names_for_device(&state.pool, device_id).await?,
        shared_libraries: model::shared_library_names_for_device(&state.pool, device_id).await?,
        permissions: model::permissions_for_device(&state.pool, device_id).await?,
        content_providers: model::content_providers_for_device(&state.pool, device_id).await?,
        file_permissions: model::file_permissions_for_device(&state.pool, device_id).await?,
        small_files: model::small_file_paths_for_device(&state.pool, device_id).await?,
        device,
    };

    Ok(Json(detail))
}

/// Raw stored bytes of one captured file. Stored paths are absolute; the
/// route wildcard strips the leading slash.
pub async fn small_file(
    State(state): State<AppState>,
    Path((device_id, path)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let contents = model::small_file_contents(&state.pool, device_id, &format!("/{path}"))
        .await?
        .ok_or(ApiError::NotFound("file"))?;

    Ok(([(header::CONTENT_TYPE, "text/plain")], contents).into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use sqlx::PgPool;
    use tower::ServiceExt;

    use crate::auth::AccessGate;
    use crate::handlers::add_routes;
    use crate::state::AppState;

    fn open_app(db: PgPool) -> Router {
        add_routes(
            Router::new(),
            AppState {
                pool: db,
                gate: AccessGate::new(false, None),
            },
        )
    }

    async fn seed_device(db: &PgPool) -> i64 {
        let device_id: i64 = sqlx::query_scalar(
            "INSERT INTO devices (name, build_description) \
             VALUES ('LG Nexus 5', 'hammerhead-user 6.0.1') RETURNING id",
        )
        .fetch_one(db)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO system_properties (device_id, property, value) \
             VALUES ($1, 'ro.build.version.release', '6.0.1')",
        )
        .bind(device_id)
        .execute(db)
        .await
        .unwrap();

        sqlx::query("INSERT INTO features (name) VALUES ('android.hardware.nfc')")
            .execute(db)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO devices_features (device_id, feature_id) \
             SELECT $1, id FROM features",
        )
        .bind(device_id)
        .execute(db)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO small_files (device_id, path, contents) \
             VALUES ($1, '/etc/hosts', '127.0.0.1 localhost')",
        )
        .bind(device_id)
        .execute(db)
        .await
        .unwrap();

        device_id
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn lists_devices(db: PgPool) {
        seed_device(&db).await;

        let app = open_app(db);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/devices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let devices: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(devices.as_array().unwrap().len(), 1);
        assert_eq!(devices[0]["name"], "LG Nexus 5");
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn shows_a_device_with_its_dependent_rows(db: PgPool) {
        let device_id = seed_device(&db).await;

        let app = open_app(db);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/devices/{device_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let detail: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(detail["name"], "LG Nexus 5");
        assert_eq!(detail["build_description"], "hammerhead-user 6.0.1");
        assert_eq!(
            detail["system_properties"][0]["name"],
            "ro.build.version.release"
        );
        assert_eq!(detail["system_properties"][0]["value"], "6.0.1");
        assert_eq!(detail["features"][0], "android.hardware.nfc");
        assert_eq!(detail["small_files"][0], "/etc/hosts");
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn missing_devices_are_a_404(db: PgPool) {
        let app = open_app(db);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/devices/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn serves_small_file_contents(db: PgPool) {
        let device_id = seed_device(&db).await;

        let app = open_app(db);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/devices/{device_id}/small_files/etc/hosts"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"127.0.0.1 localhost");
    }
}
