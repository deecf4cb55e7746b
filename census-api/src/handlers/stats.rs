use axum::extract::State;
use axum::Json;

use census_common::model::AttributeTable;
use census_common::stats::{self, ValueCount};

use crate::api::ApiError;
use crate::state::AppState;

pub async fn os_versions(State(state): State<AppState>) -> Result<Json<Vec<ValueCount>>, ApiError> {
    let counts = stats::count_by_value(
        &state.pool,
        AttributeTable::SystemProperties,
        "ro.build.version.release",
        false,
    )
    .await?;

    Ok(Json(counts))
}

pub async fn manufacturers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ValueCount>>, ApiError> {
    // Clients disagree on manufacturer casing; fold before counting.
    let counts = stats::count_by_value(
        &state.pool,
        AttributeTable::SystemProperties,
        "ro.product.manufacturer",
        true,
    )
    .await?;

    Ok(Json(counts))
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

    async fn seed(db: &PgPool) {
        for (name, release, manufacturer) in [
            ("a1", "6.0", "lge"),
            ("b2", "6.0", "LGE"),
            ("c3", "7.0", "samsung"),
        ] {
            let device_id: i64 = sqlx::query_scalar(
                "INSERT INTO devices (name, build_description) VALUES ($1, $1) RETURNING id",
            )
            .bind(name)
            .fetch_one(db)
            .await
            .unwrap();

            sqlx::query(
                "INSERT INTO system_properties (device_id, property, value) VALUES \
                 ($1, 'ro.build.version.release', $2), \
                 ($1, 'ro.product.manufacturer', $3)",
            )
            .bind(device_id)
            .bind(release.as_bytes())
            .bind(manufacturer.as_bytes())
            .execute(db)
            .await
            .unwrap();
        }
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn counts_os_versions(db: PgPool) {
        seed(&db).await;

        let app = add_routes(
            Router::new(),
            AppState {
                pool: db,
                gate: AccessGate::new(false, None),
            },
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats/os_versions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let counts: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            counts,
            serde_json::json!([
                {"label": "6.0", "count": 2},
                {"label": "7.0", "count": 1},
            ])
        );
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn counts_manufacturers_case_folded(db: PgPool) {
        seed(&db).await;

        let app = add_routes(
            Router::new(),
            AppState {
                pool: db,
                gate: AccessGate::new(false, None),
            },
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats/manufacturers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let counts: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            counts,
            serde_json::json!([
                {"label": "LGE", "count": 2},
                {"label": "SAMSUNG", "count": 1},
            ])
        );
    }
}
