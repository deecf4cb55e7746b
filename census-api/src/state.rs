use sqlx::PgPool;

use crate::auth::AccessGate;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gate: AccessGate,
}
