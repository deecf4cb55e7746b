use axum::http::{header, HeaderMap};

use crate::api::ApiError;

/// Shared-secret gate for the ingestion endpoints. Plain configuration
/// passed in at construction; production mode is never process-wide state.
#[derive(Clone)]
pub struct AccessGate {
    production: bool,
    password: Option<String>,
}

impl AccessGate {
    pub fn new(production: bool, password: Option<String>) -> Self {
        Self {
            production,
            password,
        }
    }

    /// In production the caller must present the access-control password in
    /// the Authorization header. Outside production everything passes.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if !self.production {
            return Ok(());
        }

        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match (&self.password, presented) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}
