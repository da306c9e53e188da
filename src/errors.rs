use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{market_service::CatalogError, object_store::ObjectStoreError};

/// Client-facing error with a fixed message per taxonomy class.
///
/// Internal detail (driver messages, IO errors) is logged at the conversion
/// site and never included in the response body. Validation messages may
/// name the offending field, nothing more.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("internal error")]
    Upstream,
    #[error("service temporarily unavailable")]
    Unavailable,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MarketNotFound(_) => AppError::NotFound("market not found"),
            CatalogError::BoothNotFound(_) => AppError::NotFound("booth not found"),
            CatalogError::EmptyUpdate => {
                AppError::Validation("at least one field must be provided".into())
            }
            CatalogError::DisallowedField(name) => {
                AppError::Validation(format!("field `{}` cannot be updated", name))
            }
            CatalogError::InvalidValue(name) => {
                AppError::Validation(format!("invalid value for field `{}`", name))
            }
            // Upload-side store failures: a key rejected by validation is
            // the client's filename, not a missing object.
            CatalogError::Store(ObjectStoreError::InvalidKey) => {
                AppError::Validation("invalid image filename".into())
            }
            CatalogError::Store(ObjectStoreError::Timeout) => AppError::Unavailable,
            CatalogError::Store(err) => {
                tracing::error!("object store failure: {}", err);
                AppError::Upstream
            }
            CatalogError::Sqlx(sqlx::Error::PoolTimedOut) => AppError::Unavailable,
            CatalogError::Sqlx(err) => {
                tracing::error!("database failure: {}", err);
                AppError::Upstream
            }
        }
    }
}

impl From<ObjectStoreError> for AppError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            // A bad or expired signature is indistinguishable from a
            // missing object: no oracle for probing keys.
            ObjectStoreError::NotFound(_)
            | ObjectStoreError::InvalidKey
            | ObjectStoreError::SignatureRejected
            | ObjectStoreError::Expired => AppError::NotFound("object not found"),
            ObjectStoreError::Timeout => AppError::Unavailable,
            ObjectStoreError::Io(err) => {
                tracing::error!("object store failure: {}", err);
                AppError::Upstream
            }
        }
    }
}
