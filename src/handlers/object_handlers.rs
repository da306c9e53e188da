//! Signed-URL redemption handler.
//!
//! Streams object bodies with `ReaderStream` instead of buffering, after
//! the store has verified the signature and expiry embedded in the URL.

use crate::{errors::AppError, services::market_service::MarketService};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

/// Query parameters carried by every signed URL.
#[derive(Debug, Deserialize)]
pub struct SignedUrlQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET `/objects/{*key}?expires=..&signature=..`
///
/// Bad signatures, expired links, and missing objects all answer 404: the
/// endpoint must not act as an oracle for which keys exist.
pub async fn get_object(
    State(service): State<MarketService>,
    Path(key): Path<String>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Response, AppError> {
    let (file, content_type) = service
        .objects()
        .open_verified(&key, query.expires, &query.signature)
        .await?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    Ok(response)
}
