//! HTTP handlers for booth operations. Booth bodies are plain JSON.

use crate::{
    errors::AppError,
    models::booth::{Booth, NewBooth},
    services::market_service::MarketService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Serialize)]
pub struct BoothListResponse {
    pub message: &'static str,
    pub booths: Vec<Booth>,
}

#[derive(Serialize)]
pub struct BoothCreateResponse {
    pub message: &'static str,
    #[serde(rename = "insertBooth")]
    pub insert_booth: Booth,
}

#[derive(Serialize)]
pub struct BoothUpdateResponse {
    pub message: &'static str,
    #[serde(rename = "updatedBooth")]
    pub updated_booth: Booth,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoothReq {
    #[serde(rename = "boothName")]
    pub booth_name: String,
    /// Loosely typed on the wire: older clients send a number, newer ones a
    /// string like "12-A".
    #[serde(rename = "boothNumber")]
    pub booth_number: Value,
    pub location: Option<Location>,
    pub market_uuid: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// GET `/api/custom_booth/{market_uuid}/{user_uuid}` — list the booths of
/// one of the user's markets.
pub async fn list_booths(
    State(service): State<MarketService>,
    Path((market_uuid, user_uuid)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let booths = service.list_booths(market_uuid, user_uuid).await?;
    Ok(Json(BoothListResponse {
        message: "successfully fetched booths",
        booths,
    }))
}

/// POST `/api/custom_booth/{user_uuid}` — create a booth inside one of the
/// user's markets.
pub async fn create_booth(
    State(service): State<MarketService>,
    Path(user_uuid): Path<Uuid>,
    Json(req): Json<CreateBoothReq>,
) -> Result<impl IntoResponse, AppError> {
    if req.booth_name.is_empty() {
        return Err(AppError::Validation("boothName is required".into()));
    }
    let number = booth_number_text(&req.booth_number)
        .ok_or_else(|| AppError::Validation("boothNumber is required".into()))?;

    let booth = service
        .create_booth(
            user_uuid,
            NewBooth {
                market_uuid: req.market_uuid,
                name: req.booth_name,
                number,
                latitude: req.location.as_ref().map(|l| l.lat),
                longitude: req.location.as_ref().map(|l| l.lng),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BoothCreateResponse {
            message: "successfully created booth",
            insert_booth: booth,
        }),
    ))
}

/// PATCH `/api/custom_booth/{booth_uuid}/{user_uuid}` — partial update of
/// any subset of mutable booth fields.
pub async fn update_booth(
    State(service): State<MarketService>,
    Path((booth_uuid, user_uuid)): Path<(Uuid, Uuid)>,
    Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    let fields: Vec<(String, Value)> = body.into_iter().collect();
    let booth = service.update_booth(booth_uuid, user_uuid, &fields).await?;

    Ok(Json(BoothUpdateResponse {
        message: "successfully updated booth",
        updated_booth: booth,
    }))
}

fn booth_number_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
