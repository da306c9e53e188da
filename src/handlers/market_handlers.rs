//! HTTP handlers for market operations.
//!
//! Market create/update bodies arrive as multipart form data (the mobile
//! client sends `FormData` with an optional `image` file part). Fields are
//! buffered into memory and handed to `MarketService`; all validation of
//! field names and values happens behind the allow-list in the service
//! layer, except for the required create fields checked here.

use crate::{
    errors::AppError,
    models::market::{Market, NewMarket},
    services::{
        market_service::{MarketService, UploadedImage},
        update::parse_date,
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Serialize)]
pub struct MarketListResponse {
    pub message: &'static str,
    pub markets: Vec<Market>,
    pub success: bool,
}

#[derive(Serialize)]
pub struct MarketCreateResponse {
    pub message: &'static str,
    #[serde(rename = "insertMarket")]
    pub insert_market: Market,
}

#[derive(Serialize)]
pub struct MarketUpdateResponse {
    pub message: &'static str,
    #[serde(rename = "updatedMarket")]
    pub updated_market: Market,
}

/// Everything a market multipart body can carry.
#[derive(Default)]
struct MarketForm {
    fields: Vec<(String, Value)>,
    image: Option<UploadedImage>,
}

/// GET `/api/custom_market/{user_uuid}` — list a user's markets ascending
/// by start date, with signed image URLs.
pub async fn list_markets(
    State(service): State<MarketService>,
    Path(user_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let markets = service.list_markets(user_uuid).await?;
    Ok(Json(MarketListResponse {
        message: "successfully fetched markets",
        markets,
        success: true,
    }))
}

/// POST `/api/custom_market/{user_uuid}` — create a market from multipart
/// fields `name`, `startdate`, `enddate` and an optional `image` file.
///
/// A missing image is a normal create: the row is inserted with a null
/// image key.
pub async fn create_market(
    State(service): State<MarketService>,
    Path(user_uuid): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_market_form(multipart).await?;

    let mut name = None;
    let mut startdate = None;
    let mut enddate = None;
    for (field, value) in form.fields {
        let text = value.as_str().unwrap_or_default().to_string();
        match field.as_str() {
            "name" => name = Some(text),
            "startdate" => startdate = Some(text),
            "enddate" => enddate = Some(text),
            // Legacy client form data (e.g. `img_url`) is ignored on create.
            _ => {}
        }
    }

    let name = name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("name is required".into()))?;
    let startdate = startdate
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| AppError::Validation("startdate must be a date".into()))?;
    let enddate = enddate
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| AppError::Validation("enddate must be a date".into()))?;

    let market = service
        .create_market(
            user_uuid,
            NewMarket {
                name,
                startdate,
                enddate,
            },
            form.image,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MarketCreateResponse {
            message: "successfully created market",
            insert_market: market,
        }),
    ))
}

/// PATCH `/api/custom_market/{market_uuid}/{user_uuid}` — partial update of
/// any subset of mutable fields, plus an optional replacement `image`.
pub async fn update_market(
    State(service): State<MarketService>,
    Path((market_uuid, user_uuid)): Path<(Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_market_form(multipart).await?;

    let market = service
        .update_market(market_uuid, user_uuid, &form.fields, form.image)
        .await?;

    Ok(Json(MarketUpdateResponse {
        message: "successfully updated market",
        updated_market: market,
    }))
}

/// Drain a multipart body into text fields and at most one image part.
async fn read_market_form(mut multipart: Multipart) -> Result<MarketForm, AppError> {
    let mut form = MarketForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("malformed multipart body".into()))?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };

        if field_name == "image" {
            let filename = field
                .file_name()
                .map(str::to_string)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| AppError::Validation("image part needs a filename".into()))?;
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|_| AppError::Validation("malformed multipart body".into()))?;
            form.image = Some(UploadedImage {
                filename,
                content_type,
                bytes,
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|_| AppError::Validation("malformed multipart body".into()))?;
            form.fields.push((field_name, Value::String(text)));
        }
    }

    Ok(form)
}
