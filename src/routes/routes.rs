//! Defines routes for the market/booth API and signed-object retrieval.
//!
//! ## Structure
//! - **Market endpoints**
//!   - `GET    /api/custom_market/{user_uuid}` — list a user's markets
//!   - `POST   /api/custom_market/{user_uuid}` — create (multipart, optional image)
//!   - `PATCH  /api/custom_market/{market_uuid}/{user_uuid}` — partial update
//!
//! - **Booth endpoints** (one path template, the first segment is the
//!   market on GET and the booth on PATCH)
//!   - `GET    /api/custom_booth/{market_uuid}/{user_uuid}` — list booths
//!   - `POST   /api/custom_booth/{user_uuid}` — create (JSON)
//!   - `PATCH  /api/custom_booth/{booth_uuid}/{user_uuid}` — partial update
//!
//! - **Objects**
//!   - `GET    /objects/{*key}` — signed-URL redemption (expires + signature)
//!
//! The wildcard `*key` allows nested keys like `user-uploads/{user}/img.jpg`.

use crate::{
    handlers::{
        booth_handlers::{create_booth, list_booths, update_booth},
        health_handlers::{healthz, readyz},
        market_handlers::{create_market, list_markets, update_market},
        object_handlers::get_object,
    },
    services::market_service::MarketService,
};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`MarketService`) to all handlers.
pub fn routes() -> Router<MarketService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Market endpoints
        .route(
            "/api/custom_market/{user_uuid}",
            get(list_markets).post(create_market),
        )
        .route(
            "/api/custom_market/{market_uuid}/{user_uuid}",
            patch(update_market),
        )
        // Booth endpoints
        .route("/api/custom_booth/{user_uuid}", post(create_booth))
        .route(
            "/api/custom_booth/{id}/{user_uuid}",
            get(list_booths).patch(update_booth),
        )
        // Signed-object retrieval
        .route("/objects/{*key}", get(get_object))
}
