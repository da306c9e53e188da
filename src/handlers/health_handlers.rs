//! Liveness and readiness probes.

use crate::services::market_service::MarketService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    database: CheckStatus,
    storage: CheckStatus,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    /// Failure detail goes to the log; the body carries only a fixed label.
    fn failed(label: &'static str, detail: impl std::fmt::Display) -> Self {
        warn!("readiness check failed ({}): {}", label, detail);
        Self {
            ok: false,
            error: Some(label),
        }
    }
}

/// `GET /healthz` — cheap liveness probe, no I/O.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz` — readiness probe covering both dependencies: a trivial
/// query against the database and a write/read/delete round trip under the
/// object-store root. 200 when both pass, 503 otherwise.
pub async fn readyz(State(service): State<MarketService>) -> impl IntoResponse {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(service.db())
        .await
    {
        Ok(1) => CheckStatus::ok(),
        Ok(other) => CheckStatus::failed("database check failed", format!("SELECT 1 returned {}", other)),
        Err(err) => CheckStatus::failed("database check failed", err),
    };

    let storage = storage_check(&service).await;

    let all_ok = database.ok && storage.ok;
    let body = ReadyResponse {
        status: if all_ok { "ok" } else { "error" },
        database,
        storage,
    };
    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn storage_check(service: &MarketService) -> CheckStatus {
    let probe = service
        .objects()
        .base_path()
        .join(format!(".readyz-{}", Uuid::new_v4()));

    let result = async {
        fs::write(&probe, b"readyz").await?;
        let bytes = fs::read(&probe).await?;
        if bytes != b"readyz" {
            return Err(std::io::Error::other("probe content mismatch"));
        }
        fs::remove_file(&probe).await
    }
    .await;

    match result {
        Ok(()) => CheckStatus::ok(),
        Err(err) => {
            let _ = fs::remove_file(&probe).await;
            CheckStatus::failed("storage check failed", err)
        }
    }
}
