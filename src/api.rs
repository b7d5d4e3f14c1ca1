// src/api.rs
use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::FormReplayClient;
use crate::types::{Coordinates, Credentials, PunchReq, PunchRes};

pub fn router(client: FormReplayClient) -> Router {
    // four sequential exchanges plus slack
    let budget = client
        .config()
        .timeout()
        .saturating_mul(4)
        .saturating_add(Duration::from_secs(5));

    Router::new()
        .route("/api/punch", post(punch))
        .route("/health", get(health))
        .with_state(Arc::new(client))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(budget))
        .layer(TraceLayer::new_for_http())
}

// ---------- API HANDLERS ---------- //

async fn punch(
    State(client): State<Arc<FormReplayClient>>,
    Json(req): Json<PunchReq>,
) -> Result<Json<PunchRes>, (StatusCode, String)> {
    if req.identifier.is_empty() || req.secret.is_empty() {
        return Err(bad("identifier/secret"));
    }
    let coordinates = match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        (None, None) => None,
        _ => return Err(bad("latitude/longitude pair")),
    };
    let credentials = Credentials {
        identifier: req.identifier,
        secret: req.secret,
    };

    let request_id = Uuid::new_v4();
    let report = client
        .punch(&credentials, coordinates.as_ref(), req.debug)
        .instrument(tracing::info_span!("punch", %request_id))
        .await;

    Ok(Json(PunchRes {
        request_id,
        message: report.outcome.user_message(),
        outcome: report.outcome,
        trace: report.trace,
        finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

fn bad(s: &'static str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, format!("missing/invalid {}", s))
}
