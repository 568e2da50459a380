//! Webhook handlers

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use roost_core::{Result, RoostError};
use roost_engine::{reply_text, HouseholdView, InboundMessage};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{error, warn};

use crate::server::SharedState;
use crate::twiml::{self, Twiml};

/// Build an inbound message from provider form fields
///
/// `NumMedia` says how many `MediaUrlN` fields to read.
pub fn inbound_from_form(form: &HashMap<String, String>) -> Result<InboundMessage> {
    let from = form
        .get("From")
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| RoostError::Validation("Missing sender".to_string()))?;
    let body = form.get("Body").cloned().unwrap_or_default();
    let media_count: usize = form
        .get("NumMedia")
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0);

    let mut message = InboundMessage::new(from.clone(), body);
    for i in 0..media_count {
        if let Some(url) = form.get(&format!("MediaUrl{}", i)) {
            message = message.with_media(url.clone());
        }
    }
    Ok(message)
}

/// POST /message
pub async fn receive_message(
    State(app): State<SharedState>,
    Form(form): Form<HashMap<String, String>>,
) -> Twiml {
    let result = match inbound_from_form(&form) {
        Ok(message) => app.dispatcher.handle_inbound_message(message).await,
        Err(e) => {
            warn!("Malformed message webhook: {}", e);
            Err(e)
        }
    };
    twiml::message(&reply_text(&result))
}

/// POST /call/:id
pub async fn voice_prompt(State(app): State<SharedState>, Path(call_id): Path<String>) -> Twiml {
    twiml::voice(&app.dispatcher.handle_voice_prompt(&call_id).await)
}

#[derive(Debug, Deserialize)]
pub struct DigitsForm {
    #[serde(rename = "Digits", default)]
    pub digits: String,
}

/// POST /call/:id/response
pub async fn voice_digits(
    State(app): State<SharedState>,
    Path(call_id): Path<String>,
    Form(form): Form<DigitsForm>,
) -> Twiml {
    twiml::voice(
        &app.dispatcher
            .handle_voice_digits(&call_id, &form.digits)
            .await,
    )
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(rename = "CallStatus", default)]
    pub call_status: String,
}

/// POST /call/:id/status
pub async fn voice_status(
    State(app): State<SharedState>,
    Path(call_id): Path<String>,
    Form(form): Form<StatusForm>,
) -> StatusCode {
    match app
        .dispatcher
        .handle_voice_status(&call_id, &form.call_status)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) if e.is_lookup() => {
            warn!("Status for {} dropped: {}", call_id, e);
            StatusCode::NO_CONTENT
        }
        Err(e) => {
            error!("Status for {} failed: {}", call_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /schedule - open the weekly dialogue
pub async fn start_schedule(
    State(app): State<SharedState>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match app.dispatcher.start_schedule().await {
        Ok(asked) => Ok(Json(serde_json::json!({ "asked": asked }))),
        Err(e) => {
            error!("Failed to start schedule: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// GET /state
pub async fn household(State(app): State<SharedState>) -> Json<HouseholdView> {
    Json(app.dispatcher.snapshot().await)
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "roost"
    }))
}
