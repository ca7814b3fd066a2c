//! HTTP surface of the operator console: the live table plus the three
//! operator actions. Action endpoints answer 202 once the event has been
//! dispatched; delivery itself is fire-and-forget.

use actix_web::{HttpResponse, web};
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::intake::RejectReason;
use crate::models::view;
use crate::services::dispatcher::ActionDispatcher;
use crate::services::intake_store::IntakeStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCardRequest {
    pub card_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub coin_amount: BigDecimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub reason: String,
    #[serde(default)]
    pub other_text: Option<String>,
}

/// The live intake table, urgency-first.
pub async fn get_intake(store: web::Data<IntakeStore>) -> AppResult<HttpResponse> {
    let rows = view::order_for_display(&store.snapshot());
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn send_card(
    path: web::Path<String>,
    body: web::Json<SendCardRequest>,
    dispatcher: web::Data<ActionDispatcher>,
) -> AppResult<HttpResponse> {
    dispatcher.send_card(&path, &body.card_number)?;
    Ok(HttpResponse::Accepted().json(serde_json::json!({ "status": "dispatched" })))
}

pub async fn confirm(
    path: web::Path<String>,
    body: web::Json<ConfirmRequest>,
    dispatcher: web::Data<ActionDispatcher>,
) -> AppResult<HttpResponse> {
    dispatcher.confirm(&path, body.coin_amount.clone())?;
    Ok(HttpResponse::Accepted().json(serde_json::json!({ "status": "dispatched" })))
}

pub async fn reject(
    path: web::Path<String>,
    body: web::Json<RejectRequest>,
    dispatcher: web::Data<ActionDispatcher>,
) -> AppResult<HttpResponse> {
    let reason = RejectReason::from_parts(&body.reason, body.other_text.as_deref())
        .map_err(AppError::Validation)?;
    dispatcher.reject(&path, reason)?;
    Ok(HttpResponse::Accepted().json(serde_json::json!({ "status": "dispatched" })))
}
