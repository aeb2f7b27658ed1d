// src/handlers/transfers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::stock::{validate_not_blank, validate_positive},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::inventory::{StockMovement, TransferAction, TransferPair},
    services::transfer_service::TransferRequest,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateTransferPayload {
    pub product_id: Uuid,
    pub origin_branch_id: Uuid,
    pub destination_branch_id: Uuid,

    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,

    #[validate(length(max = 500))]
    pub reason: Option<String>,

    #[validate(length(max = 120))]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReceiptPayload {
    #[validate(length(max = 500))]
    pub observations: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseTransferPayload {
    #[validate(
        length(max = 500),
        custom(function = "validate_not_blank", message = "Informe o motivo.")
    )]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PendingQuery {
    pub branch_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/transfers",
    tag = "Transfers",
    request_body = InitiateTransferPayload,
    responses(
        (status = 201, description = "Transferência criada (as duas pernas)", body = TransferPair),
        (status = 400, description = "Mesma sede, quantidade inválida ou estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn initiate_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Json(payload): Json<InitiateTransferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let pair = app_state
        .transfer_service
        .initiate_transfer(
            &auth,
            TransferRequest {
                product_id: payload.product_id,
                origin_branch_id: payload.origin_branch_id,
                destination_branch_id: payload.destination_branch_id,
                quantity: payload.quantity,
                reason: payload.reason,
                reference: payload.reference,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(pair)))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/receive",
    tag = "Transfers",
    request_body = ConfirmReceiptPayload,
    params(("id" = Uuid, Path, description = "ID da perna TRANSFER_IN")),
    responses(
        (status = 200, description = "Recebimento confirmado", body = TransferPair),
        (status = 409, description = "Transferência não está pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmReceiptPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let pair = app_state
        .transfer_service
        .confirm_receipt(&auth, id, payload.observations)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(pair)))
}

async fn close_transfer(
    app_state: AppState,
    locale: Locale,
    auth: AuthenticatedUser,
    id: Uuid,
    action: TransferAction,
    payload: CloseTransferPayload,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let pair = app_state
        .transfer_service
        .cancel_or_reject(&auth.0, id, action, payload.reason.trim().to_string())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(pair)))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/cancel",
    tag = "Transfers",
    request_body = CloseTransferPayload,
    params(("id" = Uuid, Path, description = "ID de qualquer uma das pernas")),
    responses((status = 200, description = "Transferência cancelada", body = TransferPair)),
    security(("api_jwt" = []))
)]
pub async fn cancel_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseTransferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    close_transfer(app_state, locale, user, id, TransferAction::Cancel, payload).await
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/reject",
    tag = "Transfers",
    request_body = CloseTransferPayload,
    params(("id" = Uuid, Path, description = "ID de qualquer uma das pernas")),
    responses((status = 200, description = "Transferência rejeitada", body = TransferPair)),
    security(("api_jwt" = []))
)]
pub async fn reject_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseTransferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    close_transfer(app_state, locale, user, id, TransferAction::Reject, payload).await
}

#[utoipa::path(
    get,
    path = "/api/transfers/pending",
    tag = "Transfers",
    params(PendingQuery),
    responses((status = 200, description = "Entradas aguardando conferência", body = [StockMovement])),
    security(("api_jwt" = []))
)]
pub async fn list_pending(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Query(query): Query<PendingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = app_state
        .transfer_service
        .list_pending_inbound(&auth, query.branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(pending)))
}
