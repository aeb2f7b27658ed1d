// src/handlers/stock.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        inventory::{
            fits_quantity_column, MovementFilter, MovementKind, StockLevel, StockMovement,
            TransferStatus,
        },
        report::LevelReading,
    },
    services::ledger_service::MovementRequest,
};

pub(crate) fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade deve ser maior que zero.".into());
        return Err(err);
    }
    if !fits_quantity_column(*val) {
        let mut err = ValidationError::new("precision");
        err.message = Some("No máximo 3 casas decimais e menor que 10^11.".into());
        return Err(err);
    }
    Ok(())
}

// `length(min = 1)` aceita "   ".
pub(crate) fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("O campo não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementPayload {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub kind: MovementKind,

    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,

    #[validate(length(max = 500))]
    pub reason: Option<String>,

    // Venda ou OS de origem (obrigatório para SALE_EXIT / REPAIR_EXIT)
    #[validate(length(max = 120))]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoidMovementPayload {
    #[validate(
        length(max = 500),
        custom(function = "validate_not_blank", message = "Informe o motivo da anulação.")
    )]
    pub reason: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    pub product_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub kind: Option<MovementKind>,
    pub transfer_status: Option<TransferStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    #[param(default = true)]
    pub include_void: bool,
    pub limit: Option<i64>,
}

impl From<MovementQuery> for MovementFilter {
    fn from(q: MovementQuery) -> Self {
        MovementFilter {
            product_id: q.product_id,
            branch_id: q.branch_id,
            kind: q.kind,
            transfer_status: q.transfer_status,
            from: q.from,
            to: q.to,
            include_void: q.include_void,
            limit: q.limit.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LevelQuery {
    pub product_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

// POST /api/stock/movements
#[utoipa::path(
    post,
    path = "/api/stock/movements",
    tag = "Stock",
    request_body = RecordMovementPayload,
    responses(
        (status = 201, description = "Movimentação registrada", body = StockMovement),
        (status = 400, description = "Quantidade inválida ou estoque insuficiente"),
        (status = 403, description = "Sede fora do escopo do usuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Json(payload): Json<RecordMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let movement = app_state
        .ledger_service
        .record_movement(
            &auth,
            MovementRequest {
                product_id: payload.product_id,
                branch_id: payload.branch_id,
                kind: payload.kind,
                quantity: payload.quantity,
                reason: payload.reason,
                reference: payload.reference,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

// GET /api/stock/movements
#[utoipa::path(
    get,
    path = "/api/stock/movements",
    tag = "Stock",
    params(MovementQuery),
    responses((status = 200, description = "Histórico, mais recente primeiro", body = [StockMovement])),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Query(query): Query<MovementQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut filter = MovementFilter::from(query);

    // Usuário comum só enxerga a própria sede
    if !auth.is_privileged() {
        let own = auth
            .branch_id
            .ok_or_else(|| AppError::Forbidden("usuário sem sede".into()).to_api_error(&locale))?;
        if filter.branch_id.is_some_and(|requested| requested != own) {
            return Err(AppError::Forbidden("consulta restrita à própria sede".into())
                .to_api_error(&locale));
        }
        filter.branch_id = Some(own);
    }

    let movements = app_state
        .ledger_service
        .list_movements(filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(movements)))
}

// GET /api/stock/movements/{id}
#[utoipa::path(
    get,
    path = "/api/stock/movements/{id}",
    tag = "Stock",
    params(("id" = Uuid, Path, description = "ID da movimentação")),
    responses(
        (status = 200, description = "Movimentação", body = StockMovement),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let movement = app_state
        .ledger_service
        .get_movement(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    if !auth.can_operate_at(movement.branch_id) {
        return Err(AppError::Forbidden("consulta restrita à própria sede".into())
            .to_api_error(&locale));
    }

    Ok((StatusCode::OK, Json(movement)))
}

// POST /api/stock/movements/{id}/void
#[utoipa::path(
    post,
    path = "/api/stock/movements/{id}/void",
    tag = "Stock",
    request_body = VoidMovementPayload,
    params(("id" = Uuid, Path, description = "ID da movimentação")),
    responses(
        (status = 200, description = "Movimentação anulada, saldo restaurado", body = StockMovement),
        (status = 403, description = "Venda, conserto ou transferência"),
        (status = 409, description = "Já anulada ou não é a mais recente")
    ),
    security(("api_jwt" = []))
)]
pub async fn void_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VoidMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let voided = app_state
        .reversal_service
        .void_movement(&auth, id, payload.reason.trim())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(voided)))
}

// GET /api/stock/levels/{product_id}?branchId=
#[utoipa::path(
    get,
    path = "/api/stock/levels/{product_id}",
    tag = "Stock",
    params(
        ("product_id" = Uuid, Path, description = "ID do produto"),
        ("branchId" = Option<Uuid>, Query, description = "Sede; sem ela, soma todas")
    ),
    responses((status = 200, description = "Saldo atual", body = LevelReading)),
    security(("api_jwt" = []))
)]
pub async fn get_level(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<LevelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reading = app_state
        .projection_service
        .get_level(product_id, query.branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(reading)))
}

// GET /api/stock/levels
#[utoipa::path(
    get,
    path = "/api/stock/levels",
    tag = "Stock",
    params(LevelQuery),
    responses((status = 200, description = "Saldos por produto e sede", body = [StockLevel])),
    security(("api_jwt" = []))
)]
pub async fn list_levels(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(query): Query<LevelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let levels = app_state
        .projection_service
        .list_levels(query.product_id, query.branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(levels)))
}
