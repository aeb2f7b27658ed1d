// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::report::MovementSummary,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub branch_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// GET /api/reports/movements
#[utoipa::path(
    get,
    path = "/api/reports/movements",
    tag = "Reports",
    params(SummaryQuery),
    responses((status = 200, description = "Totais por sede e tipo", body = [MovementSummary])),
    security(("api_jwt" = []))
)]
pub async fn movement_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = app_state
        .report_service
        .movement_summary(&auth, query.branch_id, query.from, query.to)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(rows)))
}
