// src/models/report.rs

use serde::Serialize;
use rust_decimal::Decimal;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::inventory::MovementKind;

/// Total por (sede, tipo) de movimentos não anulados num período.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub branch_id: Uuid,
    pub kind: MovementKind,
    pub movements: i64,
    pub total_quantity: Decimal,
}

/// Saldo consolidado de um produto.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LevelReading {
    pub product_id: Uuid,
    pub branch_id: Option<Uuid>, // None = soma de todas as sedes
    pub quantity: Decimal,
}
