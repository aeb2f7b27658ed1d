// src/models/inventory.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Colunas NUMERIC(14, 3): 11 dígitos inteiros, 3 decimais.
pub const QUANTITY_SCALE: u32 = 3;
pub const QUANTITY_LIMIT: i64 = 100_000_000_000;

pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Cabe nas colunas de quantidade sem arredondar.
pub fn fits_quantity_column(value: Decimal) -> bool {
    value.abs() < Decimal::from(QUANTITY_LIMIT) && value.normalize().scale() <= QUANTITY_SCALE
}

// --- 1. Tipos de Movimentação ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum MovementKind {
    Entry,       // Vira "ENTRY"
    Exit,        // Vira "EXIT"
    RepairExit,  // Consumo em ordem de serviço
    SaleExit,    // Baixa por venda
    TransferOut, // Vira "TRANSFER_OUT"
    TransferIn,  // Vira "TRANSFER_IN"
}

impl MovementKind {
    /// Entradas somam ao saldo, todo o resto subtrai.
    pub fn is_inbound(&self) -> bool {
        matches!(self, MovementKind::Entry | MovementKind::TransferIn)
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, MovementKind::TransferOut | MovementKind::TransferIn)
    }

    /// Movimentos que pertencem a uma venda ou ordem de serviço.
    /// Só podem ser desfeitos pelo fluxo dono.
    pub fn is_workflow_owned(&self) -> bool {
        matches!(self, MovementKind::SaleExit | MovementKind::RepairExit)
    }

    /// Aplica a movimentação sobre um saldo. None em overflow.
    pub fn apply(&self, before: Decimal, quantity: Decimal) -> Option<Decimal> {
        if self.is_inbound() {
            before.checked_add(quantity)
        } else {
            before.checked_sub(quantity)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "ENTRY",
            MovementKind::Exit => "EXIT",
            MovementKind::RepairExit => "REPAIR_EXIT",
            MovementKind::SaleExit => "SALE_EXIT",
            MovementKind::TransferOut => "TRANSFER_OUT",
            MovementKind::TransferIn => "TRANSFER_IN",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- 2. Status da Transferência ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "transfer_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    None, // Movimentos que não são transferência
    Pending,
    Received,
    Cancelled,
    Rejected,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Received | TransferStatus::Cancelled | TransferStatus::Rejected
        )
    }

    /// PENDING -> {RECEIVED | CANCELLED | REJECTED}. Nada sai de um estado final.
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        *self == TransferStatus::Pending && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::None => "NONE",
            TransferStatus::Pending => "PENDING",
            TransferStatus::Received => "RECEIVED",
            TransferStatus::Cancelled => "CANCELLED",
            TransferStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Encerramento de transferência ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferAction {
    Cancel, // Pela origem (ou admin)
    Reject, // Pelo destino (ou admin)
}

impl TransferAction {
    pub fn target_status(&self) -> TransferStatus {
        match self {
            TransferAction::Cancel => TransferStatus::Cancelled,
            TransferAction::Reject => TransferStatus::Rejected,
        }
    }
}

// --- 3. Nível de Estoque (Projeção) ---
// Uma linha por (produto, sede). Representa a tabela 'stock_levels'.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

// --- 4. STOCK MOVEMENT (Livro-razão) ---
// Campos de núcleo (kind, quantity, quantity_before/after) nunca mudam depois de gravados.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,

    // Anulação
    #[serde(rename = "void")]
    pub is_void: bool,
    pub void_reason: Option<String>,
    pub voided_by: Option<Uuid>,
    pub voided_at: Option<DateTime<Utc>>,

    // Transferência
    pub transfer_status: TransferStatus,
    pub linked_movement_id: Option<Uuid>,
    pub status_note: Option<String>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
}

/// Dados de um novo lançamento. O saldo antes/depois é calculado dentro da transação.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub transfer_status: TransferStatus,
    pub linked_movement_id: Option<Uuid>,
}

impl NewMovement {
    pub fn into_movement(self) -> StockMovement {
        StockMovement {
            id: self.id,
            product_id: self.product_id,
            branch_id: self.branch_id,
            kind: self.kind,
            quantity: self.quantity,
            quantity_before: self.quantity_before,
            quantity_after: self.quantity_after,
            reason: self.reason,
            reference: self.reference,
            created_by: self.created_by,
            created_at: self.created_at,
            is_void: false,
            void_reason: None,
            voided_by: None,
            voided_at: None,
            transfer_status: self.transfer_status,
            linked_movement_id: self.linked_movement_id,
            status_note: None,
            received_by: None,
            received_at: None,
        }
    }
}

/// Alteração de status aplicada a uma perna de transferência.
#[derive(Debug, Clone)]
pub struct TransferLegUpdate {
    pub status: TransferStatus,
    pub status_note: Option<String>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
}

/// As duas pernas de uma transferência.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPair {
    pub outbound: StockMovement,
    pub inbound: StockMovement,
}

impl TransferPair {
    /// Monta o par a partir de duas pernas em qualquer ordem.
    pub fn from_legs(a: StockMovement, b: StockMovement) -> Option<Self> {
        match (a.kind, b.kind) {
            (MovementKind::TransferOut, MovementKind::TransferIn) => {
                Some(Self { outbound: a, inbound: b })
            }
            (MovementKind::TransferIn, MovementKind::TransferOut) => {
                Some(Self { outbound: b, inbound: a })
            }
            _ => None,
        }
    }
}

/// Filtro da consulta de histórico.
#[derive(Debug, Clone)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub kind: Option<MovementKind>,
    pub transfer_status: Option<TransferStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub include_void: bool,
    pub limit: i64,
}

impl Default for MovementFilter {
    fn default() -> Self {
        Self {
            product_id: None,
            branch_id: None,
            kind: None,
            transfer_status: None,
            from: None,
            to: None,
            include_void: true,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MovementFilter {
    pub fn matches(&self, m: &StockMovement) -> bool {
        self.product_id.is_none_or(|id| m.product_id == id)
            && self.branch_id.is_none_or(|id| m.branch_id == id)
            && self.kind.is_none_or(|k| m.kind == k)
            && self.transfer_status.is_none_or(|s| m.transfer_status == s)
            && self.from.is_none_or(|from| m.created_at >= from)
            && self.to.is_none_or(|to| m.created_at <= to)
            && (self.include_void || !m.is_void)
    }
}
