// src/services/ledger_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{StockStore, StockTx},
    models::{
        auth::AuthContext,
        inventory::{
            fits_quantity_column, MovementFilter, MovementKind, NewMovement, StockMovement,
            TransferStatus, DEFAULT_PAGE_SIZE,
        },
    },
};

pub const MAX_PAGE_SIZE: i64 = 500;

/// Pedido de lançamento no livro-razão.
#[derive(Debug, Clone)]
pub struct MovementRequest {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

/// Quantidade positiva e representável na coluna (no máximo 3 casas).
pub(crate) fn check_quantity(quantity: Decimal) -> Result<(), AppError> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::InvalidQuantity);
    }
    if !fits_quantity_column(quantity) {
        return Err(AppError::field(
            "quantity",
            "precision",
            "A quantidade deve ter no máximo 3 casas decimais e ser menor que 10^11.",
        ));
    }
    Ok(())
}

/// Produto e sede precisam existir antes de tocar no saldo.
pub(crate) async fn ensure_exists(
    tx: &mut dyn StockTx,
    product_id: Uuid,
    branch_id: Uuid,
) -> Result<(), AppError> {
    if !tx.product_exists(product_id).await? {
        return Err(AppError::ProductNotFound(product_id));
    }
    if !tx.branch_exists(branch_id).await? {
        return Err(AppError::BranchNotFound(branch_id));
    }
    Ok(())
}

/// Lê o saldo (bloqueado), calcula o novo, grava saldo e lançamento.
/// Tudo dentro da transação recebida.
pub(crate) async fn append_movement(
    tx: &mut dyn StockTx,
    id: Uuid,
    request: MovementRequest,
    created_by: Option<Uuid>,
    transfer_status: TransferStatus,
    linked_movement_id: Option<Uuid>,
) -> Result<StockMovement, AppError> {
    check_quantity(request.quantity)?;

    let level = tx.lock_level(request.product_id, request.branch_id).await?;
    let quantity_before = level.quantity;
    let quantity_after = request
        .kind
        .apply(quantity_before, request.quantity)
        .filter(|after| fits_quantity_column(*after))
        .ok_or_else(|| {
            AppError::field("quantity", "range", "O saldo resultante excede o limite do estoque.")
        })?;

    if quantity_after < Decimal::ZERO {
        return Err(AppError::InsufficientStock { available: quantity_before });
    }

    tx.set_level(request.product_id, request.branch_id, quantity_after).await?;

    tx.insert_movement(NewMovement {
        id,
        product_id: request.product_id,
        branch_id: request.branch_id,
        kind: request.kind,
        quantity: request.quantity,
        quantity_before,
        quantity_after,
        reason: request.reason,
        reference: request.reference,
        created_by,
        created_at: Utc::now(),
        transfer_status,
        linked_movement_id,
    })
    .await
}

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn StockStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    // --- RECORD MOVEMENT (ENTRADA / SAÍDA / VENDA / CONSERTO) ---
    pub async fn record_movement(
        &self,
        auth: &AuthContext,
        request: MovementRequest,
    ) -> Result<StockMovement, AppError> {
        // Transferências só nascem pelo coordenador
        if request.kind.is_transfer() {
            return Err(AppError::InvalidMovementKind(request.kind));
        }

        if request.kind.is_workflow_owned()
            && request.reference.as_deref().is_none_or(|r| r.trim().is_empty())
        {
            return Err(AppError::field(
                "reference",
                "required",
                "Informe a venda ou ordem de serviço de origem.",
            ));
        }

        if !auth.can_operate_at(request.branch_id) {
            return Err(AppError::Forbidden(
                "usuário só movimenta estoque da própria sede".into(),
            ));
        }

        let mut tx = self.store.begin().await?;
        ensure_exists(tx.as_mut(), request.product_id, request.branch_id).await?;

        let movement = append_movement(
            tx.as_mut(),
            Uuid::new_v4(),
            request,
            Some(auth.actor_id),
            TransferStatus::None,
            None,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            branch_id = %movement.branch_id,
            kind = %movement.kind,
            before = %movement.quantity_before,
            after = %movement.quantity_after,
            "📦 Movimentação registrada"
        );

        Ok(movement)
    }

    pub async fn get_movement(&self, id: Uuid) -> Result<StockMovement, AppError> {
        self.store
            .find_movement(id)
            .await?
            .ok_or(AppError::MovementNotFound(id))
    }

    pub async fn list_movements(&self, mut filter: MovementFilter) -> Result<Vec<StockMovement>, AppError> {
        filter.limit = match filter.limit {
            n if n <= 0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        self.store.list_movements(&filter).await
    }
}
