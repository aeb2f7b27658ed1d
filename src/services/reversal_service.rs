// src/services/reversal_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::StockStore,
    models::{auth::AuthContext, inventory::StockMovement},
};

/// Anulação de lançamentos comuns (entrada / saída).
#[derive(Clone)]
pub struct ReversalService {
    store: Arc<dyn StockStore>,
}

impl ReversalService {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    /// Volta o saldo para o `quantity_before` do lançamento e marca como anulado.
    ///
    /// Só o último lançamento ativo de (produto, sede) pode ser anulado, senão o
    /// retrato antigo sobrescreveria movimentações mais novas.
    pub async fn void_movement(
        &self,
        auth: &AuthContext,
        movement_id: Uuid,
        reason: &str,
    ) -> Result<StockMovement, AppError> {
        let mut tx = self.store.begin().await?;

        let entry = tx
            .lock_movements(&[movement_id])
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::MovementNotFound(movement_id))?;

        if entry.is_void {
            return Err(AppError::AlreadyVoided);
        }
        // Venda e conserto: desfaz pelo fluxo dono. Transferência: cancelar/rejeitar.
        if entry.kind.is_workflow_owned() || entry.kind.is_transfer() {
            return Err(AppError::ProtectedMovement(entry.kind));
        }
        if !auth.can_operate_at(entry.branch_id) {
            return Err(AppError::Forbidden(
                "usuário só anula movimentações da própria sede".into(),
            ));
        }

        // O saldo fica bloqueado antes de conferir qual é o último lançamento;
        // nenhum outro lançamento entra no par até o commit.
        tx.lock_level(entry.product_id, entry.branch_id).await?;

        let latest = tx
            .latest_active_movement(entry.product_id, entry.branch_id)
            .await?;
        if latest != Some(entry.id) {
            return Err(AppError::NotLatestMovement);
        }

        tx.set_level(entry.product_id, entry.branch_id, entry.quantity_before)
            .await?;

        let voided = tx
            .mark_void(entry.id, reason, auth.actor_id, Utc::now())
            .await?;

        tx.commit().await?;

        tracing::info!(
            movement_id = %voided.id,
            product_id = %voided.product_id,
            branch_id = %voided.branch_id,
            restored = %voided.quantity_before,
            voided_by = %auth.actor_id,
            "↩️ Movimentação anulada"
        );

        Ok(voided)
    }
}
