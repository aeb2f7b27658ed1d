// src/services/transfer_service.rs

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
            MovementFilter, MovementKind, StockMovement, TransferAction, TransferLegUpdate,
            TransferPair, TransferStatus,
        },
    },
    services::ledger_service::{
        append_movement, check_quantity, ensure_exists, MovementRequest, MAX_PAGE_SIZE,
    },
};

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub product_id: Uuid,
    pub origin_branch_id: Uuid,
    pub destination_branch_id: Uuid,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

/// Coordena as duas pernas (saída na origem, entrada no destino) de uma transferência.
#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn StockStore>,
}

impl TransferService {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    // --- INICIAR ---
    // A origem baixa na hora e o destino já recebe o saldo; o "recebimento"
    // posterior é só conferência.
    pub async fn initiate_transfer(
        &self,
        auth: &AuthContext,
        request: TransferRequest,
    ) -> Result<TransferPair, AppError> {
        check_quantity(request.quantity)?;
        if request.origin_branch_id == request.destination_branch_id {
            return Err(AppError::SameBranchTransfer);
        }
        if !auth.can_operate_at(request.origin_branch_id) {
            return Err(AppError::Forbidden(
                "transferência só pode sair da sede do usuário".into(),
            ));
        }

        let mut tx = self.store.begin().await?;
        ensure_exists(tx.as_mut(), request.product_id, request.origin_branch_id).await?;
        if !tx.branch_exists(request.destination_branch_id).await? {
            return Err(AppError::BranchNotFound(request.destination_branch_id));
        }

        // Bloqueia os dois saldos sempre na mesma ordem
        let mut branches = [request.origin_branch_id, request.destination_branch_id];
        branches.sort();
        for branch_id in branches {
            tx.lock_level(request.product_id, branch_id).await?;
        }

        let outbound_id = Uuid::new_v4();
        let inbound_id = Uuid::new_v4();

        let outbound = append_movement(
            tx.as_mut(),
            outbound_id,
            MovementRequest {
                product_id: request.product_id,
                branch_id: request.origin_branch_id,
                kind: MovementKind::TransferOut,
                quantity: request.quantity,
                reason: request.reason.clone(),
                reference: request.reference.clone(),
            },
            Some(auth.actor_id),
            TransferStatus::Pending,
            Some(inbound_id),
        )
        .await?;

        let inbound = append_movement(
            tx.as_mut(),
            inbound_id,
            MovementRequest {
                product_id: request.product_id,
                branch_id: request.destination_branch_id,
                kind: MovementKind::TransferIn,
                quantity: request.quantity,
                reason: request.reason,
                reference: request.reference,
            },
            Some(auth.actor_id),
            TransferStatus::Pending,
            Some(outbound_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            outbound_id = %outbound.id,
            inbound_id = %inbound.id,
            product_id = %request.product_id,
            origin = %outbound.branch_id,
            destination = %inbound.branch_id,
            quantity = %outbound.quantity,
            "🚚 Transferência iniciada"
        );

        Ok(TransferPair { outbound, inbound })
    }

    // --- CONFIRMAR RECEBIMENTO ---
    pub async fn confirm_receipt(
        &self,
        auth: &AuthContext,
        transfer_in_id: Uuid,
        observations: Option<String>,
    ) -> Result<TransferPair, AppError> {
        let linked_id = self.linked_leg_id(transfer_in_id).await?;

        let mut tx = self.store.begin().await?;
        let pair = lock_pair(tx.as_mut(), transfer_in_id, linked_id).await?;

        if pair.inbound.id != transfer_in_id {
            return Err(AppError::InvalidMovementKind(MovementKind::TransferOut));
        }
        if !auth.can_operate_at(pair.inbound.branch_id) {
            return Err(AppError::Forbidden(
                "só a sede de destino confirma o recebimento".into(),
            ));
        }
        ensure_pending(&pair, TransferStatus::Received)?;

        let now = Utc::now();
        let inbound = tx
            .update_transfer_leg(
                pair.inbound.id,
                &TransferLegUpdate {
                    status: TransferStatus::Received,
                    status_note: observations,
                    received_by: Some(auth.actor_id),
                    received_at: Some(now),
                },
            )
            .await?;
        let outbound = tx
            .update_transfer_leg(
                pair.outbound.id,
                &TransferLegUpdate {
                    status: TransferStatus::Received,
                    status_note: pair.outbound.status_note.clone(),
                    received_by: None,
                    received_at: None,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            inbound_id = %inbound.id,
            outbound_id = %outbound.id,
            received_by = %auth.actor_id,
            "✅ Transferência recebida"
        );

        Ok(TransferPair { outbound, inbound })
    }

    // --- CANCELAR / REJEITAR ---
    // Não devolve o saldo movido na criação.
    pub async fn cancel_or_reject(
        &self,
        auth: &AuthContext,
        movement_id: Uuid,
        action: TransferAction,
        reason: String,
    ) -> Result<TransferPair, AppError> {
        let linked_id = self.linked_leg_id(movement_id).await?;

        let mut tx = self.store.begin().await?;
        let pair = lock_pair(tx.as_mut(), movement_id, linked_id).await?;

        let allowed = match action {
            TransferAction::Cancel => auth.is_admin() || auth.belongs_to(pair.outbound.branch_id),
            TransferAction::Reject => auth.is_admin() || auth.belongs_to(pair.inbound.branch_id),
        };
        if !allowed {
            let who = match action {
                TransferAction::Cancel => "só a sede de origem ou um admin pode cancelar",
                TransferAction::Reject => "só a sede de destino ou um admin pode rejeitar",
            };
            return Err(AppError::Forbidden(who.into()));
        }
        ensure_pending(&pair, action.target_status())?;

        let update = TransferLegUpdate {
            status: action.target_status(),
            status_note: Some(reason),
            received_by: None,
            received_at: None,
        };
        let outbound = tx.update_transfer_leg(pair.outbound.id, &update).await?;
        let inbound = tx.update_transfer_leg(pair.inbound.id, &update).await?;

        tx.commit().await?;

        tracing::info!(
            outbound_id = %outbound.id,
            inbound_id = %inbound.id,
            status = %update.status,
            actor = %auth.actor_id,
            "Transferência encerrada sem recebimento"
        );

        Ok(TransferPair { outbound, inbound })
    }

    /// Entradas pendentes de uma sede (a caixa de entrada do destino).
    pub async fn list_pending_inbound(
        &self,
        auth: &AuthContext,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<StockMovement>, AppError> {
        let branch_id = branch_id.or(auth.branch_id).ok_or_else(|| {
            AppError::field("branchId", "required", "Informe a sede.")
        })?;
        if !auth.can_operate_at(branch_id) {
            return Err(AppError::Forbidden("consulta restrita à própria sede".into()));
        }

        self.store
            .list_movements(&MovementFilter {
                branch_id: Some(branch_id),
                kind: Some(MovementKind::TransferIn),
                transfer_status: Some(TransferStatus::Pending),
                include_void: true,
                limit: MAX_PAGE_SIZE,
                ..Default::default()
            })
            .await
    }

    // O vínculo entre as pernas nunca muda, então pode ser lido fora da transação.
    async fn linked_leg_id(&self, movement_id: Uuid) -> Result<Uuid, AppError> {
        let leg = self
            .store
            .find_movement(movement_id)
            .await?
            .ok_or(AppError::MovementNotFound(movement_id))?;

        match (leg.kind.is_transfer(), leg.linked_movement_id) {
            (true, Some(linked)) => Ok(linked),
            _ => Err(AppError::InvalidMovementKind(leg.kind)),
        }
    }
}

async fn lock_pair(
    tx: &mut dyn StockTx,
    movement_id: Uuid,
    linked_id: Uuid,
) -> Result<TransferPair, AppError> {
    let mut legs = tx.lock_movements(&[movement_id, linked_id]).await?.into_iter();
    match (legs.next(), legs.next()) {
        (Some(a), Some(b)) => {
            let kind = a.kind;
            TransferPair::from_legs(a, b).ok_or(AppError::InvalidMovementKind(kind))
        }
        _ => Err(AppError::MovementNotFound(linked_id)),
    }
}

fn ensure_pending(pair: &TransferPair, next: TransferStatus) -> Result<(), AppError> {
    for leg in [&pair.inbound, &pair.outbound] {
        if !leg.transfer_status.can_transition_to(next) {
            return Err(AppError::TransferNotPending(leg.transfer_status));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;
    use rust_decimal_macros::dec;

    fn transfer(fx: &Fixture, quantity: Decimal) -> TransferRequest {
        TransferRequest {
            product_id: fx.product,
            origin_branch_id: fx.branch_a,
            destination_branch_id: fx.branch_b,
            quantity,
            reason: Some("reposição".into()),
            reference: None,
        }
    }

    #[tokio::test]
    async fn test_initiate_creates_linked_pending_pair() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(20)).await;
        fx.stock(fx.branch_b, dec!(2)).await;

        let pair = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(15))).await.unwrap();

        assert_eq!(pair.outbound.kind, MovementKind::TransferOut);
        assert_eq!(pair.inbound.kind, MovementKind::TransferIn);
        assert_eq!(pair.outbound.linked_movement_id, Some(pair.inbound.id));
        assert_eq!(pair.inbound.linked_movement_id, Some(pair.outbound.id));
        assert_eq!(pair.outbound.quantity, pair.inbound.quantity);
        assert_eq!(pair.outbound.transfer_status, TransferStatus::Pending);
        assert_eq!(pair.inbound.transfer_status, TransferStatus::Pending);

        assert_eq!(pair.outbound.quantity_before, dec!(20));
        assert_eq!(pair.outbound.quantity_after, dec!(5));
        assert_eq!(pair.inbound.quantity_before, dec!(2));
        assert_eq!(pair.inbound.quantity_after, dec!(17));

        assert_eq!(fx.level(fx.branch_a).await, dec!(5));
        assert_eq!(fx.level(fx.branch_b).await, dec!(17));
    }

    #[tokio::test]
    async fn test_initiate_validation() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(3)).await;

        let err = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(0))).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity));

        let err = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(-2))).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity));

        let err = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(4))).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available } if available == dec!(3)));

        let mut same = transfer(&fx, dec!(1));
        same.destination_branch_id = fx.branch_a;
        let err = fx.transfers.initiate_transfer(&fx.admin, same).await.unwrap_err();
        assert!(matches!(err, AppError::SameBranchTransfer));

        let mut nowhere = transfer(&fx, dec!(1));
        nowhere.destination_branch_id = Uuid::new_v4();
        let err = fx.transfers.initiate_transfer(&fx.admin, nowhere).await.unwrap_err();
        assert!(matches!(err, AppError::BranchNotFound(_)));

        // Falhas não deixam rastro
        assert_eq!(fx.level(fx.branch_a).await, dec!(3));
        assert_eq!(fx.level(fx.branch_b).await, dec!(0));
    }

    #[tokio::test]
    async fn test_regular_user_initiates_only_from_own_branch() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(3)).await;

        let err = fx.transfers.initiate_transfer(&fx.clerk_b, transfer(&fx, dec!(1))).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        fx.transfers.initiate_transfer(&fx.clerk_a, transfer(&fx, dec!(1))).await.unwrap();
    }

    #[tokio::test]
    async fn test_confirm_receipt_scenario() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(20)).await;
        let before_b = fx.level(fx.branch_b).await;

        let pair = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(15))).await.unwrap();
        assert_eq!(fx.level(fx.branch_a).await, dec!(5));
        assert_eq!(fx.level(fx.branch_b).await, before_b + dec!(15));

        let received = fx
            .transfers
            .confirm_receipt(&fx.clerk_b, pair.inbound.id, Some("caixa amassada".into()))
            .await
            .unwrap();

        assert_eq!(received.inbound.transfer_status, TransferStatus::Received);
        assert_eq!(received.outbound.transfer_status, TransferStatus::Received);
        assert_eq!(received.inbound.received_by, Some(fx.clerk_b.actor_id));
        assert!(received.inbound.received_at.is_some());
        assert_eq!(received.inbound.status_note.as_deref(), Some("caixa amassada"));

        // Recebimento não mexe no saldo
        assert_eq!(fx.level(fx.branch_a).await, dec!(5));
        assert_eq!(fx.level(fx.branch_b).await, before_b + dec!(15));

        let err = fx
            .transfers
            .confirm_receipt(&fx.admin, pair.inbound.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransferNotPending(TransferStatus::Received)));
    }

    #[tokio::test]
    async fn test_confirm_receipt_guards() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(5)).await;
        let pair = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(1))).await.unwrap();

        // Perna de saída não é confirmável
        let err = fx.transfers.confirm_receipt(&fx.admin, pair.outbound.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidMovementKind(MovementKind::TransferOut)));

        // Origem não confirma pelo destino
        let err = fx.transfers.confirm_receipt(&fx.clerk_a, pair.inbound.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = fx.transfers.confirm_receipt(&fx.admin, Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::MovementNotFound(_)));

        // Movimento comum não é transferência
        let entry = fx.stock(fx.branch_a, dec!(1)).await;
        let err = fx.transfers.confirm_receipt(&fx.admin, entry.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidMovementKind(MovementKind::Entry)));
    }

    #[tokio::test]
    async fn test_cancel_authorization() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(10)).await;
        let pair = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(4))).await.unwrap();

        // Destino não cancela, supervisor também não
        for actor in [&fx.clerk_b, &fx.supervisor] {
            let err = fx
                .transfers
                .cancel_or_reject(actor, pair.outbound.id, TransferAction::Cancel, "x".into())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }

        let closed = fx
            .transfers
            .cancel_or_reject(&fx.clerk_a, pair.inbound.id, TransferAction::Cancel, "pedido errado".into())
            .await
            .unwrap();
        assert_eq!(closed.outbound.transfer_status, TransferStatus::Cancelled);
        assert_eq!(closed.inbound.transfer_status, TransferStatus::Cancelled);
        assert_eq!(closed.inbound.status_note.as_deref(), Some("pedido errado"));

        // Saldos da criação permanecem
        assert_eq!(fx.level(fx.branch_a).await, dec!(6));
        assert_eq!(fx.level(fx.branch_b).await, dec!(4));

        // Estado final é definitivo
        let err = fx
            .transfers
            .confirm_receipt(&fx.admin, pair.inbound.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransferNotPending(TransferStatus::Cancelled)));
        let err = fx
            .transfers
            .cancel_or_reject(&fx.admin, pair.inbound.id, TransferAction::Reject, "y".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransferNotPending(TransferStatus::Cancelled)));
    }

    #[tokio::test]
    async fn test_reject_by_destination_and_admin() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(10)).await;
        let first = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(1))).await.unwrap();
        let second = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(1))).await.unwrap();

        let err = fx
            .transfers
            .cancel_or_reject(&fx.clerk_a, first.inbound.id, TransferAction::Reject, "x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let rejected = fx
            .transfers
            .cancel_or_reject(&fx.clerk_b, first.inbound.id, TransferAction::Reject, "avariado".into())
            .await
            .unwrap();
        assert_eq!(rejected.outbound.transfer_status, TransferStatus::Rejected);
        assert_eq!(rejected.inbound.transfer_status, TransferStatus::Rejected);

        let by_admin = fx
            .transfers
            .cancel_or_reject(&fx.admin, second.outbound.id, TransferAction::Reject, "z".into())
            .await
            .unwrap();
        assert_eq!(by_admin.inbound.transfer_status, TransferStatus::Rejected);
    }

    #[tokio::test]
    async fn test_received_transfer_cannot_be_cancelled() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(2)).await;
        let pair = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(2))).await.unwrap();
        fx.transfers.confirm_receipt(&fx.admin, pair.inbound.id, None).await.unwrap();

        let err = fx
            .transfers
            .cancel_or_reject(&fx.admin, pair.outbound.id, TransferAction::Cancel, "tarde".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransferNotPending(TransferStatus::Received)));
    }

    #[tokio::test]
    async fn test_pending_inbound_inbox() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(10)).await;
        let first = fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(1))).await.unwrap();
        fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(2))).await.unwrap();
        fx.transfers.confirm_receipt(&fx.admin, first.inbound.id, None).await.unwrap();

        let inbox = fx.transfers.list_pending_inbound(&fx.clerk_b, None).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].quantity, dec!(2));

        let err = fx
            .transfers
            .list_pending_inbound(&fx.clerk_a, Some(fx.branch_b))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = fx.transfers.list_pending_inbound(&fx.admin, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_never_overdraw() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(10)).await;

        let (a, b, c) = tokio::join!(
            fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(4))),
            fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(4))),
            fx.transfers.initiate_transfer(&fx.admin, transfer(&fx, dec!(4))),
        );
        let results = [a, b, c];
        let done = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(done, 2);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::InsufficientStock { .. }))));

        // As duas pernas de cada transferência entraram juntas
        let legs = fx
            .ledger
            .list_movements(MovementFilter {
                transfer_status: Some(TransferStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(legs.len(), 4);
        assert_eq!(fx.level(fx.branch_a).await, dec!(2));
        assert_eq!(fx.level(fx.branch_b).await, dec!(8));
        fx.assert_level_matches_ledger(fx.branch_a).await;
        fx.assert_level_matches_ledger(fx.branch_b).await;
    }
}
