// src/services/report_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::StockStore,
    models::{auth::AuthContext, report::MovementSummary},
};

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn StockStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    /// Totais por sede e tipo de movimentação, ignorando anulados.
    /// Usuário comum só vê a própria sede.
    pub async fn movement_summary(
        &self,
        auth: &AuthContext,
        branch_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<MovementSummary>, AppError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::field("from", "range", "A data inicial deve ser anterior à final."));
            }
        }

        let branch_id = if auth.is_privileged() {
            branch_id
        } else {
            let own = auth
                .branch_id
                .ok_or_else(|| AppError::Forbidden("usuário sem sede".into()))?;
            if branch_id.is_some_and(|requested| requested != own) {
                return Err(AppError::Forbidden("relatório restrito à própria sede".into()));
            }
            Some(own)
        };

        self.store.summarize_movements(branch_id, from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::MovementKind;
    use crate::services::test_support::Fixture;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_summary_skips_void_entries() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(10)).await;
        fx.stock(fx.branch_a, dec!(5)).await;
        let exit = fx
            .ledger
            .record_movement(&fx.admin, fx.request(fx.branch_a, MovementKind::Exit, dec!(4)))
            .await
            .unwrap();
        fx.reversal.void_movement(&fx.admin, exit.id, "erro").await.unwrap();
        fx.stock(fx.branch_b, dec!(2)).await;

        let rows = fx.reports.movement_summary(&fx.admin, Some(fx.branch_a), None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, MovementKind::Entry);
        assert_eq!(rows[0].movements, 2);
        assert_eq!(rows[0].total_quantity, dec!(15));

        let everything = fx.reports.movement_summary(&fx.supervisor, None, None, None).await.unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_scope_and_range() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(1)).await;
        fx.stock(fx.branch_b, dec!(1)).await;

        let own = fx.reports.movement_summary(&fx.clerk_a, None, None, None).await.unwrap();
        assert!(own.iter().all(|row| row.branch_id == fx.branch_a));
        assert_eq!(own.len(), 1);

        let err = fx
            .reports
            .movement_summary(&fx.clerk_a, Some(fx.branch_b), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let now = Utc::now();
        let err = fx
            .reports
            .movement_summary(&fx.admin, None, Some(now), Some(now - Duration::days(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let future = fx
            .reports
            .movement_summary(&fx.admin, None, Some(now + Duration::days(1)), None)
            .await
            .unwrap();
        assert!(future.is_empty());
    }
}
