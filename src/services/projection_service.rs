// src/services/projection_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, StockStore},
    models::{inventory::StockLevel, report::LevelReading},
};

/// Leitura do saldo atual. Nunca escreve.
#[derive(Clone)]
pub struct ProjectionService {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn StockStore>,
}

impl ProjectionService {
    pub fn new(catalog: Arc<dyn CatalogStore>, store: Arc<dyn StockStore>) -> Self {
        Self { catalog, store }
    }

    /// Saldo de um produto numa sede, ou a soma de todas quando `branch_id` é None.
    pub async fn get_level(
        &self,
        product_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> Result<LevelReading, AppError> {
        if self.catalog.find_product(product_id).await?.is_none() {
            return Err(AppError::ProductNotFound(product_id));
        }

        let quantity = match branch_id {
            Some(branch_id) => {
                if self.catalog.find_branch(branch_id).await?.is_none() {
                    return Err(AppError::BranchNotFound(branch_id));
                }
                self.store
                    .find_level(product_id, branch_id)
                    .await?
                    .map(|level| level.quantity)
                    .unwrap_or(Decimal::ZERO)
            }
            None => self
                .store
                .list_levels(Some(product_id), None)
                .await?
                .iter()
                .map(|level| level.quantity)
                .sum(),
        };

        Ok(LevelReading { product_id, branch_id, quantity })
    }

    pub async fn list_levels(
        &self,
        product_id: Option<Uuid>,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<StockLevel>, AppError> {
        self.store.list_levels(product_id, branch_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_per_branch_and_aggregate() {
        let fx = Fixture::new().await;
        fx.stock(fx.branch_a, dec!(7)).await;
        fx.stock(fx.branch_b, dec!(3)).await;

        let a = fx.projection.get_level(fx.product, Some(fx.branch_a)).await.unwrap();
        assert_eq!(a.quantity, dec!(7));

        let all = fx.projection.get_level(fx.product, None).await.unwrap();
        assert_eq!(all.quantity, dec!(10));
        assert!(all.branch_id.is_none());

        let levels = fx.projection.list_levels(None, Some(fx.branch_b)).await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].quantity, dec!(3));
    }

    #[tokio::test]
    async fn test_untouched_pair_reads_zero() {
        let fx = Fixture::new().await;
        let reading = fx.projection.get_level(fx.product, Some(fx.branch_b)).await.unwrap();
        assert_eq!(reading.quantity, Decimal::ZERO);

        let err = fx.projection.get_level(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(_)));

        let err = fx.projection.get_level(fx.product, Some(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, AppError::BranchNotFound(_)));
    }
}
