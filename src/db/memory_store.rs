// src/db/memory_store.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stock_store::{CatalogStore, StockStore, StockTx},
    models::{
        catalog::{Branch, Product},
        inventory::{MovementFilter, NewMovement, StockLevel, StockMovement, TransferLegUpdate},
        report::MovementSummary,
    },
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    branches: HashMap<Uuid, Branch>,
    levels: HashMap<(Uuid, Uuid), StockLevel>,
    // Ordem de inserção = ordem do livro-razão
    movements: Vec<StockMovement>,
}

impl MemoryState {
    fn movement_mut(&mut self, id: Uuid) -> Result<&mut StockMovement, AppError> {
        self.movements
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(AppError::MovementNotFound(id))
    }
}

/// Armazenamento em memória.
///
/// Cada `StockTx` segura o mutex inteiro até o commit ou drop, então as
/// unidades de trabalho são serializadas.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_product(
        &self,
        sku: &str,
        name: &str,
        description: Option<&str>,
        sale_price: Option<Decimal>,
    ) -> Result<Product, AppError> {
        let mut state = self.state.lock().await;
        if state.products.values().any(|p| p.sku == sku) {
            return Err(AppError::SkuAlreadyExists);
        }
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            sku: sku.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            sale_price,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn create_branch(&self, name: &str, address: Option<&str>) -> Result<Branch, AppError> {
        let now = Utc::now();
        let branch = Branch {
            id: Uuid::new_v4(),
            name: name.to_string(),
            address: address.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.branches.insert(branch.id, branch.clone());
        Ok(branch)
    }

    async fn list_branches(&self) -> Result<Vec<Branch>, AppError> {
        let state = self.state.lock().await;
        let mut branches: Vec<Branch> = state.branches.values().cloned().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, AppError> {
        Ok(self.state.lock().await.branches.get(&id).cloned())
    }
}

#[async_trait]
impl StockStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StockTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard: Some(guard), work }))
    }

    async fn find_level(&self, product_id: Uuid, branch_id: Uuid) -> Result<Option<StockLevel>, AppError> {
        Ok(self.state.lock().await.levels.get(&(product_id, branch_id)).cloned())
    }

    async fn list_levels(
        &self,
        product_id: Option<Uuid>,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<StockLevel>, AppError> {
        let state = self.state.lock().await;
        let mut levels: Vec<StockLevel> = state
            .levels
            .values()
            .filter(|l| product_id.is_none_or(|id| l.product_id == id))
            .filter(|l| branch_id.is_none_or(|id| l.branch_id == id))
            .cloned()
            .collect();
        levels.sort_by_key(|l| (l.product_id, l.branch_id));
        Ok(levels)
    }

    async fn find_movement(&self, id: Uuid) -> Result<Option<StockMovement>, AppError> {
        let state = self.state.lock().await;
        Ok(state.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn summarize_movements(
        &self,
        branch_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<MovementSummary>, AppError> {
        let filter = MovementFilter {
            branch_id,
            from,
            to,
            include_void: false,
            ..Default::default()
        };

        let state = self.state.lock().await;
        let mut totals: BTreeMap<_, (i64, Decimal)> = BTreeMap::new();
        for m in state.movements.iter().filter(|m| filter.matches(m)) {
            let entry = totals.entry((m.branch_id, m.kind)).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += m.quantity;
        }

        Ok(totals
            .into_iter()
            .map(|((branch_id, kind), (movements, total_quantity))| MovementSummary {
                branch_id,
                kind,
                movements,
                total_quantity,
            })
            .collect())
    }
}

struct MemoryTx {
    // Liberado no commit
    guard: Option<OwnedMutexGuard<MemoryState>>,
    work: MemoryState,
}

#[async_trait]
impl StockTx for MemoryTx {
    async fn product_exists(&mut self, product_id: Uuid) -> Result<bool, AppError> {
        Ok(self.work.products.contains_key(&product_id))
    }

    async fn branch_exists(&mut self, branch_id: Uuid) -> Result<bool, AppError> {
        Ok(self.work.branches.contains_key(&branch_id))
    }

    async fn lock_level(&mut self, product_id: Uuid, branch_id: Uuid) -> Result<StockLevel, AppError> {
        let level = self
            .work
            .levels
            .entry((product_id, branch_id))
            .or_insert_with(|| StockLevel {
                product_id,
                branch_id,
                quantity: Decimal::ZERO,
                updated_at: Utc::now(),
            });
        Ok(level.clone())
    }

    async fn set_level(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
        quantity: Decimal,
    ) -> Result<StockLevel, AppError> {
        let level = StockLevel {
            product_id,
            branch_id,
            quantity,
            updated_at: Utc::now(),
        };
        self.work.levels.insert((product_id, branch_id), level.clone());
        Ok(level)
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> Result<StockMovement, AppError> {
        let movement = movement.into_movement();
        self.work.movements.push(movement.clone());
        Ok(movement)
    }

    async fn lock_movements(&mut self, ids: &[Uuid]) -> Result<Vec<StockMovement>, AppError> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        Ok(ids
            .iter()
            .filter_map(|id| self.work.movements.iter().find(|m| m.id == *id).cloned())
            .collect())
    }

    async fn latest_active_movement(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .work
            .movements
            .iter()
            .rev()
            .find(|m| m.product_id == product_id && m.branch_id == branch_id && !m.is_void)
            .map(|m| m.id))
    }

    async fn update_transfer_leg(
        &mut self,
        id: Uuid,
        update: &TransferLegUpdate,
    ) -> Result<StockMovement, AppError> {
        let movement = self.work.movement_mut(id)?;
        movement.transfer_status = update.status;
        movement.status_note = update.status_note.clone();
        if update.received_by.is_some() {
            movement.received_by = update.received_by;
            movement.received_at = update.received_at;
        }
        Ok(movement.clone())
    }

    async fn mark_void(
        &mut self,
        id: Uuid,
        reason: &str,
        voided_by: Uuid,
        voided_at: DateTime<Utc>,
    ) -> Result<StockMovement, AppError> {
        let movement = self.work.movement_mut(id)?;
        movement.is_void = true;
        movement.void_reason = Some(reason.to_string());
        movement.voided_by = Some(voided_by);
        movement.voided_at = Some(voided_at);
        Ok(movement.clone())
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| anyhow::anyhow!("transação já finalizada"))?;
        *guard = std::mem::take(&mut self.work);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_dropped_tx_discards_writes() {
        let store = MemoryStore::new();
        let product = Uuid::new_v4();
        let branch = Uuid::new_v4();

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_level(product, branch).await.unwrap();
            tx.set_level(product, branch, dec!(7)).await.unwrap();
            // sem commit
        }
        assert!(store.find_level(product, branch).await.unwrap().is_none());

        let mut tx = store.begin().await.unwrap();
        tx.set_level(product, branch, dec!(7)).await.unwrap();
        tx.commit().await.unwrap();

        let level = store.find_level(product, branch).await.unwrap().unwrap();
        assert_eq!(level.quantity, dec!(7));
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let store = MemoryStore::new();
        store.create_product("SKU-1", "Tela", None, None).await.unwrap();
        let err = store.create_product("SKU-1", "Outra", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::SkuAlreadyExists));
    }
}
