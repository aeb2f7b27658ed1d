// src/db/stock_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::{Branch, Product},
        inventory::{MovementFilter, NewMovement, StockLevel, StockMovement, TransferLegUpdate},
        report::MovementSummary,
    },
};

/// Catálogo de produtos e sedes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_product(
        &self,
        sku: &str,
        name: &str,
        description: Option<&str>,
        sale_price: Option<Decimal>,
    ) -> Result<Product, AppError>;

    async fn list_products(&self) -> Result<Vec<Product>, AppError>;

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError>;

    async fn create_branch(&self, name: &str, address: Option<&str>) -> Result<Branch, AppError>;

    async fn list_branches(&self) -> Result<Vec<Branch>, AppError>;

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, AppError>;
}

/// Livro-razão + projeção de saldo.
///
/// Leituras rodam direto; toda escrita passa por um `StockTx`.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Abre uma unidade de trabalho. Sem `commit`, nada é gravado.
    async fn begin(&self) -> Result<Box<dyn StockTx>, AppError>;

    async fn find_level(&self, product_id: Uuid, branch_id: Uuid) -> Result<Option<StockLevel>, AppError>;

    async fn list_levels(
        &self,
        product_id: Option<Uuid>,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<StockLevel>, AppError>;

    async fn find_movement(&self, id: Uuid) -> Result<Option<StockMovement>, AppError>;

    /// Mais recentes primeiro.
    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, AppError>;

    async fn summarize_movements(
        &self,
        branch_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<MovementSummary>, AppError>;
}

#[async_trait]
pub trait StockTx: Send {
    async fn product_exists(&mut self, product_id: Uuid) -> Result<bool, AppError>;

    async fn branch_exists(&mut self, branch_id: Uuid) -> Result<bool, AppError>;

    /// Bloqueia o saldo de (produto, sede) até o fim da transação.
    /// Cria a linha com zero no primeiro uso.
    async fn lock_level(&mut self, product_id: Uuid, branch_id: Uuid) -> Result<StockLevel, AppError>;

    async fn set_level(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
        quantity: Decimal,
    ) -> Result<StockLevel, AppError>;

    async fn insert_movement(&mut self, movement: NewMovement) -> Result<StockMovement, AppError>;

    /// Bloqueia os movimentos pedidos, sempre em ordem de id.
    async fn lock_movements(&mut self, ids: &[Uuid]) -> Result<Vec<StockMovement>, AppError>;

    /// Id do último movimento não anulado de (produto, sede).
    async fn latest_active_movement(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<Uuid>, AppError>;

    async fn update_transfer_leg(
        &mut self,
        id: Uuid,
        update: &TransferLegUpdate,
    ) -> Result<StockMovement, AppError>;

    async fn mark_void(
        &mut self,
        id: Uuid,
        reason: &str,
        voided_by: Uuid,
        voided_at: DateTime<Utc>,
    ) -> Result<StockMovement, AppError>;

    async fn commit(&mut self) -> Result<(), AppError>;
}
