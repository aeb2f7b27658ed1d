// src/services/test_support.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, MemoryStore, StockStore, StockTx},
    models::{
        auth::{AuthContext, Role},
        inventory::{
            MovementFilter, MovementKind, NewMovement, StockLevel, StockMovement,
            TransferLegUpdate,
        },
        report::MovementSummary,
    },
    services::{
        catalog_service::CatalogService,
        ledger_service::{LedgerService, MovementRequest},
        projection_service::ProjectionService,
        report_service::ReportService,
        reversal_service::ReversalService,
        transfer_service::TransferService,
    },
};

/// Um produto, duas sedes e quatro usuários sobre o `MemoryStore`.
pub(crate) struct Fixture {
    pub store: MemoryStore,
    pub ledger: LedgerService,
    pub transfers: TransferService,
    pub reversal: ReversalService,
    pub projection: ProjectionService,
    pub reports: ReportService,
    pub catalog: CatalogService,

    pub product: Uuid,
    pub branch_a: Uuid,
    pub branch_b: Uuid,

    pub admin: AuthContext,
    pub supervisor: AuthContext,
    pub clerk_a: AuthContext,
    pub clerk_b: AuthContext,
}

fn actor(role: Role, branch_id: Option<Uuid>) -> AuthContext {
    AuthContext { actor_id: Uuid::new_v4(), role, branch_id }
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let product = store.create_product("SKU-1", "Tela iPhone", None, None).await.unwrap();
        let branch_a = store.create_branch("Matriz", Some("Rua 1")).await.unwrap();
        let branch_b = store.create_branch("Filial", None).await.unwrap();

        let catalog: Arc<dyn CatalogStore> = Arc::new(store.clone());
        let stock: Arc<dyn StockStore> = Arc::new(store.clone());

        Self {
            ledger: LedgerService::new(stock.clone()),
            transfers: TransferService::new(stock.clone()),
            reversal: ReversalService::new(stock.clone()),
            projection: ProjectionService::new(catalog.clone(), stock.clone()),
            reports: ReportService::new(stock),
            catalog: CatalogService::new(catalog),
            store,
            product: product.id,
            admin: actor(Role::Admin, None),
            supervisor: actor(Role::Supervisor, None),
            clerk_a: actor(Role::Regular, Some(branch_a.id)),
            clerk_b: actor(Role::Regular, Some(branch_b.id)),
            branch_a: branch_a.id,
            branch_b: branch_b.id,
        }
    }

    pub fn request(&self, branch_id: Uuid, kind: MovementKind, quantity: Decimal) -> MovementRequest {
        MovementRequest {
            product_id: self.product,
            branch_id,
            kind,
            quantity,
            reason: None,
            reference: Some("REF-1".into()),
        }
    }

    /// Entrada feita pelo admin.
    pub async fn stock(&self, branch_id: Uuid, quantity: Decimal) -> StockMovement {
        self.ledger
            .record_movement(&self.admin, self.request(branch_id, MovementKind::Entry, quantity))
            .await
            .unwrap()
    }

    pub async fn level(&self, branch_id: Uuid) -> Decimal {
        self.store
            .find_level(self.product, branch_id)
            .await
            .unwrap()
            .map(|level| level.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// O saldo é o `quantity_after` do último lançamento não anulado do par.
    pub async fn assert_level_matches_ledger(&self, branch_id: Uuid) {
        let latest = self
            .ledger
            .list_movements(MovementFilter {
                product_id: Some(self.product),
                branch_id: Some(branch_id),
                include_void: false,
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        let expected = latest.first().map(|m| m.quantity_after).unwrap_or(Decimal::ZERO);
        assert_eq!(self.level(branch_id).await, expected);
    }
}

/// `StockStore` que anota, em ordem, cada chamada feita nas transações.
#[derive(Clone)]
pub(crate) struct RecordingStore {
    inner: MemoryStore,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, calls: Arc::default() }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StockStore for RecordingStore {
    async fn begin(&self) -> Result<Box<dyn StockTx>, AppError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(RecordingTx { inner, calls: self.calls.clone() }))
    }

    async fn find_level(&self, product_id: Uuid, branch_id: Uuid) -> Result<Option<StockLevel>, AppError> {
        self.inner.find_level(product_id, branch_id).await
    }

    async fn list_levels(
        &self,
        product_id: Option<Uuid>,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<StockLevel>, AppError> {
        self.inner.list_levels(product_id, branch_id).await
    }

    async fn find_movement(&self, id: Uuid) -> Result<Option<StockMovement>, AppError> {
        self.inner.find_movement(id).await
    }

    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, AppError> {
        self.inner.list_movements(filter).await
    }

    async fn summarize_movements(
        &self,
        branch_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<MovementSummary>, AppError> {
        self.inner.summarize_movements(branch_id, from, to).await
    }
}

struct RecordingTx {
    inner: Box<dyn StockTx>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingTx {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StockTx for RecordingTx {
    async fn product_exists(&mut self, product_id: Uuid) -> Result<bool, AppError> {
        self.record("product_exists");
        self.inner.product_exists(product_id).await
    }

    async fn branch_exists(&mut self, branch_id: Uuid) -> Result<bool, AppError> {
        self.record("branch_exists");
        self.inner.branch_exists(branch_id).await
    }

    async fn lock_level(&mut self, product_id: Uuid, branch_id: Uuid) -> Result<StockLevel, AppError> {
        self.record("lock_level");
        self.inner.lock_level(product_id, branch_id).await
    }

    async fn set_level(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
        quantity: Decimal,
    ) -> Result<StockLevel, AppError> {
        self.record("set_level");
        self.inner.set_level(product_id, branch_id, quantity).await
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> Result<StockMovement, AppError> {
        self.record("insert_movement");
        self.inner.insert_movement(movement).await
    }

    async fn lock_movements(&mut self, ids: &[Uuid]) -> Result<Vec<StockMovement>, AppError> {
        self.record("lock_movements");
        self.inner.lock_movements(ids).await
    }

    async fn latest_active_movement(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        self.record("latest_active_movement");
        self.inner.latest_active_movement(product_id, branch_id).await
    }

    async fn update_transfer_leg(
        &mut self,
        id: Uuid,
        update: &TransferLegUpdate,
    ) -> Result<StockMovement, AppError> {
        self.record("update_transfer_leg");
        self.inner.update_transfer_leg(id, update).await
    }

    async fn mark_void(
        &mut self,
        id: Uuid,
        reason: &str,
        voided_by: Uuid,
        voided_at: DateTime<Utc>,
    ) -> Result<StockMovement, AppError> {
        self.record("mark_void");
        self.inner.mark_void(id, reason, voided_by, voided_at).await
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        self.record("commit");
        self.inner.commit().await
    }
}
