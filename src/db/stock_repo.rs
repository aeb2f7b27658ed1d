// src/db/stock_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stock_store::{StockStore, StockTx},
    models::{
        inventory::{MovementFilter, NewMovement, StockLevel, StockMovement, TransferLegUpdate},
        report::MovementSummary,
    },
};

const MOVEMENT_COLUMNS: &str = r#"
    id, product_id, branch_id, kind, quantity, quantity_before, quantity_after,
    reason, reference, created_by, created_at,
    is_void, void_reason, voided_by, voided_at,
    transfer_status, linked_movement_id, status_note, received_by, received_at
"#;

// O repositório do livro-razão (stock_movements) e da projeção (stock_levels)
#[derive(Clone)]
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockStore for StockRepository {
    async fn begin(&self) -> Result<Box<dyn StockTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStockTx { tx: Some(tx) }))
    }

    async fn find_level(&self, product_id: Uuid, branch_id: Uuid) -> Result<Option<StockLevel>, AppError> {
        let level = sqlx::query_as::<_, StockLevel>(
            "SELECT product_id, branch_id, quantity, updated_at FROM stock_levels WHERE product_id = $1 AND branch_id = $2",
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(level)
    }

    async fn list_levels(
        &self,
        product_id: Option<Uuid>,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<StockLevel>, AppError> {
        let levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT product_id, branch_id, quantity, updated_at
            FROM stock_levels
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR branch_id = $2)
            ORDER BY product_id, branch_id
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(levels)
    }

    async fn find_movement(&self, id: Uuid) -> Result<Option<StockMovement>, AppError> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = $1");
        let movement = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movement)
    }

    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, AppError> {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND ($3::movement_kind IS NULL OR kind = $3)
              AND ($4::transfer_status IS NULL OR transfer_status = $4)
              AND ($5::timestamptz IS NULL OR created_at >= $5)
              AND ($6::timestamptz IS NULL OR created_at <= $6)
              AND ($7 OR NOT is_void)
            ORDER BY seq DESC
            LIMIT $8
            "#
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(filter.product_id)
            .bind(filter.branch_id)
            .bind(filter.kind)
            .bind(filter.transfer_status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.include_void)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(movements)
    }

    async fn summarize_movements(
        &self,
        branch_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<MovementSummary>, AppError> {
        let rows = sqlx::query_as::<_, MovementSummary>(
            r#"
            SELECT branch_id,
                   kind,
                   COUNT(*) AS movements,
                   COALESCE(SUM(quantity), 0) AS total_quantity
            FROM stock_movements
            WHERE NOT is_void
              AND ($1::uuid IS NULL OR branch_id = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            GROUP BY branch_id, kind
            ORDER BY branch_id, kind
            "#,
        )
        .bind(branch_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Uma transação do Postgres. Rollback automático no drop.
pub struct PgStockTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStockTx {
    fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| anyhow::anyhow!("transação já finalizada").into())
    }
}

#[async_trait]
impl StockTx for PgStockTx {
    async fn product_exists(&mut self, product_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(exists)
    }

    async fn branch_exists(&mut self, branch_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
            .bind(branch_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(exists)
    }

    async fn lock_level(&mut self, product_id: Uuid, branch_id: Uuid) -> Result<StockLevel, AppError> {
        let conn = self.conn()?;

        // Primeiro uso do par cria a linha zerada
        sqlx::query(
            r#"
            INSERT INTO stock_levels (product_id, branch_id, quantity)
            VALUES ($1, $2, 0)
            ON CONFLICT (product_id, branch_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .execute(&mut *conn)
        .await?;

        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT product_id, branch_id, quantity, updated_at
            FROM stock_levels
            WHERE product_id = $1 AND branch_id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(level)
    }

    async fn set_level(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
        quantity: Decimal,
    ) -> Result<StockLevel, AppError> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            INSERT INTO stock_levels (product_id, branch_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, branch_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = now()
            RETURNING product_id, branch_id, quantity, updated_at
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(quantity)
        .fetch_one(self.conn()?)
        .await?;
        Ok(level)
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> Result<StockMovement, AppError> {
        let sql = format!(
            r#"
            INSERT INTO stock_movements (
                id, product_id, branch_id, kind, quantity, quantity_before, quantity_after,
                reason, reference, created_by, created_at, transfer_status, linked_movement_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(movement.id)
            .bind(movement.product_id)
            .bind(movement.branch_id)
            .bind(movement.kind)
            .bind(movement.quantity)
            .bind(movement.quantity_before)
            .bind(movement.quantity_after)
            .bind(movement.reason)
            .bind(movement.reference)
            .bind(movement.created_by)
            .bind(movement.created_at)
            .bind(movement.transfer_status)
            .bind(movement.linked_movement_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(inserted)
    }

    async fn lock_movements(&mut self, ids: &[Uuid]) -> Result<Vec<StockMovement>, AppError> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(ids)
            .fetch_all(self.conn()?)
            .await?;
        Ok(movements)
    }

    async fn latest_active_movement(
        &mut self,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM stock_movements
            WHERE product_id = $1 AND branch_id = $2 AND NOT is_void
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(id)
    }

    async fn update_transfer_leg(
        &mut self,
        id: Uuid,
        update: &TransferLegUpdate,
    ) -> Result<StockMovement, AppError> {
        let sql = format!(
            r#"
            UPDATE stock_movements
            SET transfer_status = $2,
                status_note = $3,
                received_by = COALESCE($4, received_by),
                received_at = COALESCE($5, received_at)
            WHERE id = $1
            RETURNING {MOVEMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, StockMovement>(&sql)
            .bind(id)
            .bind(update.status)
            .bind(update.status_note.as_deref())
            .bind(update.received_by)
            .bind(update.received_at)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(AppError::MovementNotFound(id))
    }

    async fn mark_void(
        &mut self,
        id: Uuid,
        reason: &str,
        voided_by: Uuid,
        voided_at: DateTime<Utc>,
    ) -> Result<StockMovement, AppError> {
        let sql = format!(
            r#"
            UPDATE stock_movements
            SET is_void = TRUE, void_reason = $2, voided_by = $3, voided_at = $4
            WHERE id = $1
            RETURNING {MOVEMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, StockMovement>(&sql)
            .bind(id)
            .bind(reason)
            .bind(voided_by)
            .bind(voided_at)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(AppError::MovementNotFound(id))
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| anyhow::anyhow!("transação já finalizada"))?;
        tx.commit().await?;
        Ok(())
    }
}
