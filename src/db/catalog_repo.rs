// src/db/catalog_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stock_store::CatalogStore,
    models::catalog::{Branch, Product},
};

// Produtos e sedes
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn create_product(
        &self,
        sku: &str,
        name: &str,
        description: Option<&str>,
        sale_price: Option<Decimal>,
    ) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, sku, name, description, sale_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sku)
        .bind(name)
        .bind(description)
        .bind(sale_price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::SkuAlreadyExists;
                }
            }
            e.into()
        })
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn create_branch(&self, name: &str, address: Option<&str>) -> Result<Branch, AppError> {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (id, name, address)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(address)
        .fetch_one(&self.pool)
        .await?;
        Ok(branch)
    }

    async fn list_branches(&self) -> Result<Vec<Branch>, AppError> {
        let branches = sqlx::query_as::<_, Branch>("SELECT * FROM branches ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(branches)
    }

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, AppError> {
        let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(branch)
    }
}
