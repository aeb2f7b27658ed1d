// src/services/catalog_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::CatalogStore,
    models::{
        auth::AuthContext,
        catalog::{Branch, Product},
    },
};

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    pub async fn create_product(
        &self,
        auth: &AuthContext,
        sku: &str,
        name: &str,
        description: Option<&str>,
        sale_price: Option<Decimal>,
    ) -> Result<Product, AppError> {
        if !auth.is_admin() {
            return Err(AppError::Forbidden("cadastro de produtos é restrito a admins".into()));
        }
        let product = self.catalog.create_product(sku, name, description, sale_price).await?;
        tracing::info!(product_id = %product.id, sku = %product.sku, "Produto criado");
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.catalog.list_products().await
    }

    pub async fn create_branch(
        &self,
        auth: &AuthContext,
        name: &str,
        address: Option<&str>,
    ) -> Result<Branch, AppError> {
        if !auth.is_admin() {
            return Err(AppError::Forbidden("cadastro de sedes é restrito a admins".into()));
        }
        let branch = self.catalog.create_branch(name, address).await?;
        tracing::info!(branch_id = %branch.id, name = %branch.name, "🏪 Sede criada");
        Ok(branch)
    }

    pub async fn list_branches(&self) -> Result<Vec<Branch>, AppError> {
        self.catalog.list_branches().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;

    #[tokio::test]
    async fn test_only_admin_registers() {
        let fx = Fixture::new().await;

        let err = fx.catalog.create_product(&fx.supervisor, "SKU-9", "Bateria", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = fx.catalog.create_branch(&fx.clerk_a, "Filial", None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        fx.catalog.create_product(&fx.admin, "SKU-9", "Bateria", Some("3000mAh"), None).await.unwrap();
        fx.catalog.create_branch(&fx.admin, "Filial Norte", Some("Rua 2")).await.unwrap();

        assert_eq!(fx.catalog.list_products().await.unwrap().len(), 2);
        assert_eq!(fx.catalog.list_branches().await.unwrap().len(), 3);
    }
}
