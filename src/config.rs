// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{CatalogRepository, CatalogStore, MemoryStore, StockRepository, StockStore},
    services::{
        auth::AuthService, catalog_service::CatalogService, ledger_service::LedgerService,
        projection_service::ProjectionService, report_service::ReportService,
        reversal_service::ReversalService, transfer_service::TransferService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("STORAGE_BACKEND inválido: {other} (use postgres ou memory)"),
        }
    }
}

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub storage: StorageBackend,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = env::var("STORAGE_BACKEND")
            .map(|v| StorageBackend::parse(&v))
            .unwrap_or(Ok(StorageBackend::Postgres))?;

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL deve ser definida");
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(v) => v.parse().context("DB_MAX_CONNECTIONS deve ser um número")?,
            Err(_) => 5,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections,
            storage,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub ledger_service: LedgerService,
    pub transfer_service: TransferService,
    pub reversal_service: ReversalService,
    pub projection_service: ProjectionService,
    pub report_service: ReportService,
}

impl AppState {
    /// Conecta ao armazenamento escolhido e monta o gráfico de dependências.
    /// Devolve o pool quando o backend é Postgres, para rodar as migrações.
    pub async fn new(settings: &Settings) -> anyhow::Result<(Self, Option<PgPool>)> {
        match settings.storage {
            StorageBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                // Conecta ao banco de dados, usando '?' para propagar erros
                let db_pool = PgPoolOptions::new()
                    .max_connections(settings.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                let state = Self::from_stores(
                    Arc::new(CatalogRepository::new(db_pool.clone())),
                    Arc::new(StockRepository::new(db_pool.clone())),
                    settings.jwt_secret.clone(),
                );
                Ok((state, Some(db_pool)))
            }
            StorageBackend::Memory => {
                tracing::warn!("⚠️ Usando armazenamento em memória; nada será persistido");
                let store = MemoryStore::new();
                let state = Self::from_stores(
                    Arc::new(store.clone()),
                    Arc::new(store),
                    settings.jwt_secret.clone(),
                );
                Ok((state, None))
            }
        }
    }

    pub fn from_stores(
        catalog: Arc<dyn CatalogStore>,
        stock: Arc<dyn StockStore>,
        jwt_secret: String,
    ) -> Self {
        Self {
            auth_service: AuthService::new(jwt_secret),
            catalog_service: CatalogService::new(catalog.clone()),
            ledger_service: LedgerService::new(stock.clone()),
            transfer_service: TransferService::new(stock.clone()),
            reversal_service: ReversalService::new(stock.clone()),
            projection_service: ProjectionService::new(catalog, stock.clone()),
            report_service: ReportService::new(stock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(StorageBackend::parse("Postgres").unwrap(), StorageBackend::Postgres);
        assert_eq!(StorageBackend::parse(" memory ").unwrap(), StorageBackend::Memory);
        assert!(StorageBackend::parse("redis").is_err());
    }
}
