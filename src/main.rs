//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

fn build_router(app_state: AppState) -> Router {
    let catalog_routes = Router::new()
        .route("/products"
               ,post(handlers::catalog::create_product)
               .get(handlers::catalog::list_products)
        )
        .route("/branches"
               ,post(handlers::catalog::create_branch)
               .get(handlers::catalog::list_branches)
        );

    let stock_routes = Router::new()
        .route("/movements"
               ,post(handlers::stock::record_movement)
               .get(handlers::stock::list_movements)
        )
        .route("/movements/{id}", get(handlers::stock::get_movement))
        .route("/movements/{id}/void", post(handlers::stock::void_movement))
        .route("/levels", get(handlers::stock::list_levels))
        .route("/levels/{product_id}", get(handlers::stock::get_level));

    let transfer_routes = Router::new()
        .route("/", post(handlers::transfers::initiate_transfer))
        .route("/pending", get(handlers::transfers::list_pending))
        .route("/{id}/receive", post(handlers::transfers::confirm_receipt))
        .route("/{id}/cancel", post(handlers::transfers::cancel_transfer))
        .route("/{id}/reject", post(handlers::transfers::reject_transfer));

    let report_routes = Router::new()
        .route("/movements", get(handlers::reports::movement_summary));

    // Tudo abaixo de /api exige JWT, menos o health
    let protected = Router::new()
        .nest("/catalog", catalog_routes)
        .nest("/stock", stock_routes)
        .nest("/transfers", transfer_routes)
        .nest("/reports", report_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let (app_state, db_pool) = AppState::new(&settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    if let Some(pool) = &db_pool {
        sqlx::migrate!().run(pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
