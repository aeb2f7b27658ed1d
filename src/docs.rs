// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Catalog ---
        handlers::catalog::create_product,
        handlers::catalog::list_products,
        handlers::catalog::create_branch,
        handlers::catalog::list_branches,

        // --- Stock ---
        handlers::stock::record_movement,
        handlers::stock::list_movements,
        handlers::stock::get_movement,
        handlers::stock::void_movement,
        handlers::stock::get_level,
        handlers::stock::list_levels,

        // --- Transfers ---
        handlers::transfers::initiate_transfer,
        handlers::transfers::confirm_receipt,
        handlers::transfers::cancel_transfer,
        handlers::transfers::reject_transfer,
        handlers::transfers::list_pending,

        // --- Reports ---
        handlers::reports::movement_summary,
    ),
    components(
        schemas(
            // --- Catalog ---
            models::catalog::Product,
            models::catalog::Branch,
            handlers::catalog::CreateProductPayload,
            handlers::catalog::CreateBranchPayload,

            // --- Stock ---
            models::inventory::MovementKind,
            models::inventory::TransferStatus,
            models::inventory::TransferAction,
            models::inventory::StockLevel,
            models::inventory::StockMovement,
            models::inventory::TransferPair,
            models::report::LevelReading,
            models::report::MovementSummary,
            models::auth::Role,

            // --- Payloads ---
            handlers::stock::RecordMovementPayload,
            handlers::stock::VoidMovementPayload,
            handlers::transfers::InitiateTransferPayload,
            handlers::transfers::ConfirmReceiptPayload,
            handlers::transfers::CloseTransferPayload,
        )
    ),
    tags(
        (name = "Catalog", description = "Produtos e Sedes"),
        (name = "Stock", description = "Livro-razão de Estoque e Saldos"),
        (name = "Transfers", description = "Transferências entre Sedes"),
        (name = "Reports", description = "Resumo de Movimentações")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
