// src/handlers/catalog.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    handlers::stock::validate_not_blank,
    models::catalog::{Branch, Product},
};

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(
        length(max = 64),
        custom(function = "validate_not_blank", message = "O SKU é obrigatório.")
    )]
    pub sku: String,

    #[validate(custom(function = "validate_not_blank", message = "O nome é obrigatório."))]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchPayload {
    #[validate(custom(function = "validate_not_blank", message = "O nome da sede é obrigatório."))]
    pub name: String,

    pub address: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/catalog/products",
    tag = "Catalog",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 409, description = "SKU já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let product = app_state
        .catalog_service
        .create_product(
            &auth,
            payload.sku.trim(),
            payload.name.trim(),
            payload.description.as_deref(),
            payload.sale_price,
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products",
    tag = "Catalog",
    responses((status = 200, description = "Produtos cadastrados", body = [Product])),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .catalog_service
        .list_products()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    post,
    path = "/api/catalog/branches",
    tag = "Catalog",
    request_body = CreateBranchPayload,
    responses((status = 201, description = "Sede criada", body = Branch)),
    security(("api_jwt" = []))
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(auth): AuthenticatedUser,
    Json(payload): Json<CreateBranchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let branch = app_state
        .catalog_service
        .create_branch(&auth, payload.name.trim(), payload.address.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(branch)))
}

#[utoipa::path(
    get,
    path = "/api/catalog/branches",
    tag = "Catalog",
    responses((status = 200, description = "Sedes cadastradas", body = [Branch])),
    security(("api_jwt" = []))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let branches = app_state
        .catalog_service
        .list_branches()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(branches)))
}
