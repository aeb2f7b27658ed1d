use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    common::i18n,
    middleware::i18n::Locale,
    models::inventory::{MovementKind, TransferStatus},
};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Validação (400) ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Quantidade deve ser maior que zero")]
    InvalidQuantity,

    #[error("Estoque insuficiente (disponível: {available})")]
    InsufficientStock { available: Decimal },

    #[error("Origem e destino da transferência são a mesma sede")]
    SameBranchTransfer,

    #[error("Tipo de movimentação não permitido nesta operação: {0}")]
    InvalidMovementKind(MovementKind),

    // --- Não encontrado (404) ---
    #[error("Produto não encontrado: {0}")]
    ProductNotFound(Uuid),

    #[error("Sede não encontrada: {0}")]
    BranchNotFound(Uuid),

    #[error("Movimentação não encontrada: {0}")]
    MovementNotFound(Uuid),

    // --- Proibido (403) ---
    #[error("Ação não permitida: {0}")]
    Forbidden(String),

    #[error("Movimentação {0} só pode ser desfeita pelo fluxo de origem")]
    ProtectedMovement(MovementKind),

    // --- Conflito (409) ---
    #[error("Movimentação já anulada")]
    AlreadyVoided,

    #[error("Existe movimentação mais recente para este produto nesta sede")]
    NotLatestMovement,

    #[error("Transferência não está pendente (status: {0})")]
    TransferNotPending(TransferStatus),

    #[error("SKU já existe")]
    SkuAlreadyExists,

    // --- Autenticação (401) ---
    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Erro de validação de um único campo, no mesmo formato do `validator`.
    pub fn field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut err = validator::ValidationError::new(code);
        err.message = Some(message.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidQuantity
            | AppError::InsufficientStock { .. }
            | AppError::SameBranchTransfer
            | AppError::InvalidMovementKind(_) => StatusCode::BAD_REQUEST,

            AppError::ProductNotFound(_)
            | AppError::BranchNotFound(_)
            | AppError::MovementNotFound(_) => StatusCode::NOT_FOUND,

            AppError::Forbidden(_) | AppError::ProtectedMovement(_) => StatusCode::FORBIDDEN,

            AppError::AlreadyVoided
            | AppError::NotLatestMovement
            | AppError::TransferNotPending(_)
            | AppError::SkuAlreadyExists => StatusCode::CONFLICT,

            AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Código estável para o frontend.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidQuantity => "INVALID_QUANTITY",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::SameBranchTransfer => "SAME_BRANCH_TRANSFER",
            AppError::InvalidMovementKind(_) => "INVALID_MOVEMENT_KIND",
            AppError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            AppError::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            AppError::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::ProtectedMovement(_) => "PROTECTED_MOVEMENT",
            AppError::AlreadyVoided => "ALREADY_VOIDED",
            AppError::NotLatestMovement => "NOT_LATEST_MOVEMENT",
            AppError::TransferNotPending(_) => "TRANSFER_NOT_PENDING",
            AppError::SkuAlreadyExists => "SKU_ALREADY_EXISTS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    /// Converte para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe fica no log, nunca na resposta.
            tracing::error!(code = self.code(), "Erro Interno do Servidor: {:?}", self);
        } else {
            tracing::warn!(code = self.code(), "Operação recusada: {}", self);
        }

        let details = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InsufficientStock { available } => Some(json!({ "available": available })),
            AppError::TransferNotPending(current) => Some(json!({ "transferStatus": current })),
            AppError::ProtectedMovement(kind) | AppError::InvalidMovementKind(kind) => {
                Some(json!({ "kind": kind }))
            }
            AppError::Forbidden(reason) => Some(json!({ "reason": reason })),
            _ => None,
        };

        ApiError {
            status,
            error: i18n::message(self.code(), &locale.0),
            code: self.code(),
            details,
        }
    }
}

/// O erro já traduzido, pronto para virar resposta.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error, "code": self.code });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

// Usado onde não temos o Locale em mãos (middlewares).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(AppError::InvalidQuantity.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InsufficientStock { available: dec!(1) }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::ProductNotFound(Uuid::nil()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::MovementNotFound(Uuid::nil()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::ProtectedMovement(MovementKind::SaleExit).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::AlreadyVoided.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::TransferNotPending(TransferStatus::Received).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_is_localized() {
        let pt = AppError::AlreadyVoided.to_api_error(&Locale("pt".into()));
        let en = AppError::AlreadyVoided.to_api_error(&Locale("en".into()));
        assert_eq!(pt.code, "ALREADY_VOIDED");
        assert_ne!(pt.error, en.error);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco: 123"))
            .to_api_error(&Locale::default());
        assert!(!api.error.contains("123"));
        assert!(api.details.is_none());
    }
}
