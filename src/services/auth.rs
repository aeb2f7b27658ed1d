// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    models::auth::{AuthContext, Claims},
};

/// Valida os JWTs emitidos pelo serviço de login.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthContext, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token recusado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(token_data.claims.into())
    }

    #[cfg(test)]
    pub fn create_token(
        &self,
        actor_id: uuid::Uuid,
        role: crate::models::auth::Role,
        branch_id: Option<uuid::Uuid>,
    ) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = chrono::Utc::now();
        let claims = Claims {
            sub: actor_id,
            role,
            branch_id,
            exp: (now + chrono::Duration::hours(1)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .unwrap()
    }
}
