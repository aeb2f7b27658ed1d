// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Supervisor,
    Regular,
}

// Estrutura de dados ("claims") dentro do JWT.
// O token é emitido por outro serviço; aqui só validamos.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub role: Role,
    #[serde(default)]
    pub branch_id: Option<Uuid>, // Sede do usuário
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

/// Quem está agindo. Passado explicitamente para cada operação do estoque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub actor_id: Uuid,
    pub role: Role,
    pub branch_id: Option<Uuid>,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin ou supervisor.
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Supervisor)
    }

    pub fn belongs_to(&self, branch_id: Uuid) -> bool {
        self.branch_id == Some(branch_id)
    }

    /// Admin/supervisor atuam em qualquer sede; os demais só na própria.
    pub fn can_operate_at(&self, branch_id: Uuid) -> bool {
        self.is_privileged() || self.belongs_to(branch_id)
    }
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            actor_id: claims.sub,
            role: claims.role,
            branch_id: claims.branch_id,
        }
    }
}
