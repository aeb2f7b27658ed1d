// src/common/i18n.rs

// Mensagens de erro por código. Idioma desconhecido cai no inglês.
pub fn message(code: &str, lang: &str) -> String {
    let text = match lang {
        "pt" => pt(code),
        _ => en(code),
    };
    text.to_string()
}

fn pt(code: &str) -> &'static str {
    match code {
        "VALIDATION_ERROR" => "Um ou mais campos são inválidos.",
        "INVALID_QUANTITY" => "A quantidade deve ser maior que zero.",
        "INSUFFICIENT_STOCK" => "Estoque insuficiente na sede.",
        "SAME_BRANCH_TRANSFER" => "A sede de destino deve ser diferente da origem.",
        "INVALID_MOVEMENT_KIND" => "Tipo de movimentação não permitido nesta operação.",
        "PRODUCT_NOT_FOUND" => "Produto não encontrado.",
        "BRANCH_NOT_FOUND" => "Sede não encontrada.",
        "MOVEMENT_NOT_FOUND" => "Movimentação não encontrada.",
        "FORBIDDEN" => "Você não tem permissão para realizar esta ação.",
        "PROTECTED_MOVEMENT" => "Esta movimentação deve ser anulada pela venda ou ordem de serviço de origem.",
        "ALREADY_VOIDED" => "Esta movimentação já foi anulada.",
        "NOT_LATEST_MOVEMENT" => "Só é possível anular a movimentação mais recente deste produto na sede.",
        "TRANSFER_NOT_PENDING" => "A transferência não está mais pendente.",
        "SKU_ALREADY_EXISTS" => "Já existe um produto com este SKU.",
        "INVALID_TOKEN" => "Token de autenticação inválido ou ausente.",
        _ => "Ocorreu um erro inesperado.",
    }
}

fn en(code: &str) -> &'static str {
    match code {
        "VALIDATION_ERROR" => "One or more fields are invalid.",
        "INVALID_QUANTITY" => "Quantity must be greater than zero.",
        "INSUFFICIENT_STOCK" => "Not enough stock at this branch.",
        "SAME_BRANCH_TRANSFER" => "Destination branch must differ from origin.",
        "INVALID_MOVEMENT_KIND" => "Movement kind not allowed for this operation.",
        "PRODUCT_NOT_FOUND" => "Product not found.",
        "BRANCH_NOT_FOUND" => "Branch not found.",
        "MOVEMENT_NOT_FOUND" => "Stock movement not found.",
        "FORBIDDEN" => "You are not allowed to perform this action.",
        "PROTECTED_MOVEMENT" => "This movement must be reversed through its sale or service ticket.",
        "ALREADY_VOIDED" => "This movement is already void.",
        "NOT_LATEST_MOVEMENT" => "Only the latest movement of this product at the branch can be voided.",
        "TRANSFER_NOT_PENDING" => "The transfer is no longer pending.",
        "SKU_ALREADY_EXISTS" => "A product with this SKU already exists.",
        "INVALID_TOKEN" => "Invalid or missing authentication token.",
        _ => "An unexpected error occurred.",
    }
}
