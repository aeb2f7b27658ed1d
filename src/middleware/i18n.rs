// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Extrator de idioma a partir do Accept-Language
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale("en".to_string())
    }
}

impl Locale {
    pub fn from_header(header_str: &str) -> Self {
        accept_language::parse(header_str)
            .first() // Pega o primeiro idioma (ex: "pt-BR")
            .map(|tag_string| {
                // "pt-BR" -> "pt"
                Locale(tag_string.split('-').next().unwrap_or(tag_string).to_lowercase())
            })
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_tag() {
        assert_eq!(Locale::from_header("pt-BR,pt;q=0.9,en;q=0.8").0, "pt");
        assert_eq!(Locale::from_header("en-US").0, "en");
        assert_eq!(Locale::from_header("").0, "en");
    }
}
