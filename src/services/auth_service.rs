// Tokens são emitidos pelo provedor de identidade (login Google); aqui apenas
// validamos o JWT HS256 e extraímos o email, que é a chave do ledger.

use crate::{config::AppConfig, utils::error::AppError};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub iat: usize,
    pub exp: usize,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    /// Email normalizado (chave do ledger)
    pub fn user_email(&self) -> String {
        normalize_email(&self.email)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub valid: bool,
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
    pub exp: usize,
}

// Verify JWT token
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.jwt_audience.as_str()]);
    validation.set_issuer(&[config.jwt_issuer.as_str()]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    if normalize_email(&claims.email).is_empty() {
        return Err(AppError::Unauthorized("Token has no email".to_string()));
    }

    Ok(claims)
}

/// Extrai o token de um header "Bearer <token>"
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
pub fn generate_token(config: &AppConfig, email: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        name: None,
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
        aud: config.jwt_audience.clone(),
        iss: config.jwt_issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .expect("test token")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_valid_token() {
        let config = AppConfig::for_tests();
        let token = generate_token(&config, "User@Example.com", 3600);

        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.user_email(), "user@example.com");
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let config = AppConfig::for_tests();
        let token = generate_token(&config, "user@example.com", -3600);
        assert!(matches!(
            verify_token(&config, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let config = AppConfig::for_tests();
        let token = generate_token(&config, "user@example.com", 3600);

        let mut other = AppConfig::for_tests();
        other.jwt_secret = "another-secret".to_string();
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_audience() {
        let config = AppConfig::for_tests();
        let token = generate_token(&config, "user@example.com", 3600);

        let mut other = AppConfig::for_tests();
        other.jwt_audience = "someone-else".to_string();
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
