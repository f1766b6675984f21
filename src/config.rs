// Configuração carregada do ambiente (.env via dotenv) uma única vez no startup.

use std::collections::HashSet;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDB,
    Memory,
}

/// Pacote de créditos vendido no checkout
#[derive(Debug, Clone)]
pub struct CreditPackage {
    pub credits: i64,
    pub price_cents: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
}

impl Default for CreditPackage {
    fn default() -> Self {
        Self {
            credits: 7,
            price_cents: 500,
            currency: "brl".to_string(),
            name: "7 AI Image Generation Credits".to_string(),
            description: "Package with 7 credits to generate images with AI".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub admin_emails: HashSet<String>,
    pub self_service_grants: bool,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub frontend_url: String,
    pub credit_package: CreditPackage,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "mongodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongodb" | "mongo" => StoreBackend::MongoDB,
            "memory" => StoreBackend::Memory,
            other => return Err(format!("Invalid STORE_BACKEND: {}. Supported: mongodb, memory", other)),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::MongoDB && database_url.is_none() {
            return Err("DATABASE_URL must be set".to_string());
        }

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3002".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let defaults = CreditPackage::default();
        let credit_package = CreditPackage {
            credits: parse_var("CREDIT_PACKAGE_CREDITS", defaults.credits)?,
            price_cents: parse_var("CREDIT_PACKAGE_PRICE_CENTS", defaults.price_cents)?,
            currency: env::var("CREDIT_PACKAGE_CURRENCY").unwrap_or(defaults.currency),
            name: env::var("CREDIT_PACKAGE_NAME").unwrap_or(defaults.name),
            description: env::var("CREDIT_PACKAGE_DESCRIPTION").unwrap_or(defaults.description),
        };
        if credit_package.credits <= 0 || credit_package.price_cents <= 0 {
            return Err("CREDIT_PACKAGE_CREDITS and CREDIT_PACKAGE_PRICE_CENTS must be positive".to_string());
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            store_backend,
            database_url,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "default-secret-change-me".to_string()),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "sketch-auth".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "sketch-api".to_string()),
            admin_emails: parse_admin_emails(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            self_service_grants: parse_flag(&env::var("SELF_SERVICE_GRANTS").unwrap_or_default()),
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string()),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            credit_package,
        })
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.trim().to_lowercase())
    }
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{} must be set", name))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Lista de admins separada por vírgula, normalizada para lowercase
pub fn parse_admin_emails(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
impl AppConfig {
    /// Configuração fixa para testes (sem variáveis de ambiente)
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3002,
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "sketch-auth".to_string(),
            jwt_audience: "sketch-api".to_string(),
            admin_emails: parse_admin_emails("admin@example.com"),
            self_service_grants: false,
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: "whsec_test".to_string(),
            stripe_api_base: "http://127.0.0.1:9/v1".to_string(),
            openai_api_key: "sk-test".to_string(),
            openai_api_base: "http://127.0.0.1:9/v1".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            credit_package: CreditPackage::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_emails() {
        let admins = parse_admin_emails(" Admin@Example.com, ,ops@example.com ");
        assert_eq!(admins.len(), 2);
        assert!(admins.contains("admin@example.com"));
        assert!(admins.contains("ops@example.com"));
        assert!(parse_admin_emails("").is_empty());
    }

    #[test]
    fn test_is_admin_is_case_insensitive() {
        let config = AppConfig::for_tests();
        assert!(config.is_admin("ADMIN@example.com"));
        assert!(!config.is_admin("user@example.com"));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(parse_flag(" YES "));
        assert!(!parse_flag(""));
        assert!(!parse_flag("false"));
    }
}
