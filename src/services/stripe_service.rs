// ==================== STRIPE ====================
// Checkout Sessions via API REST (form-encoded) e verificação da assinatura
// dos webhooks (header Stripe-Signature, HMAC-SHA256).

use crate::{
    config::{AppConfig, CreditPackage},
    models::CheckoutSession,
    utils::error::AppError,
};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Tolerância padrão do Stripe para o timestamp da assinatura
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub email: String,
    pub origin: String,
    pub package: CreditPackage,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError>;

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, AppError>;
}

pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            http,
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
        }
    }

    async fn parse_session(response: reqwest::Response) -> Result<CheckoutSession, AppError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<CheckoutSession>()
                .await
                .map_err(|e| AppError::PaymentProvider(format!("Failed to parse session: {}", e)));
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Checkout session: {}", message)));
        }

        Err(AppError::PaymentProvider(format!("Stripe API error ({}): {}", status, message)))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError> {
        log::info!("💳 Creating checkout session for {} ({} credits)", request.email, request.package.credits);

        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(request))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Failed to reach Stripe: {}", e)))?;

        Self::parse_session(response).await
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, AppError> {
        validate_session_id(session_id)?;

        log::info!("💳 Retrieving checkout session {}", session_id);

        let response = self
            .http
            .get(format!("{}/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(&self.secret_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Failed to reach Stripe: {}", e)))?;

        Self::parse_session(response).await
    }
}

/// Campos form-encoded de POST /v1/checkout/sessions
pub fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let origin = request.origin.trim_end_matches('/');
    let package = &request.package;

    vec![
        ("payment_method_types[0]".into(), "card".into()),
        ("line_items[0][price_data][currency]".into(), package.currency.clone()),
        ("line_items[0][price_data][product_data][name]".into(), package.name.clone()),
        ("line_items[0][price_data][product_data][description]".into(), package.description.clone()),
        ("line_items[0][price_data][unit_amount]".into(), package.price_cents.to_string()),
        ("line_items[0][quantity]".into(), "1".into()),
        ("mode".into(), "payment".into()),
        ("success_url".into(), format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", origin)),
        ("cancel_url".into(), format!("{}/", origin)),
        ("customer_email".into(), request.email.clone()),
        ("metadata[userEmail]".into(), request.email.clone()),
        ("metadata[credits]".into(), package.credits.to_string()),
    ]
}

/// IDs de sessão vão direto na URL: só aceitamos o formato do Stripe
pub fn validate_session_id(session_id: &str) -> Result<(), AppError> {
    let valid = session_id.starts_with("cs_")
        && session_id.len() <= 255
        && session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest("Invalid session_id".to_string()))
    }
}

/// Verifica o header `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`.
///
/// O payload assinado é `"<t>.<corpo bruto>"`; qualquer `v1` que bata é aceito
/// (o Stripe envia mais de um durante rotação de secret). A comparação é em
/// tempo constante via `Mac::verify_slice`.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), AppError> {
    let invalid = |msg: &str| AppError::InvalidRequest(format!("Webhook signature verification failed: {}", msg));

    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(invalid("no v1 signatures"));
    }
    // `t` vem do header sem autenticação: nada de subtração que possa estourar
    let within_tolerance = u64::try_from(tolerance_secs)
        .map_or(false, |tolerance| now.abs_diff(timestamp) <= tolerance);
    if !within_tolerance {
        return Err(invalid("timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| invalid("bad secret"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    if signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok())
    {
        Ok(())
    } else {
        Err(invalid("signature mismatch"))
    }
}

#[cfg(test)]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
