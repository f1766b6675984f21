use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Documento da collection "processed_payments" - uma entrada por checkout
/// session já convertida em créditos (índice único em session_id)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessedPayment {
    pub session_id: String,
    pub event_id: String,
    pub email: String,
    pub credits: i64,
    pub processed_at: BsonDateTime,
}

/// Subconjunto da Checkout Session do Stripe usado pelo serviço
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            Some("paid") | Some("no_payment_required")
        )
    }
}

/// Envelope de evento do webhook
#[derive(Debug, Deserialize, Clone)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

// ==================== API MODELS ====================

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyPaymentQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VerifiedSession {
    pub id: String,
    pub payment_status: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub session: VerifiedSession,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}
