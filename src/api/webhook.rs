use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

use crate::{
    config::AppConfig,
    database::PaymentEventStore,
    models::{WebhookAck, WebhookEvent},
    services::{
        credit_service::CreditLedger,
        stripe_service::{verify_webhook_signature, SIGNATURE_TOLERANCE_SECS},
        webhook_service::{self, WebhookOutcome},
    },
    utils::error::AppError,
};

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/stripe",
    tag = "Payments",
    request_body(content = String, description = "Raw Stripe event payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Missing or invalid Stripe-Signature"),
        (status = 500, description = "Credit store failure; Stripe retries the delivery")
    )
)]
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    ledger: web::Data<CreditLedger>,
    payments: web::Data<dyn PaymentEventStore>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let signature = match req.headers().get("Stripe-Signature").and_then(|v| v.to_str().ok()) {
        Some(signature) => signature,
        None => {
            log::warn!("❌ Webhook without Stripe-Signature header");
            return AppError::InvalidRequest("Missing Stripe-Signature header".to_string()).error_response();
        }
    };

    // A assinatura cobre os bytes exatos do corpo: validar antes de qualquer parse
    if let Err(e) = verify_webhook_signature(
        &body,
        signature,
        &config.stripe_webhook_secret,
        chrono::Utc::now().timestamp(),
        SIGNATURE_TOLERANCE_SECS,
    ) {
        log::warn!("❌ {}", e);
        return e.error_response();
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("❌ Invalid webhook payload: {}", e);
            return AppError::InvalidRequest(format!("Invalid event payload: {}", e)).error_response();
        }
    };

    log::info!("📨 Webhook {} ({})", event.id, event.event_type);

    // Payload ruim é confirmado (reenviar não adianta); falha de store vira 5xx
    // para o Stripe reenviar, e o claim liberado garante crédito único no replay
    match webhook_service::process_event(&ledger, payments.get_ref(), &event).await {
        Ok(WebhookOutcome::Granted { email, credits, balance }) => {
            log::info!("✅ Event {} granted {} credits to {} (balance: {})", event.id, credits, email, balance)
        }
        Ok(WebhookOutcome::Duplicate { session_id }) => {
            log::info!("🔁 Event {} ignored: session {} already processed", event.id, session_id)
        }
        Ok(WebhookOutcome::Ignored(reason)) => log::info!("ℹ️  Event {} ignored: {}", event.id, reason),
        Ok(WebhookOutcome::Unhandled(event_type)) => log::debug!("Event {} unhandled ({})", event.id, event_type),
        Err(AppError::InvalidRequest(reason)) => log::warn!("⚠️ Event {} acknowledged without credit: {}", event.id, reason),
        Err(e) => {
            log::error!("❌ Failed to process webhook {}: {}", event.id, e);
            return e.error_response();
        }
    }

    HttpResponse::Ok().json(WebhookAck { received: true })
}
