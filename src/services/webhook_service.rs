// ==================== PAYMENT → CREDIT RECONCILIATION ====================
// Converte eventos de checkout concluído em créditos, no máximo uma vez por
// checkout session (claim em processed_payments antes do grant).

use crate::{
    api::metrics,
    database::PaymentEventStore,
    models::{CheckoutSession, ProcessedPayment, WebhookEvent},
    services::{auth_service::normalize_email, credit_service::CreditLedger},
    utils::error::AppError,
};
use mongodb::bson::DateTime as BsonDateTime;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_ASYNC_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";

#[derive(Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Granted { email: String, credits: i64, balance: i64 },
    Duplicate { session_id: String },
    Ignored(String),
    Unhandled(String),
}

pub async fn process_event(
    ledger: &CreditLedger,
    payments: &dyn PaymentEventStore,
    event: &WebhookEvent,
) -> Result<WebhookOutcome, AppError> {
    metrics::increment_webhook_events();

    if event.event_type != CHECKOUT_COMPLETED && event.event_type != CHECKOUT_ASYNC_SUCCEEDED {
        log::info!("ℹ️  Unhandled event type {}", event.event_type);
        return Ok(WebhookOutcome::Unhandled(event.event_type.clone()));
    }

    let session: CheckoutSession = serde_json::from_value(event.data.object.clone())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid checkout session payload: {}", e)))?;

    // completed com pagamento pendente (boleto etc): o async_payment_succeeded vem depois
    if !session.is_paid() {
        log::info!(
            "⏳ Session {} not paid yet (payment_status: {:?})",
            session.id, session.payment_status
        );
        return Ok(WebhookOutcome::Ignored(format!("session {} not paid", session.id)));
    }

    let (email, credits) = match purchase_from_metadata(&session) {
        Some(purchase) => purchase,
        None => {
            log::warn!("⚠️ Session {} has no usable userEmail/credits metadata", session.id);
            return Ok(WebhookOutcome::Ignored(format!("session {} without metadata", session.id)));
        }
    };

    let claim = ProcessedPayment {
        session_id: session.id.clone(),
        event_id: event.id.clone(),
        email: email.clone(),
        credits,
        processed_at: BsonDateTime::now(),
    };

    if !payments.claim(&claim).await? {
        metrics::increment_webhook_duplicates();
        log::info!("🔁 Session {} already credited, skipping event {}", session.id, event.id);
        return Ok(WebhookOutcome::Duplicate { session_id: session.id });
    }

    match ledger.grant(&email, credits).await {
        Ok(balance) => {
            log::info!("✅ Credits added: {} for {} (total: {})", credits, email, balance);
            Ok(WebhookOutcome::Granted { email, credits, balance })
        }
        Err(e) => {
            // Libera o claim para que um replay do evento possa creditar
            if let Err(release_err) = payments.release(&session.id).await {
                log::error!("❌ Failed to release claim for {}: {}", session.id, release_err);
            }
            Err(e)
        }
    }
}

fn purchase_from_metadata(session: &CheckoutSession) -> Option<(String, i64)> {
    let email = normalize_email(session.metadata.get("userEmail")?);
    let credits = session.metadata.get("credits")?.trim().parse::<i64>().ok()?;

    if email.is_empty() || credits <= 0 {
        return None;
    }

    Some((email, credits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{testing::FlakyStore, InMemoryStore};
    use crate::models::WebhookEventData;
    use std::sync::Arc;

    fn event(id: &str, event_type: &str, object: serde_json::Value) -> WebhookEvent {
        WebhookEvent {
            id: id.to_string(),
            event_type: event_type.to_string(),
            data: WebhookEventData { object },
        }
    }

    fn completed(id: &str, session_id: &str) -> WebhookEvent {
        event(
            id,
            CHECKOUT_COMPLETED,
            serde_json::json!({
                "id": session_id,
                "payment_status": "paid",
                "metadata": { "userEmail": "Buyer@Example.com", "credits": "7" }
            }),
        )
    }

    fn setup() -> (CreditLedger, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (CreditLedger::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_completed_session_grants_credits() {
        let (ledger, store) = setup();

        let outcome = process_event(&ledger, store.as_ref(), &completed("evt_1", "cs_1")).await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Granted {
                email: "buyer@example.com".to_string(),
                credits: 7,
                balance: 7
            }
        );
        assert_eq!(ledger.read("buyer@example.com").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_grants_once() {
        let (ledger, store) = setup();

        process_event(&ledger, store.as_ref(), &completed("evt_1", "cs_1")).await.unwrap();
        let outcome = process_event(&ledger, store.as_ref(), &completed("evt_1", "cs_1")).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::Duplicate { session_id: "cs_1".to_string() });
        assert_eq!(ledger.read("buyer@example.com").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_async_success_after_unpaid_completion() {
        let (ledger, store) = setup();
        let metadata = serde_json::json!({ "userEmail": "buyer@example.com", "credits": "7" });

        let pending = event(
            "evt_1",
            CHECKOUT_COMPLETED,
            serde_json::json!({ "id": "cs_1", "payment_status": "unpaid", "metadata": metadata }),
        );
        assert!(matches!(
            process_event(&ledger, store.as_ref(), &pending).await.unwrap(),
            WebhookOutcome::Ignored(_)
        ));
        assert_eq!(ledger.read("buyer@example.com").await.unwrap(), 0);

        let succeeded = event(
            "evt_2",
            CHECKOUT_ASYNC_SUCCEEDED,
            serde_json::json!({ "id": "cs_1", "payment_status": "paid", "metadata": metadata }),
        );
        process_event(&ledger, store.as_ref(), &succeeded).await.unwrap();
        assert_eq!(ledger.read("buyer@example.com").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bad_metadata_is_ignored() {
        let (ledger, store) = setup();

        for metadata in [
            serde_json::json!({ "credits": "7" }),
            serde_json::json!({ "userEmail": "buyer@example.com", "credits": "seven" }),
            serde_json::json!({ "userEmail": "buyer@example.com", "credits": "-3" }),
        ] {
            let evt = event(
                "evt_x",
                CHECKOUT_COMPLETED,
                serde_json::json!({ "id": "cs_x", "payment_status": "paid", "metadata": metadata }),
            );
            assert!(matches!(
                process_event(&ledger, store.as_ref(), &evt).await.unwrap(),
                WebhookOutcome::Ignored(_)
            ));
        }

        assert_eq!(store.processed_count().await, 0);
        assert_eq!(ledger.read("buyer@example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_grant_releases_claim_for_replay() {
        let store = Arc::new(FlakyStore::new());
        let ledger = CreditLedger::new(store.clone());
        let evt = completed("evt_1", "cs_1");

        store.set_failing(true);
        assert!(matches!(
            process_event(&ledger, store.as_ref(), &evt).await,
            Err(AppError::DatabaseError(_))
        ));
        assert_eq!(store.processed_count().await, 0);

        store.set_failing(false);
        assert!(matches!(
            process_event(&ledger, store.as_ref(), &evt).await.unwrap(),
            WebhookOutcome::Granted { balance: 7, .. }
        ));
        assert_eq!(
            process_event(&ledger, store.as_ref(), &evt).await.unwrap(),
            WebhookOutcome::Duplicate { session_id: "cs_1".to_string() }
        );
        assert_eq!(store.processed_count().await, 1);
        assert_eq!(ledger.read("buyer@example.com").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_other_event_types_are_unhandled() {
        let (ledger, store) = setup();
        let evt = event("evt_9", "payment_intent.created", serde_json::json!({ "id": "pi_1" }));

        assert_eq!(
            process_event(&ledger, store.as_ref(), &evt).await.unwrap(),
            WebhookOutcome::Unhandled("payment_intent.created".to_string())
        );
    }
}
