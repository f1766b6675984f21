use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::services::credit_service::CreditLedger;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub store: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Credit store unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(ledger: web::Data<CreditLedger>) -> impl Responder {
    let (status, store) = match ledger.ping().await {
        Ok(()) => ("healthy", "ok".to_string()),
        Err(e) => {
            log::error!("❌ Health check: store ping failed: {}", e);
            ("degraded", "unreachable".to_string())
        }
    };

    let body = HealthResponse {
        status: status.to_string(),
        service: "sketch-credits-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store,
        timestamp: chrono::Utc::now().timestamp(),
    };

    if status == "healthy" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

#[cfg(test)]
mod tests {
    use crate::api::testing::TestContext;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_health_with_memory_store() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "sketch-credits-service");
        assert_eq!(body["store"], "ok");
    }

    #[actix_web::test]
    async fn test_health_degraded_when_store_unreachable() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;
        ctx.store.set_failing(true);

        let req = test::TestRequest::get().uri("/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["store"], "unreachable");
    }

    #[actix_web::test]
    async fn test_metrics_exposes_counters() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("credits_granted_total"));
        assert!(text.contains("generations_total"));
    }
}
