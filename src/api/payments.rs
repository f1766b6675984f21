use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

use crate::{
    config::AppConfig,
    middleware::auth::Claims,
    models::{CheckoutResponse, VerifiedSession, VerifyPaymentQuery, VerifyPaymentResponse},
    services::stripe_service::{CheckoutRequest, PaymentGateway},
    utils::error::AppError,
};

#[utoipa::path(
    post,
    path = "/api/v1/payments/checkout",
    tag = "Payments",
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "Payment provider error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_checkout(
    req: HttpRequest,
    user: web::ReqData<Claims>,
    gateway: web::Data<dyn PaymentGateway>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let email = user.user_email();
    log::info!("💳 POST /payments/checkout - {}", email);

    // Volta para a origem do frontend que iniciou a compra
    let origin = req
        .headers()
        .get("Origin")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(config.frontend_url.as_str())
        .to_string();

    let request = CheckoutRequest {
        email: email.clone(),
        origin,
        package: config.credit_package.clone(),
    };

    let session = match gateway.create_checkout_session(&request).await {
        Ok(session) => session,
        Err(e) => {
            log::error!("❌ Failed to create checkout for {}: {}", email, e);
            return e.error_response();
        }
    };

    match session.url {
        Some(url) => {
            log::info!("✅ Checkout session {} created for {}", session.id, email);
            HttpResponse::Ok().json(CheckoutResponse {
                url,
                session_id: session.id,
            })
        }
        None => AppError::PaymentProvider("Checkout session has no URL".to_string()).error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/verify",
    tag = "Payments",
    params(VerifyPaymentQuery),
    responses(
        (status = 200, description = "Payment confirmed", body = VerifyPaymentResponse),
        (status = 400, description = "Missing session_id or payment not completed"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn verify_payment(
    query: web::Query<VerifyPaymentQuery>,
    gateway: web::Data<dyn PaymentGateway>,
) -> HttpResponse {
    let session_id = match query.session_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return AppError::InvalidRequest("Session ID is required".to_string()).error_response(),
    };
    log::info!("🔍 GET /payments/verify - {}", session_id);

    let session = match gateway.retrieve_checkout_session(session_id).await {
        Ok(session) => session,
        Err(e) => {
            log::warn!("❌ Failed to verify session {}: {}", session_id, e);
            return e.error_response();
        }
    };

    // Os créditos são concedidos pelo webhook; aqui só confirmamos o status
    if !session.is_paid() {
        return AppError::InvalidRequest("Payment not completed".to_string()).error_response();
    }

    HttpResponse::Ok().json(VerifyPaymentResponse {
        success: true,
        session: VerifiedSession {
            id: session.id,
            payment_status: session.payment_status,
            customer_email: session.customer_email,
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, TestContext};
    use crate::models::CheckoutSession;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_checkout_uses_token_email_and_origin() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/payments/checkout")
            .insert_header(bearer(&ctx.config, "Buyer@Example.com"))
            .insert_header(("Origin", "https://sketch.example"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["session_id"], "cs_test_1");
        assert_eq!(body["url"], "https://checkout.stripe.test/pay/cs_test_1");

        let sent = ctx.gateway.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.email, "buyer@example.com");
        assert_eq!(sent.origin, "https://sketch.example");
        assert_eq!(sent.package.credits, 7);
    }

    #[actix_web::test]
    async fn test_checkout_falls_back_to_frontend_url() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/payments/checkout")
            .insert_header(bearer(&ctx.config, "buyer@example.com"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let sent = ctx.gateway.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.origin, "http://localhost:3000");
    }

    #[actix_web::test]
    async fn test_checkout_requires_token() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post().uri("/api/v1/payments/checkout").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_verify_payment_states() {
        let ctx = TestContext::new();
        ctx.gateway.insert(CheckoutSession {
            id: "cs_paid".to_string(),
            payment_status: Some("paid".to_string()),
            customer_email: Some("buyer@example.com".to_string()),
            ..Default::default()
        });
        ctx.gateway.insert(CheckoutSession {
            id: "cs_open".to_string(),
            payment_status: Some("unpaid".to_string()),
            ..Default::default()
        });
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get().uri("/api/v1/payments/verify?session_id=cs_paid").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["session"]["payment_status"], "paid");
        assert_eq!(body["session"]["customer_email"], "buyer@example.com");

        let req = test::TestRequest::get().uri("/api/v1/payments/verify?session_id=cs_open").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/v1/payments/verify").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/v1/payments/verify?session_id=cs_missing").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        // Verificar não concede créditos
        assert_eq!(ctx.ledger.read("buyer@example.com").await.unwrap(), 0);
    }
}
