use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

use crate::{
    config::AppConfig,
    services::auth_service::{self, VerifyTokenResponse},
    utils::error::AppError,
};

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(req: HttpRequest, config: web::Data<AppConfig>) -> HttpResponse {
    log::info!("✓ GET /auth/verify");

    let token = match req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(auth_service::bearer_token)
    {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("No valid Authorization header".to_string()).error_response();
        }
    };

    match auth_service::verify_token(&config, token) {
        Ok(claims) => {
            let email = claims.user_email();
            log::info!("✅ Token valid for user: {}", email);
            HttpResponse::Ok().json(VerifyTokenResponse {
                success: true,
                valid: true,
                user_id: claims.sub,
                is_admin: config.is_admin(&email),
                email,
                exp: claims.exp,
            })
        }
        Err(e) => {
            log::warn!("❌ Invalid token: {}", e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, TestContext};
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_verify_reports_admin_flag() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/verify")
            .insert_header(bearer(&ctx.config, "admin@example.com"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["is_admin"], true);

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/verify")
            .insert_header(bearer(&ctx.config, "user@example.com"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["email"], "user@example.com");
        assert_eq!(body["is_admin"], false);
    }

    #[actix_web::test]
    async fn test_verify_without_header() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get().uri("/api/v1/auth/verify").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
