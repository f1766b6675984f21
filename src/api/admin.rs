use actix_web::{web, HttpResponse, ResponseError};

use crate::{
    config::AppConfig,
    middleware::auth::Claims,
    models::{AdminAction, AdminCreditsRequest, AdminCreditsResponse, AdminUsersResponse, UserCreditsInfo},
    services::{auth_service::normalize_email, credit_service::CreditLedger},
    utils::error::AppError,
};

fn require_admin(config: &AppConfig, user: &Claims) -> Result<(), AppError> {
    if config.is_admin(&user.user_email()) {
        Ok(())
    } else {
        log::warn!("🚫 Admin access denied for {}", user.user_email());
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/credits",
    tag = "Admin",
    responses(
        (status = 200, description = "All credit records", body = AdminUsersResponse),
        (status = 403, description = "Caller is not an admin")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_credits(
    user: web::ReqData<Claims>,
    ledger: web::Data<CreditLedger>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    log::info!("🛠️ GET /admin/credits - {}", user.user_email());

    if let Err(e) = require_admin(&config, &user) {
        return e.error_response();
    }

    match ledger.list().await {
        Ok(records) => {
            let users: Vec<UserCreditsInfo> = records.into_iter().map(UserCreditsInfo::from).collect();
            HttpResponse::Ok().json(AdminUsersResponse {
                total: users.len(),
                users,
            })
        }
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/credits",
    tag = "Admin",
    request_body = AdminCreditsRequest,
    responses(
        (status = 200, description = "Balance updated", body = AdminCreditsResponse),
        (status = 400, description = "Invalid amount or insufficient credits"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_credits(
    user: web::ReqData<Claims>,
    ledger: web::Data<CreditLedger>,
    config: web::Data<AppConfig>,
    request: web::Json<AdminCreditsRequest>,
) -> HttpResponse {
    log::info!(
        "🛠️ POST /admin/credits - {} {:?} {} for {}",
        user.user_email(), request.action, request.credits, request.email
    );

    if let Err(e) = require_admin(&config, &user) {
        return e.error_response();
    }

    let email = normalize_email(&request.email);
    match apply(&ledger, &email, request.action, request.credits).await {
        Ok(credits) => HttpResponse::Ok().json(AdminCreditsResponse {
            success: true,
            email,
            credits,
            action: request.action,
        }),
        Err(e) => {
            log::warn!("❌ Admin credit update failed for {}: {}", email, e);
            e.error_response()
        }
    }
}

async fn apply(ledger: &CreditLedger, email: &str, action: AdminAction, amount: i64) -> Result<i64, AppError> {
    if email.is_empty() {
        return Err(AppError::InvalidRequest("Email is required".to_string()));
    }

    match action {
        AdminAction::Set if amount < 0 => {
            Err(AppError::InvalidRequest("Credits cannot be negative".to_string()))
        }
        AdminAction::Set => ledger.overwrite(email, amount).await,
        _ if amount <= 0 => Err(AppError::InvalidRequest("Credits must be a positive integer".to_string())),
        AdminAction::Add => ledger.grant(email, amount).await,
        AdminAction::Subtract => {
            let outcome = ledger.debit(email, amount).await?;
            if outcome.is_debited() {
                Ok(outcome.balance())
            } else {
                Err(AppError::insufficient_credits(outcome.balance()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, TestContext};
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_non_admin_is_forbidden() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/credits")
            .insert_header(bearer(&ctx.config, "user@example.com"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/v1/admin/credits")
            .insert_header(bearer(&ctx.config, "user@example.com"))
            .set_json(serde_json::json!({ "email": "user@example.com", "credits": 999, "action": "set" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(ctx.ledger.read("user@example.com").await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_admin_set_add_subtract() {
        let ctx = TestContext::new();
        let app = test::init_service(ctx.app()).await;

        let post = |payload: serde_json::Value| {
            test::TestRequest::post()
                .uri("/api/v1/admin/credits")
                .insert_header(bearer(&ctx.config, "Admin@Example.com"))
                .set_json(payload)
                .to_request()
        };

        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            post(serde_json::json!({ "email": "User@Example.com", "credits": 10, "action": "set" })),
        )
        .await;
        assert_eq!(
            body,
            serde_json::json!({ "success": true, "email": "user@example.com", "credits": 10, "action": "set" })
        );

        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            post(serde_json::json!({ "email": "user@example.com", "credits": 5, "action": "add" })),
        )
        .await;
        assert_eq!(body["credits"], 15);

        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            post(serde_json::json!({ "email": "user@example.com", "credits": 4, "action": "subtract" })),
        )
        .await;
        assert_eq!(body["credits"], 11);

        let res = test::call_service(
            &app,
            post(serde_json::json!({ "email": "user@example.com", "credits": 50, "action": "subtract" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = test::call_service(
            &app,
            post(serde_json::json!({ "email": "user@example.com", "credits": -1, "action": "set" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        assert_eq!(ctx.ledger.read("user@example.com").await.unwrap(), 11);
    }

    #[actix_web::test]
    async fn test_admin_list() {
        let ctx = TestContext::new();
        ctx.ledger.grant("b@example.com", 2).await.unwrap();
        ctx.ledger.grant("a@example.com", 1).await.unwrap();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/credits")
            .insert_header(bearer(&ctx.config, "admin@example.com"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["total"], 2);
        assert_eq!(body["users"][0]["email"], "a@example.com");
        assert_eq!(body["users"][1]["credits"], 2);
    }
}
