use actix_web::{web, HttpResponse, ResponseError};

use crate::{
    config::AppConfig,
    middleware::auth::Claims,
    models::{AdjustAction, AdjustCreditsRequest, AdjustCreditsResponse, CreditsResponse, DebitOutcome},
    services::credit_service::CreditLedger,
    utils::error::AppError,
};

#[utoipa::path(
    get,
    path = "/api/v1/credits",
    tag = "Credits",
    responses(
        (status = 200, description = "Current credit balance", body = CreditsResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_credits(user: web::ReqData<Claims>, ledger: web::Data<CreditLedger>) -> HttpResponse {
    let email = user.user_email();
    log::info!("💳 GET /credits - {}", email);

    match ledger.read(&email).await {
        Ok(credits) => HttpResponse::Ok().json(CreditsResponse { credits }),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/credits",
    tag = "Credits",
    request_body = AdjustCreditsRequest,
    responses(
        (status = 200, description = "Balance adjusted", body = AdjustCreditsResponse),
        (status = 400, description = "Invalid amount or insufficient credits"),
        (status = 403, description = "Self-service add disabled; enable with SELF_SERVICE_GRANTS=true")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn adjust_credits(
    user: web::ReqData<Claims>,
    ledger: web::Data<CreditLedger>,
    config: web::Data<AppConfig>,
    request: web::Json<AdjustCreditsRequest>,
) -> HttpResponse {
    let email = user.user_email();
    log::info!("💳 POST /credits - {} {:?} {}", email, request.action, request.amount);

    match adjust(&ledger, &config, &email, &request).await {
        Ok(credits) => HttpResponse::Ok().json(AdjustCreditsResponse { success: true, credits }),
        Err(e) => {
            log::warn!("❌ Credit adjustment failed for {}: {}", email, e);
            e.error_response()
        }
    }
}

async fn adjust(
    ledger: &CreditLedger,
    config: &AppConfig,
    email: &str,
    request: &AdjustCreditsRequest,
) -> Result<i64, AppError> {
    if request.amount <= 0 {
        return Err(AppError::InvalidRequest("Amount must be a positive integer".to_string()));
    }

    match request.action {
        AdjustAction::Add => {
            // Créditos próprios só chegam via pagamento, exceto se liberado por config
            if !config.self_service_grants {
                return Err(AppError::Forbidden("Adding credits requires a purchase".to_string()));
            }
            ledger.grant(email, request.amount).await
        }
        AdjustAction::Subtract => match ledger.debit(email, request.amount).await? {
            DebitOutcome::Debited { new_balance } => Ok(new_balance),
            DebitOutcome::Rejected { current_balance } => Err(AppError::insufficient_credits(current_balance)),
        },
    }
}
