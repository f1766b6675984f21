use actix_web::{web, HttpResponse, ResponseError};

use crate::{
    middleware::auth::Claims,
    models::{GenerateRequest, GenerateResponse},
    services::{
        credit_service::CreditLedger,
        generation_service::{self, ImageGenerator},
    },
};

#[utoipa::path(
    post,
    path = "/api/v1/generate",
    tag = "Generation",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Image generated, one credit consumed", body = GenerateResponse),
        (status = 400, description = "Missing or invalid imageData"),
        (status = 402, description = "No credits left"),
        (status = 502, description = "Image provider error (credit refunded)")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn generate_image(
    user: web::ReqData<Claims>,
    ledger: web::Data<CreditLedger>,
    generator: web::Data<dyn ImageGenerator>,
    request: web::Json<GenerateRequest>,
) -> HttpResponse {
    let email = user.user_email();
    log::info!("🎨 POST /generate - {}", email);

    match generation_service::generate_for_user(
        &ledger,
        generator.get_ref(),
        &email,
        request.image_data.as_deref(),
    )
    .await
    {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}
