pub mod admin;
pub mod auth;
pub mod credits;
pub mod generate;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod swagger;
pub mod webhook;

use actix_web::web;

use crate::{middleware::AuthMiddleware, utils::error::AppError};

/// Desenhos chegam como data URL base64 no corpo JSON
const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// JSON malformado ou com campos inválidos vira 400 no formato padrão de erro
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            log::warn!("❌ Invalid JSON body: {}", err);
            AppError::InvalidRequest(err.to_string()).into()
        })
}

/// Tabela de rotas (compartilhada entre main e os testes de handler)
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(metrics::get_metrics))
        .service(
            web::scope("/api/v1/auth")
                .route("/verify", web::get().to(auth::verify_token))
        )
        .service(
            web::scope("/api/v1/credits")
                .wrap(AuthMiddleware)
                .route("", web::get().to(credits::get_credits))
                .route("", web::post().to(credits::adjust_credits))
        )
        .service(
            web::scope("/api/v1/admin")
                .wrap(AuthMiddleware)
                .route("/credits", web::get().to(admin::list_credits))
                .route("/credits", web::post().to(admin::update_credits))
        )
        .service(
            web::scope("/api/v1/payments")
                .route("/verify", web::get().to(payments::verify_payment))
                .service(
                    web::resource("/checkout")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(payments::create_checkout))
                )
        )
        .service(
            web::scope("/api/v1/webhooks")
                .route("/stripe", web::post().to(webhook::stripe_webhook))
        )
        .service(
            web::scope("/api/v1/generate")
                .wrap(AuthMiddleware)
                .route("", web::post().to(generate::generate_image))
        );
}
