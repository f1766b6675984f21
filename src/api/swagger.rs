use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sketch Credits Service API",
        version = "1.0.0",
        description = "Credit ledger and image generation API for the sketch app. \n\n**Authentication:** Most endpoints require a JWT Bearer token issued by the sign-in provider.\n\n**Features:**\n- Per-user credit balance\n- Stripe checkout and webhook reconciliation\n- Credit-gated AI image generation\n- Admin balance management\n- Health monitoring and metrics",
        contact(
            name = "Sketch Team",
            email = "support@sketch-credits.dev"
        )
    ),
    paths(
        // Auth
        crate::api::auth::verify_token,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Credits
        crate::api::credits::get_credits,
        crate::api::credits::adjust_credits,

        // Admin
        crate::api::admin::list_credits,
        crate::api::admin::update_credits,

        // Payments
        crate::api::payments::create_checkout,
        crate::api::payments::verify_payment,
        crate::api::webhook::stripe_webhook,

        // Generation
        crate::api::generate::generate_image,
    ),
    components(
        schemas(
            crate::services::auth_service::VerifyTokenResponse,
            crate::api::health::HealthResponse,

            crate::models::CreditsResponse,
            crate::models::AdjustAction,
            crate::models::AdjustCreditsRequest,
            crate::models::AdjustCreditsResponse,
            crate::models::AdminAction,
            crate::models::AdminCreditsRequest,
            crate::models::AdminCreditsResponse,
            crate::models::UserCreditsInfo,
            crate::models::AdminUsersResponse,

            crate::models::CheckoutResponse,
            crate::models::VerifiedSession,
            crate::models::VerifyPaymentResponse,
            crate::models::WebhookAck,

            crate::models::GenerateRequest,
            crate::models::GenerateResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Token introspection. Tokens are issued by the sign-in provider and only verified here."),
        (name = "Health", description = "Health check and system metrics endpoints for monitoring service status."),
        (name = "Credits", description = "Balance of the authenticated user."),
        (name = "Admin", description = "Balance management for allow-listed admin accounts."),
        (name = "Payments", description = "Stripe checkout sessions, payment verification and the signed webhook that grants credits."),
        (name = "Generation", description = "Sketch to image generation. Each successful call consumes one credit."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}
