mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::{AppConfig, StoreBackend};
use database::{CreditStore, InMemoryStore, MongoDB, PaymentEventStore};
use services::{
    credit_service::CreditLedger,
    generation_service::{ImageGenerator, OpenAiImageGenerator},
    stripe_service::{PaymentGateway, StripeClient},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting Sketch Credits Service...");

    // Store: MongoDB em produção, memória para dev local
    let (credit_store, payment_store): (Arc<dyn CreditStore>, Arc<dyn PaymentEventStore>) =
        match (config.store_backend, config.database_url.as_deref()) {
            (StoreBackend::MongoDB, Some(database_url)) => {
                let db = match MongoDB::new(database_url).await {
                    Ok(db) => Arc::new(db),
                    Err(e) => {
                        log::error!("❌ Failed to connect to MongoDB: {}", e);
                        std::process::exit(1);
                    }
                };
                log::info!("✅ MongoDB connected successfully");
                let credits: Arc<dyn CreditStore> = db.clone();
                let payments: Arc<dyn PaymentEventStore> = db;
                (credits, payments)
            }
            (StoreBackend::MongoDB, None) => {
                log::error!("❌ DATABASE_URL must be set");
                std::process::exit(1);
            }
            (StoreBackend::Memory, _) => {
                log::warn!("⚠️  Using in-memory credit store: balances are lost on restart");
                let store = Arc::new(InMemoryStore::new());
                let credits: Arc<dyn CreditStore> = store.clone();
                let payments: Arc<dyn PaymentEventStore> = store;
                (credits, payments)
            }
        };

    // Cliente HTTP compartilhado (pool de conexões para Stripe e OpenAI)
    let http = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeClient::new(http.clone(), &config));
    let generator: Arc<dyn ImageGenerator> = Arc::new(OpenAiImageGenerator::new(http, &config));

    let ledger_data = web::Data::new(CreditLedger::new(credit_store));
    let payments_data = web::Data::from(payment_store);
    let gateway_data = web::Data::from(gateway);
    let generator_data = web::Data::from(generator);
    let config_data = web::Data::new(config.clone());

    let host = config.host.clone();
    let port = config.port;
    let frontend_url = config.frontend_url.clone();

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(config_data.clone())
            .app_data(ledger_data.clone())
            .app_data(payments_data.clone())
            .app_data(gateway_data.clone())
            .app_data(generator_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .configure(api::configure)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
