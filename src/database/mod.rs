pub mod credits_repository;
pub mod memory;
pub mod payments_repository;
#[cfg(test)]
pub mod testing;

pub use memory::InMemoryStore;

use crate::models::{DebitOutcome, ProcessedPayment, UserCredits};
use crate::utils::error::AppError;
use async_trait::async_trait;
use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const USER_CREDITS_COLLECTION: &str = "user_credits";
pub const PROCESSED_PAYMENTS_COLLECTION: &str = "processed_payments";

/// Armazenamento do saldo de créditos. Toda mutação é uma única operação atômica
/// no backend, nunca read-then-write.
#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn find(&self, email: &str) -> Result<Option<UserCredits>, AppError>;

    /// Busca o registro, criando-o com saldo 0 se não existir
    async fn get_or_create(&self, email: &str) -> Result<UserCredits, AppError>;

    /// Soma `amount` ao saldo (upsert), retorna o novo saldo
    async fn increment(&self, email: &str, amount: i64) -> Result<i64, AppError>;

    /// Define o saldo (upsert), retorna o valor gravado
    async fn set(&self, email: &str, amount: i64) -> Result<i64, AppError>;

    /// Subtrai `amount` somente se o saldo atual for >= amount
    async fn decrement_if_sufficient(&self, email: &str, amount: i64)
        -> Result<DebitOutcome, AppError>;

    async fn list(&self) -> Result<Vec<UserCredits>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Registro de pagamentos já convertidos em créditos (idempotência do webhook)
#[async_trait]
pub trait PaymentEventStore: Send + Sync {
    /// `true` se o pagamento foi reivindicado agora, `false` se já havia sido processado
    async fn claim(&self, payment: &ProcessedPayment) -> Result<bool, AppError>;

    /// Desfaz um claim (usado quando o crédito falha depois do claim)
    async fn release(&self, session_id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = database_name_from_uri(uri);

        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Índices únicos: garantem um documento por email e um claim por checkout session
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let credits = self.collection::<mongodb::bson::Document>(USER_CREDITS_COLLECTION);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match credits.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: user_credits(email) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let payments = self.collection::<mongodb::bson::Document>(PROCESSED_PAYMENTS_COLLECTION);

        let session_index = IndexModel::builder()
            .keys(doc! { "session_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match payments.create_index(session_index).await {
            Ok(_) => log::info!("   ✅ Index created: processed_payments(session_id) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn database_name_from_uri(uri: &str) -> String {
    // mongodb://host:27017/SketchCredits?retryWrites=true -> SketchCredits
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("SketchCredits")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(
            database_name_from_uri("mongodb://localhost:27017/Credits?retryWrites=true"),
            "Credits"
        );
        assert_eq!(
            database_name_from_uri("mongodb+srv://user:pw@cluster0.example.net/Prod"),
            "Prod"
        );
        assert_eq!(database_name_from_uri("mongodb://localhost:27017"), "SketchCredits");
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/"), "SketchCredits");
    }
}
