// Backend em memória (STORE_BACKEND=memory e testes). Sem persistência.
// Cada operação segura o write lock durante todo o read-modify-write.

use super::{CreditStore, PaymentEventStore};
use crate::models::{DebitOutcome, ProcessedPayment, UserCredits};
use crate::utils::error::AppError;
use async_trait::async_trait;
use mongodb::bson::DateTime as BsonDateTime;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    credits: RwLock<HashMap<String, UserCredits>>,
    payments: RwLock<HashMap<String, ProcessedPayment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn processed_count(&self) -> usize {
        self.payments.read().await.len()
    }
}

#[async_trait]
impl CreditStore for InMemoryStore {
    async fn find(&self, email: &str) -> Result<Option<UserCredits>, AppError> {
        Ok(self.credits.read().await.get(email).cloned())
    }

    async fn get_or_create(&self, email: &str) -> Result<UserCredits, AppError> {
        let mut credits = self.credits.write().await;
        Ok(credits
            .entry(email.to_string())
            .or_insert_with(|| UserCredits::new(email, 0))
            .clone())
    }

    async fn increment(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        let mut credits = self.credits.write().await;
        let record = credits
            .entry(email.to_string())
            .or_insert_with(|| UserCredits::new(email, 0));
        record.credits = record
            .credits
            .checked_add(amount)
            .ok_or_else(|| AppError::InvalidRequest("credit balance overflow".to_string()))?;
        record.updated_at = BsonDateTime::now();
        Ok(record.credits)
    }

    async fn set(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        let mut credits = self.credits.write().await;
        let record = credits
            .entry(email.to_string())
            .or_insert_with(|| UserCredits::new(email, amount));
        record.credits = amount;
        record.updated_at = BsonDateTime::now();
        Ok(amount)
    }

    async fn decrement_if_sufficient(
        &self,
        email: &str,
        amount: i64,
    ) -> Result<DebitOutcome, AppError> {
        let mut credits = self.credits.write().await;
        let record = credits
            .entry(email.to_string())
            .or_insert_with(|| UserCredits::new(email, 0));

        if record.credits < amount {
            return Ok(DebitOutcome::Rejected {
                current_balance: record.credits,
            });
        }

        record.credits -= amount;
        record.updated_at = BsonDateTime::now();
        Ok(DebitOutcome::Debited {
            new_balance: record.credits,
        })
    }

    async fn list(&self) -> Result<Vec<UserCredits>, AppError> {
        let mut users: Vec<UserCredits> = self.credits.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl PaymentEventStore for InMemoryStore {
    async fn claim(&self, payment: &ProcessedPayment) -> Result<bool, AppError> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.session_id) {
            return Ok(false);
        }
        payments.insert(payment.session_id.clone(), payment.clone());
        Ok(true)
    }

    async fn release(&self, session_id: &str) -> Result<(), AppError> {
        self.payments.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(session_id: &str) -> ProcessedPayment {
        ProcessedPayment {
            session_id: session_id.to_string(),
            event_id: "evt_1".to_string(),
            email: "user@example.com".to_string(),
            credits: 7,
            processed_at: BsonDateTime::now(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_materializes_zero_record() {
        let store = InMemoryStore::new();
        assert!(store.find("new@example.com").await.unwrap().is_none());

        let record = store.get_or_create("new@example.com").await.unwrap();
        assert_eq!(record.credits, 0);
        assert_eq!(record.email, "new@example.com");
        assert!(store.find("new@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_keeps_created_at() {
        let store = InMemoryStore::new();
        let created = store.get_or_create("a@example.com").await.unwrap().created_at;
        store.set("a@example.com", 42).await.unwrap();

        let record = store.find("a@example.com").await.unwrap().unwrap();
        assert_eq!(record.credits, 42);
        assert_eq!(record.created_at, created);
    }

    #[tokio::test]
    async fn test_increment_overflow_is_rejected() {
        let store = InMemoryStore::new();
        store.set("a@example.com", i64::MAX).await.unwrap();
        assert!(store.increment("a@example.com", 1).await.is_err());
        assert_eq!(
            store.find("a@example.com").await.unwrap().unwrap().credits,
            i64::MAX
        );
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_email() {
        let store = InMemoryStore::new();
        store.increment("b@example.com", 1).await.unwrap();
        store.increment("a@example.com", 2).await.unwrap();

        let users = store.list().await.unwrap();
        let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_claim_is_exactly_once() {
        let store = InMemoryStore::new();
        assert!(store.claim(&payment("cs_1")).await.unwrap());
        assert!(!store.claim(&payment("cs_1")).await.unwrap());
        assert!(store.claim(&payment("cs_2")).await.unwrap());

        store.release("cs_1").await.unwrap();
        assert!(store.claim(&payment("cs_1")).await.unwrap());
        assert_eq!(store.processed_count().await, 2);
    }
}
