// Store em memória que pode ser "derrubado" nos testes: enquanto `failing`
// estiver ligado, increment/set/ping devolvem DatabaseError.

use super::{CreditStore, InMemoryStore, PaymentEventStore};
use crate::models::{DebitOutcome, ProcessedPayment, UserCredits};
use crate::utils::error::AppError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn processed_count(&self) -> usize {
        self.inner.processed_count().await
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::DatabaseError("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CreditStore for FlakyStore {
    async fn find(&self, email: &str) -> Result<Option<UserCredits>, AppError> {
        self.inner.find(email).await
    }

    async fn get_or_create(&self, email: &str) -> Result<UserCredits, AppError> {
        self.inner.get_or_create(email).await
    }

    async fn increment(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        self.check()?;
        self.inner.increment(email, amount).await
    }

    async fn set(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        self.check()?;
        self.inner.set(email, amount).await
    }

    async fn decrement_if_sufficient(&self, email: &str, amount: i64) -> Result<DebitOutcome, AppError> {
        self.inner.decrement_if_sufficient(email, amount).await
    }

    async fn list(&self) -> Result<Vec<UserCredits>, AppError> {
        self.inner.list().await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check()?;
        self.inner.ping().await
    }
}

#[async_trait]
impl PaymentEventStore for FlakyStore {
    async fn claim(&self, payment: &ProcessedPayment) -> Result<bool, AppError> {
        self.inner.claim(payment).await
    }

    async fn release(&self, session_id: &str) -> Result<(), AppError> {
        self.inner.release(session_id).await
    }
}
