// ==================== CREDIT LEDGER ====================
// Saldo de créditos por usuário (chave = email). O ledger é injetado nos
// handlers via web::Data; o backend concreto (MongoDB ou memória) é decidido
// no startup.

use crate::{
    api::metrics,
    database::CreditStore,
    models::{DebitOutcome, UserCredits},
    utils::error::AppError,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn CreditStore>,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }

    /// Saldo atual. Usuário desconhecido é materializado com 0 créditos.
    pub async fn read(&self, email: &str) -> Result<i64, AppError> {
        let record = self.store.get_or_create(email).await?;
        log::debug!("🔍 Credits for {}: {}", email, record.credits);
        Ok(record.credits)
    }

    /// Checagem somente leitura (não materializa o registro)
    pub async fn has_credits(&self, email: &str, amount: i64) -> Result<bool, AppError> {
        let record = self.store.find(email).await?;
        Ok(record.map_or(false, |r| r.credits >= amount))
    }

    /// Adiciona créditos incondicionalmente
    pub async fn grant(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        let new_balance = self.store.increment(email, amount).await?;
        metrics::add_credits_granted(amount);
        log::info!("💰 Granted {} credits to {} (balance: {})", amount, email, new_balance);
        Ok(new_balance)
    }

    /// Debita somente se houver saldo suficiente; caso contrário o saldo fica intacto
    pub async fn debit(&self, email: &str, amount: i64) -> Result<DebitOutcome, AppError> {
        let outcome = self.store.decrement_if_sufficient(email, amount).await?;

        match outcome {
            DebitOutcome::Debited { new_balance } => {
                metrics::add_credits_debited(amount);
                log::info!("💸 Debited {} credits from {} (balance: {})", amount, email, new_balance);
            }
            DebitOutcome::Rejected { current_balance } => {
                metrics::increment_debits_rejected();
                log::warn!(
                    "⚠️ Insufficient credits for {}: requested {}, available {}",
                    email, amount, current_balance
                );
            }
        }

        Ok(outcome)
    }

    /// Define o saldo explicitamente (admin)
    pub async fn overwrite(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        let credits = self.store.set(email, amount).await?;
        log::info!("🛠️ Credits for {} set to {}", email, credits);
        Ok(credits)
    }

    pub async fn list(&self) -> Result<Vec<UserCredits>, AppError> {
        self.store.list().await
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await
    }
}
