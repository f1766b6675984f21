// CreditStore sobre MongoDB. Cada operação é um único find_one_and_update,
// atômico por documento.

use super::{CreditStore, MongoDB, USER_CREDITS_COLLECTION};
use crate::models::{DebitOutcome, UserCredits};
use crate::utils::error::AppError;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

impl MongoDB {
    fn user_credits(&self) -> Collection<UserCredits> {
        self.collection::<UserCredits>(USER_CREDITS_COLLECTION)
    }
}

fn missing_after_upsert(email: &str) -> AppError {
    AppError::DatabaseError(format!("Upsert returned no document for {}", email))
}

#[async_trait]
impl CreditStore for MongoDB {
    async fn find(&self, email: &str) -> Result<Option<UserCredits>, AppError> {
        Ok(self.user_credits().find_one(doc! { "email": email }).await?)
    }

    async fn get_or_create(&self, email: &str) -> Result<UserCredits, AppError> {
        let now = BsonDateTime::now();

        self.user_credits()
            .find_one_and_update(
                doc! { "email": email },
                doc! {
                    "$setOnInsert": {
                        "credits": 0_i64,
                        "created_at": now,
                        "updated_at": now,
                    }
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| missing_after_upsert(email))
    }

    async fn increment(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        let now = BsonDateTime::now();

        let record = self
            .user_credits()
            .find_one_and_update(
                doc! { "email": email },
                doc! {
                    "$inc": { "credits": amount },
                    "$set": { "updated_at": now },
                    "$setOnInsert": { "created_at": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| missing_after_upsert(email))?;

        Ok(record.credits)
    }

    async fn set(&self, email: &str, amount: i64) -> Result<i64, AppError> {
        let now = BsonDateTime::now();

        let record = self
            .user_credits()
            .find_one_and_update(
                doc! { "email": email },
                doc! {
                    "$set": { "credits": amount, "updated_at": now },
                    "$setOnInsert": { "created_at": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| missing_after_upsert(email))?;

        Ok(record.credits)
    }

    async fn decrement_if_sufficient(
        &self,
        email: &str,
        amount: i64,
    ) -> Result<DebitOutcome, AppError> {
        // O filtro credits >= amount é o compare-and-swap: dois débitos
        // concorrentes nunca passam do saldo.
        let debited = self
            .user_credits()
            .find_one_and_update(
                doc! { "email": email, "credits": { "$gte": amount } },
                doc! {
                    "$inc": { "credits": -amount },
                    "$set": { "updated_at": BsonDateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;

        match debited {
            Some(record) => Ok(DebitOutcome::Debited {
                new_balance: record.credits,
            }),
            None => {
                let current = self.get_or_create(email).await?;
                Ok(DebitOutcome::Rejected {
                    current_balance: current.credits,
                })
            }
        }
    }

    async fn list(&self) -> Result<Vec<UserCredits>, AppError> {
        let cursor = self.user_credits().find(doc! {}).await?;
        let users: Vec<UserCredits> = cursor.try_collect().await?;
        Ok(users)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.database().run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
