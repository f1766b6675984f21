use super::{MongoDB, PaymentEventStore, PROCESSED_PAYMENTS_COLLECTION};
use crate::models::ProcessedPayment;
use crate::utils::error::AppError;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};

const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(e: &MongoError) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl PaymentEventStore for MongoDB {
    async fn claim(&self, payment: &ProcessedPayment) -> Result<bool, AppError> {
        let collection = self.collection::<ProcessedPayment>(PROCESSED_PAYMENTS_COLLECTION);

        // O índice único em session_id decide quem ganha em entregas concorrentes
        match collection.insert_one(payment).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, session_id: &str) -> Result<(), AppError> {
        self.collection::<ProcessedPayment>(PROCESSED_PAYMENTS_COLLECTION)
            .delete_one(doc! { "session_id": session_id })
            .await?;
        Ok(())
    }
}
