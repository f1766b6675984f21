use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

/// Documento da collection "user_credits" (um por usuário, chave = email)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserCredits {
    pub email: String,
    #[serde(default)]
    pub credits: i64,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl UserCredits {
    pub fn new(email: &str, credits: i64) -> Self {
        let now = BsonDateTime::now();
        Self {
            email: email.to_string(),
            credits,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Resultado de um débito condicional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Debited { new_balance: i64 },
    Rejected { current_balance: i64 },
}

impl DebitOutcome {
    pub fn is_debited(&self) -> bool {
        matches!(self, DebitOutcome::Debited { .. })
    }

    pub fn balance(&self) -> i64 {
        match self {
            DebitOutcome::Debited { new_balance } => *new_balance,
            DebitOutcome::Rejected { current_balance } => *current_balance,
        }
    }
}

// ==================== API MODELS ====================

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreditsResponse {
    pub credits: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdjustAction {
    Add,
    Subtract,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AdjustCreditsRequest {
    pub action: AdjustAction,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AdjustCreditsResponse {
    pub success: bool,
    pub credits: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdminAction {
    Set,
    Add,
    Subtract,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AdminCreditsRequest {
    pub email: String,
    pub credits: i64,
    pub action: AdminAction,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AdminCreditsResponse {
    pub success: bool,
    pub email: String,
    pub credits: i64,
    pub action: AdminAction,
}

/// UserCredits com timestamps em RFC 3339 (para JSON)
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserCreditsInfo {
    pub email: String,
    pub credits: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserCredits> for UserCreditsInfo {
    fn from(record: UserCredits) -> Self {
        Self {
            email: record.email,
            credits: record.credits,
            created_at: record
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            updated_at: record
                .updated_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AdminUsersResponse {
    pub users: Vec<UserCreditsInfo>,
    pub total: usize,
}
