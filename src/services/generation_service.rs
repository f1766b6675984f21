// ==================== IMAGE GENERATION ====================
// Desenho (base64) → imagem estilizada via OpenAI Responses API.
// O crédito é reservado ANTES da chamada externa e devolvido se ela falhar.

use crate::{
    api::metrics,
    config::AppConfig,
    models::{DebitOutcome, GenerateResponse},
    services::credit_service::CreditLedger,
    utils::error::AppError,
};
use actix_web::http::StatusCode;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::time::Duration;

pub const GENERATION_COST: i64 = 1;

const MODEL: &str = "gpt-4o";
const PROMPT: &str = "Transform this image into a professional art made by a professional artist using an iPad.";
const IMAGE_SIZE: &str = "1536x1024";
const IMAGE_QUALITY: &str = "medium";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Recebe o PNG em base64 (sem prefixo data:) e devolve a imagem gerada em base64
    async fn transform(&self, image_base64: &str) -> Result<String, AppError>;
}

pub struct OpenAiImageGenerator {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiImageGenerator {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            http,
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesOutput {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(default)]
    text: Option<String>,
}

fn request_body(image_base64: &str) -> serde_json::Value {
    serde_json::json!({
        "model": MODEL,
        "input": [{
            "role": "user",
            "content": [
                { "type": "input_text", "text": PROMPT },
                {
                    "type": "input_image",
                    "image_url": format!("data:image/png;base64,{}", image_base64),
                    "detail": "high"
                }
            ]
        }],
        "tools": [{
            "type": "image_generation",
            "quality": IMAGE_QUALITY,
            "size": IMAGE_SIZE
        }]
    })
}

/// Primeiro `image_generation_call` com resultado; sem imagem, o texto do modelo vira erro 500
fn extract_image(response: ResponsesOutput) -> Result<String, AppError> {
    if let Some(image) = response
        .output
        .iter()
        .filter(|item| item.item_type == "image_generation_call")
        .find_map(|item| item.result.clone())
    {
        return Ok(image);
    }

    let text = response
        .output
        .iter()
        .filter(|item| item.item_type == "message")
        .flat_map(|item| item.content.iter())
        .filter_map(|content| content.text.as_deref())
        .collect::<Vec<_>>()
        .join(" ");

    Err(AppError::Generation {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: if text.is_empty() {
            "No image was generated".to_string()
        } else {
            format!("No image was generated: {}", text)
        },
    })
}

/// Mapeia o corpo de erro da OpenAI para o status devolvido ao cliente
pub fn classify_provider_error(body: &serde_json::Value) -> AppError {
    let error = &body["error"];
    let code = error["code"].as_str().or_else(|| error["type"].as_str()).unwrap_or("");
    let message = error["message"].as_str().unwrap_or("Image generation failed");

    let status = match code {
        "insufficient_quota" => StatusCode::PAYMENT_REQUIRED,
        "invalid_api_key" => StatusCode::UNAUTHORIZED,
        "model_not_found" => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_GATEWAY,
    };

    AppError::Generation {
        status,
        message: format!("Image provider error: {}", message),
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn transform(&self, image_base64: &str) -> Result<String, AppError> {
        log::info!("🎨 Sending image to {} ({} bytes base64)", MODEL, image_base64.len());

        let response = self
            .http
            .post(format!("{}/responses", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request_body(image_base64))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::Generation {
                status: StatusCode::BAD_GATEWAY,
                message: format!("Failed to reach image provider: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            log::error!("❌ Image provider returned {}: {}", status, body);
            return Err(classify_provider_error(&body));
        }

        let parsed = response
            .json::<ResponsesOutput>()
            .await
            .map_err(|e| AppError::Generation {
                status: StatusCode::BAD_GATEWAY,
                message: format!("Invalid image provider response: {}", e),
            })?;

        extract_image(parsed)
    }
}

/// Aceita data URL (`data:image/png;base64,...`) ou base64 puro
pub fn extract_base64_from_data_url(image_data: &str) -> Result<String, AppError> {
    let payload = match image_data.split_once(',') {
        Some((_, data)) => data,
        None => image_data,
    }
    .trim();

    if payload.is_empty() {
        return Err(AppError::InvalidRequest("Image data is required".to_string()));
    }

    STANDARD
        .decode(payload)
        .map_err(|_| AppError::InvalidRequest("Image data is not valid base64".to_string()))?;

    Ok(payload.to_string())
}

/// Reserva 1 crédito, chama o gerador e devolve o crédito em caso de falha
pub async fn generate_for_user(
    ledger: &CreditLedger,
    generator: &dyn ImageGenerator,
    email: &str,
    image_data: Option<&str>,
) -> Result<GenerateResponse, AppError> {
    // Rejeita cedo, antes de decodificar o desenho; o débito abaixo é que garante o saldo
    if !ledger.has_credits(email, GENERATION_COST).await? {
        return Err(AppError::payment_required(ledger.read(email).await?));
    }

    let image_data = image_data
        .filter(|data| !data.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Image data is required".to_string()))?;
    let image_base64 = extract_base64_from_data_url(image_data)?;

    let credits_remaining = match ledger.debit(email, GENERATION_COST).await? {
        DebitOutcome::Debited { new_balance } => new_balance,
        DebitOutcome::Rejected { current_balance } => {
            return Err(AppError::payment_required(current_balance));
        }
    };

    metrics::increment_generations();

    match generator.transform(&image_base64).await {
        Ok(generated) => {
            log::info!("✅ Image generated for {} (credits left: {})", email, credits_remaining);
            Ok(GenerateResponse {
                image_url: format!("data:image/png;base64,{}", generated),
                message: "Image edited successfully!".to_string(),
                credits_remaining,
            })
        }
        Err(e) => {
            metrics::increment_generations_failed();
            log::error!("❌ Generation failed for {}: {}", email, e);

            if let Err(refund_err) = ledger.grant(email, GENERATION_COST).await {
                log::error!("❌ Failed to refund credit to {}: {}", email, refund_err);
            }
            Err(e)
        }
    }
}
