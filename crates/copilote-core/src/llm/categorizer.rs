use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::categories::{self, AI_ERROR_SUBCATEGORY, AI_SUBCATEGORY, NEEDS_REVIEW};
use crate::config::ModelConfig;
use crate::llm::LLMClient;
use crate::llm::extract::extract_json_object;
use crate::llm::gate::AiCallGate;
use crate::llm::prompt::PromptBuilder;
use crate::llm::types::CompletionRequest;
use crate::transactions::Transaction;

/// Result of an AI categorization, already validated and clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct AiAnalysis {
    pub clean_label: String,
    pub category: String,
    pub subcategory: String,
}

impl AiAnalysis {
    /// Whether the model declined to categorize (or the call failed).
    pub fn needs_review(&self) -> bool {
        self.category == NEEDS_REVIEW
    }
}

#[derive(Debug, Error)]
enum AnalysisParseError {
    #[error("no json object in response")]
    NoJsonObject,
    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize, Default)]
struct RawAnalysis {
    #[serde(default)]
    libelle_nettoye: Option<String>,
    #[serde(default)]
    categorie: Option<String>,
}

/// Adapter around the model call: prompt, cooldown gate, lenient parsing,
/// category clamping, failure downgrade.
pub struct AiCategorizer {
    client: Arc<dyn LLMClient>,
    gate: Arc<AiCallGate>,
    prompt: PromptBuilder,
    temperature: f32,
    max_tokens: u32,
}

impl AiCategorizer {
    pub fn new(client: Arc<dyn LLMClient>, gate: Arc<AiCallGate>, model: &ModelConfig) -> Self {
        Self {
            client,
            gate,
            prompt: PromptBuilder::new(),
            temperature: model.temperature,
            max_tokens: model.max_output_tokens,
        }
    }

    /// Never fails: every transport or parse problem downgrades to the
    /// review sentinel with the "Erreur IA" subcategory.
    pub async fn categorize(&self, transaction: &Transaction, user_id: i64) -> AiAnalysis {
        let request = CompletionRequest {
            messages: self.prompt.build(transaction),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: true,
        };

        let completion = self
            .gate
            .throttled(self.client.complete(request, user_id))
            .await;

        let content = match completion {
            Ok(response) => response.content,
            Err(err) => {
                warn!(error = %err, label = %transaction.label, "ai call failed");
                return error_fallback(transaction);
            }
        };

        match parse_analysis(&content, &transaction.label) {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(error = %err, label = %transaction.label, "unusable ai response");
                error_fallback(transaction)
            }
        }
    }
}

fn error_fallback(transaction: &Transaction) -> AiAnalysis {
    AiAnalysis {
        clean_label: transaction.label.clone(),
        category: NEEDS_REVIEW.to_string(),
        subcategory: AI_ERROR_SUBCATEGORY.to_string(),
    }
}

fn parse_analysis(content: &str, original_label: &str) -> Result<AiAnalysis, AnalysisParseError> {
    let value = extract_json_object(content).ok_or(AnalysisParseError::NoJsonObject)?;
    let raw: RawAnalysis = serde_json::from_value(value)?;

    let mut category = raw.categorie.unwrap_or_else(|| NEEDS_REVIEW.to_string());
    if category != NEEDS_REVIEW && !categories::is_ai_category(&category) {
        warn!(proposed = %category, "model proposed an unknown category, forcing review");
        category = NEEDS_REVIEW.to_string();
    }

    Ok(AiAnalysis {
        clean_label: raw
            .libelle_nettoye
            .unwrap_or_else(|| original_label.to_string()),
        category,
        // Always the fixed literal, whatever the model returned.
        subcategory: AI_SUBCATEGORY.to_string(),
    })
}
