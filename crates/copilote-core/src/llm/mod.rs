pub mod categorizer;
pub mod error;
pub mod extract;
pub mod gate;
pub mod mock;
pub mod prompt;
pub mod repository;
pub mod types;

pub use categorizer::{AiAnalysis, AiCategorizer};
pub use error::LLMError;
pub use extract::extract_json_object;
pub use gate::AiCallGate;
pub use mock::MockLLMClient;
pub use prompt::PromptBuilder;
pub use repository::{LlmCall, LlmCallRepository, NewLlmCall};
pub use types::{ChatMessage, ChatRole, CompletionRequest, CompletionResponse};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use genai::{
    Client as GenaiClient, Error as GenaiError,
    chat::{
        ChatMessage as GenaiChatMessage, ChatOptions, ChatRequest, ChatResponse,
        ChatResponseFormat, MessageContent,
    },
    webc,
};
use reqwest::StatusCode;
use tracing::warn;

use crate::config::ModelConfig;
use crate::db::Database;

/// Minimal async interface for LLM clients used throughout the crate.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
        user_id: i64,
    ) -> Result<CompletionResponse, LLMError>;
}

#[async_trait]
pub trait ChatExecutor: Send + Sync {
    async fn exec_chat(
        &self,
        model: &str,
        request: ChatRequest,
        options: Option<&ChatOptions>,
    ) -> Result<ChatResponse, GenaiError>;
}

#[async_trait]
impl ChatExecutor for GenaiClient {
    async fn exec_chat(
        &self,
        model: &str,
        request: ChatRequest,
        options: Option<&ChatOptions>,
    ) -> Result<ChatResponse, GenaiError> {
        GenaiClient::exec_chat(self, model, request, options).await
    }
}

/// Default LLM client backed by the genai crate. Every call is recorded in
/// the llm_calls audit table, success or failure.
pub struct GenaiLLMClient {
    chat: Arc<dyn ChatExecutor>,
    model: String,
    repo: LlmCallRepository,
}

impl GenaiLLMClient {
    pub fn new(db: Database, model_config: &ModelConfig) -> Self {
        let chat: Arc<dyn ChatExecutor> = Arc::new(GenaiClient::default());
        Self::with_executor(db, model_config, chat)
    }

    pub fn with_executor(
        db: Database,
        model_config: &ModelConfig,
        chat: Arc<dyn ChatExecutor>,
    ) -> Self {
        Self {
            chat,
            model: namespaced_model(model_config),
            repo: LlmCallRepository::new(db),
        }
    }

    fn build_chat_request(&self, request: &CompletionRequest) -> ChatRequest {
        let messages = request
            .messages
            .iter()
            .map(to_genai_message)
            .collect::<Vec<_>>();
        ChatRequest::from_messages(messages)
    }

    fn build_chat_options(&self, request: &CompletionRequest) -> ChatOptions {
        let mut options = ChatOptions::default()
            .with_temperature(request.temperature as f64)
            .with_max_tokens(request.max_tokens);

        if request.json_mode {
            options = options.with_response_format(ChatResponseFormat::JsonMode);
        }

        options
    }

    async fn log_call(
        &self,
        user_id: i64,
        model: &str,
        request_json: serde_json::Value,
        response_json: Option<serde_json::Value>,
        input_tokens: Option<u32>,
        output_tokens: Option<u32>,
        latency_ms: Option<u64>,
        error: Option<String>,
    ) {
        let new_call = NewLlmCall {
            user_id,
            model: model.to_string(),
            request_json,
            response_json,
            input_tokens,
            output_tokens,
            latency_ms,
            error,
        };

        if let Err(log_err) = self.repo.create(new_call).await {
            warn!(error = ?log_err, "failed to record llm call");
        }
    }
}

#[async_trait]
impl LLMClient for GenaiLLMClient {
    async fn complete(
        &self,
        request: CompletionRequest,
        user_id: i64,
    ) -> Result<CompletionResponse, LLMError> {
        let chat_request = self.build_chat_request(&request);
        let options = self.build_chat_options(&request);

        let request_json = serde_json::to_value(&request)
            .unwrap_or_else(|err| serde_json::json!({"error": err.to_string()}));

        let start = Instant::now();
        let result = self
            .chat
            .exec_chat(&self.model, chat_request, Some(&options))
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let content = response.first_text().unwrap_or("").to_string();
                let provider_model = response.provider_model_iden.to_string();
                let (input_tokens, output_tokens) = usage_tokens(&response.usage);
                let response_json = serde_json::to_value(&response).ok();

                self.log_call(
                    user_id,
                    &provider_model,
                    request_json,
                    response_json,
                    Some(input_tokens),
                    Some(output_tokens),
                    Some(latency_ms),
                    None,
                )
                .await;

                Ok(CompletionResponse {
                    content,
                    model: provider_model,
                    input_tokens,
                    output_tokens,
                    latency_ms,
                })
            }
            Err(err) => {
                let mapped = map_genai_error(err);
                self.log_call(
                    user_id,
                    &self.model,
                    request_json,
                    None,
                    None,
                    None,
                    Some(latency_ms),
                    Some(mapped.to_string()),
                )
                .await;
                Err(mapped)
            }
        }
    }
}

fn to_genai_message(message: &ChatMessage) -> GenaiChatMessage {
    let content = MessageContent::from_text(message.content.clone());
    match message.role {
        ChatRole::System => GenaiChatMessage::system(content),
        ChatRole::User => GenaiChatMessage::user(content),
        ChatRole::Assistant => GenaiChatMessage::assistant(content),
    }
}

fn namespaced_model(cfg: &ModelConfig) -> String {
    if cfg.provider.is_empty() {
        cfg.model.clone()
    } else {
        format!("{}::{}", cfg.provider.to_lowercase(), cfg.model)
    }
}

fn usage_tokens(usage: &genai::chat::Usage) -> (u32, u32) {
    let input = usage.prompt_tokens.unwrap_or_default().max(0) as u32;
    let output = usage.completion_tokens.unwrap_or_default().max(0) as u32;
    (input, output)
}

fn map_genai_error(err: GenaiError) -> LLMError {
    match err {
        GenaiError::RequiresApiKey { .. }
        | GenaiError::NoAuthResolver { .. }
        | GenaiError::NoAuthData { .. } => LLMError::AuthenticationFailed,
        GenaiError::ChatReqHasNoMessages { .. }
        | GenaiError::LastChatMessageIsNotUser { .. }
        | GenaiError::MessageRoleNotSupported { .. }
        | GenaiError::MessageContentTypeNotSupported { .. }
        | GenaiError::JsonModeWithoutInstruction
        | GenaiError::VerbosityParsing { .. }
        | GenaiError::ReasoningParsingError { .. }
        | GenaiError::ServiceTierParsing { .. }
        | GenaiError::ModelMapperFailed { .. }
        | GenaiError::AdapterNotSupported { .. }
        | GenaiError::Resolver { .. } => LLMError::InvalidRequest(err.to_string()),
        GenaiError::InvalidJsonResponseElement { .. } | GenaiError::StreamParse { .. } => {
            LLMError::ParseError(err.to_string())
        }
        GenaiError::NoChatResponse { .. } => LLMError::ServerError(err.to_string()),
        GenaiError::WebAdapterCall { webc_error, .. }
        | GenaiError::WebModelCall { webc_error, .. } => map_webc_error(webc_error),
        GenaiError::ChatResponse { .. } | GenaiError::WebStream { .. } => {
            LLMError::ProviderError(err.to_string())
        }
        GenaiError::Internal(msg) => LLMError::ProviderError(msg),
        GenaiError::EventSourceClone(e) => LLMError::ProviderError(e.to_string()),
        GenaiError::JsonValueExt(e) => LLMError::ParseError(e.to_string()),
        GenaiError::ReqwestEventSource(err) => LLMError::ProviderError(err.to_string()),
        GenaiError::SerdeJson(err) => LLMError::ParseError(err.to_string()),
    }
}

fn map_webc_error(err: webc::Error) -> LLMError {
    match &err {
        webc::Error::ResponseFailedStatus { status, .. } => match *status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => LLMError::RateLimited,
            StatusCode::UNAUTHORIZED => LLMError::AuthenticationFailed,
            status if status.is_client_error() => LLMError::InvalidRequest(status.to_string()),
            status if status.is_server_error() => LLMError::ServerError(status.to_string()),
            status => LLMError::ProviderError(status.to_string()),
        },
        webc::Error::Reqwest(req_err) => {
            if req_err.is_timeout() {
                LLMError::Timeout
            } else {
                LLMError::ProviderError(req_err.to_string())
            }
        }
        webc::Error::ResponseFailedNotJson { .. } => LLMError::ParseError(err.to_string()),
        webc::Error::JsonValueExt(parse_err) => LLMError::ParseError(parse_err.to_string()),
        webc::Error::EventSourceClone(clone_err) => LLMError::ProviderError(clone_err.to_string()),
    }
}
