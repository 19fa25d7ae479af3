use crate::llm::client::{LLMClient, ModelParams, TokenStream};
use crate::types::{AppError, ChatMessage, MessageRole, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage as OllamaMessage, request::ChatMessageRequest},
    models::ModelOptions,
};

pub struct OllamaClient {
    client: Ollama,
    model: String,
    params: ModelParams,
}

impl OllamaClient {
    pub async fn new(base_url: String, model: String, params: ModelParams) -> Result<Self> {
        let (host, port) = split_base_url(&base_url);
        let client = Ollama::new(host, port);

        Ok(Self {
            client,
            model,
            params,
        })
    }

    fn request(&self, messages: &[ChatMessage]) -> ChatMessageRequest {
        let chat_messages: Vec<OllamaMessage> = messages
            .iter()
            .map(|m| match m.role {
                MessageRole::System => OllamaMessage::system(m.content.clone()),
                MessageRole::User => OllamaMessage::user(m.content.clone()),
                MessageRole::Assistant => OllamaMessage::assistant(m.content.clone()),
            })
            .collect();

        let options = ModelOptions::default()
            .temperature(self.params.temperature)
            .num_predict(self.params.max_tokens as i32);

        ChatMessageRequest::new(self.model.clone(), chat_messages).options(options)
    }
}

/// Split `scheme://host:port` into the `scheme://host` and port pieces
/// `Ollama::new` expects. Missing or unparsable ports fall back to 11434.
fn split_base_url(base_url: &str) -> (String, u16) {
    let (scheme, rest) = match base_url.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", base_url),
    };
    let rest = rest.trim_end_matches('/');

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().unwrap_or(11434)),
        None => (rest, 11434),
    };

    (format!("{}://{}", scheme, host), port)
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_with_history(&[ChatMessage::system(system), ChatMessage::user(prompt)])
            .await
    }

    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self
            .client
            .send_chat_messages(self.request(messages))
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }

    async fn stream_with_history(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let mut stream_response = self
            .client
            .send_chat_messages_stream(self.request(messages))
            .await
            .map_err(|e| AppError::LLM(format!("Ollama stream error: {}", e)))?;

        let output_stream = stream! {
            while let Some(chunk_result) = stream_response.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let content = chunk.message.content;
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                    }
                    Err(_) => {
                        yield Err(AppError::LLM("Stream chunk error".to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(output_stream)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
