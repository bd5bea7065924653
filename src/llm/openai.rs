//! OpenAI-compatible chat-completions client for vision models.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;

use crate::config::OracleConfig;
use crate::errors::{ScoutError, ScoutResult};
use crate::llm::provider::VisionModel;
use crate::llm::types::{ChatMessage, ContentPart, ImageUrl, MessageContent};

pub struct OpenAiCompatibleModel {
    api_base: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatibleModel {
    pub fn from_config(cfg: &OracleConfig) -> ScoutResult<Self> {
        Ok(Self {
            api_base: cfg.api_base.clone(),
            api_key: cfg.resolve_api_key()?,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            client: reqwest::Client::new(),
        })
    }

    async fn build_message(&self, prompt: &str, images: &[PathBuf]) -> ScoutResult<ChatMessage> {
        let mut parts = Vec::with_capacity(images.len() + 1);
        for path in images {
            let bytes = tokio::fs::read(path).await?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/png;base64,{encoded}"),
                },
            });
        }
        parts.push(ContentPart::Text {
            text: prompt.to_string(),
        });
        Ok(ChatMessage {
            role: "user".into(),
            content: MessageContent::Parts(parts),
        })
    }
}

#[async_trait]
impl VisionModel for OpenAiCompatibleModel {
    async fn get_response(&self, prompt: &str, images: &[PathBuf]) -> ScoutResult<String> {
        let message = self.build_message(prompt, images).await?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": [message],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        tracing::debug!(
            model = %self.model,
            images = images.len(),
            prompt_len = prompt.len(),
            "sending oracle request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScoutError::Oracle(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Oracle(format!("{status}: {err_body}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScoutError::Oracle(format!("invalid response body: {e}")))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        if content.is_empty() {
            return Err(ScoutError::Oracle(format!(
                "completion carried no content: {json}"
            )));
        }

        tracing::debug!(content_len = content.len(), "oracle response received");
        Ok(content)
    }
}
