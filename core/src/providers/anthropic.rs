use crate::agent::CatalogEntry;
use crate::config::DEFAULT_MODEL;
use crate::traits::{ExchangeRequest, ModelResponse, Provider, Turn};
use async_trait::async_trait;
use serde::Serialize;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [CatalogEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<&'a str>,
}

fn no_tools(tools: &&[CatalogEntry]) -> bool {
    tools.is_empty()
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    betas: Vec<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        // Code execution turns can run for minutes before the response arrives.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            base_url: "https://api.anthropic.com".to_string(),
            betas: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_betas(mut self, betas: Vec<String>) -> Self {
        self.betas = betas;
        self
    }

    fn build_request<'a>(&'a self, request: &ExchangeRequest<'a>) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: request.turns,
            tools: request.catalog,
            system: request.system.filter(|s| !s.is_empty()),
            container: request.session,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn exchange(&self, request: ExchangeRequest<'_>) -> anyhow::Result<ModelResponse> {
        let body = self.build_request(&request);

        let mut http = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        if !self.betas.is_empty() {
            http = http.header("anthropic-beta", self.betas.join(","));
        }

        let response = http.json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Anthropic API error {}: {}",
                status,
                error_text
            ));
        }

        let parsed: ModelResponse = response.json().await?;
        tracing::debug!(
            "Anthropic response {:?}: stop_reason={} in={} out={}",
            parsed.id,
            parsed.stop_reason,
            parsed.usage.input_tokens,
            parsed.usage.output_tokens
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolRegistry;
    use serde_json::json;

    #[test]
    fn request_body_matches_messages_api() {
        let provider = AnthropicProvider::new("sk-test")
            .with_model("claude-test")
            .with_max_tokens(1024);
        let turns = vec![Turn::user("hello")];
        let catalog = ToolRegistry::new().build_catalog("code_execution_20260120");
        let request = ExchangeRequest {
            turns: &turns,
            catalog: &catalog,
            system: Some("be brief"),
            session: Some("container_1"),
        };

        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-test",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "hello"}],
                "tools": [{"type": "code_execution_20260120", "name": "code_execution"}],
                "system": "be brief",
                "container": "container_1"
            })
        );
    }

    #[test]
    fn optional_fields_are_omitted() {
        let provider = AnthropicProvider::new("sk-test").with_base_url("http://localhost:8080/");
        assert_eq!(provider.base_url, "http://localhost:8080");

        let turns = vec![Turn::user("hello")];
        let request = ExchangeRequest {
            turns: &turns,
            catalog: &[],
            system: Some(""),
            session: None,
        };
        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert!(body.get("system").is_none());
        assert!(body.get("container").is_none());
        assert!(body.get("tools").is_none());
    }
}
