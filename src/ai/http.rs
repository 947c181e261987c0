//! A `Generator` backed by an OpenAI-compatible chat completions endpoint.

use crate::ai::{schema_title, Generator};
use crate::config::GeneratorSettings;
use crate::error::Res;
use anyhow::{bail, Context};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

const SYSTEM_PROMPT: &str = "You help a group of students plan a trip on a tight budget. \
    Answer only with JSON that matches the given schema.";

pub(crate) struct HttpGenerator {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    /// Reads the API key from the environment variable named in `settings`. A missing key is
    /// allowed, since some self-hosted endpoints do not need one.
    pub(crate) fn new(settings: &GeneratorSettings) -> Res<Self> {
        let endpoint = Url::parse(&settings.endpoint).with_context(|| {
            format!("Invalid text generator endpoint '{}'", settings.endpoint)
        })?;
        let api_key = match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.is_empty() => Some(key),
            _ => {
                warn!(
                    "{} is not set, calling {endpoint} without an API key",
                    settings.api_key_env
                );
                None
            }
        };
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            model: settings.model.clone(),
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str, schema: Value) -> Res<Value> {
        let body = request_body(&self.model, prompt, schema);
        debug!("Requesting generation from {}", self.endpoint);

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .context("Failed to send request to the text generator")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("The text generator failed with status {status}: {body}");
        }

        let response: Value = response
            .json()
            .await
            .context("Failed to parse the text generator response")?;
        extract_content(&response)
    }
}

/// Builds a chat completions request that asks for output following `schema`.
fn request_body(model: &str, prompt: &str, schema: Value) -> Value {
    let name = schema_title(&schema).unwrap_or("response").to_string();
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": prompt}
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": name,
                "schema": schema
            }
        }
    })
}

/// Pulls the JSON document out of the first choice of a chat completions response.
fn extract_content(response: &Value) -> Res<Value> {
    let content = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .context("The text generator response has no message content")?;
    serde_json::from_str(content).context("The text generator did not answer with valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let schema = json!({"title": "DealList", "type": "object"});
        let body = request_body("small-model", "Find deals in Goa", schema.clone());
        assert_eq!(body["model"], "small-model");
        assert_eq!(body["messages"][1]["content"], "Find deals in Goa");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "DealList");
        assert_eq!(body["response_format"]["json_schema"]["schema"], schema);
    }

    #[test]
    fn test_extract_content() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"deals\": []}"}}]
        });
        assert_eq!(extract_content(&response).unwrap(), json!({"deals": []}));
    }

    #[test]
    fn test_extract_content_errors() {
        assert!(extract_content(&json!({"choices": []})).is_err());
        let not_json = json!({"choices": [{"message": {"content": "Sure! Here are some deals"}}]});
        assert!(extract_content(&not_json).is_err());
    }
}
