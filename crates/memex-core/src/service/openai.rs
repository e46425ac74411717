//! Chat-completions and image-generation client over blocking HTTP.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;

use super::{Completion, GeneratedImage, ImageSynthesis, ServiceError};
use crate::config::{AiConfig, ImageConfig};

/// Response body excerpt kept in [`ServiceError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Client for OpenAI-compatible endpoints.
///
/// The API key is explicit: passed at construction and replaceable with
/// [`OpenAiClient::set_api_key`]. Safe to share across worker threads.
pub struct OpenAiClient {
    chat_agent: ureq::Agent,
    image_agent: ureq::Agent,
    ai: AiConfig,
    image: ImageConfig,
    api_key: RwLock<Option<String>>,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(ai: AiConfig, image: ImageConfig, api_key: Option<String>) -> Self {
        let chat_agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(ai.timeout_secs))
            .user_agent("memex")
            .build();
        let image_agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(image.timeout_secs))
            .user_agent("memex")
            .build();
        Self {
            chat_agent,
            image_agent,
            ai,
            image,
            api_key: RwLock::new(api_key.filter(|key| !key.trim().is_empty())),
        }
    }

    /// Replace the API key used by subsequent requests.
    pub fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into().trim().to_string();
        let mut slot = self.api_key.write().unwrap_or_else(PoisonError::into_inner);
        *slot = (!key.is_empty()).then_some(key);
        tracing::info!("api key updated");
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn bearer(&self) -> Result<String, ServiceError> {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|key| format!("Bearer {key}"))
            .ok_or(ServiceError::MissingApiKey)
    }

    fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        agent: &ureq::Agent,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<T, ServiceError> {
        let auth = self.bearer()?;
        let response = agent
            .post(endpoint)
            .set("Authorization", &auth)
            .set("Content-Type", "application/json")
            .send_json(payload)
            .map_err(|err| map_ureq_error(endpoint, err))?;

        response
            .into_json::<T>()
            .map_err(|err| ServiceError::Malformed(err.to_string()))
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("chat_endpoint", &self.ai.endpoint)
            .field("chat_model", &self.ai.model)
            .field("image_endpoint", &self.image.endpoint)
            .field("has_api_key", &self.has_api_key())
            .finish_non_exhaustive()
    }
}

impl Completion for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let payload = json!({
            "model": self.ai.model,
            "messages": [
                {"role": "system", "content": self.ai.system_prompt},
                {"role": "user", "content": prompt},
            ],
        });
        tracing::debug!(endpoint = %self.ai.endpoint, model = %self.ai.model, "chat request");
        let response: ChatResponse = self.post_json(&self.chat_agent, &self.ai.endpoint, &payload)?;
        chat_reply(response)
    }
}

impl ImageSynthesis for OpenAiClient {
    fn generate(&self, prompt: &str) -> Result<GeneratedImage, ServiceError> {
        let payload = json!({
            "model": self.image.model,
            "prompt": prompt,
            "n": 1,
            "size": self.image.size,
            "response_format": "b64_json",
        });
        tracing::debug!(endpoint = %self.image.endpoint, model = %self.image.model, "image request");
        let response: ImageResponse =
            self.post_json(&self.image_agent, &self.image.endpoint, &payload)?;
        let bytes = image_bytes(response)?;
        Ok(GeneratedImage::new(bytes, prompt))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

fn chat_reply(response: ChatResponse) -> Result<String, ServiceError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ServiceError::Malformed("response has no message content".into()))?;

    let reply = content.trim();
    if reply.is_empty() {
        return Err(ServiceError::Malformed("reply is empty".into()));
    }
    Ok(reply.to_string())
}

fn image_bytes(response: ImageResponse) -> Result<Vec<u8>, ServiceError> {
    let encoded = response
        .data
        .into_iter()
        .next()
        .and_then(|datum| datum.b64_json)
        .ok_or_else(|| ServiceError::Malformed("response has no b64_json image".into()))?;

    STANDARD
        .decode(encoded.trim())
        .map_err(|err| ServiceError::Malformed(format!("invalid base64 image: {err}")))
}

fn map_ureq_error(endpoint: &str, err: ureq::Error) -> ServiceError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            ServiceError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            }
        }
        ureq::Error::Transport(transport) => ServiceError::Transport {
            endpoint: endpoint.to_string(),
            message: transport.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: Option<&str>) -> OpenAiClient {
        OpenAiClient::new(
            AiConfig::default(),
            ImageConfig::default(),
            key.map(str::to_string),
        )
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let client = client(None);
        assert!(!client.has_api_key());
        assert_eq!(client.complete("hi"), Err(ServiceError::MissingApiKey));
        assert_eq!(
            client.generate("a cat").map(|image| image.bytes),
            Err(ServiceError::MissingApiKey)
        );
    }

    #[test]
    fn set_api_key_reconfigures_and_blank_clears() {
        let client = client(Some("  "));
        assert!(!client.has_api_key());
        client.set_api_key("sk-test");
        assert!(client.has_api_key());
        assert_eq!(client.bearer().as_deref(), Ok("Bearer sk-test"));
        client.set_api_key("");
        assert!(!client.has_api_key());
    }

    #[test]
    fn debug_output_hides_key() {
        let rendered = format!("{:?}", client(Some("sk-secret")));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("has_api_key: true"));
    }

    #[test]
    fn chat_reply_takes_first_choice_trimmed() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  An answer.\n"}}]}"#,
        )
        .expect("valid json");
        assert_eq!(chat_reply(response), Ok("An answer.".to_string()));
    }

    #[test]
    fn chat_reply_without_content_is_malformed() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("json");
        assert!(matches!(chat_reply(response), Err(ServiceError::Malformed(_))));

        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).expect("json");
        assert!(matches!(chat_reply(blank), Err(ServiceError::Malformed(_))));
    }

    #[test]
    fn image_bytes_decodes_base64() {
        let encoded = STANDARD.encode(b"\x89PNG fake");
        let response: ImageResponse =
            serde_json::from_str(&format!(r#"{{"data":[{{"b64_json":"{encoded}"}}]}}"#))
                .expect("json");
        assert_eq!(image_bytes(response), Ok(b"\x89PNG fake".to_vec()));
    }

    #[test]
    fn image_bytes_rejects_bad_payloads() {
        let empty: ImageResponse = serde_json::from_str(r#"{"data":[]}"#).expect("json");
        assert!(matches!(image_bytes(empty), Err(ServiceError::Malformed(_))));

        let garbage: ImageResponse =
            serde_json::from_str(r#"{"data":[{"b64_json":"@@not base64@@"}]}"#).expect("json");
        assert!(matches!(image_bytes(garbage), Err(ServiceError::Malformed(_))));
    }
}
