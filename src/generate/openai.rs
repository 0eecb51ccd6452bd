use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    compliance::{ContentSafety, compliance_prompt, reply_is_safe},
    foundation::config::ApiConfig,
    generate::ImageGenerator,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const IMAGE_SIZE: &str = "1024x1024";

#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("response contained no {0}")]
    EmptyResponse(&'static str),

    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible API: image generation plus the chat-based
/// compliance check.
pub struct OpenAiClient {
    client: reqwest::blocking::Client,
    config: ApiConfig,
}

impl OpenAiClient {
    pub fn new(config: ApiConfig) -> Result<Self, OpenAiError> {
        if config.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(OpenAiError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, OpenAiError> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                message: response.text()?,
            });
        }
        Ok(response.json()?)
    }

    /// Request one image and return its encoded bytes.
    pub fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, OpenAiError> {
        let request = ImageRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            response_format: "b64_json",
        };
        let response: ImageResponse = self.post_json("images/generations", &request)?;
        let datum = response
            .data
            .into_iter()
            .next()
            .ok_or(OpenAiError::EmptyResponse("image data"))?;

        if let Some(b64) = datum.b64_json {
            return Ok(base64::engine::general_purpose::STANDARD.decode(b64.trim())?);
        }
        let url = datum.url.ok_or(OpenAiError::EmptyResponse("image url or payload"))?;
        tracing::debug!(%url, "downloading generated image");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                message: format!("image download failed for {url}"),
            });
        }
        Ok(response.bytes()?.to_vec())
    }

    /// Ask the chat model for a verdict on `message`; returns the raw reply.
    pub fn review_message(&self, message: &str) -> Result<String, OpenAiError> {
        let prompt = compliance_prompt(message);
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let response: ChatResponse = self.post_json("chat/completions", &request)?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(OpenAiError::EmptyResponse("chat reply"))
    }
}

impl ImageGenerator for OpenAiClient {
    fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        Ok(self.generate_image(prompt)?)
    }
}

impl ContentSafety for OpenAiClient {
    fn is_safe(&self, message: &str) -> anyhow::Result<bool> {
        let reply = self.review_message(message)?;
        Ok(reply_is_safe(&reply))
    }
}
