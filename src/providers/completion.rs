//! Text-completion wire format (Anthropic `/v1/complete`)

use serde::{Deserialize, Serialize};
use log::{error, trace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest
{   pub model: String
  , pub prompt: String
  , pub max_tokens_to_sample: usize
  , pub temperature: f64
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse
{   pub completion: String
  , #[serde(default)]
    pub stop_reason: Option<String>
}

/// Single-turn prompt; earlier history is not sent
pub fn format_prompt(message: &str) -> String
{   format!("\n\nHuman: {}\n\nAssistant: ", message)
}

pub fn build_body(
  latest_user_message: &str
, params: &crate::request::GenerationParameters
) -> Result<serde_json::Value, crate::error::Error>
{   let request = CompletionRequest
    {   model: params.model.clone()
      , prompt: format_prompt(latest_user_message)
      , max_tokens_to_sample: params.max_tokens
      , temperature: params.temperature
    };
    trace!("Completion request for {}", request.model);
    Ok(serde_json::to_value(request)?)
}

/// Pull the top-level `completion` string out of a response body
pub fn extract_reply(body: serde_json::Value)
  -> Result<String, crate::error::Error>
{   let response: CompletionResponse = serde_json::from_value(body)
      .map_err(|e| {
        error!("Completion response shape mismatch: {}", e);
        crate::error::Error::MalformedResponse(e.to_string())
      })?;
    trace!("Stop reason: {:?}", response.stop_reason);
    Ok(response.completion)
}
