//! Single-shot generation wire format (Google generative language)

use serde::{Deserialize, Serialize};
use log::{error, trace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPrompt
{   pub text: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest
{   pub model: String
  , pub prompt: TextPrompt
  , pub temperature: f64
  , #[serde(rename = "candidateCount")]
    pub candidate_count: u32
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse
{   pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate
{   pub output: String
}

pub fn build_body(
  latest_user_message: &str
, params: &crate::request::GenerationParameters
) -> Result<serde_json::Value, crate::error::Error>
{   let request = GenerateRequest
    {   model: params.model.clone()
      , prompt: TextPrompt
        {   text: latest_user_message.to_string()
        }
      , temperature: params.temperature
      , candidate_count: 1
    };
    trace!("Generate request for {}", request.model);
    Ok(serde_json::to_value(request)?)
}

/// Pull `candidates[0].output` out of a response body
pub fn extract_reply(body: serde_json::Value)
  -> Result<String, crate::error::Error>
{   let response: GenerateResponse = serde_json::from_value(body)
      .map_err(|e| {
        error!("Generate response shape mismatch: {}", e);
        crate::error::Error::MalformedResponse(e.to_string())
      })?;

    response.candidates.into_iter().next()
      .map(|c| c.output)
      .ok_or_else(|| {
        error!("No candidates in response");
        crate::error::Error::MalformedResponse(
          "response contained no candidates".to_string()
        )
      })
}
