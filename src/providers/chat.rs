//! Chat-completions wire format (OpenAI, DeepSeek)

use serde::{Deserialize, Serialize};
use log::{error, trace};

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

impl From<&crate::Message> for ChatMessage
{   fn from(m: &crate::Message) -> Self
    {   ChatMessage
        {   role: m.role.as_str().to_string()
          , content: m.content.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub max_tokens: usize
  , pub temperature: f64
  , pub stream: bool
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ReplyMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

/// Assistant message inside a choice; only the content is required
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyMessage
{   #[serde(default)]
    pub role: Option<String>
  , pub content: String
}

/// System prompt first, then the whole history in order
pub fn build_body(
  system_prompt: &str
, history: &[crate::Message]
, params: &crate::request::GenerationParameters
) -> Result<serde_json::Value, crate::error::Error>
{   let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage
    {   role: "system".to_string()
      , content: system_prompt.to_string()
    });
    messages.extend(history.iter().map(ChatMessage::from));

    let request = ChatRequest
    {   model: params.model.clone()
      , messages
      , max_tokens: params.max_tokens
      , temperature: params.temperature
      , stream: false
    };

    trace!(
      "Chat request for {} with {} messages",
      request.model,
      request.messages.len()
    );
    Ok(serde_json::to_value(request)?)
}

/// Pull `choices[0].message.content` out of a response body
pub fn extract_reply(body: serde_json::Value)
  -> Result<String, crate::error::Error>
{   let response: ChatResponse = serde_json::from_value(body)
      .map_err(|e| {
        error!("Chat response shape mismatch: {}", e);
        crate::error::Error::MalformedResponse(e.to_string())
      })?;

    response.choices.into_iter().next()
      .map(|c| {
        trace!("Finish reason: {:?}", c.finish_reason);
        c.message.content
      })
      .ok_or_else(|| {
        error!("No choices in response");
        crate::error::Error::MalformedResponse(
          "response contained no choices".to_string()
        )
      })
}
