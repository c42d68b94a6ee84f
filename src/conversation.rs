//! Bounded conversation history and the provider request adapter

use std::collections::BTreeMap;
use log::{debug, error, trace};

use crate::providers::{self, WireFormat};
use crate::request::{GenerationParameters, RequestDescriptor};
use crate::{Message, Role};

/// Most turns kept; older ones fall off the front
pub const HISTORY_LIMIT: usize = 20;

/// Owns one conversation's rolling history and maps it onto the
/// wire format of whichever provider the caller picks per request.
///
/// Nothing here performs I/O. The caller sends the descriptor from
/// [`ConversationAdapter::build_request`] and feeds the raw body back
/// into [`ConversationAdapter::ingest_response`], one turn at a time.
#[derive(Debug, Clone, Default)]
pub struct ConversationAdapter
{   history: Vec<Message>
}

impl ConversationAdapter
{   pub fn new() -> Self
    {   ConversationAdapter
        {   history: Vec::new()
        }
    }

    /// Append a user turn, rejecting blank input
    pub fn append_user_turn(&mut self, message: &str)
      -> Result<(), crate::error::Error>
    {   let message = message.trim();
        if message.is_empty()
        {   debug!("Rejecting empty user message");
            return Err(crate::error::Error::EmptyMessage);
        }
        self.push(Message::user(message));
        Ok(())
    }

    /// Build the POST for `provider_id` from the current history.
    /// History is left untouched.
    pub fn build_request(
      &self
    , provider_id: &str
    , credential: &str
    , params: &GenerationParameters
    ) -> Result<RequestDescriptor, crate::error::Error>
    {   let descriptor = providers::lookup(provider_id)?;

        if credential.trim().is_empty()
        {   error!("No credential for provider: {}", descriptor.id);
            return Err(crate::error::Error::MissingCredential(
              descriptor.display_name.to_string()
            ));
        }
        params.validate()?;

        let latest = self.latest_user_message()
          .ok_or(crate::error::Error::EmptyMessage)?;

        let mut headers = BTreeMap::new();
        headers.insert(
          "Content-Type".to_string(),
          "application/json".to_string()
        );

        let body = match descriptor.wire
        {   WireFormat::Chat { system_prompt } => {
              headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", credential)
              );
              providers::chat::build_body(
                system_prompt,
                &self.history,
                params
              )?
            }
          , WireFormat::Completion => {
              headers.insert(
                "X-API-Key".to_string(),
                credential.to_string()
              );
              providers::completion::build_body(latest, params)?
            }
          , WireFormat::SingleShot => {
              headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", credential)
              );
              providers::generate::build_body(latest, params)?
            }
        };

        debug!(
          "Built {} request for model {} over {} turns",
          descriptor.id,
          params.model,
          self.history.len()
        );

        Ok(RequestDescriptor
        {   url: descriptor.endpoint.to_string()
          , headers
          , body
        })
    }

    /// Validate a provider response, record the reply and return it.
    /// A malformed body leaves history as it was.
    pub fn ingest_response(
      &mut self
    , provider_id: &str
    , raw_response_body: &str
    ) -> Result<String, crate::error::Error>
    {   let descriptor = providers::lookup(provider_id)?;

        let body: serde_json::Value
          = serde_json::from_str(raw_response_body).map_err(|e| {
            error!("Response from {} is not JSON: {}", descriptor.id, e);
            crate::error::Error::MalformedResponse(e.to_string())
          })?;

        let reply = match descriptor.wire
        {   WireFormat::Chat { .. } => {
              providers::chat::extract_reply(body)?
            }
          , WireFormat::Completion => {
              providers::completion::extract_reply(body)?
            }
          , WireFormat::SingleShot => {
              providers::generate::extract_reply(body)?
            }
        };

        trace!("Reply from {}: {} bytes", descriptor.id, reply.len());
        self.push(Message::assistant(reply.clone()));
        Ok(reply)
    }

    /// Start a new conversation; idempotent
    pub fn reset(&mut self)
    {   debug!("Clearing {} turns", self.history.len());
        self.history.clear();
    }

    /// Read-only copy for export or display
    pub fn history_snapshot(&self) -> Vec<Message>
    {   self.history.clone()
    }

    pub fn len(&self) -> usize
    {   self.history.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.history.is_empty()
    }

    /// Plain-text export of the conversation, `None` when there is
    /// nothing to export
    pub fn transcript(&self, generated_on: &str) -> Option<String>
    {   if self.history.is_empty()
        {   return None;
        }

        let mut out = String::from("Ellen AI Chat Export\n");
        out.push_str(&format!("Generated on: {}\n", generated_on));
        out.push_str(&format!("{}\n\n", "=".repeat(50)));

        for message in &self.history
        {   let sender = match message.role
            {   Role::User => "You"
              , Role::Assistant => "Ellen"
            };
            out.push_str(&format!(
              "{}:\n{}\n\n{}\n\n",
              sender,
              message.content,
              "-".repeat(30)
            ));
        }
        Some(out)
    }

    fn latest_user_message(&self) -> Option<&str>
    {   self.history
          .iter()
          .rev()
          .find(|m| m.role == Role::User)
          .map(|m| m.content.as_str())
    }

    fn push(&mut self, message: Message)
    {   self.history.push(message);
        if self.history.len() > HISTORY_LIMIT
        {   let excess = self.history.len() - HISTORY_LIMIT;
            trace!("Dropping {} oldest turns", excess);
            self.history.drain(..excess);
        }
    }
}
