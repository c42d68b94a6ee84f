//! Static provider registry and the per-wire-format modules

pub mod chat;
pub mod completion;
pub mod generate;

use serde::Serialize;
use log::{debug, error};

// Re-export for convenience
pub use chat::ChatRequest;
pub use completion::CompletionRequest;
pub use generate::GenerateRequest;

const OPENAI_SYSTEM_PROMPT: &str
  = "You are Ellen, a helpful AI coding assistant. You help with \
     programming, debugging, code review, and technical questions. \
     Provide clear, concise, and practical answers.";

const DEEPSEEK_SYSTEM_PROMPT: &str
  = "You are Ellen, a helpful AI coding assistant.";

/// Selectable model of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOption
{   pub id: &'static str
  , pub display_name: &'static str
}

/// How a provider expects its request body and credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WireFormat
{   /// Role-tagged message list, bearer auth
    Chat
    {   system_prompt: &'static str
    }
  , /// One `Human:`/`Assistant:` prompt string, key header auth
    Completion
  , /// One prompt text object, bearer auth
    SingleShot
}

/// Immutable description of a known backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProviderDescriptor
{   pub provider: crate::Provider
  , pub id: &'static str
  , pub display_name: &'static str
  , pub endpoint: &'static str
  , pub supported_models: &'static [ModelOption]
  , pub credential_prefix: &'static str
  , pub wire: WireFormat
  , /// Listing endpoint used to probe a credential, if the vendor has one
    pub models_url: Option<&'static str>
}

static REGISTRY: [ProviderDescriptor; 4] = [
  ProviderDescriptor
  {   provider: crate::Provider::OpenAI
    , id: "openai"
    , display_name: "OpenAI"
    , endpoint: "https://api.openai.com/v1/chat/completions"
    , supported_models: &[
        ModelOption
        {   id: "gpt-3.5-turbo"
          , display_name: "GPT-3.5 Turbo (Faster, Cheaper)"
        }
      , ModelOption
        {   id: "gpt-4"
          , display_name: "GPT-4 (More Capable)"
        }
      , ModelOption
        {   id: "gpt-4-turbo-preview"
          , display_name: "GPT-4 Turbo"
        }
      ]
    , credential_prefix: "sk-"
    , wire: WireFormat::Chat
      {   system_prompt: OPENAI_SYSTEM_PROMPT
      }
    , models_url: Some("https://api.openai.com/v1/models")
  }
, ProviderDescriptor
  {   provider: crate::Provider::DeepSeek
    , id: "deepseek"
    , display_name: "DeepSeek"
    , endpoint: "https://api.deepseek.com/v1/chat/completions"
    , supported_models: &[
        ModelOption
        {   id: "deepseek-chat"
          , display_name: "DeepSeek Chat"
        }
      , ModelOption
        {   id: "deepseek-coder"
          , display_name: "DeepSeek Coder"
        }
      ]
    , credential_prefix: "dp-"
    , wire: WireFormat::Chat
      {   system_prompt: DEEPSEEK_SYSTEM_PROMPT
      }
    , models_url: Some("https://api.deepseek.com/v1/models")
  }
, ProviderDescriptor
  {   provider: crate::Provider::Anthropic
    , id: "anthropic"
    , display_name: "Anthropic"
    , endpoint: "https://api.anthropic.com/v1/complete"
    , supported_models: &[
        ModelOption
        {   id: "claude-2"
          , display_name: "Claude 2"
        }
      , ModelOption
        {   id: "claude-instant"
          , display_name: "Claude Instant"
        }
      ]
    , credential_prefix: "sk-ant-"
    , wire: WireFormat::Completion
    , models_url: None
  }
, ProviderDescriptor
  {   provider: crate::Provider::Google
    , id: "google"
    , display_name: "Google AI"
    , endpoint: "https://generativelanguage.googleapis.com/v1/models"
    , supported_models: &[
        ModelOption
        {   id: "gemini-pro"
          , display_name: "Gemini Pro"
        }
      , ModelOption
        {   id: "gemini-pro-vision"
          , display_name: "Gemini Pro Vision"
        }
      ]
    , credential_prefix: "AIza"
    , wire: WireFormat::SingleShot
    , models_url: None
  }
];

/// Look up a provider by its identifier
pub fn lookup(provider_id: &str)
  -> Result<&'static ProviderDescriptor, crate::error::Error>
{   let provider: crate::Provider = provider_id.parse()?;
    debug!("Registry lookup for: {}", provider);
    Ok(descriptor(provider))
}

/// Descriptor of an already-parsed provider
pub fn descriptor(provider: crate::Provider)
  -> &'static ProviderDescriptor
{   match provider
    {   crate::Provider::OpenAI => &REGISTRY[0]
      , crate::Provider::DeepSeek => &REGISTRY[1]
      , crate::Provider::Anthropic => &REGISTRY[2]
      , crate::Provider::Google => &REGISTRY[3]
    }
}

/// Every known provider, in the order a settings menu lists them
pub fn all() -> &'static [ProviderDescriptor]
{   &REGISTRY
}

impl ProviderDescriptor
{   /// First listed model, used when settings name none
    pub fn default_model(&self) -> &'static str
    {   self.supported_models
          .first()
          .map(|m| m.id)
          .unwrap_or_default()
    }

    pub fn supports_model(&self, model: &str) -> bool
    {   self.supported_models.iter().any(|m| m.id == model)
    }

    /// Prefix-format check; the only inspection a credential gets
    pub fn check_credential(&self, credential: &str)
      -> Result<(), crate::error::Error>
    {   if credential.trim().is_empty()
        {   return Err(crate::error::Error::MissingCredential(
              self.display_name.to_string()
            ));
        }
        if !credential.starts_with(self.credential_prefix)
        {   error!(
              "Credential for {} does not match expected prefix",
              self.id
            );
            return Err(crate::error::Error::InvalidCredentialFormat
            {   provider: self.display_name.to_string()
              , prefix: self.credential_prefix.to_string()
            });
        }
        Ok(())
    }
}
