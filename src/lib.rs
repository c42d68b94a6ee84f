pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod conversation;
pub mod prompts;
pub mod client;

use serde::{Deserialize, Serialize};

pub use client::ChatBackend;
pub use config::{FileStore, MemoryStore, Settings, SettingsStore, Theme};
pub use conversation::{ConversationAdapter, HISTORY_LIMIT};
pub use error::Error;
pub use providers::{lookup, ProviderDescriptor, WireFormat};
pub use request::{GenerationParameters, RequestDescriptor};

/*

ellen is the core of a chat client that relays user messages to one of
several hosted LLM HTTP APIs. the adapter turns one uniform message
history into the wire format each vendor expects, and turns the vendor's
reply back into plain text. rendering, theming and file pickers live in
whatever front end drives it.

ellen/
├── Cargo.toml
├── src/
│   ├── lib.rs           # Shared types and the backend channel surface
│   ├── error.rs         # Error enum and user-facing classification
│   ├── config.rs        # Persisted settings and settings stores
│   ├── providers/       # Static registry plus one module per wire format
│   │   ├── mod.rs
│   │   ├── chat.rs      # OpenAI / DeepSeek chat completions
│   │   ├── completion.rs# Anthropic text completions
│   │   └── generate.rs  # Google single-shot generation
│   ├── request.rs       # Generation parameters and request descriptors
│   ├── conversation.rs  # Bounded history and request/response adapter
│   ├── prompts.rs       # Quick-action and attachment prompts
│   └── client.rs        # Backend actor doing the HTTP round trip
└── tests/

*/

/// ELLEN BACKEND INTERFACE:

// ===== SendMessage =====

pub type SendMessageReply = Result<String, crate::error::Error>;
pub type SendMessageReplySender
  = tokio::sync::mpsc::UnboundedSender<SendMessageReply>;

pub struct SendMessageArgs
{   pub message: String
  , pub reply: SendMessageReplySender
}

// ===== NewConversation =====

pub type NewConversationReply = Result<(), crate::error::Error>;
pub type NewConversationReplySender
  = tokio::sync::mpsc::UnboundedSender<NewConversationReply>;

pub struct NewConversationArgs
{   pub reply: NewConversationReplySender
}

// ===== UpdateSettings =====

pub type UpdateSettingsReply = Result<(), crate::error::Error>;
pub type UpdateSettingsReplySender
  = tokio::sync::mpsc::UnboundedSender<UpdateSettingsReply>;

pub struct UpdateSettingsArgs
{   pub settings: crate::config::Settings
  , pub reply: UpdateSettingsReplySender
}

// ===== GetHistory =====

pub type GetHistoryReply
  = Result<Vec<crate::Message>, crate::error::Error>;
pub type GetHistoryReplySender
  = tokio::sync::mpsc::UnboundedSender<GetHistoryReply>;

pub struct GetHistoryArgs
{   pub reply: GetHistoryReplySender
}

// ===== TestConnection =====

pub type TestConnectionReply = Result<(), crate::error::Error>;
pub type TestConnectionReplySender
  = tokio::sync::mpsc::UnboundedSender<TestConnectionReply>;

pub struct TestConnectionArgs
{   pub reply: TestConnectionReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== ChatHand (sender side) =====

pub struct ChatHand
{   pub send_message_tx
      : tokio::sync::mpsc::UnboundedSender<SendMessageArgs>
  , pub new_conversation_tx
      : tokio::sync::mpsc::UnboundedSender<NewConversationArgs>
  , pub update_settings_tx
      : tokio::sync::mpsc::UnboundedSender<UpdateSettingsArgs>
  , pub get_history_tx
      : tokio::sync::mpsc::UnboundedSender<GetHistoryArgs>
  , pub test_connection_tx
      : tokio::sync::mpsc::UnboundedSender<TestConnectionArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== ChatFoot (receiver side) =====

pub struct ChatFoot
{   pub send_message_rx
      : tokio::sync::mpsc::UnboundedReceiver<SendMessageArgs>
  , pub new_conversation_rx
      : tokio::sync::mpsc::UnboundedReceiver<NewConversationArgs>
  , pub update_settings_rx
      : tokio::sync::mpsc::UnboundedReceiver<UpdateSettingsArgs>
  , pub get_history_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetHistoryArgs>
  , pub test_connection_rx
      : tokio::sync::mpsc::UnboundedReceiver<TestConnectionArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// ELLEN STRUCTURES:

/// The closed set of supported LLM providers.
/// Adding one means a new variant, a registry entry and a wire branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider
{   /// OpenAI chat completions (GPT-3.5, GPT-4)
    OpenAI
  , /// DeepSeek chat completions
    DeepSeek
  , /// Anthropic legacy text completions (Claude 2)
    Anthropic
  , /// Google generative language (Gemini)
    Google
}

impl Provider
{   /// Registry identifier, also the persisted `apiProvider` value
    pub fn as_str(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "openai"
          , Provider::DeepSeek => "deepseek"
          , Provider::Anthropic => "anthropic"
          , Provider::Google => "google"
        }
    }
}

impl std::fmt::Display for Provider
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider
{   type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s
        {   "openai" => Ok(Provider::OpenAI)
          , "deepseek" => Ok(Provider::DeepSeek)
          , "anthropic" => Ok(Provider::Anthropic)
          , "google" => Ok(Provider::Google)
          , other => Err(
              crate::error::Error::UnknownProvider(other.to_string())
            )
        }
    }
}

/// Who produced a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   User
  , Assistant
}

impl Role
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Role::User => "user"
          , Role::Assistant => "assistant"
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message
{   pub role: Role
  , pub content: String
}

impl Message
{   pub fn user(content: impl Into<String>) -> Self
    {   Message
        {   role: Role::User
          , content: content.into()
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   Message
        {   role: Role::Assistant
          , content: content.into()
        }
    }
}
