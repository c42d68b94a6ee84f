use tokio::sync::mpsc;
use log::{debug, trace, error, info, warn};
use crate::ChatFoot;

/// Backend state: one conversation plus what is needed to send it
pub struct ChatBackendState
{   pub adapter: crate::conversation::ConversationAdapter
  , pub settings: crate::config::Settings
  , pub http_client: reqwest::Client
}

impl ChatBackendState
{   pub fn new(settings: crate::config::Settings) -> Self
    {   debug!(
          "Initializing ChatBackendState for provider {}",
          settings.api_provider
        );
        ChatBackendState
        {   adapter: crate::conversation::ConversationAdapter::new()
          , settings
          , http_client: reqwest::Client::new()
        }
    }

    /// One full turn. The user turn stays in history even when the
    /// request or the response fails, so it need not be retyped.
    async fn handle_send_message(
      &mut self
    , message: String
    ) -> Result<String, crate::error::Error>
    {   self.adapter.append_user_turn(&message)?;

        let provider_id = self.settings.api_provider.clone();
        let mut request = self.adapter.build_request(
          &provider_id,
          &self.settings.api_key,
          &self.settings.generation_parameters()
        )?;
        if let Some(base) = &self.settings.api_base
        {   debug!("Using endpoint override for {}", provider_id);
            request.url = base.clone();
        }

        let body = post_request(&self.http_client, &request).await?;
        self.adapter.ingest_response(&provider_id, &body)
    }

    fn handle_update_settings(
      &mut self
    , settings: crate::config::Settings
    ) -> Result<(), crate::error::Error>
    {   settings.validate()?;
        if settings.api_provider != self.settings.api_provider
        {   info!(
              "Switching provider from {} to {}",
              self.settings.api_provider, settings.api_provider
            );
        }
        self.settings = settings;
        Ok(())
    }

    /// Check the stored key's format, then probe the vendor's model
    /// listing where one exists
    async fn handle_test_connection(
      &self
    ) -> Result<(), crate::error::Error>
    {   let descriptor
          = crate::providers::lookup(&self.settings.api_provider)?;
        descriptor.check_credential(&self.settings.api_key)?;

        let Some(registry_url) = descriptor.models_url else
        {   debug!(
              "{} has no listing endpoint, format check only",
              descriptor.id
            );
            return Ok(());
        };
        let models_url = match &self.settings.api_base
        {   Some(base) => models_url_for_base(base)
          , None => registry_url.to_string()
        };

        let response = self.http_client
          .get(&models_url)
          .header(
            "Authorization",
            format!("Bearer {}", self.settings.api_key)
          )
          .send()
          .await
          .map_err(|e| {
            error!("Failed to reach {}: {}", descriptor.id, e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Models response status: {}", status);
        if status.is_success()
        {   info!("API connection to {} successful", descriptor.id);
            return Ok(());
        }

        let error_text = response.text().await.map_err(|e| {
          error!("Failed to read response body: {}", e);
          crate::error::Error::HttpError(e.to_string())
        })?;
        Err(classify_failure(
          status.as_u16(),
          status.canonical_reason(),
          &error_text
        ))
    }
}

/// Listing endpoint next to an overridden chat endpoint: everything
/// after the `/v1` segment becomes `/models`
pub fn models_url_for_base(base: &str) -> String
{   match base.find("/v1/")
    {   Some(idx) => format!("{}/v1/models", &base[..idx])
      , None => format!("{}/models", base.trim_end_matches('/'))
    }
}

/// POST a request descriptor and return the raw success body
pub async fn post_request(
  http_client: &reqwest::Client
, request: &crate::request::RequestDescriptor
) -> Result<String, crate::error::Error>
{   let mut builder = http_client.post(&request.url);
    for (name, value) in &request.headers
    {   builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder
      .json(&request.body)
      .send()
      .await
      .map_err(|e| {
        error!("HTTP error: {}", e);
        crate::error::Error::HttpError(e.to_string())
      })?;

    let status = response.status();
    trace!("Response status: {}", status);

    let text = response.text().await.map_err(|e| {
      error!("Failed to read response body: {}", e);
      crate::error::Error::HttpError(e.to_string())
    })?;

    if !status.is_success()
    {   return Err(classify_failure(
          status.as_u16(),
          status.canonical_reason(),
          &text
        ));
    }
    Ok(text)
}

/// Map a non-2xx response to an error from its status code and the
/// vendor's structured error body
pub fn classify_failure(
  status: u16
, reason: Option<&str>
, body: &str
) -> crate::error::Error
{   let detail = serde_json::from_str::<crate::request::ErrorResponse>(body)
      .ok()
      .and_then(|r| r.error);
    let vendor_message = detail.as_ref()
      .and_then(|d| d.message.clone());

    error!("API error {}: {:?}", status, vendor_message);

    match status
    {   429 if detail.as_ref().map(|d| d.is_quota()).unwrap_or(false) => {
          crate::error::Error::QuotaExceeded
        }
      , 429 => crate::error::Error::RateLimitExceeded
      , 401 | 403 => {
          crate::error::Error::AuthenticationFailed(
            vendor_message.unwrap_or_else(||
              format!("API Error: {} {}", status, reason.unwrap_or(""))
                .trim_end()
                .to_string()
            )
          )
        }
      , _ => crate::error::Error::ApiError
        {   status
          , message: vendor_message.unwrap_or_else(||
              format!("API Error: {} {}", status, reason.unwrap_or(""))
                .trim_end()
                .to_string()
            )
        }
    }
}

/// Public API for the chat backend - owns the task
pub struct ChatBackend
{   hand: crate::ChatHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl ChatBackend
{   /// Create and spawn a new chat backend
    /// Returns immediately - spawns background task
    pub fn new(settings: crate::config::Settings) -> Self
    {   debug!("Creating ChatBackend with task ownership");

        let (send_message_tx, send_message_rx)
          = mpsc::unbounded_channel();
        let (new_conversation_tx, new_conversation_rx)
          = mpsc::unbounded_channel();
        let (update_settings_tx, update_settings_rx)
          = mpsc::unbounded_channel();
        let (get_history_tx, get_history_rx)
          = mpsc::unbounded_channel();
        let (test_connection_tx, test_connection_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::ChatHand
        {   send_message_tx
          , new_conversation_tx
          , update_settings_tx
          , get_history_tx
          , test_connection_tx
          , kill_process_tx
        };

        let foot = crate::ChatFoot
        {   send_message_rx
          , new_conversation_rx
          , update_settings_rx
          , get_history_rx
          , test_connection_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, settings).await
        });

        ChatBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a user message - returns almost immediately
    pub async fn send_message(
      &self
    , message: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SendMessageReply>,
        crate::error::Error
      >
    {   debug!("send_message queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::SendMessageArgs
        {   message
          , reply: reply_tx
        };

        self.hand.send_message_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Clear the conversation - returns almost immediately
    pub async fn new_conversation(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::NewConversationReply>,
        crate::error::Error
      >
    {   debug!("new_conversation queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.new_conversation_tx
          .send(crate::NewConversationArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Replace the active settings - returns almost immediately
    pub async fn update_settings(
      &self
    , settings: crate::config::Settings
    ) -> Result<
        mpsc::UnboundedReceiver<crate::UpdateSettingsReply>,
        crate::error::Error
      >
    {   debug!(
          "update_settings queuing for provider {}",
          settings.api_provider
        );
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::UpdateSettingsArgs
        {   settings
          , reply: reply_tx
        };

        self.hand.update_settings_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Snapshot the history - returns almost immediately
    pub async fn get_history(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GetHistoryReply>,
        crate::error::Error
      >
    {   debug!("get_history queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.get_history_tx
          .send(crate::GetHistoryArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Probe the configured credential - returns almost immediately
    pub async fn test_connection(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::TestConnectionReply>,
        crate::error::Error
      >
    {   debug!("test_connection queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.test_connection_tx
          .send(crate::TestConnectionArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down ChatBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown reply dropped");
            Err(crate::error::Error::Other(
              "Backend stopped without confirming".to_string()
            ))
        }
    }
}

fn disconnected() -> crate::error::Error
{   error!("Backend channel closed");
    crate::error::Error::Other("Backend disconnected".to_string())
}

/// Main backend event loop
///
/// Each arm runs to completion before the next command is taken,
/// so a turn's request and response are never interleaved with
/// another turn.
async fn run_backend_loop(
  foot: crate::ChatFoot
, settings: crate::config::Settings
)
{   debug!("Starting ChatBackend event loop");
    let mut state = ChatBackendState::new(settings);
    let ChatFoot
    {   mut send_message_rx
      , mut new_conversation_rx
      , mut update_settings_rx
      , mut get_history_rx
      , mut test_connection_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = send_message_rx.recv() => {
          debug!("Received SendMessage");
          let result = state.handle_send_message(cmd.message).await;
          if let Err(e) = &result
          {   warn!("Turn failed: {}", e);
          }
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = new_conversation_rx.recv() => {
          debug!("Received NewConversation");
          state.adapter.reset();
          let _ = cmd.reply.send(Ok(()));
        }
      , Some(cmd) = update_settings_rx.recv() => {
          debug!("Received UpdateSettings");
          let result = state.handle_update_settings(cmd.settings);
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = get_history_rx.recv() => {
          debug!("Received GetHistory");
          let _ = cmd.reply.send(Ok(state.adapter.history_snapshot()));
        }
      , Some(cmd) = test_connection_rx.recv() => {
          debug!("Received TestConnection");
          let result = state.handle_test_connection().await;
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("ChatBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
