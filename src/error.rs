use std::fmt;

/// Custom error type for ellen operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Provider identifier is not in the registry
    UnknownProvider(String)
  , /// User message is empty after trimming
    EmptyMessage
  , /// Credential is missing for a provider
    MissingCredential(String)
  , /// Credential does not start with the provider's prefix
    InvalidCredentialFormat
    {   provider: String
      , prefix: String
    }
  , /// Generation parameters out of range
    InvalidParameters(String)
  , /// Response body lacks the expected reply field
    MalformedResponse(String)
  , /// HTTP transport error
    HttpError(String)
  , /// API returned an error response
    ApiError
    {   status: u16
      , message: String
    }
  , /// Rate limit exceeded
    RateLimitExceeded
  , /// Account quota exhausted
    QuotaExceeded
  , /// Provider rejected the credential
    AuthenticationFailed(String)
  , /// Rejected file attachment
    InvalidAttachment(String)
  , /// Settings store failure
    StorageError(String)
  , /// Failed to parse stored data
    ParseError(String)
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::UnknownProvider(id) => {
              write!(f, "Unknown provider: {}", id)
            }
          , Error::EmptyMessage => {
              write!(f, "Message is empty")
            }
          , Error::MissingCredential(provider) => {
              write!(f,
                "API key not configured. Please set your {} API key \
                 in settings.",
                provider
              )
            }
          , Error::InvalidCredentialFormat { provider, prefix } => {
              write!(f,
                "Invalid API key format. {} keys start with \"{}\"",
                provider, prefix
              )
            }
          , Error::InvalidParameters(msg) => {
              write!(f, "Invalid generation parameters: {}", msg)
            }
          , Error::MalformedResponse(msg) => {
              write!(f, "Invalid response format from API: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, message } => {
              write!(f, "API error ({}): {}", status, message)
            }
          , Error::RateLimitExceeded => {
              write!(f, "API rate limit exceeded")
            }
          , Error::QuotaExceeded => {
              write!(f, "API quota exceeded")
            }
          , Error::AuthenticationFailed(msg) => {
              write!(f, "Authentication failed: {}", msg)
            }
          , Error::InvalidAttachment(msg) => {
              write!(f, "Invalid attachment: {}", msg)
            }
          , Error::StorageError(msg) => {
              write!(f, "Storage error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error
{   /// Message suitable for showing to the person chatting.
    ///
    /// Classification is driven by the variant, which the HTTP layer
    /// picks from the status code and the vendor's structured error
    /// body, never from the wording of the vendor message.
    pub fn user_message(&self) -> String
    {   match self
        {   Error::InvalidCredentialFormat { .. }
          | Error::AuthenticationFailed(_) => {
              format!(
                "{} Please check your API key in settings.",
                self
              )
            }
          , Error::QuotaExceeded => {
              "API quota exceeded. Please check your provider \
               account.".to_string()
            }
          , Error::RateLimitExceeded => {
              "Rate limit exceeded. Please wait a moment and try \
               again.".to_string()
            }
          , Error::HttpError(_) => {
              "Network error. Please check your internet \
               connection.".to_string()
            }
          , Error::ApiError { message, .. } => message.clone()
          , Error::Other(_) => {
              "An unexpected error occurred. Please try \
               again.".to_string()
            }
          , _ => self.to_string()
        }
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::ParseError(e.to_string())
    }
}
