//! Request-side types shared by the adapter and the HTTP layer

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Sampling settings supplied by the caller on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters
{   /// Model name
    pub model: String
  , /// Max tokens to generate, must be positive
    pub max_tokens: usize
  , /// Temperature for sampling, within [0, 2]
    pub temperature: f64
}

impl GenerationParameters
{   pub fn new(
      model: impl Into<String>
    , max_tokens: usize
    , temperature: f64
    ) -> Self
    {   GenerationParameters
        {   model: model.into()
          , max_tokens
          , temperature
        }
    }

    /// Check the ranges the providers accept
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.model.trim().is_empty()
        {   return Err(crate::error::Error::InvalidParameters(
              "model must not be empty".to_string()
            ));
        }
        if self.max_tokens == 0
        {   return Err(crate::error::Error::InvalidParameters(
              "max tokens must be greater than zero".to_string()
            ));
        }
        // NaN fails the range check too
        if !(0.0..=2.0).contains(&self.temperature)
        {   return Err(crate::error::Error::InvalidParameters(
              format!(
                "temperature {} outside [0, 2]",
                self.temperature
              )
            ));
        }
        Ok(())
    }
}

/// A fully formed POST, ready for the HTTP collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor
{   /// Target URL
    pub url: String
  , /// Header name to value, in name order
    pub headers: BTreeMap<String, String>
  , /// JSON body
    pub body: serde_json::Value
}

impl RequestDescriptor
{   pub fn header(&self, name: &str) -> Option<&str>
    {   self.headers.get(name).map(String::as_str)
    }
}

/// Error envelope most vendors return on non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse
{   #[serde(default)]
    pub error: Option<ErrorDetail>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail
{   #[serde(default)]
    pub message: Option<String>
  , #[serde(default, rename = "type")]
    pub kind: Option<String>
  , #[serde(default)]
    pub code: Option<serde_json::Value>
}

impl ErrorDetail
{   /// True when the vendor tags the error as an exhausted quota
    pub fn is_quota(&self) -> bool
    {   let tagged = |v: Option<&str>|
          v.map(|s| s == "insufficient_quota").unwrap_or(false);
        tagged(self.kind.as_deref())
          || tagged(self.code.as_ref().and_then(|c| c.as_str()))
    }
}
