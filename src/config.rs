//! Persisted settings and the key-value stores that hold them

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use log::{debug, error, warn};

/// Fixed key the settings blob lives under
pub const SETTINGS_KEY: &str = "ellen_settings";

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: usize = 1000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Colour scheme the front end applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme
{   #[default]
    Dark
  , Light
  , /// Follow the system preference
    Auto
}

/// User settings, stored as one JSON blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSettings")]
pub struct Settings
{   /// Credential for the active provider
    pub api_key: String
  , /// Registry identifier of the active provider
    pub api_provider: String
  , /// Model name
    pub model: String
  , /// Max tokens to generate
    pub max_tokens: usize
  , /// Temperature for sampling
    pub temperature: f64
  , pub theme: Theme
  , /// Endpoint override, replaces the registry URL when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>
}

impl Default for Settings
{   fn default() -> Self
    {   Settings
        {   api_key: String::new()
          , api_provider: DEFAULT_PROVIDER.to_string()
          , model: DEFAULT_MODEL.to_string()
          , max_tokens: DEFAULT_MAX_TOKENS
          , temperature: DEFAULT_TEMPERATURE
          , theme: Theme::default()
          , api_base: None
        }
    }
}

/// Blob as written to storage. Older front ends stored a failed
/// number parse as `null`, so every field may be absent or null.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredSettings
{   api_key: Option<String>
  , api_provider: Option<String>
  , model: Option<String>
  , max_tokens: Option<usize>
  , temperature: Option<f64>
  , theme: Option<Theme>
  , api_base: Option<String>
}

impl From<StoredSettings> for Settings
{   fn from(stored: StoredSettings) -> Self
    {   let defaults = Settings::default();
        Settings
        {   api_key: stored.api_key.unwrap_or_default()
          , api_provider: stored.api_provider
              .unwrap_or(defaults.api_provider)
          , // empty model is resolved against the provider later
            model: stored.model.unwrap_or_default()
          , max_tokens: stored.max_tokens.unwrap_or(defaults.max_tokens)
          , temperature: stored.temperature
              .unwrap_or(defaults.temperature)
          , theme: stored.theme.unwrap_or(defaults.theme)
          , api_base: stored.api_base
        }
    }
}

impl Settings
{   /// Read settings from `store`, falling back to defaults when
    /// nothing has been saved yet.
    pub fn load(store: &dyn SettingsStore)
      -> Result<Self, crate::error::Error>
    {   match store.get(SETTINGS_KEY)?
        {   Some(blob) => {
              debug!("Loading saved settings");
              let settings: Settings = serde_json::from_str(&blob)
                .map_err(|e| {
                  error!("Error loading saved settings: {}", e);
                  crate::error::Error::ParseError(e.to_string())
                })?;
              Ok(settings.normalized())
            }
          , None => {
              debug!("No saved settings, using defaults");
              Ok(Settings::default())
            }
        }
    }

    /// Validate, then write the blob under the fixed key
    pub fn save(&self, store: &mut dyn SettingsStore)
      -> Result<(), crate::error::Error>
    {   self.validate()?;
        let blob = serde_json::to_string(self)?;
        store.set(SETTINGS_KEY, &blob)?;
        debug!("Settings saved for provider {}", self.api_provider);
        Ok(())
    }

    /// Forget saved settings and return the defaults
    pub fn reset(store: &mut dyn SettingsStore)
      -> Result<Self, crate::error::Error>
    {   store.remove(SETTINGS_KEY)?;
        debug!("Settings reset to default");
        Ok(Settings::default())
    }

    /// Provider known, key (when given) well-formed, parameters in range
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   let descriptor = crate::providers::lookup(&self.api_provider)?;
        if !self.api_key.is_empty()
        {   descriptor.check_credential(&self.api_key)?;
        }
        if !descriptor.supports_model(&self.model)
        {   warn!(
              "Model {} is not listed for {}",
              self.model, descriptor.id
            );
        }
        self.generation_parameters().validate()
    }

    /// The subset the adapter consumes on every request
    pub fn generation_parameters(&self)
      -> crate::request::GenerationParameters
    {   crate::request::GenerationParameters::new(
          self.model.clone(),
          self.max_tokens,
          self.temperature
        )
    }

    /// Replace empty or zero fields with defaults, the way a partially
    /// written blob is expected to be read.
    fn normalized(mut self) -> Self
    {   self.api_key = self.api_key.trim().to_string();
        if self.api_provider.is_empty()
        {   self.api_provider = DEFAULT_PROVIDER.to_string();
        }
        if self.model.is_empty()
        {   self.model = crate::providers::lookup(&self.api_provider)
              .map(|d| d.default_model().to_string())
              .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        }
        if self.max_tokens == 0
        {   self.max_tokens = DEFAULT_MAX_TOKENS;
        }
        if !(0.0..=2.0).contains(&self.temperature)
        {   self.temperature = DEFAULT_TEMPERATURE;
        }
        self
    }
}

/// Key-value persistence collaborator
pub trait SettingsStore: Send
{   fn get(&self, key: &str)
      -> Result<Option<String>, crate::error::Error>;

    fn set(&mut self, key: &str, value: &str)
      -> Result<(), crate::error::Error>;

    fn remove(&mut self, key: &str)
      -> Result<(), crate::error::Error>;
}

/// Process-local store, gone when dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryStore
{   entries: HashMap<String, String>
}

impl MemoryStore
{   pub fn new() -> Self
    {   MemoryStore::default()
    }
}

impl SettingsStore for MemoryStore
{   fn get(&self, key: &str)
      -> Result<Option<String>, crate::error::Error>
    {   Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str)
      -> Result<(), crate::error::Error>
    {   self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str)
      -> Result<(), crate::error::Error>
    {   self.entries.remove(key);
        Ok(())
    }
}

/// One JSON object file mapping keys to blobs
#[derive(Debug, Clone)]
pub struct FileStore
{   path: PathBuf
}

impl FileStore
{   pub fn new(path: impl AsRef<Path>) -> Self
    {   FileStore
        {   path: path.as_ref().to_path_buf()
        }
    }

    pub fn path(&self) -> &Path
    {   &self.path
    }

    fn read_all(&self)
      -> Result<HashMap<String, String>, crate::error::Error>
    {   if !self.path.exists()
        {   return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
          error!("Failed to read {}: {}", self.path.display(), e);
          crate::error::Error::StorageError(e.to_string())
        })?;
        if raw.trim().is_empty()
        {   return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_all(&self, entries: &HashMap<String, String>)
      -> Result<(), crate::error::Error>
    {   let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw).map_err(|e| {
          error!("Failed to write {}: {}", self.path.display(), e);
          crate::error::Error::StorageError(e.to_string())
        })
    }
}

impl SettingsStore for FileStore
{   fn get(&self, key: &str)
      -> Result<Option<String>, crate::error::Error>
    {   Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str)
      -> Result<(), crate::error::Error>
    {   let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str)
      -> Result<(), crate::error::Error>
    {   let mut entries = self.read_all()?;
        if entries.remove(key).is_some()
        {   self.write_all(&entries)?;
        }
        Ok(())
    }
}
