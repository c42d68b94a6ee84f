//! Canned prompts the front end drops into the input box

use log::debug;

/// Largest attachment accepted, in bytes
pub const MAX_ATTACHMENT_BYTES: usize = 1024 * 1024;

/// Extensions accepted for file analysis
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
  "txt", "js", "py", "html", "css", "json", "md", "jsx", "ts", "tsx",
  "php", "java", "cpp", "c", "cs", "rb", "go", "rs", "swift", "kt",
];

/// Marker the caller selects so the user can paste over it
pub const CODE_PLACEHOLDER: &str = "// Paste your code here";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction
{   ExplainCode
  , ReviewCode
  , GenerateTests
  , DebugCode
}

impl QuickAction
{   pub fn template(&self) -> String
    {   let lead = match self
        {   QuickAction::ExplainCode => {
              "Please explain this code and how it works:"
            }
          , QuickAction::ReviewCode => {
              "Please review this code and suggest improvements:"
            }
          , QuickAction::GenerateTests => {
              "Please generate unit tests for this code:"
            }
          , QuickAction::DebugCode => {
              "Help me debug this code. What might be wrong?"
            }
        };
        format!("{}\n\n```\n{}\n```", lead, CODE_PLACEHOLDER)
    }
}

impl std::str::FromStr for QuickAction
{   type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s
        {   "explain-code" => Ok(QuickAction::ExplainCode)
          , "review-code" => Ok(QuickAction::ReviewCode)
          , "generate-tests" => Ok(QuickAction::GenerateTests)
          , "debug-code" => Ok(QuickAction::DebugCode)
          , other => Err(crate::error::Error::Other(
              format!("Unknown quick action: {}", other)
            ))
        }
    }
}

/// Wrap an uploaded file in a fenced block tagged with its extension
pub fn file_analysis_prompt(file_name: &str, contents: &str)
  -> Result<String, crate::error::Error>
{   if contents.len() > MAX_ATTACHMENT_BYTES
    {   return Err(crate::error::Error::InvalidAttachment(
          "File too large. Maximum size is 1MB.".to_string()
        ));
    }

    let extension = file_name
      .rsplit_once('.')
      .map(|(_, ext)| ext.to_lowercase())
      .unwrap_or_default();

    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str())
    {   return Err(crate::error::Error::InvalidAttachment(
          format!("Unsupported file type: {}", file_name)
        ));
    }

    debug!("Attaching {} ({} bytes)", file_name, contents.len());
    Ok(format!(
      "Please analyze this {} file:\n\n```{}\n{}\n```",
      file_name, extension, contents
    ))
}
