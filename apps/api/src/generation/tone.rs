//! Tone guide: free-form writing samples handed to the narrative collaborator.
//!
//! The guide is opaque JSON: the core never interprets it, it only forwards it.

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ToneGuide(Value);

impl ToneGuide {
    /// Loads the guide; a missing file yields an empty guide, malformed JSON is an error.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let value: Value = serde_json::from_str(&raw).map_err(|e| {
                    anyhow::anyhow!("tone examples at {} are not valid JSON: {e}", path.display())
                })?;
                info!("Loaded tone examples from {}", path.display());
                Ok(Self(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "No tone examples at {}; narrative prompts will carry an empty guide",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read tone examples at {}: {e}",
                path.display()
            )),
        }
    }

    /// Rendering used inside prompts.
    pub fn to_prompt_text(&self) -> String {
        match &self.0 {
            Value::Null => "{}".to_string(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}
