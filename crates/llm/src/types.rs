//! Provider identification.

use std::fmt;
use std::str::FromStr;

/// Model backends the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Whether calls must carry an API key.
    pub fn needs_api_key(self) -> bool {
        matches!(self, Self::Anthropic)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    /// Case-insensitive; "claude" is accepted for Anthropic.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(format!("Unknown provider: {}", name)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
