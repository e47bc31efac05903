//! Model client identities and requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two model roles the harness drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientName {
    /// Generates prompts, system prompts and evaluations.
    Service,
    /// The model whose system prompt is being improved.
    Target,
}

impl ClientName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for ClientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "target" => Ok(Self::Target),
            other => Err(format!("unknown client: {other}")),
        }
    }
}

/// A single instructions + input exchange with a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// System-level instructions.
    pub instructions: String,
    /// User turn.
    pub input: String,
    pub temperature: Option<f32>,
}

impl ModelRequest {
    pub fn new(instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            input: input.into(),
            temperature: None,
        }
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}
