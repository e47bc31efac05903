//! On-disk artifact format shared by every generation step.
//!
//! A generated artifact is a block of `// Key: value` metadata lines, a
//! marker line naming the artifact kind, and the payload:
//!
//! ```text
//! // Source prompt: .permuter/prompts/strict_L1_formal_1.md
//! // Generated: 2025-01-01T00:00:00Z
//! // Generated response:
//! The payload, verbatim.
//! ```
//!
//! All encoding and decoding of this format goes through this module.

use serde::{Deserialize, Serialize};

/// Line prefix that marks a comment in every text asset.
pub const COMMENT_MARKER: &str = "//";

/// Kinds of generated artifact, each with its own marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Prompt,
    Response,
    SystemPrompt,
}

impl ArtifactKind {
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Prompt => "// Generated prompt:",
            Self::Response => "// Generated response:",
            Self::SystemPrompt => "// Generated system prompt:",
        }
    }
}

pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with(COMMENT_MARKER)
}

/// Drop comment lines and trim the remainder.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !is_comment(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Ordered metadata written above the marker line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactHeader {
    entries: Vec<(String, String)>,
}

impl ArtifactHeader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.entries.push((key.into(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Render as comment lines, one entry per line. Values are flattened
    /// to a single line so they cannot escape the header.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{COMMENT_MARKER} {k}: {}", v.replace('\n', " ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parse_line(line: &str) -> Option<(String, String)> {
        let body = line.trim_start().strip_prefix(COMMENT_MARKER)?.trim();
        let (key, value) = body.split_once(':')?;
        Some((key.trim().to_string(), value.trim().to_string()))
    }
}

/// A decoded generated artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub header: ArtifactHeader,
    pub payload: String,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, header: ArtifactHeader, payload: impl Into<String>) -> Self {
        Self {
            kind,
            header,
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> String {
        let header = self.header.render();
        let mut out = String::with_capacity(header.len() + self.payload.len() + 64);
        if !header.is_empty() {
            out.push_str(&header);
            out.push('\n');
        }
        out.push_str(self.kind.marker());
        out.push('\n');
        out.push_str(self.payload.trim());
        out.push('\n');
        out
    }

    /// Decode raw file text. Returns `None` when the marker line is absent.
    ///
    /// Header entries are the `// Key: value` lines before the marker; the
    /// payload is every non-comment line after it, trimmed.
    pub fn decode(kind: ArtifactKind, raw: &str) -> Option<Self> {
        let marker = kind.marker();
        let mut lines = raw.lines();
        let mut header = ArtifactHeader::new();

        loop {
            let line = lines.next()?;
            if line.trim() == marker {
                break;
            }
            if let Some((k, v)) = ArtifactHeader::parse_line(line) {
                header.entries.push((k, v));
            }
        }

        let payload = strip_comments(&lines.collect::<Vec<_>>().join("\n"));
        Some(Self {
            kind,
            header,
            payload,
        })
    }
}
