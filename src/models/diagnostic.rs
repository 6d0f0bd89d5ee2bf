//! Diagnostic model for LSP integration

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lsp::{Range, line_length};

/// A server-reported issue attached to a document version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: DiagnosticSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Wire shape of a diagnostic
///
/// Severity and code stay loosely typed so one odd entry does not reject
/// the whole notification.
#[derive(Debug, Clone, Deserialize)]
pub struct LspDiagnostic {
    pub range: Range,
    #[serde(default)]
    pub severity: Option<i64>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl From<LspDiagnostic> for Diagnostic {
    fn from(raw: LspDiagnostic) -> Self {
        let code = match raw.code {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            range: raw.range,
            severity: raw
                .severity
                .map(DiagnosticSeverity::from_lsp)
                .unwrap_or(DiagnosticSeverity::Information),
            message: raw.message,
            code,
            source: raw.source.filter(|s| !s.is_empty()),
        }
    }
}

impl Diagnostic {
    fn origin(&self) -> Option<String> {
        match (&self.source, &self.code) {
            (Some(source), Some(code)) => Some(format!("({source} {code})")),
            (Some(source), None) => Some(format!("({source})")),
            (None, Some(code)) => Some(format!("({code})")),
            (None, None) => None,
        }
    }

    /// Render for display against the current document text
    ///
    /// The span stays on the start line and never runs past its end.
    pub fn render(&self, document: Option<&str>) -> RenderedDiagnostic {
        let message = self
            .message
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let text = match self.origin() {
            Some(origin) => format!("{origin} {message}"),
            None => message,
        };

        let line = self.range.start.line;
        let limit = document
            .and_then(|doc| line_length(doc, line))
            .unwrap_or(u32::MAX);

        let start = self.range.start.character.min(limit);
        let end = if self.range.end.line == line {
            self.range.end.character.min(limit)
        } else {
            limit
        };

        RenderedDiagnostic {
            severity: self.severity,
            text,
            line,
            start,
            end: end.max(start),
        }
    }
}

/// A diagnostic ready for a view: one line, one clipped span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDiagnostic {
    pub severity: DiagnosticSeverity,
    pub text: String,
    pub line: u32,
    pub start: u32,
    pub end: u32,
}

impl std::fmt::Display for RenderedDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line + 1,
            self.start + 1,
            self.severity,
            self.text
        )
    }
}

/// Severity levels (matches LSP spec)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    /// Parse from LSP numeric value; unknown values read as information
    pub fn from_lsp(value: i64) -> Self {
        match value {
            1 => Self::Error,
            2 => Self::Warning,
            4 => Self::Hint,
            _ => Self::Information,
        }
    }
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Information => write!(f, "info"),
            Self::Hint => write!(f, "hint"),
        }
    }
}

impl std::str::FromStr for DiagnosticSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "e" => Ok(Self::Error),
            "warning" | "warn" | "w" => Ok(Self::Warning),
            "info" | "information" | "i" => Ok(Self::Information),
            "hint" | "h" => Ok(Self::Hint),
            _ => Err(format!(
                "Unknown severity: '{}'. Valid: error, warning, info, hint",
                s
            )),
        }
    }
}
