use std::fmt::{Display, Formatter};
use crate::exec::RuntimeError;
use crate::lexer::{LexingError, Position};
use crate::parser::ParsingError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Lexing,
    Parsing,
    Runtime,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Lexing => write!(f, "lexing"),
            Phase::Parsing => write!(f, "parsing"),
            Phase::Runtime => write!(f, "runtime"),
        }
    }
}

/// A located error from any phase, ready to be shown against the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub position: Position,
    pub message: String,
    pub hint: Option<String>,
}

impl From<LexingError> for Diagnostic {
    fn from(error: LexingError) -> Diagnostic {
        Diagnostic {
            phase: Phase::Lexing,
            position: error.position().clone(),
            message: error.to_string(),
            hint: error.hint().map(str::to_string),
        }
    }
}

impl From<ParsingError> for Diagnostic {
    fn from(error: ParsingError) -> Diagnostic {
        Diagnostic {
            phase: Phase::Parsing,
            position: error.position().clone(),
            message: error.to_string(),
            hint: None,
        }
    }
}

impl From<RuntimeError> for Diagnostic {
    fn from(error: RuntimeError) -> Diagnostic {
        Diagnostic {
            phase: Phase::Runtime,
            position: error.position().clone(),
            message: error.to_string(),
            hint: error.hint(),
        }
    }
}

impl Diagnostic {
    /// Renders the diagnostic with the offending line of `source` and a caret under the column.
    pub fn render(&self, source: &str) -> String {
        let line = source
            .split('\n')
            .nth(self.position.line.saturating_sub(1))
            .unwrap_or_default()
            .trim_end_matches('\r');
        // Keep tabs so the caret lines up with the echoed line.
        let padding = line
            .chars()
            .take(self.position.column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect::<String>();

        let mut rendered = format!(
            "| An error occurred during {}:\n|  File {}, line {} col {}\n|\n|  {line}\n|  {padding}^ {}",
            self.phase, self.position.file, self.position.line, self.position.column, self.message,
        );
        if let Some(hint) = &self.hint {
            rendered.push_str(&format!("\n|  ? {hint}"));
        }
        rendered
    }
}
