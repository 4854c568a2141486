//! Diagnostic formatting for better error messages
//!
//! This module formats a `PlcError` with its source line and a caret under
//! the failing column.

use super::{PlcError, SourceLocation};
use colored::Colorize;

/// Diagnostic information for displaying errors with context
pub struct Diagnostic<'a> {
    error: &'a PlcError,
    source: Option<&'a str>,
    filename: Option<&'a str>,
}

impl<'a> Diagnostic<'a> {
    /// Create a new diagnostic from an error
    pub fn new(error: &'a PlcError) -> Self {
        Self {
            error,
            source: None,
            filename: None,
        }
    }

    /// Create a diagnostic with source code context
    pub fn with_source(error: &'a PlcError, source: &'a str, filename: Option<&'a str>) -> Self {
        Self {
            error,
            source: Some(source),
            filename,
        }
    }

    /// Format the diagnostic with color and context
    pub fn format(&self) -> String {
        let mut output = String::new();

        let kind = self.error.kind().red().bold();
        output.push_str(&format!("{}: ", kind));
        output.push_str(self.error.message());
        output.push('\n');

        if let Some(location) = self.error.location() {
            let position = match self.filename {
                Some(filename) => format!("{}:{}", filename, location),
                None => location.to_string(),
            };
            output.push_str(&format!("  {} {}\n", "-->".blue().bold(), position));

            if let Some(source) = self.source {
                output.push_str(&self.format_source_context(source, location));
            }
        }

        output
    }

    /// Format the failing line with a caret under the error column
    fn format_source_context(&self, source: &str, location: &SourceLocation) -> String {
        let mut output = String::new();
        let lines: Vec<&str> = source.lines().collect();

        if location.line == 0 || location.line > lines.len() {
            return output;
        }

        let line_idx = location.line - 1;
        let line_num_width = location.line.to_string().len();

        output.push_str(&format!(
            "  {} {}\n",
            format!("{:width$}", location.line, width = line_num_width)
                .blue()
                .bold(),
            lines[line_idx]
        ));

        let indicator_padding = " ".repeat(line_num_width + 2 + location.column.saturating_sub(1) + 1);
        output.push_str(&format!("{}{}\n", indicator_padding, "^".red().bold()));

        output
    }
}

impl std::fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LexErrorKind, TypeErrorKind};

    #[test]
    fn test_diagnostic_without_source() {
        let err = PlcError::type_error(TypeErrorKind::MissingMain, "missing main", None);
        let formatted = Diagnostic::new(&err).format();

        assert!(formatted.contains("Type Error"));
        assert!(formatted.contains("missing main"));
        assert!(!formatted.contains("-->"));
    }

    #[test]
    fn test_diagnostic_with_source() {
        let source = "LET x: Integer = 1;\nLET y: String = \"abc;\n";
        let loc = SourceLocation::new(36, 2, 17);
        let err = PlcError::lex_error(LexErrorKind::UnterminatedString, "unterminated string", loc);
        let formatted = Diagnostic::with_source(&err, source, Some("demo.plc")).format();

        assert!(formatted.contains("Lex Error"));
        assert!(formatted.contains("demo.plc:2:17"));
        assert!(formatted.contains("LET y: String"));
        assert!(!formatted.contains("LET x: Integer"));
    }
}
