//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug, Serialize)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// File does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                format!("TRY: Look for similar files: ls {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_else(|| ".".to_string())),
            ])
    }

    /// File cannot be read
    pub fn cannot_read_file(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot read file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                format!("TRY: Check file permissions: ls -la {}", path.display()),
                "TRY: Make sure the file is UTF-8 text".to_string(),
            ])
    }

    /// Configuration file could not be used
    pub fn invalid_config(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid configuration: {}", details))
            .with_context(format!("While loading {}", path.display()))
            .with_suggestions([
                "TRY: Show the effective settings: trendpress config".to_string(),
                format!("TRY: Move the file aside to fall back to defaults: mv {0} {0}.bak", path.display()),
            ])
    }

    /// The local rate guard refused the call
    pub fn rate_limited(endpoint: &str, retry_after_seconds: Option<u64>) -> Self {
        let wait = retry_after_seconds
            .map(|s| format!("{} second{}", s, if s == 1 { "" } else { "s" }))
            .unwrap_or_else(|| "a moment".to_string());
        Self::new(format!("Too many requests to {}", endpoint))
            .with_context(format!("The configured rate limit for {} was reached", endpoint))
            .with_suggestions([
                format!("TRY: Wait {} and run the command again", wait),
                format!("TRY: Raise [rate_limits.\"{}\"] in config.toml", endpoint),
            ])
    }

    /// Empty keyword argument
    pub fn empty_keyword() -> Self {
        Self::new("Keyword must not be empty")
            .with_suggestion("TRY: Quote multi-word keywords: trendpress check \"전세 대출 금리\"")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

#[derive(Serialize)]
struct JsonErrorBody<'a> {
    error: JsonError<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonError<'a> {
    Helpful(&'a HelpfulError),
    Plain { message: String },
}

/// Print an error as a JSON object on stdout, for `--json` callers.
pub fn print_json_error(err: &anyhow::Error) {
    let error = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => JsonError::Helpful(helpful),
        None => JsonError::Plain {
            message: format!("{:#}", err),
        },
    };
    match serde_json::to_string_pretty(&JsonErrorBody { error }) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{:?}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While processing data")
            .with_suggestion("Try again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While processing data"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_file_not_found() {
        let err = HelpfulError::file_not_found(&PathBuf::from("/drafts/missing.md"));
        let display = format!("{}", err);
        assert!(display.contains("/drafts/missing.md"));
        assert!(display.contains("TRY:"));
    }

    #[test]
    fn test_rate_limited_mentions_wait() {
        let err = HelpfulError::rate_limited("jobs.start", Some(1));
        let display = format!("{}", err);
        assert!(display.contains("Wait 1 second "));
        assert!(display.contains("rate_limits.\"jobs.start\""));
    }

    #[test]
    fn test_helpful_error_survives_anyhow() {
        let err: anyhow::Error = HelpfulError::empty_keyword().into();
        let helpful = err.downcast_ref::<HelpfulError>().unwrap();
        let json = serde_json::to_value(helpful).unwrap();
        assert_eq!(json["message"], "Keyword must not be empty");
        assert!(json.get("context").is_none());
    }
}
