//! # Error Handling
//!
//! This module defines the centralized error type for `submodule-reconcile`.
//! It uses `thiserror` to describe every failure mode the library can hit,
//! with enough context (paths, URLs, commands) to act on the message.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all failures. Variants fall into two groups:
//!   - *Fatal input errors* (`ManifestLoad`, `DeclarationNotFound`,
//!     `DeclarationParse` on the top-level file) abort a run, because the
//!     build context itself cannot be trusted.
//!   - *Per-entry errors* (`MalformedUrl`, `Reconciliation`, `GitCommand`)
//!     are caught by the reconciliation engine and recorded as a `failed`
//!     outcome for a single submodule while the run continues.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for submodule-reconcile operations
#[derive(Error, Debug)]
pub enum Error {
    /// A submodule URL could not be turned into a canonical identity.
    ///
    /// Raised when the URL has no host and there is no containing repository
    /// to resolve it against, or when a relative reference climbs above the
    /// containing repository's host root.
    #[error("Malformed URL {url}: {message}")]
    MalformedUrl { url: String, message: String },

    /// The `.gitmodules` file does not exist.
    #[error("Submodule declaration file not found: {}", path.display())]
    DeclarationNotFound { path: PathBuf },

    /// The `.gitmodules` file exists but cannot be parsed.
    #[error("Submodule declaration parse error in {}: {message}", path.display())]
    DeclarationParse { path: PathBuf, message: String },

    /// The build-context manifest is unreadable or malformed.
    #[error("Manifest load error for {}: {message}", path.display())]
    ManifestLoad { path: PathBuf, message: String },

    /// A single submodule could not be reconciled.
    #[error("Reconciliation failed for {}: {message}", path.display())]
    Reconciliation { path: PathBuf, message: String },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {}: {command} - {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a `MalformedUrl` error.
    pub(crate) fn malformed_url(url: &str, message: impl Into<String>) -> Self {
        Error::MalformedUrl {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_malformed_url() {
        let error = Error::malformed_url("../../../x", "relative URL escapes host root");
        let display = format!("{}", error);
        assert!(display.contains("Malformed URL"));
        assert!(display.contains("../../../x"));
        assert!(display.contains("escapes host root"));
    }

    #[test]
    fn test_error_display_declaration_not_found() {
        let error = Error::DeclarationNotFound {
            path: PathBuf::from("/src/top/.gitmodules"),
        };
        let display = format!("{}", error);
        assert!(display.contains("declaration file not found"));
        assert!(display.contains("/src/top/.gitmodules"));
    }

    #[test]
    fn test_error_display_declaration_parse() {
        let error = Error::DeclarationParse {
            path: PathBuf::from(".gitmodules"),
            message: "submodule \"foo\" has no url".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("parse error in .gitmodules"));
        assert!(display.contains("has no url"));
    }

    #[test]
    fn test_error_display_manifest_load() {
        let error = Error::ManifestLoad {
            path: PathBuf::from("zuul.json"),
            message: "missing field `projects`".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Manifest load error"));
        assert!(display.contains("zuul.json"));
        assert!(display.contains("projects"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "submodule init".to_string(),
            dir: PathBuf::from("/src/top"),
            stderr: "fatal: not a git repository".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("submodule init"));
        assert!(display.contains("not a git repository"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{unclosed").unwrap_err();
        let error: Error = json_error.into();
        assert!(format!("{}", error).contains("JSON parsing error"));
    }
}
