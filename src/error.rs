//! Error definitions for all `mockweave` generation stages.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum WeaveError {
    /// Source module (or a generated draft fed back in) could not be scanned.
    #[error("parse error in {context}: {message}")]
    ParseError { context: String, message: String },
    /// A configured target cannot be matched to a declared symbol.
    /// Individual misses during generation are skipped with a diagnostic;
    /// this surfaces when nothing a request names resolves.
    #[error("resolution error: {0}")]
    ResolutionError(String),
    /// Pass-2 re-parse of the generated draft failed. The synthesizer
    /// produced invalid output; nothing is emitted for the module.
    #[error("render consistency error: {message}\n--- offending draft ---\n{draft}")]
    RenderError { message: String, draft: String },
    /// Mutually exclusive or malformed per-declaration configuration.
    #[error("config error: {0}")]
    ConfigError(String),
    /// Filesystem I/O error from CLI or callers that propagate I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
