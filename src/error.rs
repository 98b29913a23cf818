//! Error types for the chatgold crate.

use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fixture generation and persistence.
///
/// `Schema` is the only fatal pre-generation error: a malformed scenario
/// would silently corrupt every model's fixture, so catalog validation
/// halts the run before any rendering happens. Per-model and per-case
/// failures (`TemplateUnresolved`, `Render`) are recorded at their fault
/// boundary and never abort the pass.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed scenario detected at catalog validation time.
    #[error("Schema violation: {0}")]
    Schema(String),

    /// A model's template could not be resolved; the model is skipped.
    #[error("Template unresolved for model {model}: {message}")]
    TemplateUnresolved { model: String, message: String },

    /// The reference renderer failed on one scenario; the case is skipped.
    #[error("Render failure for model {model}, scenario {scenario}: {message}")]
    Render {
        model: String,
        scenario: String,
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] Box<serde_json::Error>),
}

impl Error {
    /// Create a schema-violation error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a template-unresolved error.
    pub fn unresolved(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateUnresolved {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create a render-failure error.
    pub fn render(
        model: impl Into<String>,
        scenario: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Render {
            model: model.into(),
            scenario: scenario.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Box::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Box::new(value))
    }
}
