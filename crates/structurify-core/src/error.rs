use crate::ValidationError;
use thiserror::Error;

/// Every way a diagram request can fail. Cancellation is not an error.
#[derive(Debug, Error)]
pub enum DiagramError {
    /// The model API could not be reached or rejected the request.
    #[error("{0}")]
    Api(String),

    /// The model response could not be read as JSON at all.
    #[error("{0}")]
    Parsing(String),

    /// The JSON did not match the diagram schema after sanitization.
    #[error("The AI response has an invalid structure: {0}")]
    Validation(#[from] ValidationError),
}

impl DiagramError {
    /// What the user can do about it.
    pub fn remedy(&self) -> &'static str {
        match self {
            DiagramError::Api(_) => {
                "Open the configuration and check the API key and model settings."
            }
            DiagramError::Parsing(_) => "The AI returned an unreadable response. Please try again.",
            DiagramError::Validation(_) => {
                "The AI produced an unusable plan. Try again or select a smaller block of code."
            }
        }
    }
}
