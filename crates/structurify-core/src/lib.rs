mod error;
pub mod identifier;
mod kind;
pub mod mermaid;
pub mod plan;
pub mod sanitize;
mod validation;

pub use error::*;
pub use kind::*;
pub use mermaid::compile;
pub use plan::ValidatedPlan;
pub use sanitize::sanitize;
pub use validation::*;

use serde_json::Value;
use tracing::debug;

/// Sanitize, validate and compile an already-parsed plan.
pub fn compile_value(kind: DiagramKind, candidate: Value) -> Result<String, ValidationError> {
    let sanitized = sanitize(kind, candidate);
    let plan = validate(kind, &sanitized)?;
    let text = compile(&plan);
    debug!(%kind, chars = text.len(), "Compiled diagram");
    Ok(text)
}

/// Parse the model's JSON text and turn it into Mermaid source.
pub fn build_diagram(kind: DiagramKind, json_text: &str) -> Result<String, DiagramError> {
    let candidate: Value = serde_json::from_str(json_text).map_err(|e| {
        DiagramError::Parsing(format!(
            "The AI returned malformed JSON ({e}). Please try again."
        ))
    })?;
    Ok(compile_value(kind, candidate)?)
}
