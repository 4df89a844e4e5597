use crate::parse::extract_json;
use crate::prompt::{system_prompt, user_message};
use crate::{ChatBackend, Message, ResponseFormat};
use structurify_core::{DiagramError, DiagramKind, DiagramRequest, build_diagram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything about one gateway call besides the code and the backend.
#[derive(Debug, Clone, Copy)]
pub struct GatewayOptions<'a> {
    /// Replaces the built-in system prompt for the diagram kind.
    pub instruction_template: Option<&'a str>,
    /// Request `response_format: json_object` from the provider.
    pub json_mode: bool,
}

impl Default for GatewayOptions<'_> {
    fn default() -> Self {
        Self {
            instruction_template: None,
            json_mode: true,
        }
    }
}

/// Ask the model for a plan and return its JSON text.
///
/// `Ok(None)` means the request was cancelled through `cancel`; that is not an
/// error. The source code is sent to the backend but never logged.
pub async fn generate_plan(
    backend: &impl ChatBackend,
    source_code: &str,
    kind: DiagramKind,
    options: GatewayOptions<'_>,
    cancel: &CancellationToken,
) -> Result<Option<String>, DiagramError> {
    if !backend.has_credentials() {
        return Err(DiagramError::Api(
            "API key not found. Please set it in the configuration.".to_string(),
        ));
    }

    let system = options
        .instruction_template
        .unwrap_or_else(|| system_prompt(kind));
    let messages = vec![Message::system(system), Message::user(user_message(source_code))];
    let response_format = options.json_mode.then(ResponseFormat::json_object);

    info!(
        %kind,
        model = backend.model_name(),
        code_chars = source_code.len(),
        "Requesting diagram plan"
    );

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("Diagram request was cancelled");
            return Ok(None);
        }
        response = backend.chat(messages, response_format) => response,
    };

    let response = response.map_err(|e| {
        warn!("AI request failed: {:#}", e);
        DiagramError::Api(format!("{:#}", e))
    })?;

    let content = response
        .choices
        .first()
        .and_then(|c| c.message.text_content())
        .ok_or_else(|| DiagramError::Parsing("The AI returned an empty response.".to_string()))?;

    debug!("Model returned {} chars", content.len());

    let json = extract_json(content).ok_or_else(|| {
        DiagramError::Parsing("The AI response did not contain any JSON. Please try again.".to_string())
    })?;

    Ok(Some(json.to_string()))
}

/// Run the whole pipeline: model call, parse, sanitize, validate, compile.
///
/// Returns `Ok(None)` if cancelled before the model answered. Once the plan
/// text is in hand the remaining stages run to completion.
pub async fn generate_diagram(
    backend: &impl ChatBackend,
    request: &DiagramRequest,
    options: GatewayOptions<'_>,
    cancel: &CancellationToken,
) -> Result<Option<String>, DiagramError> {
    let Some(json) = generate_plan(
        backend,
        &request.source_text,
        request.diagram_kind,
        options,
        cancel,
    )
    .await?
    else {
        return Ok(None);
    };

    let text = build_diagram(request.diagram_kind, &json)?;
    info!(kind = %request.diagram_kind, lines = text.lines().count(), "Diagram generated");
    Ok(Some(text))
}
