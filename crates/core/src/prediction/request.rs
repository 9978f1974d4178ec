//! Model input construction from job requests.

use serde::Serialize;
use serde_json::{Map, Value};

use super::config::ModelProfile;
use super::error::PredictionError;
use super::types::JobRequest;

const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Body of a creation request.
#[derive(Debug, Serialize)]
pub struct CreatePredictionBody<'a> {
    pub version: &'a str,
    pub input: Map<String, Value>,
}

/// Substitute the user prompt into a template.
pub fn render_prompt(template: &str, prompt: &str) -> String {
    template.replace(PROMPT_PLACEHOLDER, prompt)
}

/// Build the model input for `request` according to `profile`.
pub fn build_input(
    profile: &ModelProfile,
    request: &JobRequest,
) -> Result<Map<String, Value>, PredictionError> {
    let mut input = profile.params.clone();

    if let Some(template) = &profile.prompt_template {
        input.insert(
            "prompt".to_string(),
            Value::String(render_prompt(template, &request.prompt)),
        );
    }

    if let Some(field) = &profile.reference_image_field {
        let image = request
            .reference_image
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                PredictionError::Validation(format!(
                    "{} jobs require an input image",
                    request.kind
                ))
            })?;
        input.insert(field.clone(), Value::String(image.to_string()));
    }

    Ok(input)
}
