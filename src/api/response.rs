use crate::error::{ChatError, Result};
use serde_json::Value;

fn first_message(response_json: &Value) -> Result<&Value> {
    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| ChatError::Other("No choices in response".to_string()))?;

    let first_choice = choices
        .first()
        .ok_or_else(|| ChatError::Other("Empty choices array".to_string()))?;

    first_choice
        .get("message")
        .ok_or_else(|| ChatError::Other("No message in response".to_string()))
}

/// Extract content from a non-streaming chat completion
pub fn extract_content(response_json: &Value) -> Result<Option<String>> {
    Ok(first_message(response_json)?
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string()))
}

/// Extract the refusal text a structured-output model returns instead of content
pub fn extract_refusal(response_json: &Value) -> Result<Option<String>> {
    Ok(first_message(response_json)?
        .get("refusal")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string()))
}

/// Parse the JSON object a structured-output completion carries as its content
pub fn extract_structured(response_json: &Value) -> Result<Value> {
    if let Some(refusal) = extract_refusal(response_json)? {
        return Err(ChatError::Other(format!("Model refused: {}", refusal)));
    }
    let content = extract_content(response_json)?
        .ok_or_else(|| ChatError::Other("No content in structured response".to_string()))?;
    Ok(serde_json::from_str(&content)?)
}
