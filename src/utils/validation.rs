use validator::{Validate, ValidationError};

pub const MAX_TOPIC_LEN: usize = 200;
pub const MAX_MODEL_LEN: usize = 100;

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

pub fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("topic_empty"));
    }
    if trimmed.chars().count() > MAX_TOPIC_LEN {
        return Err(ValidationError::new("topic_too_long"));
    }
    Ok(())
}

/// Model identifiers are vendor names like `gpt-4o-mini` or
/// `models/gemini-1.5-flash`; anything else is rejected before I/O.
pub fn validate_model(model: &str) -> Result<(), ValidationError> {
    let trimmed = model.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_MODEL_LEN {
        return Err(ValidationError::new("model_invalid"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/');
    if !trimmed.chars().all(allowed) {
        return Err(ValidationError::new("model_invalid"));
    }
    Ok(())
}
