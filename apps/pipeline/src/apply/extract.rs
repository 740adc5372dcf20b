//! Heuristic extraction of a JSON object from noisy model output.
//!
//! Order of attempts: the whole trimmed response as JSON, then the substring
//! from the first `{` to the last `}`. No bracket counting — the substring
//! either parses or the response is rejected.

use crate::errors::PipelineError;

/// Returns the JSON-object slice of `raw`, or `InvalidLlmOutput` when none
/// can be located.
pub fn extract_json_object(raw: &str) -> Result<&str, PipelineError> {
    let trimmed = raw.trim();
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Ok(trimmed);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            let candidate = &trimmed[start..=end];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return Ok(candidate);
            }
        }
    }

    Err(PipelineError::InvalidLlmOutput(
        "no JSON object could be located in the response".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_json_is_returned_unchanged() {
        let raw = r#"{"a":1}"#;
        assert_eq!(extract_json_object(raw).unwrap(), raw);
    }

    #[test]
    fn test_noise_around_object_is_stripped() {
        let raw = "noise {\"a\":1} trailing";
        assert_eq!(extract_json_object(raw).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_markdown_fenced_object_is_recovered() {
        let raw = "```json\n{\"a\": {\"b\": 2}}\n```";
        assert_eq!(extract_json_object(raw).unwrap(), r#"{"a": {"b": 2}}"#);
    }

    #[test]
    fn test_no_braces_fails() {
        assert!(matches!(
            extract_json_object("I could not produce the resume, sorry."),
            Err(PipelineError::InvalidLlmOutput(_))
        ));
    }

    #[test]
    fn test_braces_without_valid_json_fail() {
        assert!(extract_json_object("{ definitely not json }").is_err());
    }

    #[test]
    fn test_leading_whitespace_is_trimmed() {
        let raw = "  \n {\"a\":1}\n";
        assert_eq!(extract_json_object(raw).unwrap(), r#"{"a":1}"#);
    }
}
