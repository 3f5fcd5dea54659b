//! Body content classification.
//!
//! Captured request bytes are classified exactly once, when the record is
//! built. The outcome is total: every possible input maps to either no
//! payload or a well-formed JSON value, so downstream stages never see raw
//! unvalidated bytes and classification itself cannot fail.

use serde_json::{json, Value as JsonValue};

use crate::defaults::INVALID_CONTENT_PREFIX_BYTES;

/// Classify captured body bytes into the record payload.
///
/// - Empty input produces `None` (nothing worth storing).
/// - Valid JSON is kept as parsed.
/// - Anything else is wrapped in an error envelope carrying a bounded,
///   lossily-stringified prefix of the input for diagnosis.
pub fn classify_content(content: &[u8]) -> Option<JsonValue> {
    if content.is_empty() {
        return None;
    }
    match serde_json::from_slice::<JsonValue>(content) {
        Ok(value) => Some(value),
        Err(_) => {
            let prefix = &content[..content.len().min(INVALID_CONTENT_PREFIX_BYTES)];
            Some(json!({
                "error": format!(
                    "content is not valid JSON: {}",
                    String::from_utf8_lossy(prefix)
                ),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_absent() {
        assert_eq!(classify_content(b""), None);
    }

    #[test]
    fn test_valid_object_kept() {
        let result = classify_content(br#"{"a": 1}"#).unwrap();
        assert_eq!(result, json!({"a": 1}));
    }

    #[test]
    fn test_valid_non_object_values_kept() {
        assert_eq!(classify_content(b"[1, 2, 3]").unwrap(), json!([1, 2, 3]));
        assert_eq!(classify_content(b"42").unwrap(), json!(42));
        assert_eq!(classify_content(br#""hello""#).unwrap(), json!("hello"));
        assert_eq!(classify_content(b"null").unwrap(), JsonValue::Null);
        assert_eq!(classify_content(b"true").unwrap(), json!(true));
    }

    #[test]
    fn test_invalid_input_wrapped_in_envelope() {
        let result = classify_content(b"not json at all").unwrap();
        assert_eq!(
            result,
            json!({"error": "content is not valid JSON: not json at all"})
        );
    }

    #[test]
    fn test_whitespace_only_is_invalid() {
        let result = classify_content(b"   \n\t").unwrap();
        assert_eq!(
            result["error"].as_str().unwrap(),
            "content is not valid JSON:    \n\t"
        );
    }

    #[test]
    fn test_trailing_garbage_is_invalid() {
        let result = classify_content(br#"{"a": 1} extra"#).unwrap();
        assert!(result["error"]
            .as_str()
            .unwrap()
            .starts_with("content is not valid JSON:"));
    }

    #[test]
    fn test_envelope_prefix_is_bounded() {
        let content = vec![b'x'; INVALID_CONTENT_PREFIX_BYTES + 2_000];
        let result = classify_content(&content).unwrap();
        let message = result["error"].as_str().unwrap();
        let expected_prefix = "content is not valid JSON: ";
        assert!(message.starts_with(expected_prefix));
        assert_eq!(
            message.len(),
            expected_prefix.len() + INVALID_CONTENT_PREFIX_BYTES
        );
    }

    #[test]
    fn test_input_at_exact_prefix_limit_not_truncated() {
        let content = vec![b'y'; INVALID_CONTENT_PREFIX_BYTES];
        let result = classify_content(&content).unwrap();
        let message = result["error"].as_str().unwrap();
        assert!(message.ends_with(&"y".repeat(INVALID_CONTENT_PREFIX_BYTES)));
    }

    #[test]
    fn test_invalid_utf8_never_panics() {
        let result = classify_content(&[0xff, 0xfe, 0x01]).unwrap();
        let message = result["error"].as_str().unwrap();
        assert!(message.starts_with("content is not valid JSON:"));
        assert!(message.contains('\u{fffd}'));
    }

    #[test]
    fn test_truncation_mid_codepoint_is_lossy_not_fatal() {
        // 3-byte characters land one straddling the cut point.
        let content = "€".repeat(INVALID_CONTENT_PREFIX_BYTES / 3 + 10);
        let result = classify_content(content.as_bytes()).unwrap();
        let message = result["error"].as_str().unwrap();
        assert!(message.starts_with("content is not valid JSON:"));
        assert!(message.ends_with('\u{fffd}'));
    }

    #[test]
    fn test_envelope_itself_is_valid_json() {
        let result = classify_content(b"\x00\x01\x02").unwrap();
        let reencoded = serde_json::to_string(&result).unwrap();
        assert!(serde_json::from_str::<JsonValue>(&reencoded).is_ok());
    }
}
