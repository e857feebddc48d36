//! Normalised step responses handed to captures and after-hooks.
//!
//! Every `pub` or `req` step produces exactly one [`ResponseRecord`]:
//! publishes get an empty record once the flush confirms delivery, while
//! request-reply steps carry the decoded reply body.

use std::collections::HashMap;

use serde_json::Value;

/// Normalised response produced after every `pub` or `req` step.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    /// Decoded reply body; `None` for fire-and-forget publishes.
    pub body: Option<Value>,
    /// Fixed success status; confirmed publishes and replies both report 200.
    pub status_code: u16,
    /// Reply headers, plus `content-type` when the body parsed as JSON.
    pub headers: HashMap<String, String>,
}

impl ResponseRecord {
    /// Record for a confirmed publish: no body, no headers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            body: None,
            status_code: 200,
            headers: HashMap::new(),
        }
    }

    /// Build a record from decoded reply text and reply headers.
    ///
    /// The body is kept structured when the text parses as JSON, in which
    /// case `content-type` is set to `application/json`; otherwise the raw
    /// text is the body and the content type stays unset. A parse failure is
    /// an expected branch, not an error.
    #[must_use]
    pub fn from_reply(text: String, reply_headers: HashMap<String, String>) -> Self {
        let mut headers = reply_headers;
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => {
                headers.insert("content-type".to_owned(), "application/json".to_owned());
                parsed
            }
            Err(_) => Value::String(text),
        };
        Self {
            body: Some(body),
            status_code: 200,
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_reply_is_parsed_and_typed() {
        let record = ResponseRecord::from_reply(r#"{"id": 7}"#.to_owned(), HashMap::new());
        assert_eq!(record.body, Some(json!({"id": 7})));
        assert_eq!(
            record.headers.get("content-type").map(String::as_str),
            Some("application/json"),
        );
        assert_eq!(record.status_code, 200);
    }

    #[test]
    fn non_json_reply_keeps_raw_text_without_content_type() {
        let record = ResponseRecord::from_reply("pong".to_owned(), HashMap::new());
        assert_eq!(record.body, Some(Value::String("pong".to_owned())));
        assert!(!record.headers.contains_key("content-type"));
    }

    #[test]
    fn reply_headers_are_merged() {
        let mut reply_headers = HashMap::new();
        reply_headers.insert("x-trace".to_owned(), "abc".to_owned());
        let record = ResponseRecord::from_reply("[1, 2]".to_owned(), reply_headers);
        assert_eq!(record.headers.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(record.body, Some(json!([1, 2])));
    }

    #[test]
    fn empty_record_has_no_body() {
        let record = ResponseRecord::empty();
        assert_eq!(record.body, None);
        assert_eq!(record.status_code, 200);
        assert!(record.headers.is_empty());
    }
}
