//! Normalization of the peer's response shapes.
//!
//! The peer has answered in several shapes over time:
//!
//! ```text
//! {"status": "error", "error": "...", ...}            top-level failure
//! {"success": false, "message": "...", ...}           top-level failure
//! {"status": "success", "result": {"success": false, "error": ...}}
//!                                                     nested failure
//! {"status": "success", "result": {"success": true, ...}}
//!                                                     nested success
//! {"status": "success", "result": <anything>}         top-level success
//! ```
//!
//! [`normalize`] folds all of them into [`Response`]. Anything else passes
//! through untouched as [`Response::Unrecognized`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

const KEY_RESULT: &str = "result";
const KEY_SUCCESS: &str = "success";
const KEY_STATUS: &str = "status";
const MESSAGE_KEYS: [&str; 2] = ["error", "message"];

/// Canonical outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The peer ran the command.
    Ok { data: Value },
    /// The peer reported a failure. `message` is never empty; `data` holds
    /// whatever else the peer attached (hints, suggestions, partial output).
    Err {
        message: String,
        data: Map<String, Value>,
    },
    /// No known shape matched. Success is unknown, not implied.
    Unrecognized(Value),
}

impl Response {
    /// `Some(true)` / `Some(false)` for recognized shapes, `None` otherwise.
    pub fn success(&self) -> Option<bool> {
        match self {
            Response::Ok { .. } => Some(true),
            Response::Err { .. } => Some(false),
            Response::Unrecognized(_) => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Response::Err { .. })
    }

    /// The failure message, for `Err` only.
    pub fn error(&self) -> Option<&str> {
        match self {
            Response::Err { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Render the canonical JSON form.
    ///
    /// `{"success": true, "data": ...}` or
    /// `{"success": false, "error": "...", "data": {...}}`; unrecognized
    /// documents are returned verbatim.
    pub fn to_value(&self) -> Value {
        match self {
            Response::Ok { data } => {
                let mut out = Map::new();
                out.insert(KEY_SUCCESS.to_string(), Value::Bool(true));
                out.insert("data".to_string(), data.clone());
                Value::Object(out)
            }
            Response::Err { message, data } => {
                let mut out = Map::new();
                out.insert(KEY_SUCCESS.to_string(), Value::Bool(false));
                out.insert("error".to_string(), Value::String(message.clone()));
                out.insert("data".to_string(), Value::Object(data.clone()));
                Value::Object(out)
            }
            Response::Unrecognized(doc) => doc.clone(),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Deserializing a `Response` runs the peer document through [`normalize`].
impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(normalize)
    }
}

/// Fold a peer document into a [`Response`]. Total over valid JSON.
pub fn normalize(doc: Value) -> Response {
    let Value::Object(mut doc) = doc else {
        return Response::Unrecognized(doc);
    };

    if let Some(Value::Object(result)) = doc.get(KEY_RESULT) {
        if is_failure(result) {
            return failure(result);
        }
    }

    if is_failure(&doc) {
        return failure(&doc);
    }

    if let Some(Value::Object(result)) = doc.get_mut(KEY_RESULT) {
        if result.get(KEY_SUCCESS) == Some(&Value::Bool(true)) {
            let mut data = std::mem::take(result);
            data.remove(KEY_SUCCESS);
            return Response::Ok {
                data: Value::Object(data),
            };
        }
    }

    if status_is(&doc, "success") {
        let data = match doc.remove(KEY_RESULT) {
            Some(result) => result,
            None => Value::Object(doc),
        };
        return Response::Ok { data };
    }

    Response::Unrecognized(Value::Object(doc))
}

fn is_failure(obj: &Map<String, Value>) -> bool {
    obj.get(KEY_SUCCESS) == Some(&Value::Bool(false)) || status_is(obj, "error")
}

fn status_is(obj: &Map<String, Value>, expected: &str) -> bool {
    matches!(obj.get(KEY_STATUS), Some(Value::String(status)) if status == expected)
}

fn failure(obj: &Map<String, Value>) -> Response {
    let found = MESSAGE_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(message_text).map(|text| (*key, text)));

    let data = obj
        .iter()
        .filter(|(key, value)| match key.as_str() {
            KEY_SUCCESS | KEY_STATUS => false,
            key if MESSAGE_KEYS.contains(&key) => {
                found.as_ref().map(|(used, _)| *used) != Some(key) && message_text(value).is_some()
            }
            _ => true,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let message = match found {
        Some((_, text)) => text,
        None => format!(
            "peer reported failure without a message: {}",
            Value::Object(obj.clone())
        ),
    };

    Response::Err { message, data }
}

/// Non-empty text of an error/message field. Non-string values are rendered
/// as JSON.
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn err_parts(response: Response) -> (String, Value) {
        match response {
            Response::Err { message, data } => (message, Value::Object(data)),
            other => panic!("expected Err, got {other:?}"),
        }
    }

    #[test]
    fn nested_success_strips_success_flag() {
        let response = normalize(json!({"status": "success", "result": {"success": true, "x": 1}}));
        assert_eq!(response, Response::Ok { data: json!({"x": 1}) });
        assert_eq!(response.success(), Some(true));
        assert_eq!(response.error(), None);
    }

    #[test]
    fn top_level_failure_keeps_extra_fields() {
        let response = normalize(json!({"success": false, "error": "not found", "hint": "check name"}));
        let (message, data) = err_parts(response);
        assert_eq!(message, "not found");
        assert_eq!(data, json!({"hint": "check name"}));
    }

    #[test]
    fn status_error_with_message_key() {
        let response = normalize(json!({
            "status": "error",
            "message": "Unknown command type: frobnicate",
            "suggestions": ["focus", "find"]
        }));
        let (message, data) = err_parts(response);
        assert_eq!(message, "Unknown command type: frobnicate");
        assert_eq!(data, json!({"suggestions": ["focus", "find"]}));
    }

    #[test]
    fn nested_failure_wins_over_top_level_success() {
        let response = normalize(json!({
            "status": "success",
            "result": {"success": false, "error": "GameObject not found", "partial": [1]}
        }));
        let (message, data) = err_parts(response);
        assert_eq!(message, "GameObject not found");
        assert_eq!(data, json!({"partial": [1]}));
    }

    #[test]
    fn nested_status_error() {
        let response = normalize(json!({
            "status": "success",
            "result": {"status": "error", "message": "compile failed", "line": 12}
        }));
        let (message, data) = err_parts(response);
        assert_eq!(message, "compile failed");
        assert_eq!(data, json!({"line": 12}));
    }

    #[test]
    fn error_preferred_over_message_and_message_kept() {
        let response = normalize(json!({
            "success": false,
            "error": "boom",
            "message": "longer description"
        }));
        let (message, data) = err_parts(response);
        assert_eq!(message, "boom");
        assert_eq!(data, json!({"message": "longer description"}));
    }

    #[test]
    fn blank_error_falls_back_to_message() {
        let response = normalize(json!({"success": false, "error": "  ", "message": "real"}));
        let (message, data) = err_parts(response);
        assert_eq!(message, "real");
        assert_eq!(data, json!({}));
    }

    #[test]
    fn structured_error_is_rendered_as_json() {
        let response = normalize(json!({"status": "error", "error": {"code": 7}}));
        let (message, _) = err_parts(response);
        assert_eq!(message, r#"{"code":7}"#);
    }

    #[test]
    fn failure_without_message_embeds_the_object() {
        let response = normalize(json!({"status": "success", "result": {"success": false, "id": 3}}));
        let (message, data) = err_parts(response);
        assert!(message.contains(r#""id":3"#), "message was {message}");
        assert_eq!(data, json!({"id": 3}));
    }

    #[test]
    fn top_level_success_unwraps_result() {
        let response = normalize(json!({"status": "success", "result": ["a", "b"]}));
        assert_eq!(response, Response::Ok { data: json!(["a", "b"]) });

        let response = normalize(json!({"status": "success", "result": {"count": 2}}));
        assert_eq!(response, Response::Ok { data: json!({"count": 2}) });
    }

    #[test]
    fn top_level_success_with_null_result_is_null_data() {
        let response = normalize(json!({"status": "success", "result": null}));
        assert_eq!(response, Response::Ok { data: Value::Null });
    }

    #[test]
    fn message_text_is_not_trimmed() {
        let response = normalize(json!({"success": false, "error": " not found "}));
        assert_eq!(response.error(), Some(" not found "));
    }

    #[test]
    fn top_level_success_without_result_returns_document() {
        let doc = json!({"status": "success", "message": "saved"});
        assert_eq!(normalize(doc.clone()), Response::Ok { data: doc });
    }

    #[test]
    fn unknown_shape_passes_through() {
        let response = normalize(json!({"foo": "bar"}));
        assert_eq!(response, Response::Unrecognized(json!({"foo": "bar"})));
        assert_eq!(response.success(), None);
        assert_eq!(response.to_value(), json!({"foo": "bar"}));
    }

    #[test]
    fn non_object_documents_pass_through() {
        for doc in [json!([1, 2]), json!(42), json!("text"), Value::Null] {
            assert_eq!(normalize(doc.clone()), Response::Unrecognized(doc));
        }
    }

    #[test]
    fn success_true_at_top_level_alone_is_not_recognized() {
        let response = normalize(json!({"success": true, "data": 1}));
        assert_eq!(response.success(), None);
    }

    #[test]
    fn every_recognized_failure_has_a_message() {
        let docs = [
            json!({"success": false}),
            json!({"status": "error"}),
            json!({"status": "error", "error": null}),
            json!({"status": "error", "error": ""}),
            json!({"result": {"success": false}}),
            json!({"result": {"status": "error", "message": ""}}),
        ];
        for doc in docs {
            let response = normalize(doc.clone());
            assert_eq!(response.success(), Some(false), "doc {doc}");
            assert!(!response.error().unwrap_or_default().is_empty(), "doc {doc}");
        }
    }

    #[test]
    fn canonical_rendering() {
        let ok = Response::Ok { data: json!({"x": 1}) };
        assert_eq!(ok.to_value(), json!({"success": true, "data": {"x": 1}}));

        let err = normalize(json!({"success": false, "error": "nope", "hint": "h"}));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"success": false, "error": "nope", "data": {"hint": "h"}})
        );
    }

    #[test]
    fn deserialize_runs_normalization() {
        let response: Response =
            serde_json::from_str(r#"{"status":"error","error":"bad params"}"#).unwrap();
        assert_eq!(response.error(), Some("bad params"));
    }
}
