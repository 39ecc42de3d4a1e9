//! Raw backend responses and how they are shown to the operator

use serde_json::Value;
use std::fmt;

/// Status and body of an HTTP exchange, before interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new<S: Into<String>>(status: u16, body: S) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A response body, structured when it parses as JSON and verbatim otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }

    /// Top-level `error` field, if the body reports one
    pub fn error_message(&self) -> Option<String> {
        let err = self.as_json()?.get("error")?;
        if err.is_null() {
            return None;
        }
        Some(match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Follow a path of object keys
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(self.as_json()?, |value, key| value.get(*key))
    }

    /// Raw transaction hex of the attacker transaction a previous attempt built
    pub fn attacker_tx_hex(&self) -> Option<String> {
        self.lookup(&["tx_attacker", "hex"])
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Pretty JSON (two-space indent) or the verbatim text
    pub fn render(&self) -> String {
        match self {
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// What the operator sees after an operation
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Result(ResponseBody),
    Error(String),
}

impl ResultView {
    pub fn error<E: fmt::Display>(err: E) -> Self {
        ResultView::Error(err.to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultView::Error(_))
    }

    pub fn render(&self) -> String {
        match self {
            ResultView::Result(body) => body.render(),
            ResultView::Error(msg) => format!("Error: {}", msg),
        }
    }
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_and_text() {
        assert_eq!(
            ResponseBody::parse(r#"{"ok":true}"#),
            ResponseBody::Json(json!({"ok": true}))
        );
        assert_eq!(
            ResponseBody::parse("Internal Server Error"),
            ResponseBody::Text("Internal Server Error".to_string())
        );
    }

    #[test]
    fn test_attacker_tx_hex() {
        let body = ResponseBody::Json(json!({"tx_attacker": {"hex": "0200ab"}}));
        assert_eq!(body.attacker_tx_hex().as_deref(), Some("0200ab"));

        let wrong_type = ResponseBody::Json(json!({"tx_attacker": {"hex": 12}}));
        assert_eq!(wrong_type.attacker_tx_hex(), None);

        let not_object = ResponseBody::Json(json!({"tx_attacker": "0200ab"}));
        assert_eq!(not_object.attacker_tx_hex(), None);

        assert_eq!(ResponseBody::Text("0200ab".into()).attacker_tx_hex(), None);
    }

    #[test]
    fn test_error_message() {
        let body = ResponseBody::Json(json!({"error": "bad utxo"}));
        assert_eq!(body.error_message().as_deref(), Some("bad utxo"));
        assert_eq!(ResponseBody::Json(json!({"error": null})).error_message(), None);
        assert_eq!(ResponseBody::Json(json!({"txid": "aa"})).error_message(), None);
    }

    #[test]
    fn test_render() {
        let body = ResponseBody::Json(json!({"a": 1}));
        assert_eq!(body.render(), "{\n  \"a\": 1\n}");
        assert_eq!(ResultView::error("timeout").render(), "Error: timeout");
    }
}
