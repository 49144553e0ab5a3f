//! Control messages exchanged with the stream endpoint.
//!
//! Market data frames are opaque at this layer and handed to the
//! `FrameHandler` untouched. Only the subscription handshake is modelled here.

use serde::{Deserialize, Serialize};

// ============================================================================
// Subscribe Request (Outgoing)
// ============================================================================

/// Subscription request, e.g.
/// `{"method":"SUBSCRIBE","params":["btcusdt@trade"],"id":1}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeRequest {
    pub method: String,
    pub params: Vec<String>,
    pub id: u64,
}

impl SubscribeRequest {
    pub fn new(id: u64, streams: Vec<String>) -> Self {
        Self {
            method: "SUBSCRIBE".to_string(),
            params: streams,
            id,
        }
    }
}

// ============================================================================
// Control Response (Incoming)
// ============================================================================

/// Error body attached to a rejected request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

/// Response to a control request.
///
/// Success is `{"result":null,"id":1}`; rejection is
/// `{"error":{"code":2,"msg":"Invalid request"},"id":1}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ControlError>,
}

impl ControlResponse {
    /// Parse `text` as a control response.
    ///
    /// Returns `None` for anything that is not one, including every market
    /// data frame.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.contains("\"id\"") {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        let obj = value.as_object()?;
        if !obj.contains_key("id") || obj.contains_key("stream") || obj.contains_key("e") {
            return None;
        }
        if !obj.contains_key("result") && !obj.contains_key("error") {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    pub fn is_for(&self, request_id: u64) -> bool {
        self.id == Some(request_id)
    }

    /// Rejection reason, if the request failed.
    pub fn rejection(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| format!("code={} msg={}", e.code, e.msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_serialization() {
        let req = SubscribeRequest::new(7, vec!["btcusdt@trade".into(), "ethusdt@trade".into()]);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"method":"SUBSCRIBE","params":["btcusdt@trade","ethusdt@trade"],"id":7}"#
        );
    }

    #[test]
    fn test_parse_ack() {
        let resp = ControlResponse::parse(r#"{"result":null,"id":3}"#).unwrap();
        assert!(resp.is_for(3));
        assert!(!resp.is_for(4));
        assert!(resp.rejection().is_none());
    }

    #[test]
    fn test_parse_rejection() {
        let resp =
            ControlResponse::parse(r#"{"error":{"code":2,"msg":"Invalid request"},"id":1}"#)
                .unwrap();
        assert_eq!(resp.rejection().unwrap(), "code=2 msg=Invalid request");
    }

    #[test]
    fn test_data_frames_are_not_control() {
        let combined = r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1,"s":"BTCUSDT","t":1,"p":"1","q":"1","T":1}}"#;
        assert!(ControlResponse::parse(combined).is_none());
        let raw = r#"{"e":"trade","E":1,"s":"BTCUSDT","t":1,"p":"1","q":"1","T":1}"#;
        assert!(ControlResponse::parse(raw).is_none());
        assert!(ControlResponse::parse("not json").is_none());
        assert!(ControlResponse::parse(r#"{"id":1}"#).is_none());
    }
}
