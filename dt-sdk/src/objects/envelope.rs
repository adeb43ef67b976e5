use serde::{Deserialize, Serialize};

/// Uniform API response envelope.
///
/// Every endpoint, success or failure, answers with this shape. `code`
/// is one of [`crate::codes`]; `data` is present only on success paths
/// that carry a body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Business code: 0 = success, non-zero = failure.
    pub code: u32,
    /// Human-readable message.
    pub message: String,
    /// Business data, absent on failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Request trace id for support lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Response timestamp, Unix milliseconds.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_envelope_omits_data() {
        let resp: ApiResponse<()> = ApiResponse {
            code: 2005,
            message: "bet window closed".into(),
            data: None,
            trace_id: Some("t-1".into()),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["code"], 2005);
    }

    #[test]
    fn success_envelope_parses() {
        let raw = r#"{
            "code": 0,
            "message": "success",
            "data": {"bill_no": "B1"},
            "trace_id": "t-2",
            "timestamp": 1700000000000
        }"#;
        let resp: ApiResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.code, 0);
        assert_eq!(resp.data.unwrap()["bill_no"], "B1");
    }
}
