#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, reset).
    #[error("network error: {0}")]
    Transport(String),
    /// The backend answered but rejected the query.
    #[error("query rejected (HTTP {status}{}): {message}", code_suffix(.code))]
    Query {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("unexpected response: {0}")]
    Decode(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|code| format!(", code {code}"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        // The URL carries every filter operand, credentials included.
        let err = err.without_url();
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::Query {
                status: status.as_u16(),
                code: None,
                message: err.to_string(),
            }
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_message_includes_code() {
        let err = GatewayError::Query {
            status: 400,
            code: Some("42703".to_string()),
            message: "column danh_muc_thuoc.gia does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "query rejected (HTTP 400, code 42703): column danh_muc_thuoc.gia does not exist"
        );
    }
}
