use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// A parameter failed local validation; nothing was sent or audited.
    #[error("{name} ! {value} : {condition}")]
    Argument {
        name: &'static str,
        value: String,
        condition: &'static str,
    },

    /// The server answered with a structured `error` body.
    #[error("error: {endpoint}: {message}")]
    Api { endpoint: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt audit log: {0}")]
    AuditLog(String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Failed to decode {kind}: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub(crate) fn argument(
        name: &'static str,
        value: impl ToString,
        condition: &'static str,
    ) -> Self {
        ClientError::Argument {
            name,
            value: value.to_string(),
            condition,
        }
    }

    /// True for errors raised before any request was dispatched
    pub fn is_argument_error(&self) -> bool {
        matches!(self, ClientError::Argument { .. })
    }

    /// True for structured errors reported by the server
    pub fn is_api_error(&self) -> bool {
        matches!(self, ClientError::Api { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_error_display() {
        let err = ClientError::argument("limit", 501, "Integer[1-500]");
        assert_eq!(err.to_string(), "limit ! 501 : Integer[1-500]");
        assert!(err.is_argument_error());
        assert!(!err.is_api_error());
    }

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api {
            endpoint: "get_user".to_string(),
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "error: get_user: not found");
        assert!(err.is_api_error());
    }
}
