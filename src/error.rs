use std::time::Duration;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Failure of a single GraphQL operation.
///
/// The `Display` text is what ends up in error notifications, so it is
/// kept human readable.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("server responded with {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("invalid {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} response contained no data")]
    MissingData { operation: &'static str },
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display__joins_graphql_messages() {
        let err = ClientError::GraphQl(vec![
            "Insufficient balance".to_string(),
            "Dice number must be between 1 and 6".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Insufficient balance; Dice number must be between 1 and 6"
        );
    }

    #[test]
    fn display__reports_timeout_in_seconds() {
        let err = ClientError::Timeout(Duration::from_secs(10));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "request timed out after 10s");
    }
}
