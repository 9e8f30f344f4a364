use crate::{
    error::{
        ClientError,
        Result,
    },
    graphql::{
        GraphqlRequest,
        Transport,
        decode_envelope,
    },
};
use reqwest::header::{
    ACCEPT,
    AUTHORIZATION,
};
use serde_json::Value;
use std::fmt;
use url::Url;

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Clone)]
pub struct HttpTransport {
    endpoint: Url,
    auth_token: Option<String>,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: Url, auth_token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            endpoint,
            auth_token,
            http,
        })
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: GraphqlRequest) -> Result<Value> {
        let operation = request.operation_name;
        tracing::debug!(operation, endpoint = %self.endpoint, "sending graphql request");
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let res = builder.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        if status.is_success() {
            return decode_envelope(operation, &bytes);
        }
        // GraphQL servers often answer validation failures with a 4xx that
        // still carries an `errors` array.
        match decode_envelope(operation, &bytes) {
            Err(err @ ClientError::GraphQl(_)) => Err(err),
            _ => Err(ClientError::Http {
                status,
                body: error_body(&bytes),
            }),
        }
    }
}

impl fmt::Display for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)
    }
}

// Error pages can be whole HTML documents; keep only the head of them.
fn error_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
