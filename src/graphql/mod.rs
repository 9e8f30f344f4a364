use crate::error::{
    ClientError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

pub mod http;
pub mod operations;

pub use http::HttpTransport;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: &'static str,
    pub operation_name: &'static str,
    pub variables: Value,
}

/// Sends a GraphQL request and yields the `data` object of the response.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: GraphqlRequest,
    ) -> impl Future<Output = Result<Value>> + Send;
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ErrorDto>,
}

#[derive(Deserialize)]
struct ErrorDto {
    message: String,
}

/// Unwraps a GraphQL response body into its `data` object.
pub fn decode_envelope(operation: &'static str, body: &[u8]) -> Result<Value> {
    let envelope: ResponseEnvelope = serde_json::from_slice(body)
        .map_err(|source| ClientError::Decode { operation, source })?;
    if !envelope.errors.is_empty() {
        return Err(ClientError::GraphQl(
            envelope.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    match envelope.data {
        Some(Value::Null) | None => Err(ClientError::MissingData { operation }),
        Some(data) => Ok(data),
    }
}
