use super::{CallProvider, TransportError};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// JSON-RPC `eth_call` client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
    timeout: Duration,
}

impl HttpRpcClient {
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client, rpc_url, timeout })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait]
impl CallProvider for HttpRpcClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError> {
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [
                {
                    "to": format!("{to:#x}"),
                    "data": format!("{data:#x}")
                },
                "latest"
            ],
            "id": 1
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Http(e)
                }
            })?;

        let response_json: Value = response.json().await?;

        if let Some(error) = response_json.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown node error")
                .to_string();
            debug!("eth_call to {to:#x} failed: {code} {message}");
            return Err(TransportError::Node { code, message });
        }

        let result = response_json
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TransportError::MalformedResponse("missing result field".to_string())
            })?;

        let bytes = hex::decode(result.trim_start_matches("0x"))
            .map_err(|e| TransportError::MalformedResponse(format!("bad result hex: {e}")))?;
        Ok(bytes.into())
    }
}
