use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;
use tracing::debug;

use crate::{
    ETH_ACCOUNTS, ETH_REQUEST_ACCOUNTS, Listener, ListenerId, ListenerSet, ProviderError,
    WalletProvider,
};

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// JSON-RPC provider for a development node with unlocked accounts, used
/// when no wallet extension is present. A plain HTTP endpoint has no push
/// channel, so subscribers are registered but never notified.
pub struct RpcProvider {
    endpoint: String,
    http: reqwest::Client,
    next_id: Cell<u64>,
    listeners: ListenerSet,
}

impl Default for RpcProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RpcProvider {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            next_id: Cell::new(1),
            listeners: ListenerSet::default(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

pub(crate) fn parse_rpc_response(body: &str) -> Result<Value, ProviderError> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|err| ProviderError::internal(format!("invalid JSON-RPC response: {err}")))?;

    if let Some(error) = response.error {
        return Err(ProviderError::new(error.code, error.message));
    }

    // `null` is a legitimate result (e.g. a receipt that is not mined yet).
    Ok(response.result.unwrap_or(Value::Null))
}

#[async_trait(?Send)]
impl WalletProvider for RpcProvider {
    fn name(&self) -> &str {
        "json-rpc"
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        // Dev nodes expose their unlocked accounts without an access prompt.
        let method = if method == ETH_REQUEST_ACCOUNTS {
            ETH_ACCOUNTS
        } else {
            method
        };

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        debug!(method, id, "json-rpc request");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .map_err(|err| ProviderError::internal(format!("{method} transport: {err}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ProviderError::internal(format!(
                "{method} HTTP {status}: {text}"
            )));
        }

        parse_rpc_response(&text)
    }

    fn subscribe(&self, listener: Listener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chain_id, request_accounts};
    use std::env;

    #[test]
    fn rpc_result_and_error_envelopes() {
        let value = parse_rpc_response(r#"{"jsonrpc":"2.0","id":1,"result":"0x2a"}"#)
            .expect("result");
        assert_eq!(value, Value::String("0x2a".to_owned()));

        let pending = parse_rpc_response(r#"{"jsonrpc":"2.0","id":2,"result":null}"#)
            .expect("null result");
        assert!(pending.is_null());

        let err = parse_rpc_response(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32000,"message":"execution reverted"}}"#,
        )
        .expect_err("error envelope");
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "execution reverted");

        assert!(parse_rpc_response("not json").is_err());
    }

    #[test]
    fn endpoint_is_normalised() {
        let provider = RpcProvider::new(Some("http://127.0.0.1:8545/".to_owned()));
        assert_eq!(provider.endpoint(), "http://127.0.0.1:8545");
        assert_eq!(RpcProvider::default().endpoint(), DEFAULT_RPC_URL);
    }

    #[tokio::test]
    async fn dev_node_reports_chain_and_accounts() -> anyhow::Result<()> {
        let url = match env::var("TEST_RPC_URL") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => return Ok(()),
        };

        let provider = RpcProvider::new(Some(url));
        let chain = chain_id(&provider).await?;
        assert!(chain.as_u64().is_some());

        let accounts = request_accounts(&provider).await?;
        for account in accounts {
            assert!(account.0.starts_with("0x"));
        }

        Ok(())
    }
}
