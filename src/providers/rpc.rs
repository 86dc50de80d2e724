//! JSON-RPC node client.

use std::time::Duration;

use bitcoin::Txid;
use serde::Serialize;
use serde_json::{Value, json};

use super::{FinalizedPsbt, MempoolAcceptance, NodeRpc, PsbtAnalysis, VerboseTransaction};
use crate::error::{Error, Result};

/// Connection settings for a JSON-RPC node endpoint.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub url: String,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub timeout: Duration,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            pass: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct RpcClient {
    config: RpcConfig,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Value,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Provider(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: "ordswap",
            method,
            params,
        };

        let mut req = self.client.post(&self.config.url).json(&request);
        if let (Some(user), Some(pass)) = (&self.config.user, &self.config.pass) {
            req = req.basic_auth(user, Some(pass));
        }

        let response = req.send().map_err(|e| Error::Provider(e.to_string()))?;
        let body: Value = response.json().map_err(|e| Error::Provider(e.to_string()))?;

        if let Some(error) = body.get("error")
            && !error.is_null()
        {
            return Err(Error::Provider(format!("{method}: {error}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| Error::Provider(format!("{method}: no result in response")))
    }

    fn parse<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| Error::Provider(format!("{method}: {e}")))
    }
}

impl NodeRpc for RpcClient {
    fn get_raw_transaction(&self, txid: &Txid) -> Result<String> {
        let value = self.call("getrawtransaction", json!([txid.to_string()]))?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::Provider("getrawtransaction: non-string result".into()))
    }

    fn get_raw_transaction_verbose(&self, txid: &Txid) -> Result<VerboseTransaction> {
        let value = self.call("getrawtransaction", json!([txid.to_string(), true]))?;
        Self::parse("getrawtransaction", value)
    }

    fn analyze_psbt(&self, psbt_b64: &str) -> Result<PsbtAnalysis> {
        let value = self.call("analyzepsbt", json!([psbt_b64]))?;
        Self::parse("analyzepsbt", value)
    }

    fn finalize_psbt(&self, psbt_b64: &str) -> Result<FinalizedPsbt> {
        let value = self.call("finalizepsbt", json!([psbt_b64]))?;
        Self::parse("finalizepsbt", value)
    }

    fn test_mempool_accept(&self, raw_txs: &[String]) -> Result<Vec<MempoolAcceptance>> {
        let value = self.call("testmempoolaccept", json!([raw_txs]))?;
        Self::parse("testmempoolaccept", value)
    }

    fn send_raw_transaction(&self, raw_tx: &str) -> Result<Txid> {
        let value = self.call("sendrawtransaction", json!([raw_tx]))?;
        let txid = value
            .as_str()
            .ok_or_else(|| Error::Provider("sendrawtransaction: non-string result".into()))?;
        txid.parse()
            .map_err(|_| Error::Provider(format!("sendrawtransaction: bad txid `{txid}`")))
    }

    fn get_raw_mempool(&self) -> Result<Vec<Txid>> {
        let value = self.call("getrawmempool", json!([]))?;
        Self::parse("getrawmempool", value)
    }
}
