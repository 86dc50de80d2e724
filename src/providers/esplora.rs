//! Esplora-style REST clients: address UTXOs, recommended fees, and the
//! inscription index.

use std::time::Duration;

use bitcoin::OutPoint;

use super::{AddressUtxo, FeeOracle, ItemIndex, RecommendedFees, UtxoSource};
use crate::error::{Error, Result};
use crate::item::Item;

/// REST client for an esplora/mempool endpoint.
pub struct EsploraClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl EsploraClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Provider(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!("GET {path}: {}", response.status())));
        }
        response
            .json()
            .map_err(|e| Error::Provider(format!("GET {path}: {e}")))
    }
}

impl UtxoSource for EsploraClient {
    fn get_address_utxos(&self, address: &str) -> Result<Vec<AddressUtxo>> {
        self.get_json(&format!("address/{address}/utxo"))
    }
}

impl FeeOracle for EsploraClient {
    fn get_fees_recommended(&self) -> Result<RecommendedFees> {
        self.get_json("v1/fees/recommended")
    }
}

/// REST client for an ord-style inscription indexer. A missing token is a
/// 404, which maps to `None`.
pub struct HttpItemIndex {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpItemIndex {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Provider(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn get_optional(&self, path: &str) -> Result<Option<Item>> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::Provider(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Provider(format!("GET {path}: {}", response.status())));
        }
        response
            .json()
            .map(Some)
            .map_err(|e| Error::Provider(format!("GET {path}: {e}")))
    }
}

impl ItemIndex for HttpItemIndex {
    fn get_token_by_output(&self, outpoint: &OutPoint) -> Result<Option<Item>> {
        self.get_optional(&format!("output/{}:{}", outpoint.txid, outpoint.vout))
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Item>> {
        self.get_optional(&format!("token/{id}"))
    }
}
