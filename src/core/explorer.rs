use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info};

use crate::utils::error::ApiError;

/// Etherscan wraps every payload as `{status, message, result}`. On failure
/// `result` holds an error string, so it is decoded only after the status
/// check.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// One row of `module=account&action=txlist`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerTransaction {
    pub block_number: String,
    pub hash: String,
    pub nonce: String,
    pub block_hash: String,
    pub transaction_index: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub gas: String,
    pub gas_price: String,
    pub is_error: String,
    #[serde(rename = "txreceipt_status")]
    pub receipt_status: String,
    pub input: String,
    pub gas_used: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExplorerSource {
    #[serde(rename = "SourceCode")]
    pub source_code: String,
    #[serde(rename = "ContractName")]
    pub contract_name: String,
    #[serde(rename = "CompilerVersion")]
    pub compiler_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ApiError::ExplorerUnavailable(format!("malformed response: {}", e)))?;

    if envelope.status != "1" {
        return Err(ApiError::ExplorerRejected(envelope.message));
    }

    serde_json::from_value(envelope.result)
        .map_err(|e| ApiError::ExplorerUnavailable(format!("unexpected result: {}", e)))
}

#[derive(Clone)]
pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExplorerClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        module: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let mut query: Vec<(&str, &str)> = vec![("module", module)];
        query.extend_from_slice(params);
        query.push(("apikey", self.api_key.as_str()));

        let action = params
            .iter()
            .find(|(k, _)| *k == "action")
            .map(|(_, v)| *v)
            .unwrap_or_default();

        let body = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await?
            .text()
            .await?;

        match decode_envelope(&body) {
            Ok(result) => {
                info!(
                    event = "explorer_request_succeeded",
                    message = "Explorer returned a result",
                    module = module,
                    action = action
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    event = "explorer_request_failed",
                    message = "Explorer request failed",
                    module = module,
                    action = action,
                    error = %e
                );
                Err(e)
            }
        }
    }

    pub async fn transaction_list(
        &self,
        address: &str,
        sort: SortOrder,
    ) -> Result<Vec<ExplorerTransaction>, ApiError> {
        self.get(
            "account",
            &[
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", sort.as_str()),
            ],
        )
        .await
    }

    /// The ABI comes back as JSON text inside the string result.
    pub async fn contract_abi(&self, address: &str) -> Result<String, ApiError> {
        self.get("contract", &[("action", "getabi"), ("address", address)])
            .await
    }

    pub async fn contract_source(&self, address: &str) -> Result<ExplorerSource, ApiError> {
        let sources: Vec<ExplorerSource> = self
            .get("contract", &[("action", "getsourcecode"), ("address", address)])
            .await?;
        sources
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ExplorerRejected("no source code returned".to_string()))
    }
}
