use tracing::{debug, error};
use web3::{
    transports::Http,
    types::{
        Address, Block, BlockId, BlockNumber, Bytes, CallRequest, Filter, Log, Transaction,
        TransactionId, TransactionReceipt, H256, U256,
    },
    Web3,
};

use crate::utils::error::ApiError;

/// Thin wrapper over the node's JSON-RPC surface. Every method is one round
/// trip; transport failures become [`ApiError::Upstream`].
#[derive(Clone)]
pub struct ChainClient {
    web3_client: Web3<Http>,
    endpoint: String,
}

fn upstream(operation: &'static str, e: web3::Error) -> ApiError {
    error!(
        event = "rpc_error",
        message = "Node request failed",
        operation = operation,
        error = %e
    );
    ApiError::from(e)
}

impl ChainClient {
    pub fn new(rpc_endpoint: &str) -> Result<Self, ApiError> {
        let transport = Http::new(rpc_endpoint)?;
        Ok(Self {
            web3_client: Web3::new(transport),
            endpoint: rpc_endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `None` fetches the chain head.
    pub async fn block(&self, number: Option<u64>) -> Result<Block<H256>, ApiError> {
        let id = match number {
            Some(n) => BlockNumber::Number(n.into()),
            None => BlockNumber::Latest,
        };
        debug!(event = "fetching_block", message = "Fetching block", block = ?number);

        self.web3_client
            .eth()
            .block(BlockId::Number(id))
            .await
            .map_err(|e| upstream("eth_getBlockByNumber", e))?
            .ok_or_else(|| match number {
                Some(n) => ApiError::NotFound(format!("block {}", n)),
                None => ApiError::NotFound("latest block".to_string()),
            })
    }

    pub async fn transaction(&self, hash: H256) -> Result<Transaction, ApiError> {
        self.web3_client
            .eth()
            .transaction(TransactionId::Hash(hash))
            .await
            .map_err(|e| upstream("eth_getTransactionByHash", e))?
            .ok_or_else(|| ApiError::NotFound(format!("transaction {:?}", hash)))
    }

    /// `None` while the transaction is pending.
    pub async fn receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>, ApiError> {
        self.web3_client
            .eth()
            .transaction_receipt(hash)
            .await
            .map_err(|e| upstream("eth_getTransactionReceipt", e))
    }

    pub async fn balance(&self, address: Address) -> Result<U256, ApiError> {
        self.web3_client
            .eth()
            .balance(address, None)
            .await
            .map_err(|e| upstream("eth_getBalance", e))
    }

    pub async fn gas_price(&self) -> Result<U256, ApiError> {
        self.web3_client
            .eth()
            .gas_price()
            .await
            .map_err(|e| upstream("eth_gasPrice", e))
    }

    /// Read-only `eth_call` against the latest block.
    pub async fn call(&self, to: Address, data: Vec<u8>) -> Result<Bytes, ApiError> {
        let request = CallRequest::builder().to(to).data(Bytes(data)).build();
        self.web3_client
            .eth()
            .call(request, None)
            .await
            .map_err(|e| upstream("eth_call", e))
    }

    pub async fn logs(&self, filter: Filter) -> Result<Vec<Log>, ApiError> {
        self.web3_client
            .eth()
            .logs(filter)
            .await
            .map_err(|e| upstream("eth_getLogs", e))
    }
}
