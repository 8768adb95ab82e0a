pub mod chain;
pub mod explorer;
pub mod mapper;
mod metrics;

use serde::Deserialize;
use tracing::info;
use web3::signing::keccak256;
use web3::types::{Address, BlockNumber, FilterBuilder, H256};

use crate::config::Config;
use crate::models::{
    Balance, Block, ContractAbi, ContractSource, EventLog, GasPrice, TokenBalance, TokenTransfer,
    Transaction, TransactionHistory,
};
use crate::utils::block_number::{parse_block_number, LATEST};
use crate::utils::error::ApiError;
use crate::utils::units::{wei_to_ether, wei_to_gwei};

use chain::ChainClient;
use explorer::ExplorerClient;

pub use self::metrics::MetricsCollector;
pub use explorer::SortOrder;

/// `balanceOf(address)` selector.
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";
const MAX_TOPICS: usize = 4;

/// Which side of an ERC-20 transfer the queried address is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    #[default]
    In,
    Out,
}

/// Optional block bounds for log queries; `None` leaves the node default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogRange {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

pub fn parse_address(value: &str) -> Result<Address, ApiError> {
    let hex = strip_hex_prefix(value);
    if hex.len() != 40 {
        return Err(ApiError::InvalidInput(format!("malformed address: {}", value)));
    }
    hex.parse()
        .map_err(|_| ApiError::InvalidInput(format!("malformed address: {}", value)))
}

pub fn parse_hash(value: &str) -> Result<H256, ApiError> {
    let hex = strip_hex_prefix(value);
    if hex.len() != 64 {
        return Err(ApiError::InvalidInput(format!("malformed hash: {}", value)));
    }
    hex.parse()
        .map_err(|_| ApiError::InvalidInput(format!("malformed hash: {}", value)))
}

/// Comma-separated topic list; an empty slot matches anything.
pub fn parse_topics(raw: &str) -> Result<Vec<Option<H256>>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let topics = raw
        .split(',')
        .map(str::trim)
        .map(|t| if t.is_empty() { Ok(None) } else { parse_hash(t).map(Some) })
        .collect::<Result<Vec<_>, _>>()?;
    if topics.len() > MAX_TOPICS {
        return Err(ApiError::InvalidInput(format!(
            "at most {} topics are supported, got {}",
            MAX_TOPICS,
            topics.len()
        )));
    }
    Ok(topics)
}

pub fn balance_of_call_data(owner: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(mapper::address_to_topic(owner).as_bytes());
    data
}

pub fn transfer_topic() -> H256 {
    H256::from(keccak256(TRANSFER_EVENT.as_bytes()))
}

fn apply_range(mut builder: FilterBuilder, range: LogRange) -> FilterBuilder {
    if let Some(from) = range.from_block {
        builder = builder.from_block(BlockNumber::Number(from.into()));
    }
    if let Some(to) = range.to_block {
        builder = builder.to_block(BlockNumber::Number(to.into()));
    }
    builder
}

fn slot(topic: Option<H256>) -> Option<Vec<H256>> {
    topic.map(|t| vec![t])
}

/// One method per endpoint. Holds no mutable state, so a single instance is
/// shared across requests.
#[derive(Clone)]
pub struct EthService {
    chain: ChainClient,
    explorer: ExplorerClient,
}

impl EthService {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let chain = ChainClient::new(&config.eth_node_url)?;
        let explorer = ExplorerClient::new(&config.explorer_url, &config.etherscan_api_key)?;
        info!(
            event = "service_initialized",
            message = "Ethereum service initialized",
            rpc_endpoint = chain.endpoint(),
            explorer_url = %config.explorer_url
        );
        Ok(Self { chain, explorer })
    }

    pub async fn get_block(&self, token: &str) -> Result<Block, ApiError> {
        let number = parse_block_number(token)?;
        let block = self.chain.block(number).await?;
        Ok(mapper::block_to_model(&block))
    }

    pub async fn get_latest_block(&self) -> Result<Block, ApiError> {
        self.get_block(LATEST).await
    }

    /// The receipt is requested alongside the transaction; it is only
    /// attached once the transaction is mined.
    pub async fn get_transaction(&self, hash: &str) -> Result<Transaction, ApiError> {
        let hash = parse_hash(hash)?;
        let (tx, receipt) =
            futures::try_join!(self.chain.transaction(hash), self.chain.receipt(hash))?;
        Ok(mapper::transaction_to_model(&tx, receipt.as_ref()))
    }

    pub async fn get_balance(&self, address: &str) -> Result<Balance, ApiError> {
        let parsed = parse_address(address)?;
        let wei = self.chain.balance(parsed).await?;
        Ok(Balance {
            address: address.to_string(),
            balance: wei_to_ether(wei),
            balance_wei: wei.to_string(),
        })
    }

    pub async fn get_gas_price(&self) -> Result<GasPrice, ApiError> {
        let wei = self.chain.gas_price().await?;
        Ok(GasPrice {
            gas_price: wei_to_gwei(wei),
            gas_price_wei: wei.to_string(),
        })
    }

    pub async fn get_transaction_history(
        &self,
        address: &str,
        sort: SortOrder,
    ) -> Result<TransactionHistory, ApiError> {
        parse_address(address)?;
        let rows = self.explorer.transaction_list(address, sort).await?;
        Ok(TransactionHistory {
            address: address.to_string(),
            transactions: rows.iter().map(mapper::history_row_to_model).collect(),
        })
    }

    pub async fn get_token_balance(
        &self,
        address: &str,
        token_address: &str,
    ) -> Result<TokenBalance, ApiError> {
        let owner = parse_address(address)?;
        let token = parse_address(token_address)?;

        let result = self.chain.call(token, balance_of_call_data(&owner)).await?;
        let balance = mapper::decode_uint256(&result.0).ok_or(ApiError::EmptyContractResult)?;

        Ok(TokenBalance {
            address: address.to_string(),
            token_address: token_address.to_string(),
            balance: balance.to_string(),
        })
    }

    pub async fn get_token_transfers(
        &self,
        address: &str,
        direction: TransferDirection,
        range: LogRange,
    ) -> Result<Vec<TokenTransfer>, ApiError> {
        let party = mapper::address_to_topic(&parse_address(address)?);
        let (from, to) = match direction {
            TransferDirection::In => (None, Some(party)),
            TransferDirection::Out => (Some(party), None),
        };

        let builder = FilterBuilder::default().topics(
            Some(vec![transfer_topic()]),
            slot(from),
            slot(to),
            None,
        );
        let logs = self.chain.logs(apply_range(builder, range).build()).await?;
        Ok(logs.iter().filter_map(mapper::log_to_transfer).collect())
    }

    pub async fn get_contract_abi(&self, address: &str) -> Result<ContractAbi, ApiError> {
        parse_address(address)?;
        let abi = self.explorer.contract_abi(address).await?;
        Ok(ContractAbi {
            address: address.to_string(),
            abi,
        })
    }

    pub async fn get_contract_source(&self, address: &str) -> Result<ContractSource, ApiError> {
        parse_address(address)?;
        let source = self.explorer.contract_source(address).await?;
        Ok(ContractSource {
            address: address.to_string(),
            source_code: source.source_code,
            contract_name: source.contract_name,
            compiler_version: source.compiler_version,
        })
    }

    pub async fn get_event_logs(
        &self,
        address: &str,
        topics: &[Option<H256>],
        range: LogRange,
    ) -> Result<Vec<EventLog>, ApiError> {
        let contract = parse_address(address)?;

        let mut builder = FilterBuilder::default().address(vec![contract]);
        if !topics.is_empty() {
            let at = |i: usize| slot(topics.get(i).copied().flatten());
            builder = builder.topics(at(0), at(1), at(2), at(3));
        }

        let logs = self.chain.logs(apply_range(builder, range).build()).await?;
        Ok(logs.iter().map(mapper::log_to_model).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_topic_is_keccak_of_signature() {
        assert_eq!(
            mapper::hash_hex(&transfer_topic()),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn balance_of_call_data_layout() {
        let owner = parse_address("0xa7d9ddbe1f17865597fbd27ec712455208b6b76d").unwrap();
        let data = balance_of_call_data(&owner);
        assert_eq!(data.len(), 36);
        assert_eq!(
            mapper::hex_bytes(&data),
            "0x70a08231000000000000000000000000a7d9ddbe1f17865597fbd27ec712455208b6b76d"
        );
    }

    #[test]
    fn address_validation() {
        assert!(parse_address("0xa7d9ddbe1f17865597fbd27ec712455208b6b76d").is_ok());
        assert!(parse_address("a7d9ddbe1f17865597fbd27ec712455208b6b76d").is_ok());
        assert!(parse_address("0xa7d9ddBE1f17865597fBD27EC712455208B6B76d").is_ok());
        assert!(matches!(parse_address("0x1234"), Err(ApiError::InvalidInput(_))));
        assert!(parse_address("0xzzd9ddbe1f17865597fbd27ec712455208b6b76d").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn hash_validation() {
        let hash = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        assert_eq!(mapper::hash_hex(&parse_hash(hash).unwrap()), hash);
        assert!(parse_hash("0x88df").is_err());
        assert!(parse_hash("x").is_err());
    }

    #[test]
    fn topics_with_wildcards() {
        let t0 = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
        let t2 = "0x000000000000000000000000a7d9ddbe1f17865597fbd27ec712455208b6b76d";
        let parsed = parse_topics(&format!("{},,{}", t0, t2)).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].is_some());
        assert!(parsed[1].is_none());
        assert!(parsed[2].is_some());

        assert!(parse_topics("").unwrap().is_empty());
        assert!(parse_topics("nothex").is_err());
        assert!(parse_topics(&[t0; 5].join(",")).is_err());
    }
}
