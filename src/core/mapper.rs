use chrono::{DateTime, SecondsFormat};
use web3::signing::keccak256;
use web3::types::{
    Address, Block as NodeBlock, Log, Transaction as NodeTransaction, TransactionReceipt, H256,
    U256,
};

use crate::core::explorer::ExplorerTransaction;
use crate::models::{Block, EventLog, TokenTransfer, Transaction};
use crate::utils::units::{wei_to_ether, wei_to_gwei};

pub fn hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn hash_hex(hash: &H256) -> String {
    format!("{:?}", hash)
}

/// EIP-55 mixed-case address encoding.
pub fn to_checksum(address: &Address) -> String {
    let lower = hex::encode(address.as_bytes());
    let digest = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn format_timestamp(timestamp: U256) -> String {
    i64::try_from(timestamp.low_u64())
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn block_to_model(block: &NodeBlock<H256>) -> Block {
    Block {
        number: block.number.map(|n| n.to_string()).unwrap_or_default(),
        hash: block.hash.as_ref().map(hash_hex).unwrap_or_default(),
        parent_hash: hash_hex(&block.parent_hash),
        timestamp: format_timestamp(block.timestamp),
        miner: to_checksum(&block.author),
        gas_limit: block.gas_limit.to_string(),
        gas_used: block.gas_used.to_string(),
        difficulty: block.difficulty.to_string(),
        size: block.size.map(|s| s.to_string()).unwrap_or_default(),
        transactions: block.transactions.iter().map(hash_hex).collect(),
    }
}

/// A transaction without a block number is pending; its placement and
/// receipt fields stay empty even if a receipt was supplied.
pub fn transaction_to_model(
    tx: &NodeTransaction,
    receipt: Option<&TransactionReceipt>,
) -> Transaction {
    let gas_price = tx
        .gas_price
        .or(tx.max_fee_per_gas)
        .unwrap_or_default();

    let mut model = Transaction {
        hash: hash_hex(&tx.hash),
        block_number: None,
        block_hash: None,
        transaction_index: None,
        from: tx.from.as_ref().map(to_checksum).unwrap_or_default(),
        to: tx.to.as_ref().map(to_checksum),
        value: wei_to_ether(tx.value),
        gas: tx.gas.to_string(),
        gas_price: wei_to_gwei(gas_price),
        gas_used: None,
        status: None,
        nonce: tx.nonce.to_string(),
        input: hex_bytes(&tx.input.0),
    };

    if tx.block_number.is_none() {
        return model;
    }

    model.block_number = tx.block_number.map(|n| n.to_string());
    model.block_hash = tx.block_hash.as_ref().map(hash_hex);
    model.transaction_index = tx.transaction_index.map(|i| i.to_string());

    if let Some(receipt) = receipt {
        model.block_number = receipt
            .block_number
            .map(|n| n.to_string())
            .or(model.block_number);
        model.block_hash = receipt.block_hash.as_ref().map(hash_hex).or(model.block_hash);
        model.transaction_index = Some(receipt.transaction_index.to_string());
        model.gas_used = receipt.gas_used.map(|g| g.to_string());
        model.status = Some(receipt_status(receipt).to_string());
    }

    model
}

/// Pre-Byzantium receipts carry no status field; they are reported as success.
fn receipt_status(receipt: &TransactionReceipt) -> &'static str {
    match receipt.status {
        Some(status) if status.is_zero() => "0",
        _ => "1",
    }
}

pub fn log_to_model(log: &Log) -> EventLog {
    EventLog {
        address: to_checksum(&log.address),
        topics: log.topics.iter().map(hash_hex).collect(),
        data: hex_bytes(&log.data.0),
        block_number: log.block_number.map(|n| n.as_u64()),
        block_hash: log.block_hash.as_ref().map(hash_hex),
        transaction_hash: log.transaction_hash.as_ref().map(hash_hex),
        transaction_index: log.transaction_index.map(|i| i.as_u64()),
        log_index: log.log_index.map(|i| i.low_u64()),
        removed: log.removed.unwrap_or(false),
    }
}

/// Big-endian integer from the leading 32-byte word of an ABI-encoded result.
pub fn decode_uint256(data: &[u8]) -> Option<U256> {
    if data.is_empty() {
        return None;
    }
    let word = &data[..data.len().min(32)];
    Some(U256::from_big_endian(word))
}

pub fn topic_to_address(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..])
}

pub fn address_to_topic(address: &Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256::from(word)
}

/// ERC-20 `Transfer(from, to, value)` with both parties indexed. Logs of other
/// shapes (ERC-721 transfers, unindexed variants) yield `None`.
pub fn log_to_transfer(log: &Log) -> Option<TokenTransfer> {
    if log.topics.len() != 3 {
        return None;
    }
    let value = decode_uint256(&log.data.0).unwrap_or_default();

    Some(TokenTransfer {
        token_address: to_checksum(&log.address),
        from: to_checksum(&topic_to_address(&log.topics[1])),
        to: to_checksum(&topic_to_address(&log.topics[2])),
        value: value.to_string(),
        block_number: log.block_number.map(|n| n.as_u64()),
        block_hash: log.block_hash.as_ref().map(hash_hex),
        transaction_hash: log.transaction_hash.as_ref().map(hash_hex),
        log_index: log.log_index.map(|i| i.low_u64()),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Explorer rows carry decimal wei strings; unparseable amounts pass through.
fn convert_decimal(raw: &str, convert: fn(U256) -> String) -> String {
    U256::from_dec_str(raw)
        .map(convert)
        .unwrap_or_else(|_| raw.to_string())
}

/// Rows older than Byzantium only carry `isError`.
fn legacy_status(is_error: &str) -> Option<String> {
    match is_error {
        "1" => Some("0".to_string()),
        "0" => Some("1".to_string()),
        _ => None,
    }
}

pub fn history_row_to_model(row: &ExplorerTransaction) -> Transaction {
    Transaction {
        hash: row.hash.clone(),
        block_number: non_empty(&row.block_number),
        block_hash: non_empty(&row.block_hash),
        transaction_index: non_empty(&row.transaction_index),
        from: row.from.clone(),
        to: non_empty(&row.to),
        value: convert_decimal(&row.value, wei_to_ether),
        gas: row.gas.clone(),
        gas_price: convert_decimal(&row.gas_price, wei_to_gwei),
        gas_used: non_empty(&row.gas_used),
        status: non_empty(&row.receipt_status).or_else(|| legacy_status(&row.is_error)),
        nonce: row.nonce.clone(),
        input: row.input.clone(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn tx(mined: bool) -> NodeTransaction {
        serde_json::from_value(transaction(mined)).unwrap()
    }

    fn rcpt(status: &str) -> TransactionReceipt {
        serde_json::from_value(receipt(status)).unwrap()
    }

    #[test]
    fn checksum_matches_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let address: Address = expected[2..].to_lowercase().parse().unwrap();
            assert_eq!(to_checksum(&address), expected);
        }
    }

    #[test]
    fn pending_transaction_omits_placement_and_status() {
        let model = transaction_to_model(&tx(false), None);
        assert_eq!(model.hash, TX_HASH);
        assert!(model.block_number.is_none());
        assert!(model.block_hash.is_none());
        assert!(model.transaction_index.is_none());
        assert!(model.status.is_none());
        assert!(model.gas_used.is_none());

        let json = serde_json::to_value(&model).unwrap();
        let object = json.as_object().unwrap();
        for key in ["block_number", "block_hash", "transaction_index", "status", "gas_used"] {
            assert!(!object.contains_key(key), "{key} should be omitted");
        }
    }

    #[test]
    fn mined_transaction_with_failed_receipt() {
        let model = transaction_to_model(&tx(true), Some(&rcpt("0x0")));
        assert_eq!(model.status.as_deref(), Some("0"));
        assert_eq!(model.block_number.as_deref(), Some("6139707"));
        assert_eq!(model.block_hash.as_deref(), Some(BLOCK_HASH));
        assert_eq!(model.transaction_index.as_deref(), Some("65"));
        assert_eq!(model.gas_used.as_deref(), Some("1244"));
    }

    #[test]
    fn mined_transaction_with_successful_receipt() {
        let model = transaction_to_model(&tx(true), Some(&rcpt("0x1")));
        assert_eq!(model.status.as_deref(), Some("1"));
        assert_eq!(model.from, "0xa7d9ddBE1f17865597fBD27EC712455208B6B76d");
        assert_eq!(model.nonce, "21");
        assert_eq!(model.gas, "50000");
        assert_eq!(model.gas_price, "20.000000000");
        assert_eq!(model.value, "0.004290000000000000");
        assert_eq!(model.input, "0x68656c6c6f21");
    }

    #[test]
    fn contract_creation_has_no_recipient() {
        let mut raw = transaction(false);
        raw["to"] = serde_json::Value::Null;
        let tx: NodeTransaction = serde_json::from_value(raw).unwrap();
        let model = transaction_to_model(&tx, None);
        assert!(model.to.is_none());
        assert!(!serde_json::to_value(&model).unwrap().as_object().unwrap().contains_key("to"));
    }

    #[test]
    fn block_fields_are_decimal_strings() {
        let block: NodeBlock<H256> = serde_json::from_value(block()).unwrap();
        let model = block_to_model(&block);
        assert_eq!(model.number, "436");
        assert_eq!(model.hash, BLOCK_HASH);
        assert_eq!(model.miner, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(model.gas_limit, "5000");
        assert_eq!(model.gas_used, "0");
        assert_eq!(model.difficulty, "21109876668");
        assert_eq!(model.size, "544");
        assert_eq!(model.timestamp, "2015-07-30T15:45:00Z");
        assert_eq!(model.transactions, vec![TX_HASH.to_string()]);
    }

    #[test]
    fn decodes_balance_word() {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&1_000_000u64.to_be_bytes());
        assert_eq!(decode_uint256(&word), Some(U256::from(1_000_000u64)));

        let mut max = [0xffu8; 32];
        assert_eq!(decode_uint256(&max), Some(U256::MAX));
        max[0] = 0x01;
        assert_eq!(decode_uint256(&max).unwrap().bits(), 249);

        assert_eq!(decode_uint256(&[]), None);
    }

    #[test]
    fn topic_address_padding() {
        let address: Address = FROM[2..].parse().unwrap();
        let topic = address_to_topic(&address);
        assert_eq!(
            hash_hex(&topic),
            "0x000000000000000000000000a7d9ddbe1f17865597fbd27ec712455208b6b76d"
        );
        assert_eq!(topic_to_address(&topic), address);
    }

    #[test]
    fn transfer_log_decoding() {
        let log: Log = serde_json::from_value(transfer_log(
            "0x000000000000000000000000f02c1c8e6114b1dbe8937a39260b5b0a374432bb",
        ))
        .unwrap();
        let transfer = log_to_transfer(&log).unwrap();
        assert_eq!(transfer.token_address, "0xdAC17F958D2ee523a2206206994597C13D831ec7");
        assert_eq!(transfer.from, "0xa7d9ddBE1f17865597fBD27EC712455208B6B76d");
        assert_eq!(transfer.to.to_lowercase(), TO);
        assert_eq!(transfer.value, "1000000");
        assert_eq!(transfer.block_number, Some(6139707));
        assert_eq!(transfer.log_index, Some(3));
    }

    #[test]
    fn non_erc20_transfer_shapes_are_skipped() {
        let mut raw = transfer_log(
            "0x000000000000000000000000f02c1c8e6114b1dbe8937a39260b5b0a374432bb",
        );
        raw["topics"].as_array_mut().unwrap().truncate(1);
        let log: Log = serde_json::from_value(raw).unwrap();
        assert!(log_to_transfer(&log).is_none());
    }

    #[test]
    fn event_log_projection() {
        let log: Log = serde_json::from_value(transfer_log(
            "0x000000000000000000000000f02c1c8e6114b1dbe8937a39260b5b0a374432bb",
        ))
        .unwrap();
        let model = log_to_model(&log);
        assert_eq!(model.topics.len(), 3);
        assert_eq!(model.transaction_index, Some(65));
        assert_eq!(model.transaction_hash.as_deref(), Some(TX_HASH));
        assert!(!model.removed);
    }

    #[test]
    fn explorer_row_conversion() {
        let row: ExplorerTransaction = serde_json::from_value(serde_json::json!({
            "blockNumber": "14923678",
            "timeStamp": "1654646411",
            "hash": TX_HASH,
            "nonce": "7",
            "blockHash": BLOCK_HASH,
            "transactionIndex": "61",
            "from": FROM,
            "to": "",
            "value": "1000000000000000000",
            "gas": "21000",
            "gasPrice": "36000000000",
            "isError": "0",
            "txreceipt_status": "1",
            "input": "0x",
            "contractAddress": "",
            "cumulativeGasUsed": "5453145",
            "gasUsed": "21000",
            "confirmations": "122"
        }))
        .unwrap();

        let model = history_row_to_model(&row);
        assert_eq!(model.value, "1.000000000000000000");
        assert_eq!(model.gas_price, "36.000000000");
        assert_eq!(model.status.as_deref(), Some("1"));
        assert_eq!(model.block_number.as_deref(), Some("14923678"));
        assert!(model.to.is_none());
    }

    #[test]
    fn hex_bytes_prefixes_lowercase_hex() {
        assert_eq!(hex_bytes(&[]), "0x");
        assert_eq!(hex_bytes(&[0x00, 0xab, 0x0f]), "0x00ab0f");
    }

    #[test]
    fn pre_byzantium_explorer_rows_use_is_error() {
        let succeeded = ExplorerTransaction {
            is_error: "0".to_string(),
            ..Default::default()
        };
        let failed = ExplorerTransaction {
            is_error: "1".to_string(),
            ..Default::default()
        };
        assert_eq!(history_row_to_model(&succeeded).status.as_deref(), Some("1"));
        assert_eq!(history_row_to_model(&failed).status.as_deref(), Some("0"));
        assert!(history_row_to_model(&ExplorerTransaction::default()).status.is_none());
    }
}
