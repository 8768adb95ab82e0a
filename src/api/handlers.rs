use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::warn;
use warp::http::StatusCode;
use warp::Rejection;

use super::rejection::Failure;
use super::Context;
use crate::core::{parse_topics, LogRange, SortOrder, TransferDirection};
use crate::models::Health;
use crate::utils::block_number::parse_optional;
use crate::utils::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransfersQuery {
    #[serde(default)]
    pub direction: TransferDirection,
    pub from_block: Option<String>,
    pub to_block: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventLogsQuery {
    pub topics: Option<String>,
    pub from_block: Option<String>,
    pub to_block: Option<String>,
}

fn log_range(from_block: Option<&str>, to_block: Option<&str>) -> Result<LogRange, ApiError> {
    Ok(LogRange {
        from_block: parse_optional(from_block)?,
        to_block: parse_optional(to_block)?,
    })
}

fn respond<T: Serialize>(
    ctx: &Context,
    endpoint: &'static str,
    label: &'static str,
    start: Instant,
    result: Result<T, ApiError>,
) -> Result<warp::reply::Json, Rejection> {
    match result {
        Ok(body) => {
            ctx.metrics.record_request(endpoint, StatusCode::OK, start);
            Ok(warp::reply::json(&body))
        }
        Err(error) => {
            if error.is_upstream() {
                ctx.metrics.record_upstream_error(endpoint);
            }
            ctx.metrics.record_request(endpoint, error.status_code(), start);
            warn!(
                event = "request_failed",
                message = label,
                endpoint = endpoint,
                error = %error
            );
            Err(warp::reject::custom(Failure::new(label, error)))
        }
    }
}

pub async fn get_block(number: String, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_block(&number).await;
    respond(&ctx, "block", "Failed to fetch block", start, result)
}

pub async fn get_transaction(hash: String, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_transaction(&hash).await;
    respond(&ctx, "transaction", "Failed to fetch transaction", start, result)
}

pub async fn get_balance(address: String, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_balance(&address).await;
    respond(&ctx, "balance", "Failed to fetch balance", start, result)
}

pub async fn get_latest_block(ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_latest_block().await;
    respond(&ctx, "latest_block", "Failed to fetch latest block", start, result)
}

pub async fn get_gas_price(ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_gas_price().await;
    respond(&ctx, "gas_price", "Failed to fetch gas price", start, result)
}

pub async fn get_transaction_history(
    address: String,
    query: HistoryQuery,
    ctx: Context,
) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx
        .service
        .get_transaction_history(&address, query.sort)
        .await;
    respond(
        &ctx,
        "transaction_history",
        "Failed to fetch transaction history",
        start,
        result,
    )
}

pub async fn get_token_balance(
    address: String,
    token_address: String,
    ctx: Context,
) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_token_balance(&address, &token_address).await;
    respond(&ctx, "token_balance", "Failed to fetch token balance", start, result)
}

pub async fn get_token_transfers(
    address: String,
    query: TransfersQuery,
    ctx: Context,
) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = match log_range(query.from_block.as_deref(), query.to_block.as_deref()) {
        Ok(range) => {
            ctx.service
                .get_token_transfers(&address, query.direction, range)
                .await
        }
        Err(e) => Err(e),
    };
    respond(&ctx, "token_transfers", "Failed to fetch token transfers", start, result)
}

pub async fn get_contract_abi(address: String, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_contract_abi(&address).await;
    respond(&ctx, "contract_abi", "Failed to fetch contract ABI", start, result)
}

pub async fn get_contract_source(
    address: String,
    ctx: Context,
) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let result = ctx.service.get_contract_source(&address).await;
    respond(&ctx, "contract_source", "Failed to fetch contract source", start, result)
}

pub async fn get_event_logs(
    address: String,
    query: EventLogsQuery,
    ctx: Context,
) -> Result<warp::reply::Json, Rejection> {
    let start = Instant::now();
    let filter = parse_topics(query.topics.as_deref().unwrap_or_default()).and_then(|topics| {
        log_range(query.from_block.as_deref(), query.to_block.as_deref()).map(|r| (topics, r))
    });
    let result = match filter {
        Ok((topics, range)) => ctx.service.get_event_logs(&address, &topics, range).await,
        Err(e) => Err(e),
    };
    respond(&ctx, "event_logs", "Failed to fetch event logs", start, result)
}

pub async fn health() -> Result<warp::reply::Json, Rejection> {
    Ok(warp::reply::json(&Health {
        status: "healthy".to_string(),
    }))
}
