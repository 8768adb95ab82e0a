mod handlers;
mod rejection;

use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use crate::core::{EthService, MetricsCollector};

/// Per-request handle on the shared service.
#[derive(Clone)]
pub struct Context {
    pub service: Arc<EthService>,
    pub metrics: MetricsCollector,
}

fn with_context(
    ctx: Context,
) -> impl Filter<Extract = (Context,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Every endpoint under `/api/v1`, with JSON error bodies, CORS and request
/// tracing applied.
pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let block = warp::path!("eth" / "block" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_block);

    let transaction = warp::path!("eth" / "transaction" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_transaction);

    let balance = warp::path!("eth" / "balance" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_balance);

    let latest_block = warp::path!("eth" / "latest-block")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_latest_block);

    let gas_price = warp::path!("eth" / "gas-price")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_gas_price);

    let history = warp::path!("eth" / "transactions" / String)
        .and(warp::get())
        .and(warp::query::<handlers::HistoryQuery>())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_transaction_history);

    let token_balance = warp::path!("eth" / "token-balance" / String / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_token_balance);

    let token_transfers = warp::path!("eth" / "token-transfers" / String)
        .and(warp::get())
        .and(warp::query::<handlers::TransfersQuery>())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_token_transfers);

    let contract_abi = warp::path!("eth" / "contract-abi" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_contract_abi);

    let contract_source = warp::path!("eth" / "contract-source" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_contract_source);

    let event_logs = warp::path!("eth" / "event-logs" / String)
        .and(warp::get())
        .and(warp::query::<handlers::EventLogsQuery>())
        .and(with_context(ctx))
        .and_then(handlers::get_event_logs);

    let health = warp::path!("health")
        .and(warp::get())
        .and_then(handlers::health);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    warp::path("api")
        .and(warp::path("v1"))
        .and(
            block
                .or(transaction)
                .or(balance)
                .or(latest_block)
                .or(gas_price)
                .or(history)
                .or(token_balance)
                .or(token_transfers)
                .or(contract_abi)
                .or(contract_source)
                .or(event_logs)
                .or(health),
        )
        .recover(rejection::handle_rejection)
        .with(cors)
        .with(warp::trace::request())
}
