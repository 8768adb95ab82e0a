pub mod block_number;
pub mod error;
pub mod units;
