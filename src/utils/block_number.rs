use crate::utils::error::ApiError;

pub const LATEST: &str = "latest";

/// Parse a block token: `latest`, a decimal number or a `0x`-prefixed hex
/// number. `Ok(None)` means the chain head.
pub fn parse_block_number(token: &str) -> Result<Option<u64>, ApiError> {
    if token == LATEST {
        return Ok(None);
    }

    if let Ok(number) = token.parse::<u64>() {
        return Ok(Some(number));
    }

    token
        .strip_prefix("0x")
        .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        .map(Some)
        .ok_or_else(|| ApiError::InvalidBlockNumber(token.to_string()))
}

/// Same as [`parse_block_number`] for optional query parameters.
pub fn parse_optional(token: Option<&str>) -> Result<Option<u64>, ApiError> {
    match token {
        Some(token) => parse_block_number(token),
        None => Ok(None),
    }
}
