//! Conversion of raw token amounts into quote (USD) value through an
//! aggregator-style price feed contract.

use soroban_sdk::{contractclient, contracttype, Address, Env};

use crate::ContractError;

/// Decimals of every quote value, matching Stellar asset amounts.
pub const QUOTE_DECIMALS: u32 = 7;

/// A price round as reported by the feed.
#[derive(Clone, Debug, PartialEq)]
#[contracttype]
pub struct RoundData {
    pub round_id: u64,
    pub answer: i128,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

/// The subset of the aggregator interface this contract reads.
#[contractclient(name = "PriceFeedClient")]
pub trait PriceFeed {
    fn decimals(env: Env) -> u32;
    fn latest_round_data(env: Env) -> RoundData;
    fn version(env: Env) -> u32;
}

/// Latest price and its precision.
///
/// A feed that traps or answers garbage never yields a price: call failures
/// map to [`ContractError::OracleUnavailable`], non-positive answers and
/// unrepresentable precisions to [`ContractError::InvalidPrice`].
pub fn latest_price(env: &Env, feed: &Address) -> Result<(i128, i128), ContractError> {
    let client = PriceFeedClient::new(env, feed);

    let round = match client.try_latest_round_data() {
        Ok(Ok(round)) => round,
        _ => return Err(ContractError::OracleUnavailable),
    };
    if round.answer <= 0 {
        return Err(ContractError::InvalidPrice);
    }

    let decimals = match client.try_decimals() {
        Ok(Ok(decimals)) => decimals,
        _ => return Err(ContractError::OracleUnavailable),
    };
    let scale = 10i128
        .checked_pow(decimals)
        .ok_or(ContractError::InvalidPrice)?;

    Ok((round.answer, scale))
}

/// Quote value of `amount` (in units of a token with `token_decimals`
/// decimals), expressed with [`QUOTE_DECIMALS`] decimals.
pub fn conversion_rate(
    env: &Env,
    feed: &Address,
    amount: i128,
    token_decimals: u32,
) -> Result<i128, ContractError> {
    let (price, scale) = latest_price(env, feed)?;
    // Saturates rather than overflowing; a saturated value clears any minimum.
    let value = amount.saturating_mul(price) / scale;
    Ok(rescale(value, token_decimals, QUOTE_DECIMALS))
}

/// Moves `value` from `from` decimals to `to` decimals. `from` must satisfy
/// `10^from <= i128::MAX`.
fn rescale(value: i128, from: u32, to: u32) -> i128 {
    if from >= to {
        value / 10i128.pow(from - to)
    } else {
        value.saturating_mul(10i128.pow(to - from))
    }
}

pub fn version(env: &Env, feed: &Address) -> Result<u32, ContractError> {
    match PriceFeedClient::new(env, feed).try_version() {
        Ok(Ok(version)) => Ok(version),
        _ => Err(ContractError::OracleUnavailable),
    }
}
