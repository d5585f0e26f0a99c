#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
    Symbol, Vec,
};

pub mod price;


/// Minimum contribution, in quote units with 7 decimals (50 USD).
pub const MINIMUM_USD: i128 = 50 * 10_000_000;

const DAY_IN_LEDGERS: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = INSTANCE_BUMP_AMOUNT - DAY_IN_LEDGERS;
const BALANCE_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const BALANCE_LIFETIME_THRESHOLD: u32 = BALANCE_BUMP_AMOUNT - DAY_IN_LEDGERS;

const TOPIC: Symbol = symbol_short!("fund_me");
const EVENT_CONTRIBUTED: Symbol = symbol_short!("contrib");
const EVENT_WITHDRAWN: Symbol = symbol_short!("withdrawn");

// ── Errors ──────────────────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    /// `initialize` was already called.
    AlreadyInitialized = 1,
    /// The contract has not been initialized.
    NotInitialized = 2,
    /// The contribution is worth less than [`MINIMUM_USD`].
    InsufficientContribution = 3,
    /// Only the owner may withdraw.
    Unauthorized = 4,
    /// Index past the end of the contributor sequence.
    IndexOutOfRange = 5,
    /// The payout to the owner could not be completed.
    TransferFailed = 6,
    /// The price feed could not be read.
    OracleUnavailable = 7,
    /// The price feed answered a price that cannot be used.
    InvalidPrice = 8,
    /// The token's decimals could not be read or are out of range.
    UnsupportedToken = 9,
}

// ── Data Types ──────────────────────────────────────────────────────────────

#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// The only address allowed to withdraw.
    Owner,
    /// The token used for contributions.
    Token,
    /// Decimals of the contribution token, read once at initialization.
    TokenDecimals,
    /// The price feed used to value contributions.
    PriceFeed,
    /// Cumulative amount contributed by an address since the last withdrawal.
    /// Persistent, one entry per contributor.
    AmountFunded(Address),
    /// Contributors in call order, one entry per contribution.
    Funders,
}

/// State changes a withdrawal publishes once the payout has gone through.
struct Withdrawal {
    owner: Address,
    cleared: Vec<Address>,
}

// ── Contract ────────────────────────────────────────────────────────────────

#[contract]
pub struct FundMeContract;

#[contractimpl]
impl FundMeContract {
    /// Initializes the contract.
    ///
    /// # Arguments
    /// * `owner`      – The address allowed to withdraw.
    /// * `token`      – The token contract address used for contributions.
    /// * `price_feed` – The price feed contract used to value contributions.
    pub fn initialize(
        env: Env,
        owner: Address,
        token: Address,
        price_feed: Address,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(ContractError::AlreadyInitialized);
        }

        owner.require_auth();

        let token_decimals = match token::Client::new(&env, &token).try_decimals() {
            Ok(Ok(decimals)) if 10i128.checked_pow(decimals).is_some() => decimals,
            _ => return Err(ContractError::UnsupportedToken),
        };

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::TokenDecimals, &token_decimals);
        env.storage().instance().set(&DataKey::PriceFeed, &price_feed);

        let empty_funders: Vec<Address> = Vec::new(&env);
        env.storage()
            .instance()
            .set(&DataKey::Funders, &empty_funders);
        extend_instance(&env);

        Ok(())
    }

    /// Contribute tokens.
    ///
    /// The contributor must authorize the call. The amount is valued through
    /// the price feed and rejected when worth less than [`MINIMUM_USD`].
    /// Repeat contributions accumulate and are recorded again in the
    /// contributor sequence.
    pub fn contribute(env: Env, contributor: Address, amount: i128) -> Result<(), ContractError> {
        contributor.require_auth();

        let price_feed = read_price_feed(&env)?;
        let token_decimals = read_token_decimals(&env)?;
        let value = price::conversion_rate(&env, &price_feed, amount, token_decimals)?;
        if value < MINIMUM_USD {
            log!(&env, "contribution below minimum", amount, value);
            return Err(ContractError::InsufficientContribution);
        }

        let token_address = read_token(&env)?;
        let token_client = token::Client::new(&env, &token_address);

        // Transfer tokens from the contributor to this contract.
        token_client.transfer(&contributor, &env.current_contract_address(), &amount);

        let key = DataKey::AmountFunded(contributor.clone());
        let prev: i128 = env.storage().persistent().get(&key).unwrap_or(0);
        env.storage().persistent().set(&key, &(prev + amount));
        env.storage()
            .persistent()
            .extend_ttl(&key, BALANCE_LIFETIME_THRESHOLD, BALANCE_BUMP_AMOUNT);

        let mut funders = read_funders(&env);
        funders.push_back(contributor.clone());
        env.storage().instance().set(&DataKey::Funders, &funders);
        extend_instance(&env);

        env.events()
            .publish((TOPIC, EVENT_CONTRIBUTED), (contributor, amount));

        Ok(())
    }

    /// Withdraw the entire balance to the owner and reset all bookkeeping.
    ///
    /// Reads the contributor sequence from storage once per element.
    pub fn withdraw(env: Env, caller: Address) -> Result<(), ContractError> {
        let owner = authorize_owner(&env, &caller)?;

        let mut cleared: Vec<Address> = Vec::new(&env);
        let mut index: u32 = 0;
        while index < read_funders(&env).len() {
            let funder = read_funders(&env)
                .get(index)
                .ok_or(ContractError::IndexOutOfRange)?;
            cleared.push_back(funder);
            index += 1;
        }

        settle(&env, Withdrawal { owner, cleared })
    }

    /// Same as [`Self::withdraw`], but loads the contributor sequence into
    /// memory once.
    pub fn withdraw_optimized(env: Env, caller: Address) -> Result<(), ContractError> {
        let owner = authorize_owner(&env, &caller)?;

        let cleared = read_funders(&env);

        settle(&env, Withdrawal { owner, cleared })
    }

    // ── View helpers ────────────────────────────────────────────────────

    /// Returns the amount contributed by `funder` since the last withdrawal.
    pub fn balance_of(env: Env, funder: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::AmountFunded(funder))
            .unwrap_or(0)
    }

    /// Returns the contributor recorded at `index`.
    pub fn contributor_at(env: Env, index: u32) -> Result<Address, ContractError> {
        read_funders(&env)
            .get(index)
            .ok_or(ContractError::IndexOutOfRange)
    }

    pub fn contributor_count(env: Env) -> u32 {
        read_funders(&env).len()
    }

    /// Returns the contract's balance in the contribution token.
    pub fn held_balance(env: Env) -> Result<i128, ContractError> {
        let token_address = read_token(&env)?;
        Ok(token::Client::new(&env, &token_address).balance(&env.current_contract_address()))
    }

    /// Returns the quote value of `amount` at the current feed price.
    pub fn conversion_rate(env: Env, amount: i128) -> Result<i128, ContractError> {
        let price_feed = read_price_feed(&env)?;
        let token_decimals = read_token_decimals(&env)?;
        price::conversion_rate(&env, &price_feed, amount, token_decimals)
    }

    pub fn minimum_usd(_env: Env) -> i128 {
        MINIMUM_USD
    }

    pub fn owner(env: Env) -> Result<Address, ContractError> {
        read_owner(&env)
    }

    pub fn token(env: Env) -> Result<Address, ContractError> {
        read_token(&env)
    }

    /// Returns the configured price feed address.
    pub fn price_feed(env: Env) -> Result<Address, ContractError> {
        read_price_feed(&env)
    }

    /// Returns the aggregator version reported by the price feed.
    pub fn price_feed_version(env: Env) -> Result<u32, ContractError> {
        let price_feed = read_price_feed(&env)?;
        price::version(&env, &price_feed)
    }
}

// ── Internals ───────────────────────────────────────────────────────────────

fn read_owner(env: &Env) -> Result<Address, ContractError> {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .ok_or(ContractError::NotInitialized)
}

fn read_token(env: &Env) -> Result<Address, ContractError> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(ContractError::NotInitialized)
}

fn read_token_decimals(env: &Env) -> Result<u32, ContractError> {
    env.storage()
        .instance()
        .get(&DataKey::TokenDecimals)
        .ok_or(ContractError::NotInitialized)
}

fn read_price_feed(env: &Env) -> Result<Address, ContractError> {
    env.storage()
        .instance()
        .get(&DataKey::PriceFeed)
        .ok_or(ContractError::NotInitialized)
}

fn read_funders(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&DataKey::Funders)
        .unwrap_or_else(|| Vec::new(env))
}

fn extend_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

/// Requires `caller`'s signature and checks it is the owner.
fn authorize_owner(env: &Env, caller: &Address) -> Result<Address, ContractError> {
    let owner = read_owner(env)?;
    caller.require_auth();

    if *caller != owner {
        log!(env, "withdrawal refused for non-owner", caller.clone());
        return Err(ContractError::Unauthorized);
    }
    Ok(owner)
}

/// Pays out the held balance, then publishes the reset.
///
/// Nothing is written to storage until the transfer has succeeded, so a
/// rejected payout leaves the ledger exactly as it was.
fn settle(env: &Env, withdrawal: Withdrawal) -> Result<(), ContractError> {
    let token_address = read_token(env)?;
    let token_client = token::Client::new(env, &token_address);
    let contract = env.current_contract_address();

    let amount = token_client.balance(&contract);
    if amount > 0 {
        match token_client.try_transfer(&contract, &withdrawal.owner, &amount) {
            Ok(Ok(())) => {}
            _ => {
                log!(env, "payout to owner failed", amount);
                return Err(ContractError::TransferFailed);
            }
        }
    }

    for funder in withdrawal.cleared.iter() {
        env.storage()
            .persistent()
            .remove(&DataKey::AmountFunded(funder));
    }
    let empty_funders: Vec<Address> = Vec::new(env);
    env.storage()
        .instance()
        .set(&DataKey::Funders, &empty_funders);
    extend_instance(env);

    env.events().publish(
        (TOPIC, EVENT_WITHDRAWN),
        (withdrawal.owner, amount, withdrawal.cleared.len()),
    );

    Ok(())
}
