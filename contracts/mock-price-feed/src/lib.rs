#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, symbol_short, Env};

#[cfg(test)]
mod test;

/// Aggregator interface version reported by [`MockPriceFeed::version`].
pub const VERSION: u32 = 4;

// ── Data Types ──────────────────────────────────────────────────────────────

/// A single price round, shaped like a Chainlink `latestRoundData` answer.
#[derive(Clone, Debug, PartialEq)]
#[contracttype]
pub struct RoundData {
    pub round_id: u64,
    pub answer: i128,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Number of decimals in every answer.
    Decimals,
    /// The most recent round.
    LatestRound,
    /// When set, reads fail as if the feed were offline.
    Halted,
}

// ── Contract ────────────────────────────────────────────────────────────────

/// Price feed used in place of a live oracle in tests and local deployments.
#[contract]
pub struct MockPriceFeed;

#[contractimpl]
impl MockPriceFeed {
    /// Sets the answer precision and publishes the first round.
    ///
    /// # Arguments
    /// * `decimals`       – Number of decimals in `answer`.
    /// * `initial_answer` – The first price, scaled by `10^decimals`.
    pub fn initialize(env: Env, decimals: u32, initial_answer: i128) {
        if env.storage().instance().has(&DataKey::Decimals) {
            panic!("already initialized");
        }

        env.storage().instance().set(&DataKey::Decimals, &decimals);
        env.storage().instance().set(&DataKey::Halted, &false);
        Self::update_answer(env, initial_answer);
    }

    /// Publish a new answer as the next round.
    pub fn update_answer(env: Env, answer: i128) {
        let round_id = env
            .storage()
            .instance()
            .get::<_, RoundData>(&DataKey::LatestRound)
            .map(|round| round.round_id + 1)
            .unwrap_or(1);
        let now = env.ledger().timestamp();

        let round = RoundData {
            round_id,
            answer,
            started_at: now,
            updated_at: now,
            answered_in_round: round_id,
        };
        env.storage().instance().set(&DataKey::LatestRound, &round);

        env.events().publish(
            (symbol_short!("feed"), symbol_short!("answer")),
            (round_id, answer),
        );
    }

    /// Take the feed offline (`true`) or bring it back (`false`).
    pub fn set_halted(env: Env, halted: bool) {
        env.storage().instance().set(&DataKey::Halted, &halted);
    }

    // ── View helpers ────────────────────────────────────────────────────

    pub fn latest_round_data(env: Env) -> RoundData {
        let halted: bool = env
            .storage()
            .instance()
            .get(&DataKey::Halted)
            .unwrap_or(false);
        if halted {
            panic!("price feed halted");
        }

        env.storage()
            .instance()
            .get(&DataKey::LatestRound)
            .expect("not initialized")
    }

    /// Returns only the answer of the latest round.
    pub fn latest_answer(env: Env) -> i128 {
        Self::latest_round_data(env).answer
    }

    pub fn decimals(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::Decimals)
            .expect("not initialized")
    }

    pub fn version(_env: Env) -> u32 {
        VERSION
    }
}
