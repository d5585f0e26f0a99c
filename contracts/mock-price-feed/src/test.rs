#![cfg(test)]

use soroban_sdk::{testutils::Ledger, Env};

use crate::{MockPriceFeed, MockPriceFeedClient, VERSION};

const DECIMALS: u32 = 8;
const INITIAL_ANSWER: i128 = 2_000_0000_0000;

fn setup_env() -> (Env, MockPriceFeedClient<'static>) {
    let env = Env::default();
    let contract_id = env.register(MockPriceFeed, ());
    let client = MockPriceFeedClient::new(&env, &contract_id);
    client.initialize(&DECIMALS, &INITIAL_ANSWER);
    (env, client)
}

#[test]
fn test_initialize_publishes_first_round() {
    let (_env, client) = setup_env();

    let round = client.latest_round_data();
    assert_eq!(round.round_id, 1);
    assert_eq!(round.answered_in_round, 1);
    assert_eq!(round.answer, INITIAL_ANSWER);
    assert_eq!(client.decimals(), DECIMALS);
    assert_eq!(client.version(), VERSION);
}

#[test]
#[should_panic(expected = "already initialized")]
fn test_double_initialize_panics() {
    let (_env, client) = setup_env();
    client.initialize(&DECIMALS, &INITIAL_ANSWER);
}

#[test]
fn test_update_answer_starts_new_round() {
    let (env, client) = setup_env();

    env.ledger().set_timestamp(1_000);
    client.update_answer(&1_500_0000_0000);

    let round = client.latest_round_data();
    assert_eq!(round.round_id, 2);
    assert_eq!(round.answer, 1_500_0000_0000);
    assert_eq!(round.updated_at, 1_000);
    assert_eq!(client.latest_answer(), 1_500_0000_0000);
}

#[test]
fn test_halted_feed_rejects_reads() {
    let (_env, client) = setup_env();

    client.set_halted(&true);
    assert!(client.try_latest_round_data().is_err());
    assert!(client.try_latest_answer().is_err());

    client.set_halted(&false);
    assert_eq!(client.latest_answer(), INITIAL_ANSWER);
}
