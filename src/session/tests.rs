#![allow(non_snake_case)]

use super::*;
use crate::{
    pricing::UNIT_PRICE,
    test_helpers::{
        FakeConnector,
        FakeLedger,
        TEST_NETWORK,
        address,
        kinds,
    },
};
use proptest::prelude::*;

const TOKEN: u64 = 1_000_000_000;

fn owner() -> Address {
    address(9)
}

fn alice() -> Address {
    address(1)
}

fn session_for(connector: FakeConnector) -> Session<FakeConnector> {
    let mut settings = SessionSettings::new(TEST_NETWORK);
    settings.withdraw_on_connect = false;
    Session::new(connector, settings)
}

async fn connected_session(ledger: &FakeLedger, account: Address) -> Session<FakeConnector> {
    let mut session = session_for(ledger.connector(account));
    session.connect().await.unwrap();
    session
}

#[tokio::test]
async fn initial_load__missing_wallet__stays_disconnected_without_reads() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = session_for(ledger.missing_wallet());

    // when
    session.initial_load().await;

    // then
    assert!(!session.is_connected());
    assert_eq!(ledger.call_names(), vec!["connect"]);
    assert_eq!(session.snapshot(), &ChainSnapshot::default());
    let errors = session.recent_errors(1);
    assert!(errors[0].starts_with("wallet unavailable"));
}

#[tokio::test]
async fn initial_load__connected_wallet__populates_snapshot() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.set_total_supply(42 * TOKEN);
    ledger.set_token_balance(alice(), 7 * TOKEN);
    ledger.give_collectibles(alice(), &[3, 4]);
    let mut session = session_for(ledger.connector(alice()));

    // when
    session.initial_load().await;

    // then
    let expected = ChainSnapshot {
        total_minted: 42 * TOKEN,
        caller_balance: 7 * TOKEN,
        claimable_count: 2,
        is_owner: false,
    };
    assert!(session.is_connected());
    assert_eq!(session.wallet().network_id, Some(TEST_NETWORK));
    assert_eq!(session.wallet().account, Some(alice()));
    assert_eq!(session.snapshot(), &expected);
    assert!(ledger.submitted().is_empty());
}

#[tokio::test]
async fn initial_load__withdraw_on_connect_for_owner__submits_withdraw() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.set_contract_funds(3 * UNIT_PRICE);
    let mut session = Session::new(
        ledger.connector(owner()),
        SessionSettings::new(TEST_NETWORK),
    );

    // when
    session.initial_load().await;

    // then
    assert_eq!(kinds(&ledger.submitted()), vec![TxKind::Withdraw]);
    assert_eq!(ledger.withdrawn(), 3 * UNIT_PRICE);
    assert!(session.snapshot().is_owner);
}

#[tokio::test]
async fn initial_load__withdraw_on_connect_for_regular_user__submits_nothing() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = Session::new(
        ledger.connector(alice()),
        SessionSettings::new(TEST_NETWORK),
    );

    // when
    session.initial_load().await;

    // then
    assert!(ledger.submitted().is_empty());
    assert!(!session.snapshot().is_owner);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn read_claimable__three_owned_one_claimed__returns_two() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.give_collectibles(alice(), &[10, 11, 12]);
    ledger.mark_claimed(11);
    let session = connected_session(&ledger, alice()).await;

    // when
    let claimable = session.read_claimable().await.unwrap();

    // then
    assert_eq!(claimable, 2);
}

#[tokio::test]
async fn read_claimable__no_collectibles__returns_zero_without_index_lookups() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.give_collectibles(owner(), &[1, 2]);
    let session = connected_session(&ledger, alice()).await;
    ledger.clear_calls();

    // when
    let claimable = session.read_claimable().await.unwrap();

    // then
    assert_eq!(claimable, 0);
    let names = ledger.call_names();
    assert!(!names.contains(&"token_of_owner_by_index"));
    assert!(!names.contains(&"token_ids_claimed"));
}

#[tokio::test]
async fn read_owner__returns_collectible_owner() {
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let session = connected_session(&ledger, alice()).await;

    let actual = session.read_owner().await.unwrap();

    assert_eq!(actual, owner());
}

#[tokio::test]
async fn reads__before_connect__fail_with_wallet_unavailable() {
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let session = session_for(ledger.connector(alice()));

    let result = session.read_total_minted().await;

    assert!(matches!(result, Err(SessionError::WalletUnavailable(_))));
    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn refresh_reads__wrong_network__keeps_snapshot_and_raises_alert() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.set_total_supply(5 * TOKEN);
    ledger.set_token_balance(alice(), TOKEN);
    ledger.give_collectibles(alice(), &[1]);
    let mut session = connected_session(&ledger, alice()).await;
    session.refresh_reads().await;
    let before = session.snapshot().clone();
    ledger.set_network(TEST_NETWORK + 5);
    ledger.clear_calls();

    // when
    session.refresh_reads().await;

    // then
    assert_eq!(session.snapshot(), &before);
    assert!(ledger.contract_calls().is_empty());
    assert_eq!(
        session.take_alert().as_deref(),
        Some("Change the network to 0")
    );
}

#[tokio::test]
async fn connect__wrong_network__connects_but_raises_alert() {
    // given
    let ledger = FakeLedger::new(7, owner());
    let mut session = session_for(ledger.connector(alice()));

    // when
    let result = session.connect().await;

    // then
    assert!(result.is_ok());
    assert!(session.is_connected());
    assert_eq!(session.wallet().network_id, Some(7));
    assert!(session.alert().is_some());
}

#[tokio::test]
async fn connect__different_account__discards_previous_snapshot() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.give_collectibles(alice(), &[1, 2, 3]);
    let mut session = connected_session(&ledger, alice()).await;
    session.refresh_reads().await;
    assert_eq!(session.snapshot().claimable_count, 3);

    // when
    session.connector_mut().switch_account(address(2));
    session.connect().await.unwrap();

    // then
    assert_eq!(session.snapshot().claimable_count, 0);
    assert_eq!(session.wallet().account, Some(address(2)));
}

#[tokio::test]
async fn refresh_caller_balance__read_failure__substitutes_zero() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.set_token_balance(alice(), 9 * TOKEN);
    let mut session = connected_session(&ledger, alice()).await;
    session.refresh_caller_balance().await.unwrap();
    ledger.fail_read("balance_of");

    // when
    let result = session.refresh_caller_balance().await;

    // then
    assert!(matches!(
        result,
        Err(SessionError::ReadFailure {
            call: "balance_of",
            ..
        })
    ));
    assert_eq!(session.snapshot().caller_balance, 0);
}

#[tokio::test]
async fn refresh_claimable__read_failure__substitutes_zero() {
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.give_collectibles(alice(), &[1, 2]);
    let mut session = connected_session(&ledger, alice()).await;
    session.refresh_claimable().await.unwrap();
    ledger.fail_read("token_ids_claimed");

    let _ = session.refresh_claimable().await;

    assert_eq!(session.snapshot().claimable_count, 0);
}

#[tokio::test]
async fn refresh_total_minted__read_failure__keeps_prior_value() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.set_total_supply(12 * TOKEN);
    let mut session = connected_session(&ledger, alice()).await;
    session.refresh_total_minted().await.unwrap();
    ledger.fail_read("total_supply");

    // when
    let result = session.refresh_total_minted().await;

    // then
    assert!(result.is_err());
    assert_eq!(session.snapshot().total_minted, 12 * TOKEN);
}

#[tokio::test]
async fn mint__zero_amount__never_submits() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = connected_session(&ledger, alice()).await;
    ledger.clear_calls();

    // when
    let result = session.mint(0).await;

    // then
    assert!(matches!(result, Err(SessionError::InvalidAmount(0))));
    assert!(ledger.calls().is_empty());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn mint__five_tokens__attaches_five_times_unit_price() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = connected_session(&ledger, alice()).await;

    // when
    let receipt = session.mint(5).await.unwrap();

    // then
    assert_eq!(receipt.kind, TxKind::Mint);
    assert_eq!(
        ledger.submitted(),
        vec![WriteCall::Mint {
            amount: 5,
            payment: 5_000_000,
        }]
    );
    assert_eq!(ledger.contract_funds(), 5_000_000);
    assert_eq!(session.snapshot().caller_balance, 5 * TOKEN);
    assert_eq!(session.snapshot().total_minted, 5 * TOKEN);
    assert_eq!(
        session.take_alert().as_deref(),
        Some("Successfully minted Crypto Dev Tokens")
    );
}

#[tokio::test]
async fn mint__success__refreshes_all_reads_before_leaving_busy() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = connected_session(&ledger, alice()).await;
    ledger.observe_phases(session.subscribe_phase());
    ledger.clear_calls();

    // when
    session.mint(2).await.unwrap();

    // then
    let calls = ledger.calls();
    let submit = calls.iter().find(|c| c.name == "submit").unwrap();
    assert_eq!(submit.phase, Some(TxPhase::Submitting));
    let confirm_at = calls.iter().position(|c| c.name == "confirm").unwrap();
    assert_eq!(calls[confirm_at].phase, Some(TxPhase::AwaitingConfirmation));
    let refreshes = &calls[confirm_at + 1..];
    for read in ["total_supply", "balance_of", "collectible_balance_of", "owner"] {
        let call = refreshes.iter().find(|c| c.name == read).unwrap();
        assert_eq!(call.phase, Some(TxPhase::RefreshingReads), "{read}");
    }
    assert_eq!(session.phase(), TxPhase::Idle);
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn mint__wrong_network__does_not_submit() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = connected_session(&ledger, alice()).await;
    ledger.set_network(3);

    // when
    let result = session.mint(1).await;

    // then
    assert!(matches!(
        result,
        Err(SessionError::WrongNetwork {
            expected: 0,
            actual: 3
        })
    ));
    assert!(ledger.submitted().is_empty());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn mint__network_switched_during_confirmation__keeps_network_alert() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = connected_session(&ledger, alice()).await;
    ledger.switch_network_after_confirm(7);

    // when
    let receipt = session.mint(1).await.unwrap();

    // then
    assert_eq!(receipt.kind, TxKind::Mint);
    assert_eq!(session.status(), "Successfully minted Crypto Dev Tokens");
    assert_eq!(
        session.take_alert().as_deref(),
        Some("Change the network to 0")
    );
}

#[tokio::test]
async fn mint__after_finished_write__submits_again() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = connected_session(&ledger, alice()).await;
    ledger.reject_submissions();
    assert!(session.mint(1).await.is_err());
    ledger.accept_submissions();

    // when
    session.mint(2).await.unwrap();
    session.mint(3).await.unwrap();

    // then
    assert_eq!(ledger.submitted().len(), 2);
    assert_eq!(session.snapshot().caller_balance, 5 * TOKEN);
    assert!(session.pending().is_none());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn claim__unclaimed_collectibles__issues_tokens_and_clears_claimable() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.give_collectibles(alice(), &[4, 5, 6]);
    ledger.mark_claimed(5);
    let mut session = connected_session(&ledger, alice()).await;
    session.refresh_reads().await;
    assert_eq!(session.snapshot().claimable_count, 2);

    // when
    session.claim().await.unwrap();

    // then
    assert_eq!(kinds(&ledger.submitted()), vec![TxKind::Claim]);
    assert!(ledger.is_claimed(4));
    assert!(ledger.is_claimed(6));
    assert_eq!(session.snapshot().claimable_count, 0);
    assert_eq!(session.snapshot().caller_balance, 20 * TOKEN);
}

#[tokio::test]
async fn claim__reverted_on_chain__returns_write_reverted_and_keeps_snapshot() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.give_collectibles(alice(), &[4]);
    let mut session = connected_session(&ledger, alice()).await;
    session.refresh_reads().await;
    let before = session.snapshot().clone();
    ledger.revert_confirmations();

    // when
    let result = session.claim().await;

    // then
    assert!(matches!(
        result,
        Err(SessionError::WriteReverted {
            kind: TxKind::Claim,
            ..
        })
    ));
    assert_eq!(session.snapshot(), &before);
    assert_eq!(session.phase(), TxPhase::Idle);
    assert_eq!(session.status(), "The claim transaction failed");
}

#[tokio::test]
async fn mint__rejected_submission__returns_write_rejected_without_confirm() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    let mut session = connected_session(&ledger, alice()).await;
    ledger.reject_submissions();

    // when
    let result = session.mint(1).await;

    // then
    assert!(matches!(
        result,
        Err(SessionError::WriteRejected {
            kind: TxKind::Mint,
            ..
        })
    ));
    assert!(!ledger.call_names().contains(&"confirm"));
    assert_eq!(session.status(), "The mint transaction failed");
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn withdraw__not_owner__does_not_submit() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.set_contract_funds(UNIT_PRICE);
    let mut session = connected_session(&ledger, alice()).await;

    // when
    let result = session.withdraw().await;

    // then
    assert!(matches!(result, Err(SessionError::Unauthorized { .. })));
    assert!(ledger.submitted().is_empty());
    assert_eq!(ledger.contract_funds(), UNIT_PRICE);
}

#[tokio::test]
async fn withdraw__owner__moves_contract_funds() {
    // given
    let ledger = FakeLedger::new(TEST_NETWORK, owner());
    ledger.set_contract_funds(8 * UNIT_PRICE);
    let mut session = connected_session(&ledger, owner()).await;

    // when
    session.withdraw().await.unwrap();

    // then
    assert_eq!(ledger.contract_funds(), 0);
    assert_eq!(ledger.withdrawn(), 8 * UNIT_PRICE);
    assert!(session.snapshot().is_owner);
}

proptest! {
    #[test]
    fn every_operation__foreign_network__aborts_before_contract_calls(
        network in 1u64..u64::MAX,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            // given
            let ledger = FakeLedger::new(TEST_NETWORK, owner());
            ledger.give_collectibles(alice(), &[1, 2]);
            ledger.set_total_supply(3 * TOKEN);
            let mut session = connected_session(&ledger, alice()).await;
            session.refresh_reads().await;
            let before = session.snapshot().clone();
            ledger.set_network(network);
            ledger.clear_calls();

            // when
            session.refresh_reads().await;
            let _ = session.mint(1).await;
            let _ = session.claim().await;
            let _ = session.withdraw().await;

            // then
            assert_eq!(session.snapshot(), &before);
            assert!(ledger.contract_calls().is_empty());
            assert!(ledger.submitted().is_empty());
        });
    }
}
