use std::sync::{Arc, Mutex};

use wallet_core::{Bytes32, Coin, CoinState, MemoryPersister, SecretKey};
use wallet_state_manager::{
    DerivationIndex, Error, Event, MempoolInclusionStatus, NetworkClient, SpendOutcome,
    StandardWallet, TransactionRecord, TransactionType, WalletStateConfig, WalletStateManager,
};

/// A `NetworkClient` whose answers are fixed ahead of time by the test.
#[derive(Default)]
struct FakeClient {
    spend_outcomes: Mutex<std::collections::HashMap<Bytes32, SpendOutcome>>,
    subscribed_batches: Mutex<Vec<Vec<Bytes32>>>,
}

impl NetworkClient for FakeClient {
    fn subscribe_to_new_puzzle_hash(&self, puzzle_hashes: &[Bytes32]) -> Result<(), Error> {
        self.subscribed_batches
            .lock()
            .unwrap()
            .push(puzzle_hashes.to_vec());
        Ok(())
    }

    fn subscribe_to_coin_ids_update(&self, _coin_ids: &[Bytes32]) -> Result<(), Error> {
        Ok(())
    }

    fn get_coin_state(&self, _ids: &[Bytes32]) -> Result<Vec<CoinState>, Error> {
        Ok(vec![])
    }

    fn fetch_children(&self, _parent_coin_name: Bytes32) -> Result<Vec<CoinState>, Error> {
        Ok(vec![])
    }

    fn fetch_spend_outcome(&self, _height: u32, coin: Coin) -> Result<SpendOutcome, Error> {
        Ok(self
            .spend_outcomes
            .lock()
            .unwrap()
            .get(&coin.coin_id())
            .cloned()
            .unwrap_or(SpendOutcome {
                reserved_fee: 0,
                children: vec![],
            }))
    }

    fn get_timestamp_for_height(&self, height: u32) -> Result<u64, Error> {
        Ok(height as u64 * 10)
    }
}

fn make_manager(
    client: Arc<FakeClient>,
) -> (WalletStateManager, std::sync::mpsc::Receiver<wallet_state_manager::Event>, u32) {
    let sk = SecretKey::from_seed(&[5u8; 32]);
    let derivation = DerivationIndex::new(sk);
    let (mut manager, receiver) = WalletStateManager::new(WalletStateConfig::default(), derivation, client);
    let wallet_id = manager
        .registry
        .add_new_wallet(|id| Box::new(StandardWallet { id }));
    manager.create_more_puzzle_hashes(false).unwrap();
    (manager, receiver, wallet_id)
}

fn puzzle_hash_for(manager: &WalletStateManager, wallet_id: u32, index: u32) -> Bytes32 {
    let pubkey = manager.derivation.public_key(index);
    manager
        .registry
        .get(wallet_id)
        .unwrap()
        .puzzle_hash_for_pubkey(&pubkey)
}

#[test]
fn incoming_confirmed_coin_increases_confirmed_balance() {
    let _ = env_logger::try_init();
    let (mut manager, _rx, wallet_id) = make_manager(Arc::new(FakeClient::default()));
    let ph = puzzle_hash_for(&manager, wallet_id, 0);

    let coin = Coin {
        parent_coin_info: Bytes32::from([0xaa; 32]),
        puzzle_hash: ph,
        amount: 1_000,
    };
    let (added, _) = manager
        .new_coin_state(
            vec![CoinState {
                coin,
                created_height: Some(10),
                spent_height: None,
            }],
            None,
            Some(10),
        )
        .unwrap();

    assert_eq!(added.len(), 1);
    assert_eq!(manager.confirmed_balance(wallet_id), 1_000);
    assert_eq!(manager.unconfirmed_balance(wallet_id), 1_000);
    assert_eq!(manager.spendable_balance(wallet_id), 1_000);
}

#[test]
fn reorg_rollback_removes_coin_above_fork_height() {
    let (mut manager, _rx, wallet_id) = make_manager(Arc::new(FakeClient::default()));
    let ph = puzzle_hash_for(&manager, wallet_id, 0);

    let coin = Coin {
        parent_coin_info: Bytes32::from([0xbb; 32]),
        puzzle_hash: ph,
        amount: 500,
    };
    manager
        .new_coin_state(
            vec![CoinState {
                coin,
                created_height: Some(20),
                spent_height: None,
            }],
            None,
            Some(20),
        )
        .unwrap();
    assert_eq!(manager.confirmed_balance(wallet_id), 500);

    manager.reorg_rollback(15).unwrap();
    assert_eq!(manager.confirmed_balance(wallet_id), 0);
}

#[test]
fn spend_with_change_records_outgoing_tx_and_change_coin() {
    let client = Arc::new(FakeClient::default());
    let (mut manager, _rx, wallet_id) = make_manager(client.clone());
    let ph0 = puzzle_hash_for(&manager, wallet_id, 0);
    let ph1 = puzzle_hash_for(&manager, wallet_id, 1);

    let original = Coin {
        parent_coin_info: Bytes32::from([0xcc; 32]),
        puzzle_hash: ph0,
        amount: 1_000,
    };
    manager
        .new_coin_state(
            vec![CoinState {
                coin: original,
                created_height: Some(5),
                spent_height: None,
            }],
            None,
            Some(5),
        )
        .unwrap();

    let change = Coin {
        parent_coin_info: original.coin_id(),
        puzzle_hash: ph1,
        amount: 400,
    };
    let to_other = Coin {
        parent_coin_info: original.coin_id(),
        puzzle_hash: Bytes32::from([0xee; 32]),
        amount: 590,
    };
    client.spend_outcomes.lock().unwrap().insert(
        original.coin_id(),
        SpendOutcome {
            reserved_fee: 10,
            children: vec![change, to_other],
        },
    );

    manager
        .new_coin_state(
            vec![CoinState {
                coin: original,
                created_height: Some(5),
                spent_height: Some(6),
            }],
            None,
            Some(6),
        )
        .unwrap();

    // The original coin is spent and neither child has landed yet.
    assert_eq!(manager.confirmed_balance(wallet_id), 0);

    manager
        .new_coin_state(
            vec![
                CoinState {
                    coin: change,
                    created_height: Some(6),
                    spent_height: None,
                },
                CoinState {
                    coin: to_other,
                    created_height: Some(6),
                    spent_height: None,
                },
            ],
            None,
            Some(6),
        )
        .unwrap();

    // Only the change coin belongs to this wallet.
    assert_eq!(manager.confirmed_balance(wallet_id), 400);
}

#[test]
fn spend_of_untracked_coin_records_incoming_and_outgoing_tx() {
    let client = Arc::new(FakeClient::default());
    let (mut manager, _rx, wallet_id) = make_manager(client.clone());
    let ph = puzzle_hash_for(&manager, wallet_id, 0);

    // The wallet never saw this coin created, only already spent: the
    // engine must still record the receive side as an incoming tx, in
    // addition to synthesizing the outgoing spend.
    let coin = Coin {
        parent_coin_info: Bytes32::from([0x11; 32]),
        puzzle_hash: ph,
        amount: 1_000,
    };
    let to_other = Coin {
        parent_coin_info: coin.coin_id(),
        puzzle_hash: Bytes32::from([0xee; 32]),
        amount: 900,
    };
    client.spend_outcomes.lock().unwrap().insert(
        coin.coin_id(),
        SpendOutcome {
            reserved_fee: 0,
            children: vec![to_other],
        },
    );

    manager
        .new_coin_state(
            vec![CoinState {
                coin,
                created_height: Some(5),
                spent_height: Some(6),
            }],
            None,
            Some(6),
        )
        .unwrap();

    let txs = manager.tx_store.get_all_transactions_for_wallet(wallet_id, None);
    assert!(
        txs.iter().any(|t| t.tx_type == TransactionType::IncomingTx && t.amount == 1_000),
        "missing incoming tx for the receive side: {txs:?}"
    );
    assert!(
        txs.iter().any(|t| t.tx_type == TransactionType::OutgoingTx && t.amount == 900),
        "missing outgoing tx for the spend side: {txs:?}"
    );
}

#[test]
fn reorg_trigger_requires_both_heights() {
    let (mut manager, _rx, wallet_id) = make_manager(Arc::new(FakeClient::default()));
    let ph = puzzle_hash_for(&manager, wallet_id, 0);

    let coin = Coin {
        parent_coin_info: Bytes32::from([0x22; 32]),
        puzzle_hash: ph,
        amount: 700,
    };
    manager
        .new_coin_state(
            vec![CoinState {
                coin,
                created_height: Some(20),
                spent_height: None,
            }],
            None,
            Some(20),
        )
        .unwrap();

    // fork_height is Some but current_height is None: this must NOT be
    // treated as a reorg trigger, so the coin survives.
    manager
        .new_coin_state(vec![], Some(5), None)
        .unwrap();
    assert_eq!(manager.confirmed_balance(wallet_id), 700);
}

#[test]
fn pending_transaction_and_send_ack_emit_events() {
    let (mut manager, rx, wallet_id) = make_manager(Arc::new(FakeClient::default()));

    let tx = TransactionRecord {
        name: Bytes32::from([0x33; 32]),
        confirmed_at_height: 0,
        created_at_time: 0,
        to_puzzle_hash: Bytes32::from([0x44; 32]),
        amount: 50,
        fee_amount: 1,
        confirmed: false,
        sent: 0,
        sent_to: vec![],
        additions: vec![],
        removals: vec![],
        wallet_id,
        trade_id: None,
        tx_type: TransactionType::OutgoingTx,
    };
    manager.add_pending_transaction(tx);
    assert!(matches!(
        rx.recv().unwrap(),
        Event::PendingTransaction { wallet_id: w, .. } if w == wallet_id
    ));

    manager.remove_from_queue(
        &Bytes32::from([0x33; 32]),
        "peer1".to_string(),
        MempoolInclusionStatus::Success,
        None,
    );
    assert!(matches!(
        rx.recv().unwrap(),
        Event::TxUpdate { wallet_id: w, .. } if w == wallet_id
    ));
}

#[test]
fn persist_all_then_load_all_round_trips_balances() {
    let (mut manager, _rx, wallet_id) = make_manager(Arc::new(FakeClient::default()));
    let ph = puzzle_hash_for(&manager, wallet_id, 0);

    let coin = Coin {
        parent_coin_info: Bytes32::from([0x55; 32]),
        puzzle_hash: ph,
        amount: 250,
    };
    manager
        .new_coin_state(
            vec![CoinState {
                coin,
                created_height: Some(3),
                spent_height: None,
            }],
            None,
            Some(3),
        )
        .unwrap();

    let persister = MemoryPersister::new();
    manager.persist_all(&persister).unwrap();

    let client = Arc::new(FakeClient::default());
    let sk = SecretKey::from_seed(&[5u8; 32]);
    let derivation = DerivationIndex::new(sk);
    let (mut restored, _rx2) = WalletStateManager::new(WalletStateConfig::default(), derivation, client);
    restored.load_all(&persister).unwrap();

    assert_eq!(restored.confirmed_balance(wallet_id), 250);
}

#[test]
fn bootstrap_derivation_covers_initial_window_in_one_subscription() {
    let client = Arc::new(FakeClient::default());
    let sk = SecretKey::from_seed(&[5u8; 32]);
    let derivation = DerivationIndex::new(sk);
    let config = WalletStateConfig {
        initial_num_public_keys: 8,
        initial_num_public_keys_new_wallet: 8,
        ..WalletStateConfig::default()
    };
    let (mut manager, _rx) = WalletStateManager::new(config, derivation, client.clone());
    let wallet_id = manager
        .registry
        .add_new_wallet(|id| Box::new(StandardWallet { id }));

    manager.create_more_puzzle_hashes(true).unwrap();

    assert_eq!(manager.derivation.last_generated_for(wallet_id), Some(7));
    assert_eq!(manager.derivation.last_used_for(wallet_id), None);

    let batches = client.subscribed_batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 8);
}
