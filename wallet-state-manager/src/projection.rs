use std::sync::Arc;

use wallet_core::{
    detect_reward_parent, Bytes32, Coin, CoinState, Persister, RewardKind, WalletCoinRecord, WalletId, WalletType,
};

use crate::client::NetworkClient;
use crate::coin_store::CoinStore;
use crate::config::WalletStateConfig;
use crate::derivation::DerivationIndex;
use crate::error::Error;
use crate::events::{Event, EventSink};
use crate::interest_store::InterestStore;
use crate::tx_store::{MempoolInclusionStatus, TransactionRecord, TransactionStore, TransactionType};
use crate::wallet::WalletRegistry;

/// Returns the set of coin names currently locked by open trade offers.
/// Trade/offer matching itself lives outside this crate; this is the
/// narrow capability `spendable_balance` needs from it.
pub trait LockedCoinsProvider: Send + Sync {
    fn locked_coin_names(&self) -> std::collections::HashSet<Bytes32>;
}

/// A `LockedCoinsProvider` that never locks anything, for callers with no
/// trade subsystem wired up.
#[derive(Debug, Default)]
pub struct NoLockedCoins;

impl LockedCoinsProvider for NoLockedCoins {
    fn locked_coin_names(&self) -> std::collections::HashSet<Bytes32> {
        Default::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncState {
    pub syncing: bool,
    pub synced_height: u32,
    pub peak_height: u32,
}

/// The Wallet Projection Engine: ingests `CoinState` streams,
/// classifies coin additions/removals, synthesizes transaction records,
/// drives reorg rollback, and expands derivation paths.
pub struct WalletStateManager {
    pub config: WalletStateConfig,
    pub coin_store: CoinStore,
    pub tx_store: TransactionStore,
    pub derivation: DerivationIndex,
    pub interest: InterestStore,
    pub registry: WalletRegistry,
    client: Arc<dyn NetworkClient>,
    locked_coins: Arc<dyn LockedCoinsProvider>,
    events: EventSink,
    sync_state: SyncState,
}

impl WalletStateManager {
    pub fn new(
        config: WalletStateConfig,
        derivation: DerivationIndex,
        client: Arc<dyn NetworkClient>,
    ) -> (Self, std::sync::mpsc::Receiver<Event>) {
        let (events, receiver) = EventSink::new();
        let manager = Self {
            config,
            coin_store: CoinStore::new(),
            tx_store: TransactionStore::new(),
            derivation,
            interest: InterestStore::new(),
            registry: WalletRegistry::new(),
            client,
            locked_coins: Arc::new(NoLockedCoins),
            events,
            sync_state: SyncState::default(),
        };
        (manager, receiver)
    }

    pub fn with_locked_coins_provider(mut self, provider: Arc<dyn LockedCoinsProvider>) -> Self {
        self.locked_coins = provider;
        self
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    /// Writes the Coin Ledger, Transaction Ledger, Derivation Index, and
    /// Interest Set to `persister`, one key per store.
    pub fn persist_all(&self, persister: &dyn Persister) -> Result<(), Error> {
        self.coin_store.save(persister)?;
        self.tx_store.save(persister)?;
        self.derivation.save(persister)?;
        self.interest.save(persister)?;
        Ok(())
    }

    /// Rehydrates the Coin Ledger, Transaction Ledger, Derivation Index,
    /// and Interest Set from `persister`. A no-op per store for keys that
    /// were never written.
    pub fn load_all(&mut self, persister: &dyn Persister) -> Result<(), Error> {
        self.coin_store.load(persister)?;
        self.tx_store.load(persister)?;
        self.derivation.load(persister)?;
        self.interest.load(persister)?;
        Ok(())
    }

    /// Queues `tx` for sending: records it as unconfirmed and emits
    /// `pending_transaction` so a caller resubmits it until a full node
    /// accepts it.
    pub fn add_pending_transaction(&mut self, tx: TransactionRecord) {
        let wallet_id = tx.wallet_id;
        let tx_name = tx.name;
        self.tx_store.add(tx);
        self.events.emit(Event::PendingTransaction { wallet_id, tx_name });
    }

    /// A full node acknowledged (or rejected) a previously queued send;
    /// records the outcome and emits `tx_update`.
    pub fn remove_from_queue(
        &mut self,
        tx_name: &Bytes32,
        peer: String,
        status: MempoolInclusionStatus,
        error: Option<String>,
    ) {
        self.tx_store.increment_sent(tx_name, peer, status, error);
        if let Some(tx) = self.tx_store.get(tx_name) {
            self.events.emit(Event::TxUpdate {
                wallet_id: tx.wallet_id,
                tx_name: *tx_name,
            });
        }
    }

    /// A new peak arrived from the network layer. Updates the tracked
    /// peak height and emits `sync_changed`.
    pub fn new_peak(&mut self, height: u32) {
        self.sync_state.peak_height = height;
        self.sync_state.synced_height = height;
        self.sync_state.syncing = false;
        self.events.emit(Event::SyncChanged {
            syncing: false,
            synced_height: height,
        });
    }

    /// Entry point for a batch of coin state updates from the network
    /// layer. Returns the newly added records and the coin states that
    /// transitioned to spent.
    pub fn new_coin_state(
        &mut self,
        mut updates: Vec<CoinState>,
        fork_height: Option<u32>,
        current_height: Option<u32>,
    ) -> Result<(Vec<WalletCoinRecord>, Vec<CoinState>), Error> {
        // Stable sort ascending by created_height so parents land before
        // children. Coins with no created_height sort last; input order
        // is preserved among ties.
        updates.sort_by_key(|cs| cs.created_height.unwrap_or(u32::MAX));

        if let (Some(fork), Some(current)) = (fork_height, current_height) {
            if fork != current.saturating_sub(1) {
                self.reorg_rollback(fork)?;
            }
        }

        let mut added = Vec::new();
        let mut removed = Vec::new();

        for cs in updates {
            match (cs.created_height, cs.spent_height) {
                (Some(created), None) => {
                    if let Some(record) = self.process_created(cs.coin, created)? {
                        added.push(record);
                    }
                }
                (Some(created), Some(spent)) => {
                    self.process_created_and_spent(cs.clone(), created, spent)?;
                    removed.push(cs);
                }
                (None, None) | (None, Some(_)) => {
                    // Reorged out, or malformed wire data: best-effort
                    // remove any matching coin record.
                    let name = cs.coin.coin_id();
                    self.coin_store.remove(&name);
                    removed.push(cs);
                }
            }
        }

        Ok((added, removed))
    }

    fn resolve_wallet(&self, puzzle_hash: &Bytes32) -> Option<(WalletId, WalletType)> {
        if let Some(info) = self.derivation.wallet_info_for_puzzle_hash(puzzle_hash) {
            return Some(info);
        }
        let wallet_id = self.interest.lookup_puzzle_hash(puzzle_hash)?;
        let wallet_type = self
            .registry
            .get(wallet_id)
            .map(|w| w.wallet_type())
            .unwrap_or(WalletType::Standard);
        Some((wallet_id, wallet_type))
    }

    fn process_created(&mut self, coin: Coin, created_height: u32) -> Result<Option<WalletCoinRecord>, Error> {
        let Some((wallet_id, wallet_type)) = self.resolve_wallet(&coin.puzzle_hash) else {
            return Ok(None);
        };
        let reward = detect_reward_parent(
            coin.parent_coin_info,
            created_height,
            self.config.genesis_challenge,
        );
        let record = self.coin_added(coin, created_height, wallet_id, wallet_type, reward);
        if let Some(index) = self.derivation.index_for_puzzle_hash(&record.coin.puzzle_hash) {
            self.derivation.set_used_up_to(wallet_id, index);
        }
        Ok(Some(record))
    }

    /// Classifies and writes a freshly observed coin.
    fn coin_added(
        &mut self,
        coin: Coin,
        confirmed_height: u32,
        wallet_id: WalletId,
        wallet_type: WalletType,
        reward: Option<RewardKind>,
    ) -> WalletCoinRecord {
        let name = coin.coin_id();

        let is_change = self
            .coin_store
            .get_by_name(&coin.parent_coin_info)
            .map(|parent| parent.wallet_id == wallet_id && parent.wallet_type == wallet_type)
            .unwrap_or(false);

        let record = WalletCoinRecord {
            coin,
            confirmed_height,
            spent_height: 0,
            coinbase: reward == Some(RewardKind::Pool),
            is_farm_reward: reward.is_some(),
            wallet_type,
            wallet_id,
        };
        self.coin_store.add(record.clone());

        if !is_change {
            match reward {
                Some(RewardKind::Pool) => self.record_reward_tx(
                    name,
                    record.coin.amount,
                    confirmed_height,
                    TransactionType::CoinbaseReward,
                    wallet_id,
                    record.coin.puzzle_hash,
                ),
                Some(RewardKind::Farmer) => self.record_reward_tx(
                    name,
                    record.coin.amount,
                    confirmed_height,
                    TransactionType::FeeReward,
                    wallet_id,
                    record.coin.puzzle_hash,
                ),
                None => {
                    if let Some(tx) = self.tx_store.addition_owner(&name) {
                        tx.confirmed = true;
                        tx.confirmed_at_height = confirmed_height;
                    } else if record.coin.amount > 0 {
                        self.record_reward_tx(
                            name,
                            record.coin.amount,
                            confirmed_height,
                            TransactionType::IncomingTx,
                            wallet_id,
                            record.coin.puzzle_hash,
                        );
                    }
                }
            }
        }

        self.events.emit(Event::CoinAdded {
            wallet_id,
            coin_name: name,
        });

        record
    }

    fn record_reward_tx(
        &mut self,
        name: Bytes32,
        amount: u64,
        height: u32,
        tx_type: TransactionType,
        wallet_id: WalletId,
        to_puzzle_hash: Bytes32,
    ) {
        self.tx_store.add(TransactionRecord {
            name,
            confirmed_at_height: height,
            created_at_time: self.client.get_timestamp_for_height(height).unwrap_or(0),
            to_puzzle_hash,
            amount,
            fee_amount: 0,
            confirmed: true,
            sent: 0,
            sent_to: vec![],
            additions: vec![],
            removals: vec![],
            wallet_id,
            trade_id: None,
            tx_type,
        });
    }

    fn process_created_and_spent(
        &mut self,
        cs: CoinState,
        created_height: u32,
        spent_height: u32,
    ) -> Result<(), Error> {
        let coin = cs.coin;
        let name = coin.coin_id();

        if self.coin_store.contains(&name) {
            self.coin_store.set_spent(&name, spent_height);
            self.confirm_removals(&name, spent_height);
            return Ok(());
        }

        let Some((wallet_id, wallet_type)) = self.resolve_wallet(&coin.puzzle_hash) else {
            return Ok(());
        };
        let reward = detect_reward_parent(
            coin.parent_coin_info,
            created_height,
            self.config.genesis_challenge,
        );

        let record = WalletCoinRecord {
            coin: coin.clone(),
            confirmed_height: created_height,
            spent_height,
            coinbase: reward == Some(RewardKind::Pool),
            is_farm_reward: reward.is_some(),
            wallet_type,
            wallet_id,
        };
        self.coin_store.add(record);

        let is_change = self
            .coin_store
            .get_by_name(&coin.parent_coin_info)
            .map(|parent| parent.wallet_id == wallet_id && parent.wallet_type == wallet_type)
            .unwrap_or(false);

        if !is_change {
            self.tx_store.add(TransactionRecord {
                name: random_tx_name(),
                confirmed_at_height: created_height,
                created_at_time: self.client.get_timestamp_for_height(created_height).unwrap_or(0),
                to_puzzle_hash: coin.puzzle_hash,
                amount: coin.amount,
                fee_amount: 0,
                confirmed: true,
                sent: 0,
                sent_to: vec![],
                additions: vec![coin.clone()],
                removals: vec![],
                wallet_id,
                trade_id: None,
                tx_type: TransactionType::IncomingTx,
            });
        }

        match self.client.fetch_spend_outcome(created_height, coin.clone()) {
            Ok(outcome) => {
                let is_ours = |c: &Coin| {
                    self.derivation
                        .wallet_info_for_puzzle_hash(&c.puzzle_hash)
                        .is_some()
                };
                let to_puzzle_hash = outcome
                    .children
                    .iter()
                    .find(|c| !is_ours(c))
                    .or_else(|| outcome.children.first())
                    .map(|c| c.puzzle_hash)
                    .unwrap_or(coin.puzzle_hash);
                let amount: u64 = outcome
                    .children
                    .iter()
                    .filter(|c| !is_ours(c))
                    .map(|c| c.amount)
                    .sum();

                self.tx_store.add(TransactionRecord {
                    name,
                    confirmed_at_height: spent_height,
                    created_at_time: self
                        .client
                        .get_timestamp_for_height(spent_height)
                        .unwrap_or(0),
                    to_puzzle_hash,
                    amount,
                    fee_amount: outcome.reserved_fee,
                    confirmed: true,
                    sent: 0,
                    sent_to: vec![],
                    additions: outcome.children,
                    removals: vec![coin],
                    wallet_id,
                    trade_id: None,
                    tx_type: TransactionType::OutgoingTx,
                });
            }
            Err(Error::PeerUnavailable) => {
                log::warn!("peer unavailable fetching spend outcome for {name}; dropping this coin-state update");
            }
            Err(e) => return Err(e),
        }

        self.confirm_removals(&name, spent_height);
        Ok(())
    }

    fn confirm_removals(&mut self, coin_name: &Bytes32, height: u32) {
        for tx in self.tx_store.unconfirmed_removing(coin_name) {
            tx.confirmed = true;
            tx.confirmed_at_height = height;
        }
    }

    /// Rolls the Coin Ledger and Transaction Ledger back to `h`, requeues
    /// confirmed outgoing/trade transactions as unconfirmed, and tears
    /// down any wallet whose `rewind` reports it no longer exists.
    pub fn reorg_rollback(&mut self, h: u32) -> Result<(), Error> {
        if self.sync_state.peak_height.saturating_sub(h) > self.config.max_reorg_size {
            log::warn!(
                "reorg_rollback to height {h} reaches {} blocks behind peak {}, beyond the configured reorg horizon of {}",
                self.sync_state.peak_height.saturating_sub(h),
                self.sync_state.peak_height,
                self.config.max_reorg_size,
            );
        }

        self.coin_store.rollback_to_block(h);
        self.tx_store.rollback_to_block(h);

        let ids: Vec<WalletId> = self.registry.ids().collect();
        for id in ids {
            let should_remove = self
                .registry
                .get_mut(id)
                .map(|w| w.rewind(h))
                .unwrap_or(false);
            if should_remove {
                self.registry.remove(id);
            }
        }
        Ok(())
    }

    /// Guarantees derivation coverage `[start, unused + N)` for every
    /// standard-type wallet, publishing newly generated puzzle hashes to
    /// the Interest Set and the network collaborator.
    pub fn create_more_puzzle_hashes(&mut self, from_zero: bool) -> Result<(), Error> {
        let ids: Vec<WalletId> = self.registry.ids().collect();
        let mut to_subscribe = Vec::new();

        for wallet_id in ids {
            let Some(wallet) = self.registry.get(wallet_id) else {
                continue;
            };
            if !wallet.wants_derivation() {
                continue;
            }

            if let Some(single_index) = wallet.single_derivation_index() {
                if self.derivation.last_generated_for(wallet_id).is_none() {
                    let ph = self.generate_one(wallet_id, single_index)?;
                    to_subscribe.push(ph);
                }
                continue;
            }

            let n = if self.derivation.last_generated_for(wallet_id).is_none() {
                self.config.initial_num_public_keys_new_wallet
            } else {
                self.config.initial_num_public_keys
            };

            let start = if from_zero {
                0
            } else {
                self.derivation.last_generated_for(wallet_id).map_or(0, |i| i + 1)
            };
            let unused = self.derivation.get_unused_derivation_path(wallet_id).unwrap_or(0);
            let target = unused + n;

            let mut index = start;
            while index < target {
                to_subscribe.push(self.generate_one(wallet_id, index)?);
                index += 1;
            }
        }

        for batch in to_subscribe.chunks(self.config.subscription_batch_size) {
            self.client.subscribe_to_new_puzzle_hash(batch)?;
        }

        Ok(())
    }

    fn generate_one(&mut self, wallet_id: WalletId, index: u32) -> Result<Bytes32, Error> {
        let pubkey = self.derivation.public_key(index);
        let wallet_type = self
            .registry
            .get(wallet_id)
            .map(|w| w.wallet_type())
            .ok_or(Error::UnknownWallet(wallet_id))?;
        let puzzle_hash = self
            .registry
            .get(wallet_id)
            .expect("checked above")
            .puzzle_hash_for_pubkey(&pubkey);

        self.derivation.add_derivation_paths(vec![crate::derivation::DerivationRecord {
            index,
            puzzle_hash,
            pubkey,
            wallet_type,
            wallet_id,
        }]);
        self.interest.add_puzzle_hash(puzzle_hash, wallet_id);
        Ok(puzzle_hash)
    }

    pub fn confirmed_balance(&self, wallet_id: WalletId) -> u64 {
        self.coin_store.confirmed_balance(wallet_id)
    }

    /// `confirmed - unconfirmed removals + unconfirmed additions owned by
    /// the wallet` (see DESIGN.md for the reasoning behind this exact
    /// arithmetic).
    pub fn unconfirmed_balance(&self, wallet_id: WalletId) -> u64 {
        let confirmed = self.confirmed_balance(wallet_id);
        let unconfirmed = self.tx_store.get_unconfirmed_for_wallet(wallet_id);

        let removals: u64 = unconfirmed.iter().flat_map(|t| t.removals.iter()).map(|c| c.amount).sum();
        let additions: u64 = unconfirmed
            .iter()
            .flat_map(|t| t.additions.iter())
            .filter(|c| {
                self.derivation
                    .wallet_info_for_puzzle_hash(&c.puzzle_hash)
                    .map(|(id, _)| id)
                    == Some(wallet_id)
            })
            .map(|c| c.amount)
            .sum();

        confirmed.saturating_sub(removals) + additions
    }

    /// Unspent amounts minus coins locked by unconfirmed removals
    /// belonging to this wallet, minus coins locked by open trade offers.
    pub fn spendable_balance(&self, wallet_id: WalletId) -> u64 {
        let locked_by_trade = self.locked_coins.locked_coin_names();
        let locked_by_send: std::collections::HashSet<Bytes32> = self
            .tx_store
            .get_unconfirmed_for_wallet(wallet_id)
            .iter()
            .flat_map(|t| t.removals.iter())
            .filter(|c| {
                self.derivation
                    .wallet_info_for_puzzle_hash(&c.puzzle_hash)
                    .map(|(id, _)| id)
                    == Some(wallet_id)
            })
            .map(|c| c.coin_id())
            .collect();

        self.coin_store
            .get_unspent_for_wallet(wallet_id)
            .iter()
            .filter(|r| !locked_by_trade.contains(&r.name()) && !locked_by_send.contains(&r.name()))
            .map(|r| r.coin.amount)
            .sum()
    }
}

/// A transaction record's own identity, independent of any coin it
/// references (a coin can show up in more than one record's
/// additions/removals).
fn random_tx_name() -> Bytes32 {
    Bytes32::from(rand::random::<[u8; 32]>())
}
