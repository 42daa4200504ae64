use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wallet_core::{Bytes32, Coin, PersistError, Persister, WalletId};

const PERSIST_KEY: &str = "tx_store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    CoinbaseReward,
    FeeReward,
    IncomingTx,
    OutgoingTx,
    IncomingTrade,
    OutgoingTrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MempoolInclusionStatus {
    Success,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRecord {
    pub peer: String,
    pub status: MempoolInclusionStatus,
    pub error: Option<String>,
}

/// A confirmed or pending transaction as tracked by the wallet.
///
/// Invariant: `confirmed == true` implies `confirmed_at_height` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub name: Bytes32,
    pub confirmed_at_height: u32,
    pub created_at_time: u64,
    pub to_puzzle_hash: Bytes32,
    pub amount: u64,
    pub fee_amount: u64,
    pub confirmed: bool,
    pub sent: u32,
    pub sent_to: Vec<SendRecord>,
    pub additions: Vec<Coin>,
    pub removals: Vec<Coin>,
    pub wallet_id: WalletId,
    pub trade_id: Option<Bytes32>,
    pub tx_type: TransactionType,
}

impl TransactionRecord {
    pub fn is_confirmed_consistent(&self) -> bool {
        !self.confirmed || self.confirmed_at_height != 0
    }
}

/// Table of [`TransactionRecord`]s, keyed by `name`.
#[derive(Debug, Default)]
pub struct TransactionStore {
    by_name: BTreeMap<Bytes32, TransactionRecord>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tx: TransactionRecord) {
        self.by_name.insert(tx.name, tx);
    }

    pub fn get(&self, name: &Bytes32) -> Option<&TransactionRecord> {
        self.by_name.get(name)
    }

    pub fn get_mut(&mut self, name: &Bytes32) -> Option<&mut TransactionRecord> {
        self.by_name.get_mut(name)
    }

    pub fn set_confirmed(&mut self, name: &Bytes32, height: u32) {
        if let Some(tx) = self.by_name.get_mut(name) {
            tx.confirmed = true;
            tx.confirmed_at_height = height;
        }
    }

    pub fn increment_sent(
        &mut self,
        name: &Bytes32,
        peer: String,
        status: MempoolInclusionStatus,
        error: Option<String>,
    ) {
        if let Some(tx) = self.by_name.get_mut(name) {
            tx.sent += 1;
            tx.sent_to.push(SendRecord {
                peer,
                status,
                error,
            });
        }
    }

    pub fn get_unconfirmed_for_wallet(&self, wallet_id: WalletId) -> Vec<&TransactionRecord> {
        self.by_name
            .values()
            .filter(|t| t.wallet_id == wallet_id && !t.confirmed)
            .collect()
    }

    pub fn get_unconfirmed_for_wallet_mut(
        &mut self,
        wallet_id: WalletId,
    ) -> Vec<&mut TransactionRecord> {
        self.by_name
            .values_mut()
            .filter(|t| t.wallet_id == wallet_id && !t.confirmed)
            .collect()
    }

    pub fn get_all_transactions_for_wallet(
        &self,
        wallet_id: WalletId,
        tx_type: Option<TransactionType>,
    ) -> Vec<&TransactionRecord> {
        self.by_name
            .values()
            .filter(|t| {
                t.wallet_id == wallet_id && tx_type.map_or(true, |ty| ty == t.tx_type)
            })
            .collect()
    }

    pub fn get_transaction_above(&self, height: u32) -> Vec<&TransactionRecord> {
        self.by_name
            .values()
            .filter(|t| t.confirmed && t.confirmed_at_height > height)
            .collect()
    }

    /// Find any unconfirmed tx whose `removals` contains `coin_name`.
    pub fn unconfirmed_removing(&mut self, coin_name: &Bytes32) -> Vec<&mut TransactionRecord> {
        self.by_name
            .values_mut()
            .filter(|t| !t.confirmed && t.removals.iter().any(|c| &c.coin_id() == coin_name))
            .collect()
    }

    /// Find any (confirmed or not) tx whose `additions` contains `coin_name`,
    /// used by `coin_added` to recognize a change output belonging to a
    /// pending outgoing spend.
    pub fn addition_owner(&mut self, coin_name: &Bytes32) -> Option<&mut TransactionRecord> {
        self.by_name
            .values_mut()
            .find(|t| t.additions.iter().any(|c| &c.coin_id() == coin_name))
    }

    /// Delete confirmed tx with `confirmed_at_height > h`; demote
    /// unconfirmed tx embedding a removed coin back to pending. Outgoing,
    /// outgoing-trade, and incoming-trade tx rolled back above `h` are
    /// requeued as unconfirmed so they can resubmit; reward/plain-incoming
    /// records are simply dropped.
    pub fn rollback_to_block(&mut self, h: u32) {
        for tx in self.by_name.values_mut() {
            if tx.confirmed && tx.confirmed_at_height > h {
                if matches!(
                    tx.tx_type,
                    TransactionType::OutgoingTx | TransactionType::OutgoingTrade | TransactionType::IncomingTrade
                ) {
                    tx.confirmed = false;
                    tx.confirmed_at_height = 0;
                } else {
                    // Reward/incoming records don't resubmit; they simply
                    // cease to exist once their confirming block is gone.
                }
            }
        }
        self.by_name.retain(|_, tx| {
            !(tx.confirmed
                && tx.confirmed_at_height > h
                && !matches!(
                    tx.tx_type,
                    TransactionType::OutgoingTx | TransactionType::OutgoingTrade | TransactionType::IncomingTrade
                ))
        });
    }

    pub fn save(&self, persister: &dyn Persister) -> Result<(), PersistError> {
        let records: Vec<&TransactionRecord> = self.by_name.values().collect();
        let bytes = serde_json::to_vec(&records).map_err(|e| PersistError::Backend(e.to_string()))?;
        persister.put(PERSIST_KEY, &bytes)
    }

    pub fn load(&mut self, persister: &dyn Persister) -> Result<(), PersistError> {
        let Some(bytes) = persister.get(PERSIST_KEY)? else {
            return Ok(());
        };
        let records: Vec<TransactionRecord> =
            serde_json::from_slice(&bytes).map_err(|e| PersistError::Backend(e.to_string()))?;
        self.by_name.clear();
        for record in records {
            self.add(record);
        }
        Ok(())
    }
}
