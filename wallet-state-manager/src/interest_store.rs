use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use wallet_core::{Bytes32, PersistError, Persister, WalletId};

const PERSIST_KEY: &str = "interest_store";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedInterestStore {
    puzzle_hashes: Vec<(Bytes32, WalletId)>,
    coin_ids: Vec<(Bytes32, WalletId)>,
}

/// Puzzle hashes and coin ids the wallet wants the network layer to push
/// `CoinState` updates for.
///
/// Membership here is never rolled back on reorg: once a puzzle hash has
/// been derived it stays subscribed.
#[derive(Debug, Default)]
pub struct InterestStore {
    puzzle_hashes: HashMap<Bytes32, WalletId>,
    coin_ids: HashMap<Bytes32, WalletId>,
}

impl InterestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_puzzle_hash(&mut self, puzzle_hash: Bytes32, wallet_id: WalletId) {
        self.puzzle_hashes.insert(puzzle_hash, wallet_id);
    }

    pub fn add_coin_id(&mut self, coin_id: Bytes32, wallet_id: WalletId) {
        self.coin_ids.insert(coin_id, wallet_id);
    }

    pub fn lookup_puzzle_hash(&self, puzzle_hash: &Bytes32) -> Option<WalletId> {
        self.puzzle_hashes.get(puzzle_hash).copied()
    }

    pub fn lookup_coin_id(&self, coin_id: &Bytes32) -> Option<WalletId> {
        self.coin_ids.get(coin_id).copied()
    }

    pub fn puzzle_hashes_for(&self, wallet_id: WalletId) -> HashSet<Bytes32> {
        self.puzzle_hashes
            .iter()
            .filter(|(_, w)| **w == wallet_id)
            .map(|(ph, _)| *ph)
            .collect()
    }

    /// Interest-set membership is never rolled back, so persisting it is
    /// a plain snapshot with no height bookkeeping.
    pub fn save(&self, persister: &dyn Persister) -> Result<(), PersistError> {
        let snapshot = PersistedInterestStore {
            puzzle_hashes: self.puzzle_hashes.iter().map(|(ph, w)| (*ph, *w)).collect(),
            coin_ids: self.coin_ids.iter().map(|(id, w)| (*id, *w)).collect(),
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(|e| PersistError::Backend(e.to_string()))?;
        persister.put(PERSIST_KEY, &bytes)
    }

    pub fn load(&mut self, persister: &dyn Persister) -> Result<(), PersistError> {
        let Some(bytes) = persister.get(PERSIST_KEY)? else {
            return Ok(());
        };
        let snapshot: PersistedInterestStore =
            serde_json::from_slice(&bytes).map_err(|e| PersistError::Backend(e.to_string()))?;
        self.puzzle_hashes = snapshot.puzzle_hashes.into_iter().collect();
        self.coin_ids = snapshot.coin_ids.into_iter().collect();
        Ok(())
    }
}
