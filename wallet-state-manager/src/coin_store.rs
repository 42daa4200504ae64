use std::collections::BTreeMap;

use wallet_core::{Bytes32, PersistError, Persister, WalletCoinRecord, WalletId};

const PERSIST_KEY: &str = "coin_store";

/// Append-only table of [`WalletCoinRecord`]s, mutated only to set
/// `spent_height`, and rolled back only by height.
#[derive(Debug, Default)]
pub struct CoinStore {
    by_name: BTreeMap<Bytes32, WalletCoinRecord>,
}

impl CoinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: WalletCoinRecord) {
        self.by_name.insert(record.name(), record);
    }

    pub fn set_spent(&mut self, name: &Bytes32, height: u32) {
        if let Some(record) = self.by_name.get_mut(name) {
            record.spent_height = height;
        }
    }

    pub fn get_by_name(&self, name: &Bytes32) -> Option<&WalletCoinRecord> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &Bytes32) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn remove(&mut self, name: &Bytes32) {
        self.by_name.remove(name);
    }

    pub fn get_unspent_for_wallet(&self, wallet_id: WalletId) -> Vec<&WalletCoinRecord> {
        self.by_name
            .values()
            .filter(|r| r.wallet_id == wallet_id && !r.is_spent())
            .collect()
    }

    pub fn all_for_wallet(&self, wallet_id: WalletId) -> Vec<&WalletCoinRecord> {
        self.by_name
            .values()
            .filter(|r| r.wallet_id == wallet_id)
            .collect()
    }

    /// Delete every record with `confirmed_height > h`; clear `spent_height`
    /// on every remaining record with `spent_height > h`.
    pub fn rollback_to_block(&mut self, h: u32) {
        self.by_name.retain(|_, r| r.confirmed_height <= h);
        for record in self.by_name.values_mut() {
            if record.spent_height > h {
                record.spent_height = 0;
            }
        }
    }

    pub fn confirmed_balance(&self, wallet_id: WalletId) -> u64 {
        self.get_unspent_for_wallet(wallet_id)
            .iter()
            .map(|r| r.coin.amount)
            .sum()
    }

    /// Writes every record as one JSON blob under a single key, matching
    /// how the derivation index and transaction store persist themselves.
    pub fn save(&self, persister: &dyn Persister) -> Result<(), PersistError> {
        let records: Vec<&WalletCoinRecord> = self.by_name.values().collect();
        let bytes = serde_json::to_vec(&records).map_err(|e| PersistError::Backend(e.to_string()))?;
        persister.put(PERSIST_KEY, &bytes)
    }

    /// Replaces the in-memory table with whatever was last saved, if
    /// anything. A no-op when the key is absent (fresh persister).
    pub fn load(&mut self, persister: &dyn Persister) -> Result<(), PersistError> {
        let Some(bytes) = persister.get(PERSIST_KEY)? else {
            return Ok(());
        };
        let records: Vec<WalletCoinRecord> =
            serde_json::from_slice(&bytes).map_err(|e| PersistError::Backend(e.to_string()))?;
        self.by_name.clear();
        for record in records {
            self.add(record);
        }
        Ok(())
    }
}
