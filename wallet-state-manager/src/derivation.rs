use std::collections::BTreeMap;

use chia_bls::{DerivableKey, PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use wallet_core::{Bytes32, PersistError, Persister, WalletId, WalletType};

use crate::error::Error;

const PERSIST_KEY: &str = "derivation_index";

/// The part of a [`DerivationRecord`] that's worth persisting: `pubkey` is
/// re-derived from `index` on load rather than serialized, since
/// [`DerivationIndex::public_key`] is a pure function of the master key.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord {
    index: u32,
    puzzle_hash: Bytes32,
    wallet_type: WalletType,
    wallet_id: WalletId,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedWallet {
    wallet_id: WalletId,
    last_used: Option<u32>,
    last_generated: Option<u32>,
    records: Vec<PersistedRecord>,
}

/// One derived address: `index -> (pubkey, puzzle_hash)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationRecord {
    pub index: u32,
    pub puzzle_hash: Bytes32,
    pub pubkey: PublicKey,
    pub wallet_type: WalletType,
    pub wallet_id: WalletId,
}

#[derive(Debug, Clone, Default)]
struct WalletDerivationState {
    records: BTreeMap<u32, DerivationRecord>,
    last_used: Option<u32>,
    last_generated: Option<u32>,
}

/// Deterministic `index -> (pubkey, puzzle_hash)` mapping from a master
/// secret key, with per-wallet `last_used`/`last_generated` pointers.
///
/// `last_used` only ever advances and never exceeds `last_generated`;
/// both are persisted per wallet id.
pub struct DerivationIndex {
    master_sk: SecretKey,
    by_wallet: BTreeMap<WalletId, WalletDerivationState>,
    by_puzzle_hash: BTreeMap<Bytes32, (WalletId, u32)>,
}

impl DerivationIndex {
    pub fn new(master_sk: SecretKey) -> Self {
        Self {
            master_sk,
            by_wallet: BTreeMap::new(),
            by_puzzle_hash: BTreeMap::new(),
        }
    }

    /// Deterministic public key at `index`, derived unhardened from the
    /// master secret. Pure: calling this twice with the same index always
    /// returns the same key.
    pub fn public_key(&self, index: u32) -> PublicKey {
        self.master_sk.derive_unhardened(index).public_key()
    }

    /// Dense range of indices currently generated for `wallet_id`.
    pub fn last_generated_for(&self, wallet_id: WalletId) -> Option<u32> {
        self.by_wallet.get(&wallet_id).and_then(|s| s.last_generated)
    }

    pub fn last_used_for(&self, wallet_id: WalletId) -> Option<u32> {
        self.by_wallet.get(&wallet_id).and_then(|s| s.last_used)
    }

    /// Insert a dense range of derivation records. `records` must be
    /// contiguous and start right after the wallet's current
    /// `last_generated` (the caller, `create_more_puzzle_hashes`,
    /// guarantees this).
    pub fn add_derivation_paths(&mut self, records: Vec<DerivationRecord>) {
        for record in records {
            let state = self.by_wallet.entry(record.wallet_id).or_default();
            state.last_generated = Some(
                state
                    .last_generated
                    .map_or(record.index, |prev| prev.max(record.index)),
            );
            self.by_puzzle_hash
                .insert(record.puzzle_hash, (record.wallet_id, record.index));
            state.records.insert(record.index, record);
        }
    }

    /// Monotone: never lets `last_used` move backwards.
    pub fn set_used_up_to(&mut self, wallet_id: WalletId, index: u32) {
        let state = self.by_wallet.entry(wallet_id).or_default();
        state.last_used = Some(state.last_used.map_or(index, |prev| prev.max(index)));
    }

    /// Lowest generated index greater than `last_used` for `wallet_id`.
    pub fn get_unused_derivation_path(&self, wallet_id: WalletId) -> Option<u32> {
        let state = self.by_wallet.get(&wallet_id)?;
        let floor = state.last_used.map_or(0, |u| u + 1);
        state
            .records
            .range(floor..)
            .next()
            .map(|(index, _)| *index)
    }

    pub fn index_for_puzzle_hash(&self, puzzle_hash: &Bytes32) -> Option<u32> {
        self.by_puzzle_hash.get(puzzle_hash).map(|(_, index)| *index)
    }

    pub fn wallet_info_for_puzzle_hash(
        &self,
        puzzle_hash: &Bytes32,
    ) -> Option<(WalletId, WalletType)> {
        let (wallet_id, index) = self.by_puzzle_hash.get(puzzle_hash)?;
        let record = self.by_wallet.get(wallet_id)?.records.get(index)?;
        Some((*wallet_id, record.wallet_type))
    }

    pub fn get_keys(&self, puzzle_hash: &Bytes32) -> Result<&DerivationRecord, Error> {
        let (wallet_id, index) = self
            .by_puzzle_hash
            .get(puzzle_hash)
            .ok_or_else(|| Error::NoKeyForPuzzleHash(hex_of(puzzle_hash)))?;
        self.by_wallet
            .get(wallet_id)
            .and_then(|s| s.records.get(index))
            .ok_or_else(|| Error::NoKeyForPuzzleHash(hex_of(puzzle_hash)))
    }

    /// Persists `last_used`/`last_generated` and every derived puzzle hash
    /// per wallet id. Public keys themselves aren't serialized.
    pub fn save(&self, persister: &dyn Persister) -> Result<(), PersistError> {
        let snapshot: Vec<PersistedWallet> = self
            .by_wallet
            .iter()
            .map(|(wallet_id, state)| PersistedWallet {
                wallet_id: *wallet_id,
                last_used: state.last_used,
                last_generated: state.last_generated,
                records: state
                    .records
                    .values()
                    .map(|r| PersistedRecord {
                        index: r.index,
                        puzzle_hash: r.puzzle_hash,
                        wallet_type: r.wallet_type,
                        wallet_id: r.wallet_id,
                    })
                    .collect(),
            })
            .collect();
        let bytes = serde_json::to_vec(&snapshot).map_err(|e| PersistError::Backend(e.to_string()))?;
        persister.put(PERSIST_KEY, &bytes)
    }

    /// Rehydrates every wallet's derivation state, re-deriving each
    /// `pubkey` from its index rather than reading a serialized one.
    pub fn load(&mut self, persister: &dyn Persister) -> Result<(), PersistError> {
        let Some(bytes) = persister.get(PERSIST_KEY)? else {
            return Ok(());
        };
        let snapshot: Vec<PersistedWallet> =
            serde_json::from_slice(&bytes).map_err(|e| PersistError::Backend(e.to_string()))?;

        self.by_wallet.clear();
        self.by_puzzle_hash.clear();
        for pw in snapshot {
            let mut state = WalletDerivationState {
                records: BTreeMap::new(),
                last_used: pw.last_used,
                last_generated: pw.last_generated,
            };
            for pr in pw.records {
                let pubkey = self.public_key(pr.index);
                let record = DerivationRecord {
                    index: pr.index,
                    puzzle_hash: pr.puzzle_hash,
                    pubkey,
                    wallet_type: pr.wallet_type,
                    wallet_id: pr.wallet_id,
                };
                self.by_puzzle_hash.insert(pr.puzzle_hash, (pw.wallet_id, pr.index));
                state.records.insert(pr.index, record);
            }
            self.by_wallet.insert(pw.wallet_id, state);
        }
        Ok(())
    }
}

fn hex_of(b: &Bytes32) -> String {
    b.as_ref()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
