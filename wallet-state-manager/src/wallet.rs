use std::collections::BTreeMap;

use wallet_core::{Bytes32, PublicKey, WalletId, WalletType};

/// Capabilities a wallet kind may expose to the projection engine: a
/// tagged variant plus a narrow capability trait instead of a class
/// hierarchy.
pub trait WalletCapability: Send + Sync {
    fn wallet_type(&self) -> WalletType;
    fn wallet_id(&self) -> WalletId;

    /// Tree-hash of the puzzle this wallet kind would lock a coin with for
    /// `pubkey`. The exact puzzle/CLVM construction is full-node
    /// territory; implementors provide it.
    fn puzzle_hash_for_pubkey(&self, pubkey: &PublicKey) -> Bytes32;

    /// Called when a coin confirmed as belonging to this wallet is added
    /// to the ledger. Most wallet kinds don't need to react; default is a
    /// no-op.
    fn coin_added(&mut self, _coin_name: Bytes32, _height: u32) {}

    /// Roll this wallet's private state back to `height`. Returning `true`
    /// tells the registry this wallet no longer has a reason to exist and
    /// should be deleted. Pool wallets are the only kind that currently
    /// implements this.
    fn rewind(&mut self, _height: u32) -> bool {
        false
    }

    /// Whether `create_more_puzzle_hashes` should run for this wallet.
    /// Pooling wallets are skipped.
    fn wants_derivation(&self) -> bool {
        true
    }

    /// Rate-limited wallets only ever generate a single derivation, at the
    /// index of their one RL pubkey.
    fn single_derivation_index(&self) -> Option<u32> {
        None
    }
}

/// A standard (non-CAT, non-RL, non-DID, non-pool) wallet.
pub struct StandardWallet {
    pub id: WalletId,
}

impl WalletCapability for StandardWallet {
    fn wallet_type(&self) -> WalletType {
        WalletType::Standard
    }

    fn wallet_id(&self) -> WalletId {
        self.id
    }

    fn puzzle_hash_for_pubkey(&self, pubkey: &PublicKey) -> Bytes32 {
        standard_puzzle_hash(pubkey)
    }
}

/// A coloured-coin (CAT) wallet; derivation behaves like a standard wallet
/// from the projection engine's point of view.
pub struct ColouredCoinWallet {
    pub id: WalletId,
}

impl WalletCapability for ColouredCoinWallet {
    fn wallet_type(&self) -> WalletType {
        WalletType::ColouredCoin
    }

    fn wallet_id(&self) -> WalletId {
        self.id
    }

    fn puzzle_hash_for_pubkey(&self, pubkey: &PublicKey) -> Bytes32 {
        standard_puzzle_hash(pubkey)
    }
}

/// A rate-limited wallet: generates exactly one derivation, at its RL
/// pubkey's fixed index.
pub struct RateLimitedWallet {
    pub id: WalletId,
    pub rl_index: u32,
}

impl WalletCapability for RateLimitedWallet {
    fn wallet_type(&self) -> WalletType {
        WalletType::RateLimited
    }

    fn wallet_id(&self) -> WalletId {
        self.id
    }

    fn puzzle_hash_for_pubkey(&self, pubkey: &PublicKey) -> Bytes32 {
        standard_puzzle_hash(pubkey)
    }

    fn single_derivation_index(&self) -> Option<u32> {
        Some(self.rl_index)
    }
}

/// A distributed-id wallet.
pub struct DistributedIdWallet {
    pub id: WalletId,
}

impl WalletCapability for DistributedIdWallet {
    fn wallet_type(&self) -> WalletType {
        WalletType::DistributedId
    }

    fn wallet_id(&self) -> WalletId {
        self.id
    }

    fn puzzle_hash_for_pubkey(&self, pubkey: &PublicKey) -> Bytes32 {
        standard_puzzle_hash(pubkey)
    }
}

/// A pool-member wallet: skipped by derivation expansion, and supports
/// `rewind` so `reorg_rollback` can tear it down if the pooling
/// relationship itself gets reorged out.
pub struct PoolingWallet {
    pub id: WalletId,
    pub joined_at_height: u32,
}

impl WalletCapability for PoolingWallet {
    fn wallet_type(&self) -> WalletType {
        WalletType::Pooling
    }

    fn wallet_id(&self) -> WalletId {
        self.id
    }

    fn puzzle_hash_for_pubkey(&self, pubkey: &PublicKey) -> Bytes32 {
        standard_puzzle_hash(pubkey)
    }

    fn rewind(&mut self, height: u32) -> bool {
        self.joined_at_height > height
    }

    fn wants_derivation(&self) -> bool {
        false
    }
}

fn standard_puzzle_hash(pubkey: &PublicKey) -> Bytes32 {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"standard-puzzle");
    hasher.update(pubkey.to_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    Bytes32::from(digest)
}

/// The map of `wallet_id -> Wallet`, loaded at startup and extended by
/// `add_new_wallet`.
#[derive(Default)]
pub struct WalletRegistry {
    wallets: BTreeMap<WalletId, Box<dyn WalletCapability>>,
    next_id: WalletId,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self {
            wallets: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn add_new_wallet(&mut self, make: impl FnOnce(WalletId) -> Box<dyn WalletCapability>) -> WalletId {
        let id = self.next_id;
        self.next_id += 1;
        self.wallets.insert(id, make(id));
        id
    }

    pub fn get(&self, wallet_id: WalletId) -> Option<&dyn WalletCapability> {
        self.wallets.get(&wallet_id).map(|w| w.as_ref())
    }

    pub fn get_mut(&mut self, wallet_id: WalletId) -> Option<&mut (dyn WalletCapability + 'static)> {
        self.wallets.get_mut(&wallet_id).map(|w| w.as_mut())
    }

    pub fn ids(&self) -> impl Iterator<Item = WalletId> + '_ {
        self.wallets.keys().copied()
    }

    pub fn remove(&mut self, wallet_id: WalletId) {
        self.wallets.remove(&wallet_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_core::SecretKey;
    use chia_bls::DerivableKey;

    #[test]
    fn standard_puzzle_hash_is_deterministic() {
        let sk = SecretKey::from_seed(&[1u8; 32]);
        let pk = sk.public_key();
        assert_eq!(standard_puzzle_hash(&pk), standard_puzzle_hash(&pk));
    }

    #[test]
    fn registry_assigns_increasing_ids() {
        let mut registry = WalletRegistry::new();
        let a = registry.add_new_wallet(|id| Box::new(StandardWallet { id }));
        let b = registry.add_new_wallet(|id| Box::new(StandardWallet { id }));
        assert_ne!(a, b);
        assert!(registry.get(a).is_some());
    }
}
