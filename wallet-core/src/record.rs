use chia_protocol::{Bytes32, Coin};
use serde::{Deserialize, Serialize};

/// Identifies one of the wallets held by the registry.
pub type WalletId = u32;

/// The kind of wallet a coin/derivation record belongs to.
///
/// A tagged variant rather than a class hierarchy: each wallet kind
/// implements only the capabilities it needs, via a small capability
/// trait in the wallet projection engine crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletType {
    Standard,
    ColouredCoin,
    RateLimited,
    DistributedId,
    Pooling,
}

/// A coin the wallet has observed belonging to one of its puzzle hashes,
/// as it sits in the Coin Ledger.
///
/// Invariant: `spent_height == 0 || spent_height >= confirmed_height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCoinRecord {
    pub coin: Coin,
    pub confirmed_height: u32,
    /// `0` means unspent.
    pub spent_height: u32,
    pub coinbase: bool,
    pub is_farm_reward: bool,
    pub wallet_type: WalletType,
    pub wallet_id: WalletId,
}

impl WalletCoinRecord {
    pub fn name(&self) -> Bytes32 {
        self.coin.coin_id()
    }

    pub fn is_spent(&self) -> bool {
        self.spent_height != 0
    }

    /// Whether this record currently satisfies the ledger invariant; used
    /// by tests and assertions, never by production control flow.
    pub fn is_valid(&self) -> bool {
        self.spent_height == 0 || self.spent_height >= self.confirmed_height
    }
}
