//! Reorg-safe wallet coin/transaction projection engine: turns a stream of
//! `CoinState` updates into per-wallet balances and transaction history,
//! and drives derivation-path expansion.

pub mod client;
pub mod coin_store;
pub mod config;
pub mod derivation;
pub mod error;
pub mod events;
pub mod interest_store;
pub mod projection;
pub mod tx_store;
pub mod wallet;

pub use client::{NetworkClient, SpendOutcome};
pub use coin_store::CoinStore;
pub use config::WalletStateConfig;
pub use derivation::{DerivationIndex, DerivationRecord};
pub use error::Error;
pub use events::{Event, EventSink};
pub use interest_store::InterestStore;
pub use projection::{LockedCoinsProvider, NoLockedCoins, SyncState, WalletStateManager};
pub use tx_store::{
    MempoolInclusionStatus, SendRecord, TransactionRecord, TransactionStore, TransactionType,
};
pub use wallet::{
    ColouredCoinWallet, DistributedIdWallet, PoolingWallet, RateLimitedWallet, StandardWallet,
    WalletCapability, WalletRegistry,
};
