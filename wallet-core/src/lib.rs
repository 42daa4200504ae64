//! Shared coin/record primitives for the wallet projection engine and the
//! singleton history engine: the things neither crate owns exclusively.

pub mod error;
pub mod persist;
pub mod record;
pub mod rewards;

pub use chia_bls::{PublicKey, SecretKey};
pub use chia_protocol::{Bytes32, Coin, CoinState};
pub use error::CoreError;
pub use persist::{MemoryPersister, Persister, PersistError};
pub use record::{WalletCoinRecord, WalletId, WalletType};
pub use rewards::{detect_reward_parent, farmer_parent_id, pool_parent_id, RewardKind};
