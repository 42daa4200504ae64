use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use wallet_core::Bytes32;

/// A coin observation in a singleton's lineage: just enough to walk the
/// parent chain and order states by height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingletonCoinRecord {
    pub name: Bytes32,
    pub parent_coin_info: Bytes32,
    pub height: u32,
}

/// Per-launcher state: the current tip plus a bounded recency window
/// behind it.
///
/// Invariant: if `recent_history` is non-empty, `last_non_recent_state` is
/// the entry immediately preceding its oldest member; if it's empty,
/// `last_non_recent_state` is the most recent state older than the
/// recency window (or `None` if the singleton has no history yet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingletonInfo {
    pub launcher_id: Bytes32,
    pub latest_state: SingletonCoinRecord,
    pub last_non_recent_state: Option<(u32, Bytes32)>,
    pub recent_history: VecDeque<(u32, Bytes32)>,
}

impl SingletonInfo {
    pub fn bootstrap(launcher_id: Bytes32, state: SingletonCoinRecord) -> Self {
        Self {
            launcher_id,
            latest_state: state,
            last_non_recent_state: None,
            recent_history: VecDeque::new(),
        }
    }

    pub fn is_recent(&self, height: u32, peak_height: u32, max_reorg_size: u32) -> bool {
        height + max_reorg_size >= peak_height
    }
}
