use chia_protocol::Bytes32;
use sha2::{Digest, Sha256};

/// Inclusive window (in blocks) a coin's `created_height` is checked against
/// when looking for a matching coinbase/fee-reward parent id: exactly 30
/// heights, ending at and including `created_height`.
pub const REWARD_SEARCH_WINDOW: u32 = 30;

/// Deterministic parent id of the pool (coinbase) reward coin created at
/// `height` for the chain identified by `genesis_challenge`.
///
/// The full-node consensus rules that derive this id from a block's
/// proof-of-space are block-validation territory and live outside this
/// crate; this is a documented stand-in with the same shape (a
/// deterministic function of height and genesis) used purely so the
/// projection engine can recognize reward coins in synthetic and test
/// data.
pub fn pool_parent_id(height: u32, genesis_challenge: Bytes32) -> Bytes32 {
    reward_parent_id(b"pool", height, genesis_challenge)
}

/// Deterministic parent id of the farmer (fee) reward coin created at
/// `height`. See [`pool_parent_id`] for the scope caveat.
pub fn farmer_parent_id(height: u32, genesis_challenge: Bytes32) -> Bytes32 {
    reward_parent_id(b"farmer", height, genesis_challenge)
}

fn reward_parent_id(tag: &[u8], height: u32, genesis_challenge: Bytes32) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(height.to_be_bytes());
    hasher.update(genesis_challenge.as_ref());
    let digest: [u8; 32] = hasher.finalize().into();
    Bytes32::from(digest)
}

/// Does `created_height` fall within the reward-detection window ending at
/// `created_height` (i.e. did the coin's parent appear in
/// `[created_height - 29, created_height]`)?
///
/// Returns the first height in the window (walked from the newest) whose
/// reward parent id matches `parent_coin_info`, for either pool or farmer
/// rewards, or `None` if neither matches anywhere in the window.
pub fn detect_reward_parent(
    parent_coin_info: Bytes32,
    created_height: u32,
    genesis_challenge: Bytes32,
) -> Option<RewardKind> {
    let start = created_height.saturating_sub(REWARD_SEARCH_WINDOW - 1);
    for h in (start..=created_height).rev() {
        if pool_parent_id(h, genesis_challenge) == parent_coin_info {
            return Some(RewardKind::Pool);
        }
        if farmer_parent_id(h, genesis_challenge) == parent_coin_info {
            return Some(RewardKind::Farmer);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    Pool,
    Farmer,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis() -> Bytes32 {
        Bytes32::from([7u8; 32])
    }

    #[test]
    fn detects_pool_reward_at_exact_height() {
        let parent = pool_parent_id(100, genesis());
        assert_eq!(
            detect_reward_parent(parent, 100, genesis()),
            Some(RewardKind::Pool)
        );
    }

    #[test]
    fn detects_farmer_reward_within_window() {
        let parent = farmer_parent_id(80, genesis());
        // created at height 100, window is [71, 100], 80 is inside it.
        assert_eq!(
            detect_reward_parent(parent, 100, genesis()),
            Some(RewardKind::Farmer)
        );
    }

    #[test]
    fn rejects_outside_window() {
        let parent = farmer_parent_id(69, genesis());
        // window for created_height=100 is [71, 100]; 69 is outside it.
        assert_eq!(detect_reward_parent(parent, 100, genesis()), None);
    }

    #[test]
    fn window_is_exactly_thirty_heights() {
        let start_parent = farmer_parent_id(71, genesis());
        assert_eq!(
            detect_reward_parent(start_parent, 100, genesis()),
            Some(RewardKind::Farmer)
        );
        let before_start = farmer_parent_id(70, genesis());
        assert_eq!(detect_reward_parent(before_start, 100, genesis()), None);
    }

    #[test]
    fn unrelated_parent_is_not_a_reward() {
        let parent = Bytes32::from([9u8; 32]);
        assert_eq!(detect_reward_parent(parent, 100, genesis()), None);
    }
}
