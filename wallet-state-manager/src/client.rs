use wallet_core::{Bytes32, Coin, CoinState};

use crate::error::Error;

/// The network collaborator the projection engine pulls data from and
/// pushes subscriptions to. Block validation, peer selection, and the
/// wire protocol live elsewhere, but the engine needs a seam to call
/// through, so this is that seam.
///
/// Puzzle-reveal inspection (extracting a spend's reserved fee) is folded
/// in here too: computing it requires evaluating the coin's CLVM puzzle,
/// which is full-node territory.
pub trait NetworkClient: Send + Sync {
    fn subscribe_to_new_puzzle_hash(&self, puzzle_hashes: &[Bytes32]) -> Result<(), Error>;

    fn subscribe_to_coin_ids_update(&self, coin_ids: &[Bytes32]) -> Result<(), Error>;

    fn get_coin_state(&self, ids: &[Bytes32]) -> Result<Vec<CoinState>, Error>;

    fn fetch_children(&self, parent_coin_name: Bytes32) -> Result<Vec<CoinState>, Error>;

    /// Returns the reserved fee and the full list of children of the spend
    /// of `coin` at `height`. A real implementation fetches the puzzle
    /// reveal and solution and evaluates them; see
    /// [`NetworkClient`] doc comment.
    fn fetch_spend_outcome(&self, height: u32, coin: Coin) -> Result<SpendOutcome, Error>;

    fn get_timestamp_for_height(&self, height: u32) -> Result<u64, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendOutcome {
    pub reserved_fee: u64,
    pub children: Vec<Coin>,
}
