use wallet_core::Bytes32;

/// Static configuration for the wallet projection engine.
///
/// Bundles the handful of network-wide constants a wallet needs behind
/// one struct with a `Default` impl.
#[derive(Debug, Clone)]
pub struct WalletStateConfig {
    /// Genesis challenge of the chain this wallet follows; used to
    /// recognize coinbase/fee reward coins.
    pub genesis_challenge: Bytes32,

    /// How many addresses `create_more_puzzle_hashes` keeps generated
    /// ahead of the last used one, for an existing wallet.
    pub initial_num_public_keys: u32,

    /// Same as above, but for a wallet that was just created (a larger
    /// initial batch is generated for brand new wallets).
    pub initial_num_public_keys_new_wallet: u32,

    /// How many puzzle hashes to batch per
    /// `subscribe_to_new_puzzle_hash` call.
    pub subscription_batch_size: usize,

    /// Reorg safety horizon shared with the singleton history engine.
    /// `reorg_rollback` logs a warning when asked to roll back further
    /// behind the current peak than this.
    pub max_reorg_size: u32,
}

impl Default for WalletStateConfig {
    fn default() -> Self {
        Self {
            genesis_challenge: Bytes32::from([0u8; 32]),
            initial_num_public_keys: 50,
            initial_num_public_keys_new_wallet: 425,
            subscription_batch_size: 500,
            max_reorg_size: 100,
        }
    }
}
