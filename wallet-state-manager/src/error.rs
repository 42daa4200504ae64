use wallet_core::WalletId;

/// Error kinds raised by the wallet projection engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no key for puzzle hash {0}")]
    NoKeyForPuzzleHash(String),

    #[error("unknown wallet id {0}")]
    UnknownWallet(WalletId),

    #[error("peer unavailable while fetching data for a coin update; dropping it")]
    PeerUnavailable,

    #[error("underlying store failure: {0}")]
    Db(String),

    #[error(transparent)]
    Persist(#[from] wallet_core::PersistError),

    #[error(transparent)]
    Core(#[from] wallet_core::CoreError),
}
