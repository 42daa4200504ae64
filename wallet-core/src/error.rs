/// Errors shared across the wallet projection and singleton history engines.
///
/// One flat, `#[from]`-heavy enum rather than a separate error type per
/// module.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("no key for puzzle hash {0}")]
    NoKeyForPuzzleHash(String),

    #[error("unknown wallet id {0}")]
    UnknownWallet(u32),

    #[error(transparent)]
    Persist(#[from] crate::persist::PersistError),
}
