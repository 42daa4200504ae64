use wallet_core::Bytes32;

/// Error kinds raised by [`crate::store::SingletonStore`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("new state's parent {new_parent} does not match latest state {latest_name} for launcher {launcher_id}")]
    NotChildOfLatest {
        launcher_id: Bytes32,
        latest_name: Bytes32,
        new_parent: Bytes32,
    },

    #[error("a state named {0} already exists for this singleton")]
    AlreadyExists(Bytes32),
}
