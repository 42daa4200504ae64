use std::sync::mpsc::{Receiver, Sender};

use wallet_core::{Bytes32, WalletId};

/// Named events the engine surfaces, each carrying `(state, wallet_id,
/// data)`. A single typed channel owned by the engine instance, rather
/// than per-puzzle-hash callback maps or module-level mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CoinAdded {
        wallet_id: WalletId,
        coin_name: Bytes32,
    },
    SyncChanged {
        syncing: bool,
        synced_height: u32,
    },
    TxUpdate {
        wallet_id: WalletId,
        tx_name: Bytes32,
    },
    PendingTransaction {
        wallet_id: WalletId,
        tx_name: Bytes32,
    },
}

/// One consumer drains this queue; the engine only ever pushes.
pub struct EventSink {
    sender: Sender<Event>,
}

impl EventSink {
    pub fn new() -> (Self, Receiver<Event>) {
        let (sender, receiver) = std::sync::mpsc::channel();
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: Event) {
        // A disconnected receiver (consumer dropped) is not an engine
        // error; events are best-effort notifications.
        let _ = self.sender.send(event);
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").finish()
    }
}
