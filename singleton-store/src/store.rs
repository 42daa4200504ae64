use std::collections::HashMap;

use wallet_core::Bytes32;

use crate::error::Error;
use crate::singleton::{SingletonCoinRecord, SingletonInfo};

/// The external coin store the rollback path consults to find a
/// surviving ancestor when a singleton's tip gets reorged out (spec
/// §4.4 `rollback`). Kept as a narrow trait rather than a hard dependency
/// on the wallet projection engine's `CoinStore`, since singletons are
/// not necessarily wallet-owned.
pub trait SingletonCoinLookup {
    fn get(&self, name: &Bytes32) -> Option<SingletonCoinRecord>;
}

/// Per-launcher bounded history with a sliding recency window: one
/// struct holding everything reconstructable from the chain, indexed by
/// the id that identifies the tracked object.
#[derive(Debug)]
pub struct SingletonStore {
    max_reorg_size: u32,
    peak_height: u32,
    by_launcher: HashMap<Bytes32, SingletonInfo>,
}

impl SingletonStore {
    pub fn new(max_reorg_size: u32) -> Self {
        Self {
            max_reorg_size,
            peak_height: 0,
            by_launcher: HashMap::new(),
        }
    }

    pub fn peak_height(&self) -> u32 {
        self.peak_height
    }

    fn is_known_name(info: &SingletonInfo, name: &Bytes32) -> bool {
        info.latest_state.name == *name
            || info.recent_history.iter().any(|(_, n)| n == name)
            || info.last_non_recent_state.is_some_and(|(_, n)| n == *name)
    }

    /// Records a new state transition for `launcher_id`. The first call
    /// for a launcher bootstraps a fresh [`SingletonInfo`] unconditionally;
    /// subsequent calls must chain off the current tip.
    pub fn add_state(&mut self, launcher_id: Bytes32, new_cr: SingletonCoinRecord) -> Result<(), Error> {
        let Some(info) = self.by_launcher.get_mut(&launcher_id) else {
            self.by_launcher
                .insert(launcher_id, SingletonInfo::bootstrap(launcher_id, new_cr));
            return Ok(());
        };

        if new_cr.parent_coin_info != info.latest_state.name {
            return Err(Error::NotChildOfLatest {
                launcher_id,
                latest_name: info.latest_state.name,
                new_parent: new_cr.parent_coin_info,
            });
        }
        if Self::is_known_name(info, &new_cr.name) {
            return Err(Error::AlreadyExists(new_cr.name));
        }

        let prev = info.latest_state;
        if info.is_recent(prev.height, self.peak_height, self.max_reorg_size) {
            info.recent_history.push_back((prev.height, prev.name));
        } else {
            debug_assert!(
                info.recent_history.is_empty(),
                "recent_history must be empty when shelving into last_non_recent_state"
            );
            info.last_non_recent_state = Some((prev.height, prev.name));
        }
        info.latest_state = new_cr;
        Ok(())
    }

    /// Advances the tracked peak and, if `do_prune`, folds every
    /// `recent_history` entry that has fallen out of the window into
    /// `last_non_recent_state`.
    pub fn set_peak_height(&mut self, new_peak: u32, do_prune: bool) {
        self.peak_height = new_peak;
        if do_prune {
            self.prune();
        }
    }

    pub fn prune(&mut self) {
        let cutoff = self.peak_height.saturating_sub(self.max_reorg_size);
        for info in self.by_launcher.values_mut() {
            while let Some(&(h, name)) = info.recent_history.front() {
                if h < cutoff {
                    info.last_non_recent_state = Some((h, name));
                    info.recent_history.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Rolls every tracked singleton back to `target_height`, re-anchoring
    /// `latest_state` by walking the parent chain in `coin_store` when the
    /// current tip no longer survives, and dropping singletons whose
    /// entire lineage was reorged out.
    pub fn rollback(&mut self, target_height: u32, coin_store: &dyn SingletonCoinLookup) {
        let mut to_remove = Vec::new();

        for (launcher_id, info) in self.by_launcher.iter_mut() {
            info.recent_history.retain(|(h, _)| *h <= target_height);

            if info.latest_state.height > target_height {
                let mut cursor = coin_store.get(&info.latest_state.parent_coin_info);
                let mut ancestor = None;
                while let Some(cr) = cursor {
                    if cr.height <= target_height {
                        ancestor = Some(cr);
                        break;
                    }
                    cursor = coin_store.get(&cr.parent_coin_info);
                }
                match ancestor {
                    Some(cr) => {
                        info.recent_history.retain(|(_, name)| *name != cr.name);
                        if info.last_non_recent_state.is_some_and(|(_, name)| name == cr.name) {
                            info.last_non_recent_state = None;
                        }
                        info.latest_state = cr;
                    }
                    None => {
                        to_remove.push(*launcher_id);
                        continue;
                    }
                }
            }

            if info.last_non_recent_state.is_some_and(|(h, _)| h > target_height)
                || (info.recent_history.is_empty() && info.last_non_recent_state.is_none())
            {
                info.last_non_recent_state = coin_store
                    .get(&info.latest_state.parent_coin_info)
                    .filter(|cr| cr.height <= target_height)
                    .map(|cr| (cr.height, cr.name));
            }
        }

        for launcher_id in to_remove {
            log::warn!("singleton {launcher_id} has no surviving ancestor at or below height {target_height}; dropping it");
            self.by_launcher.remove(&launcher_id);
        }
    }

    pub fn remove_singleton(&mut self, launcher_id: &Bytes32) {
        self.by_launcher.remove(launcher_id);
    }

    pub fn get_latest_coin_record_by_launcher_id(&self, launcher_id: &Bytes32) -> Option<SingletonCoinRecord> {
        self.by_launcher.get(launcher_id).map(|info| info.latest_state)
    }

    /// Exposed for property tests verifying the bounded-memory invariant.
    pub fn recent_history_len(&self, launcher_id: &Bytes32) -> Option<usize> {
        self.by_launcher.get(launcher_id).map(|info| info.recent_history.len())
    }

    /// Every name currently tracked for `launcher_id` (tip, recency window,
    /// and the shelved entry behind it). Exposed for tests asserting the
    /// chain has no duplicate or overlapping entries.
    pub fn known_names(&self, launcher_id: &Bytes32) -> Option<Vec<Bytes32>> {
        self.by_launcher.get(launcher_id).map(|info| {
            let mut names = vec![info.latest_state.name];
            names.extend(info.recent_history.iter().map(|(_, name)| *name));
            names.extend(info.last_non_recent_state.map(|(_, name)| name));
            names
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyCoinStore;
    impl SingletonCoinLookup for EmptyCoinStore {
        fn get(&self, _name: &Bytes32) -> Option<SingletonCoinRecord> {
            None
        }
    }

    struct ChainCoinStore {
        by_name: HashMap<Bytes32, SingletonCoinRecord>,
    }
    impl SingletonCoinLookup for ChainCoinStore {
        fn get(&self, name: &Bytes32) -> Option<SingletonCoinRecord> {
            self.by_name.get(name).copied()
        }
    }

    fn rec(name: u8, parent: u8, height: u32) -> SingletonCoinRecord {
        SingletonCoinRecord {
            name: Bytes32::from([name; 32]),
            parent_coin_info: Bytes32::from([parent; 32]),
            height,
        }
    }

    #[test]
    fn bootstrap_then_chain() {
        let mut store = SingletonStore::new(100);
        let launcher = Bytes32::from([0u8; 32]);
        store.add_state(launcher, rec(1, 0, 1)).unwrap();
        assert_eq!(
            store.get_latest_coin_record_by_launcher_id(&launcher),
            Some(rec(1, 0, 1))
        );

        store.add_state(launcher, rec(2, 1, 10)).unwrap();
        assert_eq!(
            store.get_latest_coin_record_by_launcher_id(&launcher),
            Some(rec(2, 1, 10))
        );
        assert_eq!(store.recent_history_len(&launcher), Some(1));
    }

    #[test]
    fn rejects_non_child_parent() {
        let mut store = SingletonStore::new(100);
        let launcher = Bytes32::from([0u8; 32]);
        store.add_state(launcher, rec(1, 0, 1)).unwrap();
        let err = store.add_state(launcher, rec(2, 9, 10)).unwrap_err();
        assert!(matches!(err, Error::NotChildOfLatest { .. }));
    }

    #[test]
    fn rejects_duplicate_name() {
        let mut store = SingletonStore::new(100);
        let launcher = Bytes32::from([0u8; 32]);
        store.add_state(launcher, rec(1, 0, 1)).unwrap();
        store.add_state(launcher, rec(2, 1, 10)).unwrap();
        let err = store.add_state(launcher, rec(1, 0, 20)).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn window_mechanics_from_spec_scenario() {
        let mut store = SingletonStore::new(100);
        let launcher = Bytes32::from([0u8; 32]);
        store.add_state(launcher, rec(1, 0, 1)).unwrap();
        let mut parent = 1u8;
        for (i, h) in (10..=190).step_by(10).enumerate() {
            let name = 2 + i as u8;
            store.add_state(launcher, rec(name, parent, h)).unwrap();
            parent = name;
        }

        store.set_peak_height(200, true);
        let info = store.by_launcher.get(&launcher).unwrap();
        assert_eq!(info.latest_state.height, 190);
        assert!(info.last_non_recent_state.unwrap().0 < 100);
        assert!(info.recent_history.iter().all(|(h, _)| *h >= 100));
    }

    #[test]
    fn rollback_reanchors_to_surviving_ancestor() {
        let mut store = SingletonStore::new(100);
        let launcher = Bytes32::from([0u8; 32]);
        let r1 = rec(1, 0, 1);
        let r2 = rec(2, 1, 50);
        let r3 = rec(3, 2, 150);
        store.add_state(launcher, r1).unwrap();
        store.add_state(launcher, r2).unwrap();
        store.add_state(launcher, r3).unwrap();

        let mut by_name = HashMap::new();
        by_name.insert(r1.name, r1);
        by_name.insert(r2.name, r2);
        let coin_store = ChainCoinStore { by_name };

        store.rollback(100, &coin_store);
        assert_eq!(
            store.get_latest_coin_record_by_launcher_id(&launcher),
            Some(r2)
        );

        let info = store.by_launcher.get(&launcher).unwrap();
        assert!(
            info.recent_history.iter().all(|(_, name)| *name != r2.name),
            "re-anchored ancestor must not remain duplicated in recent_history"
        );
        assert_ne!(info.last_non_recent_state.map(|(_, name)| name), Some(r2.name));
    }

    #[test]
    fn rollback_below_launcher_deletes_singleton() {
        let mut store = SingletonStore::new(100);
        let launcher = Bytes32::from([0u8; 32]);
        store.add_state(launcher, rec(1, 0, 50)).unwrap();

        store.rollback(10, &EmptyCoinStore);
        assert_eq!(store.get_latest_coin_record_by_launcher_id(&launcher), None);
    }
}
