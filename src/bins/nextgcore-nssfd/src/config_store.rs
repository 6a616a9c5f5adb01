//! Slice configuration store
//!
//! Holds the supported PLMN list and the per-PLMN S-NSSAI mapping. Readers
//! take snapshots; writers go through [`ConfigStore::update`] so that any
//! side effect of a write (such as publishing a PLMN change) happens while
//! the write lock is held.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ogs_sbi::{PlmnId, Snssai};

/// PLMN -> supported S-NSSAIs
pub type SupportedNssaiInPlmn = HashMap<PlmnId, HashSet<Snssai>>;

/// Slice configuration as seen by the rest of the NSSF
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NssaiConfig {
    pub supported_plmn_list: Vec<PlmnId>,
    pub supported_nssai_in_plmn: SupportedNssaiInPlmn,
}

/// Reader/writer-locked slice configuration
#[derive(Debug, Default)]
pub struct ConfigStore {
    config: RwLock<NssaiConfig>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an initial configuration
    pub fn with_config(config: NssaiConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, NssaiConfig> {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, NssaiConfig> {
        self.config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Full copy of the current configuration
    pub fn snapshot(&self) -> NssaiConfig {
        self.read().clone()
    }

    pub fn supported_plmn_list(&self) -> Vec<PlmnId> {
        self.read().supported_plmn_list.clone()
    }

    pub fn supported_nssai_in_plmn(&self) -> SupportedNssaiInPlmn {
        self.read().supported_nssai_in_plmn.clone()
    }

    pub fn is_plmn_supported(&self, plmn_id: &PlmnId) -> bool {
        self.read().supported_plmn_list.contains(plmn_id)
    }

    /// Whether `snssai` may be served in `plmn_id`.
    ///
    /// Standardized slices (SST 1..=3 without SD) are accepted in any PLMN.
    pub fn is_snssai_supported_in_plmn(&self, snssai: &Snssai, plmn_id: &PlmnId) -> bool {
        if snssai.is_standard() {
            return true;
        }
        self.read()
            .supported_nssai_in_plmn
            .get(plmn_id)
            .map(|set| set.contains(snssai))
            .unwrap_or(false)
    }

    /// Mutate the configuration under the write lock
    pub fn update<R>(&self, f: impl FnOnce(&mut NssaiConfig) -> R) -> R {
        let mut guard = self.write();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plmn() -> PlmnId {
        PlmnId::new("208", "93")
    }

    fn seeded() -> ConfigStore {
        let mut nssai = SupportedNssaiInPlmn::new();
        nssai.insert(
            plmn(),
            HashSet::from([Snssai::new(1, "010203"), Snssai::new(5, "")]),
        );
        ConfigStore::with_config(NssaiConfig {
            supported_plmn_list: vec![plmn()],
            supported_nssai_in_plmn: nssai,
        })
    }

    #[test]
    fn test_empty_store() {
        let store = ConfigStore::new();
        assert!(store.supported_plmn_list().is_empty());
        assert!(store.supported_nssai_in_plmn().is_empty());
        assert!(!store.is_plmn_supported(&plmn()));
    }

    #[test]
    fn test_is_snssai_supported_in_plmn() {
        let store = seeded();
        let other = PlmnId::new("001", "01");

        assert!(store.is_snssai_supported_in_plmn(&Snssai::new(1, "010203"), &plmn()));
        assert!(store.is_snssai_supported_in_plmn(&Snssai::new(5, ""), &plmn()));
        assert!(!store.is_snssai_supported_in_plmn(&Snssai::new(1, "010203"), &other));
        assert!(!store.is_snssai_supported_in_plmn(&Snssai::new(4, "ffffff"), &plmn()));

        // standardized slice accepted everywhere
        assert!(store.is_snssai_supported_in_plmn(&Snssai::new(2, ""), &other));
    }

    #[test]
    fn test_update_returns_closure_result() {
        let store = seeded();
        let removed = store.update(|cfg| {
            cfg.supported_nssai_in_plmn.clear();
            cfg.supported_plmn_list.pop()
        });

        assert_eq!(removed, Some(plmn()));
        assert_eq!(store.snapshot(), NssaiConfig::default());
    }

    #[test]
    fn test_concurrent_readers_see_whole_writes() {
        let store = std::sync::Arc::new(seeded());
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..100u8 {
                    store.update(|cfg| {
                        let p = PlmnId::new("001", format!("{:02}", i % 10));
                        cfg.supported_plmn_list = vec![p.clone()];
                        cfg.supported_nssai_in_plmn =
                            HashMap::from([(p, HashSet::from([Snssai::new(1, "")]))]);
                    });
                }
            })
        };

        for _ in 0..100 {
            let snapshot = store.snapshot();
            for key in snapshot.supported_nssai_in_plmn.keys() {
                assert!(snapshot.supported_plmn_list.contains(key));
            }
        }
        writer.join().unwrap();
    }
}
