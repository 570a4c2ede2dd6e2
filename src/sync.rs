// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Capacity-bounded construction of sync manager / PDO / PDO entry trees.
//!
//! The three levels live in flat, fixed-capacity arrays. Appends always go
//! to the last sync manager and the last PDO, so every node's children are
//! a contiguous range of the level below and insertion order is wire order.

use crate::types::*;
use heapless::Vec as BoundedVec;

pub const MAX_SYNC_COUNT: usize = 4;
pub const MAX_PDO_INFO_COUNT: usize = 8;
pub const MAX_PDO_ENTRY_COUNT: usize = 32;

#[derive(Debug, Clone, Copy)]
struct SyncNode {
    idx: SmIdx,
    direction: SyncDirection,
    watchdog_mode: WatchdogMode,
    first_pdo: usize,
    n_pdos: usize,
}

#[derive(Debug, Clone, Copy)]
struct PdoNode {
    idx: PdoIdx,
    first_entry: usize,
    n_entries: usize,
}

/// Sync manager configuration of one slave.
#[derive(Debug)]
pub struct Syncs {
    device: String,
    syncs: BoundedVec<SyncNode, MAX_SYNC_COUNT>,
    pdo_infos: BoundedVec<PdoNode, MAX_PDO_INFO_COUNT>,
    pdo_entries: BoundedVec<PdoEntryInfo, MAX_PDO_ENTRY_COUNT>,
    failed: bool,
}

impl Syncs {
    /// Creates an empty configuration; `device` names the slave in diagnostics.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            syncs: BoundedVec::new(),
            pdo_infos: BoundedVec::new(),
            pdo_entries: BoundedVec::new(),
            failed: false,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Drops everything added so far.
    pub fn begin_device(&mut self) {
        self.syncs.clear();
        self.pdo_infos.clear();
        self.pdo_entries.clear();
        self.failed = false;
    }

    /// Appends a sync manager and makes it current. Its index is its position.
    pub fn add_sync(
        &mut self,
        direction: SyncDirection,
        watchdog_mode: WatchdogMode,
    ) -> Result<()> {
        let node = SyncNode {
            idx: SmIdx::from(self.syncs.len() as u8),
            direction,
            watchdog_mode,
            first_pdo: self.pdo_infos.len(),
            n_pdos: 0,
        };
        if self.syncs.push(node).is_err() {
            return Err(self.fail(Error::SyncFull {
                device: self.device.clone(),
                max: MAX_SYNC_COUNT,
            }));
        }
        Ok(())
    }

    /// Appends a PDO to the current sync manager and makes it current.
    pub fn add_pdo_info(&mut self, idx: u16) -> Result<()> {
        if self.syncs.is_empty() {
            return Err(self.fail(Error::NoCurrentSync(self.device.clone())));
        }
        let node = PdoNode {
            idx: PdoIdx::from(idx),
            first_entry: self.pdo_entries.len(),
            n_entries: 0,
        };
        if self.pdo_infos.push(node).is_err() {
            return Err(self.fail(Error::PdoInfoFull {
                device: self.device.clone(),
                max: MAX_PDO_INFO_COUNT,
            }));
        }
        if let Some(sync) = self.syncs.last_mut() {
            sync.n_pdos += 1;
        }
        Ok(())
    }

    /// Appends an entry to the current PDO.
    pub fn add_pdo_entry(&mut self, idx: u16, sub_idx: u8, bit_len: u8) -> Result<()> {
        // A PDO belongs to the current sync only if it was added after it.
        let has_pdo = self.syncs.last().map_or(false, |s| s.n_pdos > 0);
        if !has_pdo {
            return Err(self.fail(Error::NoCurrentPdo(self.device.clone())));
        }
        let entry = PdoEntryInfo {
            entry_idx: PdoEntryIdx::new(idx, sub_idx),
            bit_len,
        };
        if self.pdo_entries.push(entry).is_err() {
            return Err(self.fail(Error::PdoEntryFull {
                device: self.device.clone(),
                max: MAX_PDO_ENTRY_COUNT,
            }));
        }
        if let Some(pdo) = self.pdo_infos.last_mut() {
            pdo.n_entries += 1;
        }
        Ok(())
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.len()
    }

    pub fn pdo_info_count(&self) -> usize {
        self.pdo_infos.len()
    }

    pub fn pdo_entry_count(&self) -> usize {
        self.pdo_entries.len()
    }

    /// Number of entries in the current PDO, 0 if there is none.
    pub fn current_pdo_entry_count(&self) -> usize {
        match self.syncs.last() {
            Some(s) if s.n_pdos > 0 => self.pdo_infos.last().map_or(0, |p| p.n_entries),
            _ => 0,
        }
    }

    /// Index of the most recently added PDO.
    pub fn current_pdo_idx(&self) -> Option<PdoIdx> {
        self.pdo_infos.last().map(|p| p.idx)
    }

    /// PDO indices in insertion order.
    pub fn pdo_indices(&self) -> impl Iterator<Item = PdoIdx> + '_ {
        self.pdo_infos.iter().map(|p| p.idx)
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn entries(&self) -> impl Iterator<Item = &PdoEntryInfo> + '_ {
        self.pdo_entries.iter()
    }

    /// Flattens the tree for the master.
    ///
    /// Fails if any append was rejected, since the configuration would not
    /// describe what the device driver expects.
    pub fn finish(&self) -> Result<SyncTable<'_>> {
        if self.failed {
            log::error!(
                "sync manager configuration for slave {} was rejected earlier, not activating",
                self.device
            );
            return Err(Error::SyncsInvalid(self.device.clone()));
        }
        let pdos = self
            .pdo_infos
            .iter()
            .map(|p| PdoInfo {
                idx: p.idx,
                entries: &self.pdo_entries[p.first_entry..p.first_entry + p.n_entries],
            })
            .collect();
        Ok(SyncTable {
            syncs: &self.syncs,
            pdos,
        })
    }

    fn fail(&mut self, e: Error) -> Error {
        log::error!("{}, not adding more", e);
        self.failed = true;
        e
    }
}

/// Flattened, read-only view of a finished [Syncs].
pub struct SyncTable<'a> {
    syncs: &'a [SyncNode],
    pdos: Vec<PdoInfo<'a>>,
}

impl<'a> SyncTable<'a> {
    /// Sync managers in insertion order followed by [SyncInfo::END].
    pub fn sync_infos(&self) -> Vec<SyncInfo<'_>> {
        self.syncs
            .iter()
            .map(|s| SyncInfo {
                idx: s.idx,
                direction: s.direction,
                watchdog_mode: s.watchdog_mode,
                pdos: &self.pdos[s.first_pdo..s.first_pdo + s.n_pdos],
            })
            .chain(std::iter::once(SyncInfo::END))
            .collect()
    }
}
