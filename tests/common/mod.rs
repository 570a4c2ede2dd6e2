// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! In-memory master placing every mapped entry in one process data image.

#![allow(dead_code)]

use ethercat_pdomap::*;
use std::collections::{HashMap, HashSet};

pub type EntryList = Vec<(u16, u8, u8)>;
pub type PdoList = Vec<(u16, EntryList)>;

#[derive(Debug, Clone)]
pub struct Configured {
    pub slave: u16,
    pub id: SlaveId,
    pub syncs: Vec<(u8, SyncDirection, PdoList)>,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub slave: u16,
    pub idx: SdoIdx,
    pub size: usize,
    pub state: RequestState,
    pub writes: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct MockMaster {
    pub pd: Vec<u8>,
    next_bit: usize,
    offsets: HashMap<(u16, PdoEntryIdx), Offset>,
    pub configured: Vec<Configured>,
    pub sdos: HashMap<(u16, SdoIdx), Vec<u8>>,
    pub downloads: Vec<(u16, SdoIdx, Vec<u8>)>,
    pub config_sdos: Vec<(u16, SdoIdx, Vec<u8>)>,
    pub requests: Vec<Request>,
    pub states: HashMap<u16, SlaveConfigState>,
    pub state_errors: HashSet<u16>,
    pub reject_configure: HashSet<u16>,
    /// Lay every slave out from offset 0, as a broken master would.
    pub shared_offsets: bool,
}

fn idx_of(idx: SdoIdx) -> (u16, u8) {
    (u16::from(idx.idx), u8::from(idx.sub_idx))
}

impl MockMaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value a following SDO upload returns.
    pub fn set_sdo(&mut self, slave: u16, idx: u16, sub_idx: u8, data: &[u8]) {
        self.sdos.insert((slave, SdoIdx::new(idx, sub_idx)), data.to_vec());
    }

    pub fn set_operational(&mut self, slave: u16, operational: bool) {
        let al_state = if operational { AlState::Op } else { AlState::Preop };
        self.states.insert(
            slave,
            SlaveConfigState {
                online: true,
                operational,
                al_state,
            },
        );
    }

    pub fn offset(&self, slave: u16, idx: u16, sub_idx: u8) -> Offset {
        self.offsets[&(slave, PdoEntryIdx::new(idx, sub_idx))]
    }

    pub fn downloads_to(&self, slave: u16) -> Vec<(u16, u8, Vec<u8>)> {
        self.downloads
            .iter()
            .filter(|(s, _, _)| *s == slave)
            .map(|(_, idx, data)| {
                let (i, s) = idx_of(*idx);
                (i, s, data.clone())
            })
            .collect()
    }

    /// The most recently created request for `idx`.
    pub fn request(&self, slave: u16, idx: u16, sub_idx: u8) -> &Request {
        self.requests
            .iter()
            .rev()
            .find(|r| r.slave == slave && r.idx == SdoIdx::new(idx, sub_idx))
            .unwrap()
    }

    /// Finishes all requests in flight.
    pub fn complete_requests(&mut self) {
        for r in &mut self.requests {
            if r.state == RequestState::Busy {
                r.state = RequestState::Success;
            }
        }
    }

    pub fn configured(&self, slave: u16) -> &Configured {
        self.configured.iter().find(|c| c.slave == slave).unwrap()
    }
}

impl BusMaster for MockMaster {
    fn sdo_upload(&mut self, slave: SlavePos, idx: SdoIdx, target: &mut [u8]) -> Result<usize> {
        let data = self
            .sdos
            .get(&(u16::from(slave), idx))
            .ok_or(Error::SdoUpload {
                idx,
                abort_code: 0x0602_0000,
            })?;
        let n = data.len().min(target.len());
        target[..n].copy_from_slice(&data[..n]);
        Ok(data.len())
    }

    fn sdo_download(&mut self, slave: SlavePos, idx: SdoIdx, data: &[u8]) -> Result<()> {
        self.downloads.push((u16::from(slave), idx, data.to_vec()));
        self.sdos.insert((u16::from(slave), idx), data.to_vec());
        Ok(())
    }

    fn add_config_sdo(&mut self, slave: SlavePos, idx: SdoIdx, data: &[u8]) -> Result<()> {
        self.config_sdos.push((u16::from(slave), idx, data.to_vec()));
        Ok(())
    }

    fn configure_slave(&mut self, slave: SlavePos, id: SlaveId, syncs: &[SyncInfo]) -> Result<()> {
        let pos = u16::from(slave);
        if self.reject_configure.contains(&pos) {
            return Err(Error::Master(format!("slave {} did not accept its configuration", pos)));
        }
        assert!(syncs.last().map_or(false, |s| s.is_end()), "sync list is not terminated");
        if self.shared_offsets {
            self.next_bit = 0;
        }
        let mut layout = Vec::new();
        for sync in syncs.iter().take_while(|s| !s.is_end()) {
            let mut pdos = Vec::new();
            for pdo in sync.pdos {
                let mut entries = Vec::new();
                for e in pdo.entries {
                    let offset = Offset {
                        byte: self.next_bit / 8,
                        bit: (self.next_bit % 8) as u32,
                    };
                    self.offsets.insert((pos, e.entry_idx), offset);
                    self.next_bit += usize::from(e.bit_len);
                    let idx = e.entry_idx;
                    entries.push((u16::from(idx.idx), u8::from(idx.sub_idx), e.bit_len));
                }
                pdos.push((u16::from(pdo.idx), entries));
            }
            layout.push((u8::from(sync.idx), sync.direction, pdos));
        }
        self.next_bit = (self.next_bit + 7) / 8 * 8;
        let len = self.pd.len().max(self.next_bit / 8);
        self.pd.resize(len, 0);
        self.configured.push(Configured {
            slave: pos,
            id,
            syncs: layout,
        });
        Ok(())
    }

    fn register_pdo_entry(&mut self, slave: SlavePos, entry: PdoEntryIdx) -> Result<Offset> {
        self.offsets
            .get(&(u16::from(slave), entry))
            .copied()
            .ok_or_else(|| Error::Master(format!("{} is not mapped", entry)))
    }

    fn create_sdo_request(
        &mut self,
        slave: SlavePos,
        idx: SdoIdx,
        size: usize,
    ) -> Result<SdoRequestHandle> {
        self.requests.push(Request {
            slave: u16::from(slave),
            idx,
            size,
            state: RequestState::Unused,
            writes: Vec::new(),
        });
        Ok(SdoRequestHandle(self.requests.len() - 1))
    }

    fn sdo_request_state(&mut self, request: SdoRequestHandle) -> RequestState {
        self.requests[request.0].state
    }

    fn sdo_request_write(&mut self, request: SdoRequestHandle, data: &[u8]) {
        let r = &mut self.requests[request.0];
        r.writes.push(data.to_vec());
        r.state = RequestState::Busy;
    }

    fn slave_state(&mut self, slave: SlavePos) -> Result<SlaveConfigState> {
        let pos = u16::from(slave);
        if self.state_errors.contains(&pos) {
            return Err(Error::Master("state query failed".to_string()));
        }
        Ok(self.states.get(&pos).copied().unwrap_or_default())
    }

    fn process_data(&self) -> &[u8] {
        &self.pd
    }

    fn process_data_mut(&mut self) -> &mut [u8] {
        &mut self.pd
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn bus() -> (DeviceRegistry, Bus<MockMaster>) {
    init_logging();
    let registry = DeviceRegistry::with_defaults().unwrap();
    (registry, Bus::new("m0", MockMaster::new()))
}
