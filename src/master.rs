// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

use crate::types::*;

/// Handle of an asynchronous SDO request created by a [BusMaster].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SdoRequestHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Unused,
    Busy,
    Success,
    Error,
}

/// The fieldbus master performing the wire-level exchange.
///
/// Configuration-time calls may block and fail. The cyclic calls
/// (`process_data*`, `sdo_request_*`, `slave_state`) must return at once.
pub trait BusMaster {
    /// Blocking SDO upload; returns the number of bytes received.
    fn sdo_upload(&mut self, slave: SlavePos, idx: SdoIdx, target: &mut [u8]) -> Result<usize>;

    /// Blocking SDO download, acknowledged by the slave.
    fn sdo_download(&mut self, slave: SlavePos, idx: SdoIdx, data: &[u8]) -> Result<()>;

    /// Adds an SDO the master writes whenever it (re)configures the slave.
    fn add_config_sdo(&mut self, slave: SlavePos, idx: SdoIdx, data: &[u8]) -> Result<()>;

    /// Applies a sync manager configuration terminated by [SyncInfo::END].
    fn configure_slave(&mut self, slave: SlavePos, id: SlaveId, syncs: &[SyncInfo]) -> Result<()>;

    /// Location of a mapped PDO entry in the process data.
    fn register_pdo_entry(&mut self, slave: SlavePos, entry: PdoEntryIdx) -> Result<Offset>;

    fn create_sdo_request(
        &mut self,
        slave: SlavePos,
        idx: SdoIdx,
        size: usize,
    ) -> Result<SdoRequestHandle>;

    fn sdo_request_state(&mut self, request: SdoRequestHandle) -> RequestState;

    /// Starts writing `data` through `request`.
    fn sdo_request_write(&mut self, request: SdoRequestHandle, data: &[u8]);

    fn slave_state(&mut self, slave: SlavePos) -> Result<SlaveConfigState>;

    fn process_data(&self) -> &[u8];

    fn process_data_mut(&mut self) -> &mut [u8];
}
