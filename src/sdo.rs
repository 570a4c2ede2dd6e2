// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Cyclic writes of unmapped objects through asynchronous SDO requests.

use crate::convert::to_le_bytes;
use crate::master::{BusMaster, RequestState, SdoRequestHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// No request in flight.
    Idle,
    /// A request is in flight.
    Busy,
    /// The last request has succeeded.
    Done,
}

/// Keeps one object in sync with a pin value, with at most one request in flight.
///
/// Only changes are written: the writer starts out assuming the device
/// already holds the value it is created with.
#[derive(Debug)]
pub struct SdoWriter {
    name: String,
    request: SdoRequestHandle,
    bits: u8,
    state: WriterState,
    last: i64,
    pending: i64,
}

impl SdoWriter {
    /// `name` identifies the object in diagnostics, `current` is the value
    /// the device holds now.
    pub fn new(name: impl Into<String>, request: SdoRequestHandle, bits: u8, current: i64) -> Self {
        Self {
            name: name.into(),
            request,
            bits,
            state: WriterState::Idle,
            last: current,
            pending: current,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Value of the last successful request, or the value the writer was
    /// created or reset with.
    pub fn last_written(&self) -> i64 {
        self.last
    }

    /// Takes `current` as the value the device holds now.
    pub fn reset(&mut self, current: i64) {
        self.last = current;
        if self.state == WriterState::Done {
            self.state = WriterState::Idle;
        }
    }

    /// One cycle: collects a finished request, then starts a new one if
    /// `value` differs from what was last written. Never blocks.
    ///
    /// A failed request is retried on the next cycle.
    pub fn write(&mut self, master: &mut dyn BusMaster, value: i64) {
        if self.state == WriterState::Busy {
            match master.sdo_request_state(self.request) {
                RequestState::Busy => return,
                RequestState::Success => {
                    self.last = self.pending;
                    self.state = WriterState::Done;
                }
                state => {
                    log::warn!(
                        "SDO write of {} to {} failed ({:?}), retrying",
                        self.pending,
                        self.name,
                        state
                    );
                    self.state = WriterState::Idle;
                    return;
                }
            }
        }
        if self.last != value {
            self.pending = value;
            master.sdo_request_write(self.request, &to_le_bytes(value, self.bits));
            self.state = WriterState::Busy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    /// Master with one request whose completion the test controls.
    #[derive(Default)]
    struct OneRequest {
        busy: bool,
        fail: bool,
        writes: Vec<Vec<u8>>,
    }

    impl BusMaster for OneRequest {
        fn sdo_upload(&mut self, _: SlavePos, _: SdoIdx, _: &mut [u8]) -> Result<usize> {
            unimplemented!()
        }
        fn sdo_download(&mut self, _: SlavePos, _: SdoIdx, _: &[u8]) -> Result<()> {
            unimplemented!()
        }
        fn add_config_sdo(&mut self, _: SlavePos, _: SdoIdx, _: &[u8]) -> Result<()> {
            unimplemented!()
        }
        fn configure_slave(&mut self, _: SlavePos, _: SlaveId, _: &[SyncInfo]) -> Result<()> {
            unimplemented!()
        }
        fn register_pdo_entry(&mut self, _: SlavePos, _: PdoEntryIdx) -> Result<Offset> {
            unimplemented!()
        }
        fn create_sdo_request(
            &mut self,
            _: SlavePos,
            _: SdoIdx,
            _: usize,
        ) -> Result<SdoRequestHandle> {
            Ok(SdoRequestHandle(0))
        }
        fn sdo_request_state(&mut self, _: SdoRequestHandle) -> RequestState {
            if self.busy {
                RequestState::Busy
            } else if self.fail {
                RequestState::Error
            } else {
                RequestState::Success
            }
        }
        fn sdo_request_write(&mut self, _: SdoRequestHandle, data: &[u8]) {
            self.busy = true;
            self.writes.push(data.to_vec());
        }
        fn slave_state(&mut self, _: SlavePos) -> Result<SlaveConfigState> {
            unimplemented!()
        }
        fn process_data(&self) -> &[u8] {
            &[]
        }
        fn process_data_mut(&mut self) -> &mut [u8] {
            &mut []
        }
    }

    fn writer(bits: u8, current: i64) -> SdoWriter {
        SdoWriter::new("m.s.srv-test", SdoRequestHandle(0), bits, current)
    }

    #[test]
    fn only_changes_are_written() {
        let mut m = OneRequest::default();
        let mut w = writer(16, 35);
        assert_eq!(w.state(), WriterState::Idle);
        w.write(&mut m, 35);
        assert!(m.writes.is_empty());
        assert_eq!(w.state(), WriterState::Idle);

        w.write(&mut m, 36);
        assert_eq!(m.writes, vec![vec![36, 0]]);
        assert_eq!(w.state(), WriterState::Busy);
    }

    #[test]
    fn one_request_in_flight() {
        let mut m = OneRequest::default();
        let mut w = writer(32, 0);
        w.write(&mut m, 5);
        assert_eq!(m.writes.len(), 1);

        // value changes twice while the request is busy
        w.write(&mut m, 6);
        w.write(&mut m, 7);
        assert_eq!(m.writes.len(), 1);
        assert_eq!(w.last_written(), 0);

        // completion records the old value and starts the latest one
        m.busy = false;
        w.write(&mut m, 7);
        assert_eq!(w.last_written(), 5);
        assert_eq!(m.writes, vec![vec![5, 0, 0, 0], vec![7, 0, 0, 0]]);

        m.busy = false;
        w.write(&mut m, 7);
        assert_eq!(w.state(), WriterState::Done);
        assert_eq!(w.last_written(), 7);
        w.write(&mut m, 7);
        assert_eq!(m.writes.len(), 2);
    }

    #[test]
    fn failed_write_is_retried() {
        let mut m = OneRequest::default();
        let mut w = writer(8, 0);
        w.write(&mut m, 3);
        m.busy = false;
        m.fail = true;

        // the failure is collected, nothing is committed
        w.write(&mut m, 3);
        assert_eq!(m.writes.len(), 1);
        assert_eq!(w.state(), WriterState::Idle);
        assert_eq!(w.last_written(), 0);

        m.fail = false;
        w.write(&mut m, 3);
        assert_eq!(m.writes, vec![vec![3], vec![3]]);
        m.busy = false;
        w.write(&mut m, 3);
        assert_eq!(w.last_written(), 3);
        assert_eq!(w.state(), WriterState::Done);
    }

    #[test]
    fn reset_takes_the_device_value() {
        let mut m = OneRequest::default();
        let mut w = writer(8, 0);
        w.write(&mut m, 3);
        m.busy = false;
        for _ in 0..5 {
            w.write(&mut m, 3);
        }
        assert_eq!(m.writes.len(), 1);

        w.reset(4);
        assert_eq!(w.state(), WriterState::Idle);
        w.write(&mut m, 3);
        assert_eq!(m.writes.len(), 2);

        m.busy = false;
        w.write(&mut m, 3);
        w.reset(3);
        w.write(&mut m, 3);
        assert_eq!(m.writes.len(), 2);
    }
}
