// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

use derive_new::new;
use std::{fmt, io};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sync managers full for slave {device}: {max} of {max} used")]
    SyncFull { device: String, max: usize },
    #[error("PDO infos full for slave {device}: {max} of {max} used")]
    PdoInfoFull { device: String, max: usize },
    #[error("PDO entries full for slave {device}: {max} of {max} used")]
    PdoEntryFull { device: String, max: usize },
    #[error("no sync manager to add a PDO to for slave {0}")]
    NoCurrentSync(String),
    #[error("no PDO to add an entry to for slave {0}")]
    NoCurrentPdo(String),
    #[error("sync manager configuration for slave {0} is incomplete after an earlier error")]
    SyncsInvalid(String),
    #[error("PDO entry registrations full for slave {device}: {used} of {max} used")]
    RegsFull {
        device: String,
        used: usize,
        max: usize,
    },
    #[error("PDO entries {0} and {1} overlap in the process data")]
    OverlappingEntries(PdoEntryIdx, PdoEntryIdx),
    #[error("unknown modparam {name} for slave {device}")]
    UnknownModParam { device: String, name: String },
    #[error("invalid value {value:?} for modparam {name}")]
    InvalidModParam { name: String, value: String },
    #[error("invalid ratio {0:?}")]
    InvalidRatio(String),
    #[error("{requested} channels requested, at most {max} are supported")]
    TooManyChannels { requested: usize, max: usize },
    #[error("unknown feature {0}")]
    UnknownFeature(String),
    #[error("unknown device type {0}")]
    UnknownDeviceType(String),
    #[error("device type {0} is already registered")]
    DuplicateDeviceType(String),
    #[error("pin {0} already exists")]
    DuplicatePin(String),
    #[error("no pin named {0}")]
    UnknownPin(String),
    #[error("no slave named {0}")]
    UnknownSlave(String),
    #[error("slave {device} is not configured correctly: {reason}")]
    Unconfigured { device: String, reason: String },
    #[error("SDO upload of {idx} failed (abort code 0x{abort_code:08x})")]
    SdoUpload { idx: SdoIdx, abort_code: u32 },
    #[error("SDO download of {idx} failed (abort code 0x{abort_code:08x})")]
    SdoDownload { idx: SdoIdx, abort_code: u32 },
    #[error("invalid result size on SDO upload of {idx}: requested {expected}, got {actual}")]
    SdoSize {
        idx: SdoIdx,
        expected: usize,
        actual: usize,
    },
    #[error("master error: {0}")]
    Master(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        io::Error::new(io::ErrorKind::Other, e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name($inner);

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }

        impl From<$name> for $inner {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

index_type!(
    /// CoE object index.
    Idx(u16)
);
index_type!(
    /// CoE object subindex.
    SubIdx(u8)
);
index_type!(
    /// Index of a PDO (e.g. `0x1600` or `0x1a00`).
    PdoIdx(u16)
);
index_type!(
    /// Sync manager index.
    SmIdx(u8)
);
index_type!(
    /// Position of a slave in the ring.
    SlavePos(u16)
);

impl SmIdx {
    /// Reserved index closing a flattened sync manager list.
    pub const END: SmIdx = SmIdx(0xff);
}

/// Address of a PDO entry: object index and subindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdoEntryIdx {
    pub idx: Idx,
    pub sub_idx: SubIdx,
}

impl PdoEntryIdx {
    pub const fn new(idx: u16, sub_idx: u8) -> Self {
        Self {
            idx: Idx(idx),
            sub_idx: SubIdx(sub_idx),
        }
    }
}

impl fmt::Display for PdoEntryIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}:{:02x}", self.idx.0, self.sub_idx.0)
    }
}

/// Address of an SDO: object index and subindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SdoIdx {
    pub idx: Idx,
    pub sub_idx: SubIdx,
}

impl SdoIdx {
    pub const fn new(idx: u16, sub_idx: u8) -> Self {
        Self {
            idx: Idx(idx),
            sub_idx: SubIdx(sub_idx),
        }
    }
}

impl fmt::Display for SdoIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}:{:02x}", self.idx.0, self.sub_idx.0)
    }
}

/// Position of a PDO entry inside the process data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub byte: usize,
    pub bit: u32,
}

/// An EtherCAT slave identification, consisting of vendor ID and product code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct SlaveId {
    pub vendor_id: u32,
    pub product_code: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlState {
    Init = 1,
    Preop = 2,
    Boot = 3,
    Safeop = 4,
    Op = 8,
}

impl Default for AlState {
    fn default() -> Self {
        AlState::Init
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlaveConfigState {
    pub online: bool,
    pub operational: bool,
    pub al_state: AlState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Invalid,
    Output,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogMode {
    Default,
    Enable,
    Disable,
}

/// PDO entry as handed to the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoEntryInfo {
    pub entry_idx: PdoEntryIdx,
    pub bit_len: u8,
}

/// PDO and the entries mapped into it, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoInfo<'a> {
    pub idx: PdoIdx,
    pub entries: &'a [PdoEntryInfo],
}

/// Sync manager configuration; a list of these ends with [SyncInfo::END].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncInfo<'a> {
    pub idx: SmIdx,
    pub direction: SyncDirection,
    pub watchdog_mode: WatchdogMode,
    pub pdos: &'a [PdoInfo<'a>],
}

impl<'a> SyncInfo<'a> {
    pub const END: SyncInfo<'static> = SyncInfo {
        idx: SmIdx::END,
        direction: SyncDirection::Invalid,
        watchdog_mode: WatchdogMode::Default,
        pdos: &[],
    };

    pub const fn is_end(&self) -> bool {
        self.idx.0 == SmIdx::END.0
    }
}
