// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Process data mapping for EtherCAT slaves driven by an IgH/Etherlab style
//! master.
//!
//! A device driver describes the sync managers, PDOs and PDO entries its
//! slave needs with a capacity-bounded [Syncs] builder, registers the
//! entries it reads or writes, and exposes them as typed, named pins.
//! CiA 402 drives get all of this from the [cia402] module: a sparse
//! [FeatureRequest] per axis is resolved into the objects that are mapped,
//! and per-axis modparams are multiplexed over up to eight channels.
//!
//! The wire-level exchange is left to an implementation of [BusMaster].
//! A [Bus] ties a master to its slaves and runs configuration and the
//! cyclic read/write passes.

mod bus;
pub mod cia402;
mod convert;
pub mod devices;
mod feature;
mod master;
mod modparam;
mod pin;
mod ratio;
mod regs;
mod sdo;
mod slave;
mod sync;
mod types;
mod util;

pub use self::{
    bus::Bus,
    convert::{bit_of, read_bit, read_field, to_le_bytes, write_bit, write_field},
    devices::{DeviceFlags, DeviceRegistry, DeviceType},
    feature::{
        Feature, FeatureDesc, FeatureRequest, FeatureSet, ObjectDesc, ObjectKind, FEATURES,
        IMPLICATIONS,
    },
    master::{BusMaster, RequestState, SdoRequestHandle},
    modparam::{
        channelize, concat as concat_modparams, parse_modparams, ModParam, ModParamDesc,
        ModParamDoc, ModParamType, ModParamValue, CHANNEL_MASK, MAX_CHANNELS,
    },
    pin::{pin_name, Pin, PinDir, PinId, PinTable, PinType, PinValue},
    ratio::{decode_ratio, Ratio, DEFAULT_MAX_DENOMINATOR},
    regs::{check_overlap, PdoEntryReg, PdoEntryRegs, RegHandle},
    sdo::{SdoWriter, WriterState},
    slave::{CycleContext, Driver, InitContext, Slave, SlaveConfig},
    sync::{SyncTable, Syncs, MAX_PDO_ENTRY_COUNT, MAX_PDO_INFO_COUNT, MAX_SYNC_COUNT},
    types::*,
    util::{lookup_ignore_case, LookupTable},
};
