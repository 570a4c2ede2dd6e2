// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! CiA 402 drive profile shared by all servo and stepper drivers.
//!
//! Channel `n` owns the objects at `0x6000 + 0x800 * n`. Its RxPDO is
//! `0x1600 + n * pdo_increment`, its TxPDO `0x1a00 + n * pdo_increment`.

use crate::convert::{read_field, write_field};
use crate::feature::{Feature, FeatureRequest, FeatureSet, ObjectKind, FEATURES};
use crate::modparam::ModParamType::{S32, U32};
use crate::modparam::{channelize, concat, ModParam, ModParamDesc, ModParamType, MAX_CHANNELS};
use crate::pin::{PinDir, PinId, PinType, PinValue};
use crate::ratio::{decode_ratio, DEFAULT_MAX_DENOMINATOR};
use crate::regs::{PdoEntryRegs, RegHandle};
use crate::sdo::SdoWriter;
use crate::slave::{CycleContext, InitContext};
use crate::sync::{Syncs, MAX_PDO_ENTRY_COUNT, MAX_PDO_INFO_COUNT};
use crate::types::*;
use std::convert::TryFrom;

const CHANNEL_BASE: u16 = 0x6000;
const CHANNEL_STRIDE: u16 = 0x800;
const RX_PDO_BASE: u16 = 0x1600;
const TX_PDO_BASE: u16 = 0x1a00;
/// RxPDOs are `0x1600..=0x17ff`, TxPDOs `0x1a00..=0x1bff`.
const PDO_RANGE: u16 = 0x1ff;

const CONTROLWORD: u16 = 0x40;
const STATUSWORD: u16 = 0x41;
const SUPPORTED_DRIVE_MODES: u16 = 0x502;

/// Lowest ID of the modparams handled here. Device-specific IDs stay below.
pub const MP_BASE: u32 = 0x1000;
/// `enableXxx` of feature `i` has ID `MP_ENABLE_BASE + 8 * i`.
pub const MP_ENABLE_BASE: u32 = 0x4000;

/// Supported drive mode bits of object 0x6502.
const SUPPORTED_MODES: [(&str, u32); 9] = [
    ("pp", 0),
    ("vl", 1),
    ("pv", 2),
    ("tq", 3),
    ("hm", 5),
    ("ip", 6),
    ("csp", 7),
    ("csv", 8),
    ("cst", 9),
];

pub fn channel_base(channel: usize) -> u16 {
    CHANNEL_BASE + CHANNEL_STRIDE * channel as u16
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Pin prefix, `srv` for single-axis devices.
    pub name_prefix: String,
    pub features: FeatureRequest,
    /// Mapped objects the driver decodes itself. They get no pin and are
    /// not copied by [Channel::read] and [Channel::write].
    pub packed: FeatureSet,
    pub digital_in_channels: usize,
    pub digital_out_channels: usize,
    sdo_values: Vec<(u16, u8, i64)>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            name_prefix: "srv".to_string(),
            features: FeatureRequest::new(),
            packed: FeatureSet::empty(),
            digital_in_channels: 0,
            digital_out_channels: 0,
            sdo_values: Vec::new(),
        }
    }
}

impl ChannelOptions {
    /// A plain axis: opmode is selectable, everything else is up to the driver.
    pub fn single_axis() -> Self {
        Self {
            features: FeatureRequest::new().with(Feature::Opmode),
            ..Self::default()
        }
    }

    /// Records a value written to object `offset:sub_idx` of this channel
    /// during init. An SDO pin of the same object starts out with it.
    pub fn set_sdo_value(&mut self, offset: u16, sub_idx: u8, value: i64) {
        match self.sdo_values.iter_mut().find(|(o, s, _)| *o == offset && *s == sub_idx) {
            Some(entry) => entry.2 = value,
            None => self.sdo_values.push((offset, sub_idx, value)),
        }
    }

    pub fn sdo_value(&self, offset: u16, sub_idx: u8) -> Option<i64> {
        self.sdo_values
            .iter()
            .find(|(o, s, _)| *o == offset && *s == sub_idx)
            .map(|(_, _, v)| *v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub channels: usize,
    /// Most objects one channel maps into its RxPDOs.
    pub rx_pdo_entry_limit: usize,
    /// Most objects one channel maps into its TxPDOs.
    pub tx_pdo_entry_limit: usize,
    /// Distance between the PDO indices of neighbouring channels.
    pub pdo_increment: u16,
    /// Continue in the next PDO index once `pdo_entry_limit` is reached.
    pub pdo_autoflow: bool,
    /// Most PDOs per channel and direction when autoflowing.
    pub pdo_limit: usize,
    /// Most entries in a single PDO.
    pub pdo_entry_limit: usize,
    /// Always [MAX_CHANNELS] long; only the first `channels` are used.
    pub channel: Vec<ChannelOptions>,
}

impl Options {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            rx_pdo_entry_limit: MAX_PDO_ENTRY_COUNT,
            tx_pdo_entry_limit: MAX_PDO_ENTRY_COUNT,
            pdo_increment: 1,
            pdo_autoflow: false,
            pdo_limit: MAX_PDO_INFO_COUNT,
            pdo_entry_limit: MAX_PDO_ENTRY_COUNT,
            channel: vec![ChannelOptions::single_axis(); MAX_CHANNELS],
        }
    }

    pub fn channels(&self) -> &[ChannelOptions] {
        &self.channel[..self.channels.min(MAX_CHANNELS)]
    }

    /// Names channel `n` `srv-<n+1>` on devices with more than one axis.
    pub fn rename_multiaxis_channels(&mut self) {
        if self.channels > 1 {
            for (n, ch) in self.channel.iter_mut().enumerate().take(self.channels) {
                ch.name_prefix = format!("srv-{}", n + 1);
            }
        }
    }

    pub fn validate(&self, device: &str) -> Result<()> {
        if self.channels > MAX_CHANNELS {
            log::error!(
                "slave {}: {} channels requested, at most {}",
                device,
                self.channels,
                MAX_CHANNELS
            );
            return Err(Error::TooManyChannels {
                requested: self.channels,
                max: MAX_CHANNELS,
            });
        }
        if self.channels == 0 {
            return Err(unconfigured(device, "no channels".to_string()));
        }
        if self.pdo_entry_limit == 0 || self.pdo_limit == 0 {
            return Err(unconfigured(device, "PDO limits must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn unconfigured(device: &str, reason: String) -> Error {
    log::error!("slave {}: {}", device, reason);
    Error::Unconfigured {
        device: device.to_string(),
        reason,
    }
}

/// Adds the two mailbox sync managers every CiA 402 device starts with.
pub fn init_syncs(syncs: &mut Syncs) -> Result<()> {
    syncs.add_sync(SyncDirection::Output, WatchdogMode::Default)?;
    syncs.add_sync(SyncDirection::Input, WatchdogMode::Default)
}

/// Adds sync manager 2 with the controlword and write PDOs of every channel.
pub fn add_output_sync(syncs: &mut Syncs, options: &Options) -> Result<()> {
    let limit = options.rx_pdo_entry_limit;
    add_pdo_sync(syncs, options, SyncDirection::Output, RX_PDO_BASE, CONTROLWORD, limit)
}

/// Adds sync manager 3 with the statusword and read PDOs of every channel.
pub fn add_input_sync(syncs: &mut Syncs, options: &Options) -> Result<()> {
    let limit = options.tx_pdo_entry_limit;
    add_pdo_sync(syncs, options, SyncDirection::Input, TX_PDO_BASE, STATUSWORD, limit)
}

fn add_pdo_sync(
    syncs: &mut Syncs,
    options: &Options,
    direction: SyncDirection,
    range: u16,
    word: u16,
    limit: usize,
) -> Result<()> {
    let kind = match direction {
        SyncDirection::Output => ObjectKind::WritePdo,
        _ => ObjectKind::ReadPdo,
    };
    syncs.add_sync(direction, WatchdogMode::Default)?;
    for (ch, opt) in options.channels().iter().enumerate() {
        let base = channel_base(ch);
        let enabled = opt.features.resolve();
        let entries: Vec<_> = std::iter::once((base + word, 0, 16))
            .chain(enabled.objects(kind).map(|(_, o)| (o.index(base), o.sub_idx, o.bits)))
            .collect();
        let first = first_pdo(syncs.device(), range, ch, options.pdo_increment)?;
        add_channel_pdos(syncs, options, range, first, &entries, limit)?;
    }
    Ok(())
}

/// Index of the first PDO of channel `ch` in the range starting at `range`.
fn first_pdo(device: &str, range: u16, ch: usize, increment: u16) -> Result<u16> {
    u16::try_from(ch)
        .ok()
        .and_then(|ch| ch.checked_mul(increment))
        .filter(|offset| *offset <= PDO_RANGE)
        .map(|offset| range + offset)
        .ok_or_else(|| {
            let reason = format!(
                "PDO increment 0x{:x} puts channel {} outside 0x{:04x}..=0x{:04x}",
                increment,
                ch + 1,
                range,
                range + PDO_RANGE
            );
            unconfigured(device, reason)
        })
}

fn add_channel_pdos(
    syncs: &mut Syncs,
    options: &Options,
    range: u16,
    first_pdo: u16,
    entries: &[(u16, u8, u8)],
    limit: usize,
) -> Result<()> {
    if entries.len() > limit {
        let reason = format!(
            "PDO 0x{:04x} needs {} entries, the device maps at most {}",
            first_pdo,
            entries.len(),
            limit
        );
        return Err(unconfigured(syncs.device(), reason));
    }
    let last_pdo = range + PDO_RANGE;
    let mut pdo = first_pdo;
    let mut pdos = 1;
    let mut in_pdo = 0;
    add_pdo(syncs, pdo)?;
    for &(idx, sub_idx, bits) in entries {
        if in_pdo == options.pdo_entry_limit {
            if !options.pdo_autoflow {
                let reason = format!(
                    "PDO 0x{:04x} holds at most {} entries",
                    pdo,
                    options.pdo_entry_limit
                );
                return Err(unconfigured(syncs.device(), reason));
            }
            if pdos == options.pdo_limit || pdo == last_pdo {
                let reason = format!("more than {} PDOs needed from 0x{:04x}", pdos, first_pdo);
                return Err(unconfigured(syncs.device(), reason));
            }
            pdo += 1;
            pdos += 1;
            in_pdo = 0;
            add_pdo(syncs, pdo)?;
        }
        syncs.add_pdo_entry(idx, sub_idx, bits)?;
        in_pdo += 1;
    }
    Ok(())
}

/// Adds PDO `pdo` unless an earlier channel already maps it.
fn add_pdo(syncs: &mut Syncs, pdo: u16) -> Result<()> {
    if syncs.pdo_indices().any(|p| u16::from(p) == pdo) {
        let reason = format!("PDO 0x{:04x} is used by two channels", pdo);
        return Err(unconfigured(syncs.device(), reason));
    }
    syncs.add_pdo_info(pdo)
}

/// Configures all channels: sync managers, PDO entry registrations and pins.
pub fn configure(cx: &mut InitContext<'_>, options: &Options) -> Result<Vec<Channel>> {
    options.validate(&cx.device())?;
    init_syncs(cx.syncs)?;
    add_output_sync(cx.syncs, options)?;
    add_input_sync(cx.syncs, options)?;
    options
        .channels()
        .iter()
        .enumerate()
        .map(|(ch, opt)| Channel::register(cx, ch, opt))
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Mapped {
    reg: RegHandle,
    pin: PinId,
    bits: u8,
    signed: bool,
}

#[derive(Debug)]
struct SdoObject {
    writer: SdoWriter,
    pin: PinId,
}

/// One registered axis.
#[derive(Debug)]
pub struct Channel {
    prefix: String,
    base: u16,
    enabled: FeatureSet,
    supported_modes: u32,
    controlword: Mapped,
    statusword: Mapped,
    reads: Vec<(Feature, Mapped)>,
    writes: Vec<(Feature, Mapped)>,
    packed: Vec<(Feature, RegHandle)>,
    sdos: Vec<SdoObject>,
}

impl Channel {
    /// Registers the PDO entries of channel `ch` and creates its pins and
    /// SDO requests. The sync configuration must already contain them.
    pub fn register(cx: &mut InitContext<'_>, ch: usize, opt: &ChannelOptions) -> Result<Channel> {
        let base = channel_base(ch);
        let enabled = opt.features.resolve();
        let prefix = opt.name_prefix.clone();
        let pfx = Some(prefix.as_str());

        let position = cx.position;
        let mut local = PdoEntryRegs::new(cx.device(), MAX_PDO_ENTRY_COUNT);
        let mut reg = |idx: u16, sub_idx: u8, bits: u8| {
            local.register(position, PdoEntryIdx::new(idx, sub_idx), bits)
        };
        let cw = reg(base + CONTROLWORD, 0, 16)?;
        let sw = reg(base + STATUSWORD, 0, 16)?;
        let mut pdo_regs = Vec::new();
        for kind in [ObjectKind::ReadPdo, ObjectKind::WritePdo].iter() {
            for (f, o) in enabled.objects(*kind) {
                pdo_regs.push((f, o, reg(o.index(base), o.sub_idx, o.bits)?));
            }
        }
        let start = cx.regs.append(local)?;

        let controlword = Mapped {
            reg: cw.rebase(start),
            pin: cx.add_pin(pfx, "cia-controlword", PinType::U32, PinDir::In)?,
            bits: 16,
            signed: false,
        };
        let statusword = Mapped {
            reg: sw.rebase(start),
            pin: cx.add_pin(pfx, "cia-statusword", PinType::U32, PinDir::Out)?,
            bits: 16,
            signed: false,
        };

        let supported_modes = cx.read_sdo32(base + SUPPORTED_DRIVE_MODES, 0).unwrap_or_else(|_| {
            log::warn!(
                "slave {}: supported drive modes of {} unknown, assuming none",
                cx.device(),
                prefix
            );
            0
        });
        let pin = cx.add_pin(pfx, "supported-modes", PinType::U32, PinDir::Out)?;
        cx.pins.set(pin, PinValue::U32(supported_modes));
        for (mode, bit) in SUPPORTED_MODES.iter() {
            let name = format!("supports-mode-{}", mode);
            let pin = cx.add_pin(pfx, &name, PinType::Bit, PinDir::Out)?;
            cx.pins.set(pin, PinValue::Bit(supported_modes & (1 << bit) != 0));
        }

        let mut reads = Vec::new();
        let mut writes = Vec::new();
        let mut packed = Vec::new();
        for (f, o, r) in pdo_regs {
            let reg = r.rebase(start);
            if opt.packed.contains(f) {
                packed.push((f, reg));
                continue;
            }
            let (dir, list) = match o.kind {
                ObjectKind::ReadPdo => (PinDir::Out, &mut reads),
                _ => (PinDir::In, &mut writes),
            };
            let mapped = Mapped {
                reg,
                pin: cx.add_pin(pfx, o.pin_name, o.pin_type(), dir)?,
                bits: o.bits,
                signed: o.signed,
            };
            list.push((f, mapped));
        }

        let mut sdos = Vec::new();
        for (_, o) in enabled.objects(ObjectKind::WriteSdo) {
            let idx = SdoIdx::new(o.index(base), o.sub_idx);
            let size = usize::from(o.bits / 8);
            let request = cx
                .master
                .create_sdo_request(cx.position, idx, size)
                .map_err(|e| {
                    log::error!(
                        "slave {}: failed to create SDO request for {}: {}",
                        cx.device(),
                        idx,
                        e
                    );
                    e
                })?;
            let name = cx.pin_name(pfx, o.pin_name);
            let pin = cx.add_pin(pfx, o.pin_name, o.pin_type(), PinDir::In)?;
            if let Some(value) = opt.sdo_value(o.offset, o.sub_idx) {
                cx.pins.set_raw(pin, value);
            }
            let current = cx.pins.get_raw(pin);
            sdos.push(SdoObject {
                writer: SdoWriter::new(name, request, o.bits, current),
                pin,
            });
        }

        log::debug!(
            "slave {}: channel {} at 0x{:04x}, {} read PDOs, {} write PDOs, {} SDOs",
            cx.device(),
            prefix,
            base,
            reads.len(),
            writes.len(),
            sdos.len()
        );
        Ok(Channel {
            prefix,
            base,
            enabled,
            supported_modes,
            controlword,
            statusword,
            reads,
            writes,
            packed,
            sdos,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn enabled(&self) -> FeatureSet {
        self.enabled
    }

    /// Contents of object 0x6502 read at registration, 0 if unreadable.
    pub fn supported_modes(&self) -> u32 {
        self.supported_modes
    }

    /// Registration of a mapped object.
    pub fn reg(&self, f: Feature) -> Option<RegHandle> {
        self.reads
            .iter()
            .chain(self.writes.iter())
            .map(|(x, m)| (*x, m.reg))
            .chain(self.packed.iter().copied())
            .find(|(x, _)| *x == f)
            .map(|(_, reg)| reg)
    }

    pub fn read(&self, cx: &mut CycleContext<'_>) {
        let pd = cx.master.process_data();
        let reads = self.reads.iter().map(|(_, m)| m);
        for m in std::iter::once(&self.statusword).chain(reads) {
            if let Some(offset) = cx.regs.offset(m.reg) {
                cx.pins.set_raw(m.pin, read_field(pd, offset, m.bits, m.signed));
            }
        }
    }

    pub fn write(&mut self, cx: &mut CycleContext<'_>) {
        let pd = cx.master.process_data_mut();
        let writes = self.writes.iter().map(|(_, m)| m);
        for m in std::iter::once(&self.controlword).chain(writes) {
            if let Some(offset) = cx.regs.offset(m.reg) {
                write_field(pd, offset, m.bits, cx.pins.get_raw(m.pin));
            }
        }
        for s in &mut self.sdos {
            let value = cx.pins.get_raw(s.pin);
            s.writer.write(&mut *cx.master, value);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SdoModParam {
    name: &'static str,
    id: u32,
    ty: ModParamType,
    offset: u16,
    sub_idx: u8,
    bytes: u8,
}

const fn sdo_mp(
    name: &'static str,
    id: u32,
    ty: ModParamType,
    offset: u16,
    sub_idx: u8,
    bytes: u8,
) -> SdoModParam {
    SdoModParam {
        name,
        id,
        ty,
        offset,
        sub_idx,
        bytes,
    }
}

/// Per-channel modparams written once to an SDO at init.
static SDO_MODPARAMS: [SdoModParam; 26] = [
    sdo_mp("positionLimitMin", 0x1000, S32, 0x7b, 1, 4),
    sdo_mp("positionLimitMax", 0x1008, S32, 0x7b, 2, 4),
    sdo_mp("swPositionLimitMin", 0x1010, S32, 0x7d, 1, 4),
    sdo_mp("swPositionLimitMax", 0x1018, S32, 0x7d, 2, 4),
    sdo_mp("homeOffset", 0x1020, S32, 0x7c, 0, 4),
    sdo_mp("profileMaxVelocity", 0x1028, U32, 0x7f, 0, 4),
    sdo_mp("motorMaxSpeed_RPM", 0x1030, U32, 0x80, 0, 4),
    sdo_mp("profileVelocity", 0x1038, U32, 0x81, 0, 4),
    sdo_mp("profileEndVelocity", 0x1040, U32, 0x82, 0, 4),
    sdo_mp("profileAccel", 0x1048, U32, 0x83, 0, 4),
    sdo_mp("profileDecel", 0x1050, U32, 0x84, 0, 4),
    sdo_mp("quickDecel", 0x1058, U32, 0x85, 0, 4),
    sdo_mp("quickStopOptionCode", 0x1060, S32, 0x5a, 0, 2),
    sdo_mp("shutdownOptionCode", 0x1068, S32, 0x5b, 0, 2),
    sdo_mp("disableOptionCode", 0x1070, S32, 0x5c, 0, 2),
    sdo_mp("haltOptionCode", 0x1078, S32, 0x5d, 0, 2),
    sdo_mp("faultOptionCode", 0x1080, S32, 0x5e, 0, 2),
    sdo_mp("homeMethod", 0x1088, S32, 0x98, 0, 1),
    sdo_mp("homeVelocityFast", 0x1090, U32, 0x99, 1, 4),
    sdo_mp("homeVelocitySlow", 0x1098, U32, 0x99, 2, 4),
    sdo_mp("homeAccel", 0x10a0, U32, 0x9a, 0, 4),
    sdo_mp("probeFunction", 0x10a8, U32, 0xb8, 0, 2),
    sdo_mp("probe1Positive", 0x10b0, S32, 0xba, 0, 4),
    sdo_mp("probe1Negative", 0x10b8, S32, 0xbb, 0, 4),
    sdo_mp("probe2Positive", 0x10c0, S32, 0xbc, 0, 4),
    sdo_mp("probe2Negative", 0x10c8, S32, 0xbd, 0, 4),
];

/// Ratio modparams: name, ID and object offset; subindex 1 takes the
/// numerator, subindex 2 the denominator.
static RATIO_MODPARAMS: [(&str, u32, u16); 3] = [
    ("encoderRatio", 0x10d0, 0x8f),
    ("gearRatio", 0x10d8, 0x91),
    ("feedRatio", 0x10e0, 0x92),
];

/// Channel-less declarations of every per-axis CiA 402 modparam.
pub fn per_channel_modparams() -> Vec<ModParamDesc> {
    let sdo = SDO_MODPARAMS
        .iter()
        .map(|m| ModParamDesc::new(m.name, m.id, m.ty));
    let ratio = RATIO_MODPARAMS
        .iter()
        .map(|(name, id, _)| ModParamDesc::new(*name, *id, ModParamType::String));
    let enable = FEATURES.iter().enumerate().map(|(i, d)| {
        ModParamDesc::new(d.config_name, MP_ENABLE_BASE + 8 * i as u32, ModParamType::Bit)
    });
    sdo.chain(ratio).chain(enable).collect()
}

/// All modparams of a CiA 402 device: `device` as is, then `per_channel`
/// and the CiA 402 set, each for `channels` axes.
pub fn modparams(
    device: &[ModParamDesc],
    per_channel: &[ModParamDesc],
    channels: usize,
) -> Result<Vec<ModParamDesc>> {
    let base = concat(per_channel, &per_channel_modparams());
    Ok(concat(device, &channelize(&base, channels)?))
}

/// Applies one CiA 402 modparam: feature overrides go to `options`, all
/// others are written to the device.
///
/// Returns `false` if `p` is not a CiA 402 modparam.
pub fn handle_modparam(
    cx: &mut InitContext<'_>,
    options: &mut Options,
    p: &ModParam,
) -> Result<bool> {
    if p.id < MP_BASE {
        return Ok(false);
    }
    let (ch, id) = p.split_channel();
    let base = channel_base(ch);

    if id >= MP_ENABLE_BASE {
        let desc = FEATURES
            .get(((id - MP_ENABLE_BASE) / 8) as usize)
            .ok_or_else(|| Error::UnknownFeature(p.name.clone()))?;
        options.channel[ch].features.set(desc.feature, p.value.as_bool());
        return Ok(true);
    }

    if let Some(m) = SDO_MODPARAMS.iter().find(|m| m.id == id) {
        let value = match m.ty {
            ModParamType::S32 => i64::from(p.value.as_i32()),
            _ => i64::from(p.value.as_u32()),
        };
        let raw = value as u32;
        let idx = base + m.offset;
        match m.bytes {
            1 => cx.write_sdo8_modparam(idx, m.sub_idx, raw as u8, &p.name)?,
            2 => cx.write_sdo16_modparam(idx, m.sub_idx, raw as u16, &p.name)?,
            _ => cx.write_sdo32_modparam(idx, m.sub_idx, raw, &p.name)?,
        }
        options.channel[ch].set_sdo_value(m.offset, m.sub_idx, value);
        return Ok(true);
    }

    if let Some((_, _, offset)) = RATIO_MODPARAMS.iter().find(|(_, mid, _)| *mid == id) {
        let ratio = decode_ratio(p.value.as_str(), DEFAULT_MAX_DENOMINATOR).map_err(|e| {
            log::error!("slave {}: invalid ratio for modparam {}: {}", cx.device(), p.name, e);
            e
        })?;
        if ratio.numerator == 0 || ratio.denominator == 0 {
            log::error!(
                "slave {}: ratio {:?} of modparam {} has a zero part",
                cx.device(),
                p.value.as_str(),
                p.name
            );
            return Err(Error::InvalidRatio(p.value.to_string()));
        }
        cx.write_sdo32_modparam(base + offset, 1, ratio.numerator as u32, &p.name)?;
        cx.write_sdo32_modparam(base + offset, 2, ratio.denominator, &p.name)?;
        return Ok(true);
    }

    Ok(false)
}
