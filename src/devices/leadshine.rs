// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Leadshine EtherCAT steppers: EM3E (open loop), CS3E (closed loop) and
//! their dual-axis variants.
//!
//! The digital input and output objects are mapped without pins of their
//! own; their bits are exposed as `din-*` and `dout-*` pins instead.

use super::{DeviceFlags, DeviceType};
use crate::cia402::{self, Channel, Options};
use crate::convert::{bit_of, read_bit, write_bit};
use crate::feature::Feature;
use crate::modparam::{ModParam, ModParamDesc, ModParamDoc, ModParamType};
use crate::pin::{PinDir, PinId, PinType, PinValue};
use crate::regs::RegHandle;
use crate::slave::{CycleContext, Driver, InitContext};
use crate::sync::MAX_PDO_ENTRY_COUNT;
use crate::types::*;
use crate::util::{lookup_ignore_case, LookupTable};

const VENDOR_ID: u32 = 0x4321;

const MP_PEAK_CURRENT_100MA: u32 = 0x100;
const MP_PEAK_CURRENT_1MA: u32 = 0x110;
const MP_CONTROL_MODE: u32 = 0x120;

const VENDOR_BASE: u16 = 0x2000;
const CONTROL_MODE: u16 = 0x24;

static CONTROL_MODES: &LookupTable<u16> = &[("openloop", 0), ("closedloop", 2)];

static DOCS: &[ModParamDoc] = &[
    ModParamDoc {
        name: "feedRatio",
        default: "10000",
        comment: "Microsteps per rotation",
    },
    ModParamDoc {
        name: "encoderRatio",
        default: "4000",
        comment: "Encoder steps per rotation",
    },
];

/// Named bits of the digital input object; generic inputs start at bit 4.
const DIN_BITS: [(&str, u32); 7] = [
    ("din-negative-limit", 0),
    ("din-positive-limit", 1),
    ("din-home", 2),
    ("din-probe1", 26),
    ("din-probe2", 27),
    ("din-index-z", 31),
    ("din-quick-stop", 23),
];
const DIN_GENERIC_BIT: u32 = 4;
/// Generic outputs of the digital output object start at bit 16.
const DOUT_GENERIC_BIT: u32 = 16;

fn open_loop_modparams() -> Vec<ModParamDesc> {
    vec![ModParamDesc::new("peakCurrent_amps", MP_PEAK_CURRENT_1MA, ModParamType::Float)
        .with_default("5.6")
        .with_comment("Peak motor current, in Amps")]
}

fn closed_loop_modparams() -> Vec<ModParamDesc> {
    vec![
        ModParamDesc::new("peakCurrent_amps", MP_PEAK_CURRENT_100MA, ModParamType::Float)
            .with_default("6.0")
            .with_comment("Peak motor current, in Amps"),
        ModParamDesc::new("controlMode", MP_CONTROL_MODE, ModParamType::String)
            .with_default("closedloop")
            .with_comment("Operation mode: openloop or closedloop"),
    ]
}

pub(super) fn types() -> Result<Vec<DeviceType>> {
    // name, product code, axes, digital inputs, digital outputs, closed loop
    let table: [(&'static str, u32, usize, usize, usize, bool); 13] = [
        ("EM3E-522E", 0x8800, 1, 6, 2, false),
        ("EM3E-556E", 0x8600, 1, 6, 2, false),
        ("EM3E-870E", 0x8700, 1, 6, 2, false),
        ("CS3E-D503", 0x1300, 1, 7, 7, true),
        ("CS3E-D507", 0x1100, 1, 7, 7, true),
        ("CS3E-D1008", 0x1200, 1, 7, 7, true),
        ("CS3E-D503E", 0x0700, 1, 6, 2, true),
        ("CS3E-D507E", 0x0500, 1, 6, 2, true),
        ("2EM3E-D522", 0xa300, 2, 4, 2, false),
        ("2EM3E-D556", 0xa100, 2, 4, 2, false),
        ("2EM3E-D870", 0xa200, 2, 4, 2, false),
        ("2CS3E-D503", 0x2200, 2, 4, 2, true),
        ("2CS3E-D507", 0x2100, 2, 4, 2, true),
    ];
    table
        .iter()
        .map(|&(name, product_code, axes, digital_in, digital_out, closed)| -> Result<DeviceType> {
            let per_channel = if closed {
                closed_loop_modparams()
            } else {
                open_loop_modparams()
            };
            Ok(DeviceType {
                name,
                vendor_id: VENDOR_ID,
                product_code,
                pdo_entry_count: MAX_PDO_ENTRY_COUNT,
                flags: DeviceFlags {
                    axes,
                    digital_in,
                    digital_out,
                },
                modparams: cia402::modparams(&[], &per_channel, axes)?,
                docs: DOCS,
                create,
            })
        })
        .collect()
}

fn create(ty: &DeviceType) -> Box<dyn Driver> {
    Box::new(LeadshineStepper {
        flags: ty.flags,
        channels: Vec::new(),
        inputs: Vec::new(),
        outputs: Vec::new(),
    })
}

/// Bits of one axis' digital input or output object exposed as separate pins.
#[derive(Debug)]
struct PackedBits {
    reg: RegHandle,
    bits: Vec<(u32, PinId)>,
}

#[derive(Debug)]
struct LeadshineStepper {
    flags: DeviceFlags,
    channels: Vec<Channel>,
    inputs: Vec<PackedBits>,
    outputs: Vec<PackedBits>,
}

impl LeadshineStepper {
    fn handle_modparam(
        &self,
        cx: &mut InitContext<'_>,
        options: &mut Options,
        p: &ModParam,
    ) -> Result<()> {
        let (ch, id) = p.split_channel();
        let base = VENDOR_BASE + 0x800 * ch as u16;
        match id {
            MP_PEAK_CURRENT_100MA => {
                let value = (p.value.as_f64() * 10.0 + 0.5) as u16;
                cx.write_sdo16_modparam(base, 0, value, &p.name)
            }
            MP_PEAK_CURRENT_1MA => {
                let value = (p.value.as_f64() * 1000.0 + 0.5) as u16;
                cx.write_sdo16_modparam(base, 0, value, &p.name)
            }
            MP_CONTROL_MODE => {
                let mode = lookup_ignore_case(CONTROL_MODES, p.value.as_str()).ok_or_else(|| {
                    log::error!("invalid value for modparam {} of slave {}", p.name, cx.device());
                    Error::InvalidModParam {
                        name: p.name.clone(),
                        value: p.value.to_string(),
                    }
                })?;
                cx.write_sdo16_modparam(base + CONTROL_MODE, 0, mode, &p.name)
            }
            _ => {
                if cia402::handle_modparam(cx, options, p)? {
                    Ok(())
                } else {
                    log::error!("unknown modparam {} for slave {}", p.name, cx.device());
                    Err(Error::UnknownModParam {
                        device: cx.device(),
                        name: p.name.clone(),
                    })
                }
            }
        }
    }

    fn register_bits(&mut self, cx: &mut InitContext<'_>, options: &Options) -> Result<()> {
        self.inputs.clear();
        self.outputs.clear();
        for (axis, channel) in self.channels.iter().enumerate() {
            let opt = &options.channels()[axis];
            let prefix = Some(opt.name_prefix.as_str());
            if let Some(reg) = channel.reg(Feature::DigitalInput) {
                let mut bits = Vec::new();
                for (name, bit) in DIN_BITS.iter() {
                    bits.push((*bit, cx.add_pin(prefix, name, PinType::Bit, PinDir::Out)?));
                }
                for n in 0..opt.digital_in_channels {
                    let name = format!("din-{}", n + 1);
                    let pin = cx.add_pin(prefix, &name, PinType::Bit, PinDir::Out)?;
                    bits.push((DIN_GENERIC_BIT + n as u32, pin));
                }
                self.inputs.push(PackedBits { reg, bits });
            }
            if let Some(reg) = channel.reg(Feature::DigitalOutput) {
                let mut bits = Vec::new();
                for n in 0..opt.digital_out_channels {
                    let name = format!("dout-{}", n + 1);
                    let pin = cx.add_pin(prefix, &name, PinType::Bit, PinDir::In)?;
                    bits.push((DOUT_GENERIC_BIT + n as u32, pin));
                }
                self.outputs.push(PackedBits { reg, bits });
            }
        }
        Ok(())
    }
}

impl Driver for LeadshineStepper {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<()> {
        let mut options = Options::new(self.flags.axes);
        options.rx_pdo_entry_limit = 8;
        options.tx_pdo_entry_limit = 8;
        for ch in options.channel.iter_mut() {
            ch.features.enable(Feature::Csp);
            ch.features.enable(Feature::DigitalOutput);
            ch.features.enable(Feature::DigitalInput);
            ch.packed.insert(Feature::DigitalOutput);
            ch.packed.insert(Feature::DigitalInput);
            ch.digital_in_channels = self.flags.digital_in;
            ch.digital_out_channels = self.flags.digital_out;
        }

        let params = cx.modparams;
        for p in params {
            self.handle_modparam(cx, &mut options, p)?;
        }

        options.rename_multiaxis_channels();
        self.channels = cia402::configure(cx, &options)?;
        self.register_bits(cx, &options)
    }

    fn read(&mut self, cx: &mut CycleContext<'_>) {
        for ch in &self.channels {
            ch.read(cx);
        }
        let pd = cx.master.process_data();
        for inputs in &self.inputs {
            if let Some(offset) = cx.regs.offset(inputs.reg) {
                for (bit, pin) in &inputs.bits {
                    cx.pins.set(*pin, PinValue::Bit(read_bit(pd, bit_of(offset, *bit))));
                }
            }
        }
    }

    fn write(&mut self, cx: &mut CycleContext<'_>) {
        for ch in &mut self.channels {
            ch.write(cx);
        }
        let pd = cx.master.process_data_mut();
        for outputs in &self.outputs {
            if let Some(offset) = cx.regs.offset(outputs.reg) {
                for (bit, pin) in &outputs.bits {
                    let on = cx.pins.get(*pin) == PinValue::Bit(true);
                    write_bit(pd, bit_of(offset, *bit), on);
                }
            }
        }
    }
}
